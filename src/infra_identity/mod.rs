mod federated_auth_client;
mod local_auth_client;

pub use federated_auth_client::*;
pub use local_auth_client::*;
