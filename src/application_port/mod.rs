mod auth_client;
mod session_service;
mod token_service;

pub use auth_client::*;
pub use session_service::*;
pub use token_service::*;
