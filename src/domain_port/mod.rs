// store

mod revocation_store;

pub use revocation_store::*;

// repo

mod user_repo;

pub use user_repo::*;

mod clock;

pub use clock::*;
