//! Process-local adapters for development runs and tests. Nothing here is
//! shared across instances.

mod clock_manual;
mod revocation_store_memory;
mod user_repo_memory;

pub use clock_manual::*;
pub use revocation_store_memory::*;
pub use user_repo_memory::*;
