//! Reloadable `tracing` subscriber: starts from `RUST_LOG` (or `info`) and
//! switches to the configured filter once settings are loaded.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
