//! Settings are read from a TOML file and then overridden from `CADENCE__*`
//! environment variables, e.g. `CADENCE__TOKEN__ACCESS_SECRET`.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
