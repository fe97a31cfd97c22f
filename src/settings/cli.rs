use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "cadence", about = "Session token service")]
pub struct Cli {
    /// Path to the settings file.
    #[arg(long)]
    pub settings: Option<String>,
}
