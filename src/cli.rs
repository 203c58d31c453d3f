use clap::Parser;

use crate::cmd::Commands;

/// Household mission tracker CLI.
/// Talks to the shared record store; local state lives under ~/.loadout.
#[derive(Parser)]
#[command(name = "loadout", version, about = "Household mission and loadout CLI")]
pub struct Cli {
    /// API endpoint URL, overriding the saved one for this invocation.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}
