//! webcard CLI: resolve a domain into its published identity profile.
//!
//! Follows the domain's `_adp` TXT record to a content-addressed profile
//! document, cross-checks it against the linked WebID profile, and prints
//! the reconciled result.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
