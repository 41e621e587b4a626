mod bootstrap;
mod cli_args;
mod config;
mod dry_run;
mod runtime;

use anyhow::Result;
use clap::Parser;

use crate::bootstrap::init_tracing;
use crate::cli_args::Cli;
use crate::config::RelayConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let config = RelayConfig::from_cli(&cli)?;
    runtime::run(config).await
}
