use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use report::boot::init_logging;
use report::cli::{Cli, Command};
use report::commands;
use report::conf::RunConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = RunConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    match &cli.command {
        Command::Run(args) => config.apply_args(&args.output),
        Command::Compare(args) => config.apply_args(&args.output),
        Command::Dialects => {}
    }
    config.validate().context("Configuration validation failed")?;

    init_logging(&config.logging, cli.log_json);
    info!("Starting logsift v{}", env!("CARGO_PKG_VERSION"));

    let text = match &cli.command {
        Command::Run(args) => commands::run(args, &config)?,
        Command::Compare(args) => commands::compare(args, &config)?,
        Command::Dialects => commands::list_dialects()?,
    };
    print!("{text}");
    Ok(())
}
