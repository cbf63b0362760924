//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::conf::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "logsift")]
#[command(about = "Extract structured records from interleaved logs and summarize them")]
#[command(version)]
pub struct Cli {
    /// Run configuration file (TOML)
    #[arg(long, global = true, env = "LOGSIFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze one log file
    Run(RunArgs),

    /// Compare one aggregate table across two log files
    Compare(CompareArgs),

    /// List the built-in dialects
    Dialects,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Log file to analyze
    pub input: PathBuf,

    /// Built-in dialect name or path to a dialect TOML file
    #[arg(short, long)]
    pub dialect: String,

    /// Keep only records whose lookup equals a value (repeatable)
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub filters: Vec<(String, String)>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CompareArgs {
    /// Baseline log file
    pub left: PathBuf,

    /// Log file measured against the baseline
    pub right: PathBuf,

    /// Built-in dialect name or path to a dialect TOML file
    #[arg(short, long)]
    pub dialect: String,

    /// Aggregate table to compare [default: metrics, else the first summary]
    #[arg(short, long)]
    pub table: Option<String>,

    /// Keep only records whose lookup equals a value (repeatable)
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub filters: Vec<(String, String)>,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Output flags shared by `run` and `compare`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Directory for the generated files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write CSV files without a UTF-8 byte order mark
    #[arg(long)]
    pub no_bom: bool,

    /// Error samples kept per class
    #[arg(long)]
    pub sample_limit: Option<usize>,

    /// Decimal places for rendered statistics
    #[arg(long)]
    pub decimals: Option<usize>,

    /// Print the summary only; write no files
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("payload.status=END"),
            Ok(("payload.status".to_string(), "END".to_string()))
        );
        assert_eq!(parse_key_value("k=a=b"), Ok(("k".to_string(), "a=b".to_string())));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_run_args() {
        let cli = Cli::try_parse_from([
            "logsift", "run", "app.log", "-d", "p6spy", "--format", "json", "--filter", "worker=A",
            "--filter", "category=statement", "--no-bom",
        ])
        .expect("parses");

        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.input, PathBuf::from("app.log"));
        assert_eq!(args.dialect, "p6spy");
        assert_eq!(args.output.format, Some(OutputFormat::Json));
        assert_eq!(args.filters.len(), 2);
        assert!(args.output.no_bom);
        assert!(!args.output.dry_run);
    }

    #[test]
    fn test_compare_args() {
        let cli = Cli::try_parse_from([
            "logsift", "compare", "phase1.log", "phase2.log", "-d", "rtt-phase2", "-t", "by_mode", "--dry-run",
        ])
        .expect("parses");

        let Command::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        assert_eq!(args.left, PathBuf::from("phase1.log"));
        assert_eq!(args.right, PathBuf::from("phase2.log"));
        assert_eq!(args.dialect, "rtt-phase2");
        assert_eq!(args.table.as_deref(), Some("by_mode"));
        assert!(args.output.dry_run);
    }

    #[test]
    fn test_compare_needs_two_inputs() {
        assert!(Cli::try_parse_from(["logsift", "compare", "phase1.log", "-d", "p6spy"]).is_err());
    }

    #[test]
    fn test_dialect_is_required() {
        assert!(Cli::try_parse_from(["logsift", "run", "app.log"]).is_err());
    }

    #[test]
    fn test_dialects_subcommand() {
        let cli = Cli::try_parse_from(["logsift", "--log-json", "dialects"]).expect("parses");
        assert!(matches!(cli.command, Command::Dialects));
        assert!(cli.log_json);
    }

    #[test]
    fn test_cli_debug_assert() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
