//! Run configuration: defaults < `logsift.toml` (or `--config`) < `LOGSIFT_*`
//! environment < command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::cli::OutputArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    /// Prefix CSV files with a UTF-8 byte order mark (spreadsheet friendly)
    pub bom: bool,
    pub sample_limit: usize,
    pub decimals: Option<usize>,
    pub logging: LoggingConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "report=info,engine=info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("logsift_output"),
            format: OutputFormat::Csv,
            bom: true,
            sample_limit: engine::DEFAULT_SAMPLE_LIMIT,
            decimals: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load from `path` (or `./logsift.toml` when absent) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_with(path, config::Environment::with_prefix("LOGSIFT"))
    }

    fn load_with(path: Option<&Path>, env: config::Environment) -> Result<Self> {
        let defaults = config::Config::try_from(&RunConfig::default())
            .context("Failed to serialize default configuration")?;

        let file = match path {
            // An explicit file must exist.
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name("logsift").required(false),
        };

        // Nested keys use a double underscore: LOGSIFT_LOGGING__LEVEL
        let env = env.prefix_separator("_").separator("__").try_parsing(true);

        config::Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(env)
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Command-line flags win over every other layer.
    pub fn apply_args(&mut self, args: &OutputArgs) {
        if let Some(dir) = &args.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(format) = args.format {
            self.format = format;
        }
        if args.no_bom {
            self.bom = false;
        }
        if let Some(limit) = args.sample_limit {
            self.sample_limit = limit;
        }
        if args.decimals.is_some() {
            self.decimals = args.decimals;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            bail!("output_dir must not be empty");
        }
        if let Some(decimals) = self.decimals {
            if decimals > engine::dialect::model::MAX_DECIMALS {
                bail!("decimals must be <= {}", engine::dialect::model::MAX_DECIMALS);
            }
        }
        if self.logging.level.trim().is_empty() {
            bail!("logging.level must not be empty");
        }
        Ok(())
    }
}
