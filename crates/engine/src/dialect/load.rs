//! Load: dialect configuration from TOML text, files and the built-in set.

use std::path::Path;

use tracing::info;

use super::builtin;
use super::model::DialectConfig;
use crate::error::EngineError;

impl DialectConfig {
    /// Parse and validate a dialect from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
        let config: DialectConfig =
            toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate().map_err(EngineError::Config)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        info!("Loading dialect from: {}", path.display());
        Self::from_toml_str(&text).map_err(|e| match e {
            EngineError::Config(msg) => EngineError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    pub fn builtin(name: &str) -> Result<Self, EngineError> {
        let text = builtin::source(name).ok_or_else(|| EngineError::UnknownDialect(name.to_string()))?;
        Self::from_toml_str(text)
    }

    /// A built-in name, or otherwise a path to a TOML file.
    pub fn resolve(name_or_path: &str) -> Result<Self, EngineError> {
        if builtin::source(name_or_path).is_some() {
            return Self::builtin(name_or_path);
        }
        let path = Path::new(name_or_path);
        if path.exists() {
            return Self::from_file(path);
        }
        Err(EngineError::UnknownDialect(name_or_path.to_string()))
    }
}
