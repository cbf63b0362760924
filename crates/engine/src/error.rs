use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run before any output is produced.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Input file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid dialect configuration: {0}")]
    Config(String),

    #[error("Invalid pattern in {owner}: {source}")]
    InvalidPattern {
        owner: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),

    #[error("Cannot compare runs: {0}")]
    Compare(String),
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            EngineError::NotFound { path }
        } else {
            EngineError::Io { path, source }
        }
    }
}

/// Errors raised by a [`crate::table::ReportSink`] implementation.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink serialization error: {0}")]
    Serialize(String),

    #[error("Table '{table}' row {row} has {width} cells, expected {expected}")]
    RowWidth {
        table: String,
        row: usize,
        width: usize,
        expected: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_distinguished() {
        let err = EngineError::io(
            "/nope.log",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, EngineError::NotFound { .. }));
        assert_eq!(err.to_string(), "Input file not found: /nope.log");
    }

    #[test]
    fn test_other_io_kept() {
        let err = EngineError::io(
            "/locked.log",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, EngineError::Io { .. }));
        assert!(err.to_string().contains("denied"));
    }
}
