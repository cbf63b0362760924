use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// A prefix pattern matched; timestamp/worker/level/logger may be set
    Prefixed,
    /// No prefix matched but the line carries the dialect marker; message is the raw line
    Unparsed,
    /// No prefix matched and the dialect accepts free continuation text (e.g. SQL)
    Continuation,
    /// Empty or whitespace-only
    Blank,
    /// A run of `=` or `-` characters
    Separator,
    /// Dropped by the marker pre-filter before any pattern was tried
    Filtered,
}

impl LineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineKind::Prefixed => "prefixed",
            LineKind::Unparsed => "unparsed",
            LineKind::Continuation => "continuation",
            LineKind::Blank => "blank",
            LineKind::Separator => "separator",
            LineKind::Filtered => "filtered",
        }
    }

    /// Lines whose message may open a record.
    pub fn carries_message(&self) -> bool {
        matches!(self, LineKind::Prefixed | LineKind::Unparsed)
    }
}

/// One classified physical line. Never mutated after classification.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    /// 1-based physical line number in the input file
    pub line_number: usize,
    /// Original text, without the line terminator
    pub raw: String,
    pub kind: LineKind,
    pub timestamp: Option<String>,
    pub worker_id: Option<String>,
    pub level: Option<String>,
    pub logger: Option<String>,
    pub message: String,
}

impl LogLine {
    /// A line with no prefix fields.
    pub fn bare(line_number: usize, raw: &str, kind: LineKind, message: String) -> Self {
        Self {
            line_number,
            raw: raw.to_string(),
            kind,
            timestamp: None,
            worker_id: None,
            level: None,
            logger: None,
            message,
        }
    }
}

/// A line that is neither prefixed, tolerated, nor structural.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line_number}: no prefix pattern matched")]
pub struct StructuralError {
    pub line_number: usize,
    pub raw: String,
}
