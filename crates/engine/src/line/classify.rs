use regex::{Captures, Regex};

use super::model::{LineKind, LogLine, StructuralError};
use super::sniff::MarkerSniffer;
use super::timestamp;

/// Flags controlling what happens to lines no prefix pattern accepts.
#[derive(Debug, Clone, Default)]
pub struct ClassifyOptions {
    /// Drop lines without the marker before trying any prefix pattern.
    pub prefilter: bool,
    /// Keep marker-bearing lines that match no prefix as [`LineKind::Unparsed`].
    pub tolerate_unparsed: bool,
    /// Keep any other non-matching line as [`LineKind::Continuation`].
    pub continuation_lines: bool,
    pub timestamp_formats: Vec<String>,
}

/// Turns one physical line into a [`LogLine`], or rejects it.
///
/// Decision order: blank, separator, marker pre-filter, prefix patterns in
/// declared order (first match wins), unparsed tolerance, continuation.
#[derive(Debug)]
pub struct LineClassifier {
    prefixes: Vec<Regex>,
    sniffer: Option<MarkerSniffer>,
    options: ClassifyOptions,
}

impl LineClassifier {
    pub fn new(prefixes: Vec<Regex>, sniffer: Option<MarkerSniffer>, options: ClassifyOptions) -> Self {
        Self {
            prefixes,
            sniffer,
            options,
        }
    }

    pub fn classify(&self, line_number: usize, raw: &str) -> Result<LogLine, StructuralError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(LogLine::bare(line_number, raw, LineKind::Blank, String::new()));
        }
        if is_separator(trimmed) {
            return Ok(LogLine::bare(line_number, raw, LineKind::Separator, trimmed.to_string()));
        }

        let has_marker = self.sniffer.as_ref().map(|s| s.contains(raw.as_bytes()));
        if self.options.prefilter && has_marker == Some(false) {
            return Ok(LogLine::bare(line_number, raw, LineKind::Filtered, String::new()));
        }

        if let Some(caps) = self.prefixes.iter().find_map(|re| re.captures(raw)) {
            return Ok(self.prefixed(line_number, raw, &caps));
        }

        if self.options.tolerate_unparsed && has_marker.unwrap_or(true) {
            return Ok(LogLine::bare(line_number, raw, LineKind::Unparsed, raw.to_string()));
        }
        if self.options.continuation_lines {
            return Ok(LogLine::bare(line_number, raw, LineKind::Continuation, trimmed.to_string()));
        }

        Err(StructuralError {
            line_number,
            raw: raw.to_string(),
        })
    }

    /// `(lines_scanned, lines_matched)` of the marker sniffer, if any.
    pub fn marker_stats(&self) -> Option<(u64, u64)> {
        self.sniffer.as_ref().map(MarkerSniffer::stats)
    }

    fn prefixed(&self, line_number: usize, raw: &str, caps: &Captures<'_>) -> LogLine {
        let group = |name: &str| {
            caps.name(name)
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty())
        };

        LogLine {
            line_number,
            raw: raw.to_string(),
            kind: LineKind::Prefixed,
            timestamp: group("ts").map(|ts| timestamp::normalize(ts, &self.options.timestamp_formats)),
            worker_id: group("worker").map(str::to_string),
            level: group("level").map(str::to_string),
            logger: group("logger").map(str::to_string),
            message: caps
                .name("message")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        }
    }
}

fn is_separator(trimmed: &str) -> bool {
    trimmed.len() >= 3 && (trimmed.bytes().all(|b| b == b'=') || trimmed.bytes().all(|b| b == b'-'))
}
