use std::sync::atomic::{AtomicU64, Ordering};

use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SniffError {
    #[error("Invalid marker keyword: {0}")]
    InvalidMarker(String),
}

#[derive(Debug, Default)]
pub struct SniffStats {
    pub lines_scanned: AtomicU64,
    pub lines_matched: AtomicU64,
}

/// Literal keyword test for a dialect's marker (e.g. `PERFORMANCE`, `hikari`).
///
/// Runs on raw bytes before any prefix regex, so lines that cannot belong to
/// the dialect are dropped without paying for a full match.
pub struct MarkerSniffer {
    matcher: RegexMatcher,
    keyword: String,
    stats: SniffStats,
}

impl MarkerSniffer {
    pub fn new(keyword: &str, case_sensitive: bool) -> Result<Self, SniffError> {
        if keyword.is_empty() {
            return Err(SniffError::InvalidMarker("keyword is empty".to_string()));
        }

        let matcher = RegexMatcherBuilder::new()
            .case_insensitive(!case_sensitive)
            .multi_line(false)
            .build(&regex::escape(keyword))
            .map_err(|e| SniffError::InvalidMarker(e.to_string()))?;

        Ok(Self {
            matcher,
            keyword: keyword.to_string(),
            stats: SniffStats::default(),
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    #[inline]
    pub fn contains(&self, line: &[u8]) -> bool {
        self.stats.lines_scanned.fetch_add(1, Ordering::Relaxed);

        let found = self.matcher.is_match(line).unwrap_or(false);
        if found {
            self.stats.lines_matched.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// `(lines_scanned, lines_matched)`
    pub fn stats(&self) -> (u64, u64) {
        (
            self.stats.lines_scanned.load(Ordering::Relaxed),
            self.stats.lines_matched.load(Ordering::Relaxed),
        )
    }
}

impl std::fmt::Debug for MarkerSniffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerSniffer")
            .field("keyword", &self.keyword)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_marker() {
        let sniffer = MarkerSniffer::new("hikari", false).expect("Failed to create sniffer");

        assert!(sniffer.contains(b"HikariPool-1 - Pool stats (total=10)"));
        assert!(sniffer.contains(b"com.zaxxer.hikari.pool.HikariPool"));
        assert!(!sniffer.contains(b"p6spy - #1 | took 3ms"));
    }

    #[test]
    fn test_case_sensitive_marker() {
        let sniffer = MarkerSniffer::new("PERFORMANCE", true).expect("Failed to create sniffer");

        assert!(sniffer.contains(b"INFO  PERFORMANCE - {\"step\":\"R-01\"}"));
        assert!(!sniffer.contains(b"INFO  performance tuning notes"));
    }

    #[test]
    fn test_marker_is_literal() {
        let sniffer = MarkerSniffer::new("PERF:CHUNK", true).expect("Failed to create sniffer");

        assert!(sniffer.contains(b"[PERF:CHUNK:CHARTER] phase=COMPLETE"));
        let dots = MarkerSniffer::new("a.b", true).expect("Failed to create sniffer");
        assert!(!dots.contains(b"axb"));
    }

    #[test]
    fn test_empty_marker_rejected() {
        assert!(MarkerSniffer::new("", false).is_err());
    }

    #[test]
    fn test_stats_tracking() {
        let sniffer = MarkerSniffer::new("took", false).expect("Failed to create sniffer");

        sniffer.contains(b"took 3ms");
        sniffer.contains(b"nothing here");
        sniffer.contains(b"TOOK 9ms");

        assert_eq!(sniffer.stats(), (3, 2));
    }
}
