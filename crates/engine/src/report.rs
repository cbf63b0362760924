//! Run report: everything a run observed besides its tables.
//!
//! Local failures (unmatched lines, incomplete blocks, failed transforms) are
//! absorbed here as counts plus a bounded number of verbatim samples, so the
//! presentation layer can explain a run without the engine printing anything.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::line::LineKind;

/// A counter that keeps the first `limit` items verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundedSamples<T> {
    pub limit: usize,
    pub total: usize,
    pub samples: Vec<T>,
}

impl<T> BoundedSamples<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            total: 0,
            samples: Vec::new(),
        }
    }

    pub fn record(&mut self, item: T) {
        self.total += 1;
        if self.samples.len() < self.limit {
            self.samples.push(item);
        }
    }

    /// Occurrences counted but not kept.
    pub fn overflow(&self) -> usize {
        self.total - self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// One sampled problem, tied to a physical line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleLine {
    pub line_number: usize,
    pub text: String,
}

impl SampleLine {
    pub fn new(line_number: usize, text: impl Into<String>) -> Self {
        Self {
            line_number,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarkerStats {
    pub keyword: String,
    pub lines_scanned: u64,
    pub lines_matched: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub source: String,
    pub dialect: String,

    // Lines
    /// Encoding the input was decoded as
    pub encoding: String,
    pub physical_lines: usize,
    pub lossy_lines: usize,
    pub classified_lines: usize,
    pub line_kinds: BTreeMap<LineKind, usize>,
    pub structural_errors: BoundedSamples<SampleLine>,
    pub marker: Option<MarkerStats>,

    // Streams
    pub workers: usize,
    pub discarded_lines: usize,

    // Blocks
    pub headers_matched: usize,
    pub records: usize,
    pub incomplete_blocks: BoundedSamples<SampleLine>,

    // Record selection
    pub missing_required: usize,
    pub filtered_records: usize,
    pub duplicate_records: usize,
    pub selected_records: usize,

    // Extraction
    pub observations: usize,
    pub absent_values: usize,
    pub transform_failures: BoundedSamples<SampleLine>,

    pub advisories: Vec<String>,
}

impl RunReport {
    pub fn new(source: &str, dialect: &str, sample_limit: usize) -> Self {
        Self {
            source: source.to_string(),
            dialect: dialect.to_string(),
            encoding: "UTF-8".to_string(),
            physical_lines: 0,
            lossy_lines: 0,
            classified_lines: 0,
            line_kinds: BTreeMap::new(),
            structural_errors: BoundedSamples::new(sample_limit),
            marker: None,
            workers: 0,
            discarded_lines: 0,
            headers_matched: 0,
            records: 0,
            incomplete_blocks: BoundedSamples::new(sample_limit),
            missing_required: 0,
            filtered_records: 0,
            duplicate_records: 0,
            selected_records: 0,
            observations: 0,
            absent_values: 0,
            transform_failures: BoundedSamples::new(sample_limit),
            advisories: Vec::new(),
        }
    }

    pub fn count_kind(&mut self, kind: LineKind) {
        *self.line_kinds.entry(kind).or_insert(0) += 1;
    }

    pub fn kind_count(&self, kind: LineKind) -> usize {
        self.line_kinds.get(&kind).copied().unwrap_or(0)
    }

    /// Every physical line is either classified or a structural error.
    pub fn is_complete(&self) -> bool {
        self.classified_lines + self.structural_errors.total == self.physical_lines
    }

    /// Derive advisories from the counters. Idempotent.
    pub fn finalize(&mut self) {
        let mut advisories = Vec::new();

        if self.physical_lines == 0 {
            advisories.push("input is empty".to_string());
        } else if self.classified_lines == 0 {
            advisories.push("no lines were classified; check the dialect's prefix patterns".to_string());
        }
        if !self.structural_errors.is_empty() {
            advisories.push(format!(
                "{} line(s) matched no prefix pattern and were dropped",
                self.structural_errors.total
            ));
        }
        if self.physical_lines > 0 && self.encoding != "UTF-8" {
            advisories.push(format!("input is not valid UTF-8; decoded as {}", self.encoding));
        }
        if self.lossy_lines > 0 {
            advisories.push(format!(
                "{} line(s) contained bytes invalid in {} and were decoded lossily",
                self.lossy_lines, self.encoding
            ));
        }
        if self.classified_lines > 0 && self.headers_matched == 0 {
            advisories.push("no record headers matched; check the dialect's shapes".to_string());
        }
        if !self.incomplete_blocks.is_empty() {
            advisories.push(format!(
                "{} block(s) were incomplete and produced no record",
                self.incomplete_blocks.total
            ));
        }
        if !self.transform_failures.is_empty() {
            advisories.push(format!(
                "{} value(s) failed their transform and were treated as absent",
                self.transform_failures.total
            ));
        }

        self.advisories = advisories;
    }
}
