//! Model: DialectConfig and the tables nested in it.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::aggregate::RowOrder;
use crate::block::{FieldDecl, PayloadMode};
use crate::line::timestamp::DEFAULT_FORMATS;
use crate::payload::{MetricSpec, Transform};
use crate::stream::UnattributedPolicy;

/// Logback/SLF4J layout: `date time [worker] LEVEL logger - message`.
pub const LOGBACK_PREFIX: &str = r"^(?P<ts>\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2}(?:\.\d{1,9})?)\s+\[(?P<worker>[^\]]+)\]\s+(?P<level>[A-Z]+)\s+(?P<logger>\S+)\s+-\s+(?P<message>.*)$";

/// Table names every run may emit besides its summaries.
pub const RESERVED_TABLES: &[&str] = &["records", "metrics", "slowest"];

/// Upper bound on rendered float precision.
pub const MAX_DECIMALS: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialectConfig {
    pub name: String,
    pub description: String,
    /// Literal keyword every relevant line contains
    pub marker: Option<String>,
    pub marker_case_sensitive: bool,
    /// Drop lines without the marker before classification
    pub prefilter: bool,
    pub tolerate_unparsed: bool,
    pub continuation_lines: bool,
    pub unattributed: UnattributedPolicy,
    /// Line prefix patterns, tried in order; each needs a `message` group
    pub prefixes: Vec<String>,
    pub timestamp_formats: Vec<String>,
    pub shapes: Vec<ShapeConfig>,
    pub metrics: Vec<MetricSpec>,
    pub summaries: Vec<SummaryConfig>,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKindConfig {
    #[default]
    Block,
    Paired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeConfig {
    pub name: String,
    #[serde(default)]
    pub kind: ShapeKindConfig,
    pub header: String,
    #[serde(default)]
    pub lines: Vec<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDecl>,
    #[serde(default)]
    pub payload: PayloadMode,
    /// Paired shapes only
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
    /// Paired shapes only
    #[serde(default)]
    pub collect_if: BTreeMap<String, String>,
}

/// One grouped statistics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryConfig {
    pub name: String,
    /// Restrict to records of this shape
    #[serde(default)]
    pub shape: Option<String>,
    pub group_by: Vec<String>,
    /// Record lookup path of the summarized value
    pub value: String,
    #[serde(default)]
    pub transform: Option<Transform>,
    #[serde(default)]
    pub order: RowOrder,
    /// Exact-match conditions on record lookups
    #[serde(default)]
    pub filter: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub decimals: usize,
    /// Emit the per-record `records` table
    pub detail: bool,
    /// Conditions every selected record must meet
    pub filter: BTreeMap<String, String>,
    /// Lookups every selected record must resolve
    pub require: Vec<String>,
    /// Keep only the first record per combination of these lookups
    pub dedup: Vec<String>,
    pub metrics_group_by: Vec<String>,
    /// Conditions for records feeding the `metrics` table
    pub metrics_filter: BTreeMap<String, String>,
    pub slowest: Option<SlowestConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowestConfig {
    pub field: String,
    #[serde(default = "default_slowest_limit")]
    pub limit: usize,
}

fn default_max_lines() -> usize {
    2
}

fn default_slowest_limit() -> usize {
    10
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            marker: None,
            marker_case_sensitive: false,
            prefilter: false,
            tolerate_unparsed: false,
            continuation_lines: false,
            unattributed: UnattributedPolicy::default(),
            prefixes: vec![LOGBACK_PREFIX.to_string()],
            timestamp_formats: DEFAULT_FORMATS.iter().map(|f| f.to_string()).collect(),
            shapes: Vec::new(),
            metrics: Vec::new(),
            summaries: Vec::new(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            decimals: 3,
            detail: true,
            filter: BTreeMap::new(),
            require: Vec::new(),
            dedup: Vec::new(),
            metrics_group_by: Vec::new(),
            metrics_filter: BTreeMap::new(),
            slowest: None,
        }
    }
}

impl DialectConfig {
    /// Structural checks that need no regex compilation.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.prefixes.is_empty() {
            return Err("at least one prefix pattern is required".to_string());
        }
        if self.shapes.is_empty() {
            return Err("at least one shape is required".to_string());
        }
        if self.prefilter && self.marker.as_deref().map_or(true, str::is_empty) {
            return Err("prefilter requires a marker".to_string());
        }

        let mut shape_names = HashSet::new();
        for shape in &self.shapes {
            shape.validate()?;
            if !shape_names.insert(shape.name.as_str()) {
                return Err(format!("shape '{}' is declared more than once", shape.name));
            }
        }

        let mut table_names = HashSet::new();
        for summary in &self.summaries {
            if summary.name.trim().is_empty() {
                return Err("summary name must not be empty".to_string());
            }
            if RESERVED_TABLES.contains(&summary.name.as_str()) {
                return Err(format!("summary name '{}' is reserved", summary.name));
            }
            if !table_names.insert(summary.name.as_str()) {
                return Err(format!("summary '{}' is declared more than once", summary.name));
            }
            if let Some(shape) = &summary.shape {
                if !shape_names.contains(shape.as_str()) {
                    return Err(format!("summary '{}' names unknown shape '{shape}'", summary.name));
                }
            }
            if summary.value.trim().is_empty() {
                return Err(format!("summary '{}' has an empty value path", summary.name));
            }
            if let Some(transform) = &summary.transform {
                transform
                    .validate()
                    .map_err(|e| format!("summary '{}': {e}", summary.name))?;
            }
        }

        let mut metric_names = HashSet::new();
        for metric in &self.metrics {
            metric.validate()?;
            if !metric_names.insert(metric.name.as_str()) {
                return Err(format!("metric '{}' is declared more than once", metric.name));
            }
        }

        self.report.validate()
    }
}

impl ShapeConfig {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("shape name must not be empty".to_string());
        }
        if self.header.is_empty() {
            return Err(format!("shape '{}' has an empty header pattern", self.name));
        }
        match self.kind {
            ShapeKindConfig::Paired if self.max_lines == 0 => {
                Err(format!("shape '{}': max_lines must be > 0", self.name))
            }
            ShapeKindConfig::Block if !self.collect_if.is_empty() => {
                Err(format!("shape '{}': collect_if applies to paired shapes only", self.name))
            }
            _ => Ok(()),
        }
    }
}

impl ReportConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.decimals > MAX_DECIMALS {
            return Err(format!("report.decimals must be <= {MAX_DECIMALS}"));
        }
        if let Some(slowest) = &self.slowest {
            if slowest.limit == 0 {
                return Err("report.slowest.limit must be > 0".to_string());
            }
            if slowest.field.trim().is_empty() {
                return Err("report.slowest.field must not be empty".to_string());
            }
        }
        Ok(())
    }
}
