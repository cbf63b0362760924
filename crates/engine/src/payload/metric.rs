use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::transform::{Transform, TransformError};
use crate::record::{render_value, Record};

/// Descriptor for one metric pulled out of every record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub name: String,
    /// Record lookup path (see [`Record::lookup`])
    pub path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub transform: Option<Transform>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Numeric(f64),
    Categorical(String),
}

impl MetricValue {
    /// Natural interpretation of an untransformed value.
    ///
    /// Only numbers are numeric; booleans, strings and containers are
    /// categorical. `null` is absence, not a value.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => Some(match n.as_f64() {
                Some(f) if f.is_finite() => MetricValue::Numeric(f),
                _ => MetricValue::Categorical(n.to_string()),
            }),
            other => Some(MetricValue::Categorical(render_value(other))),
        }
    }
}

/// One observation: a metric name, its group labels and a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedMetric {
    pub metric: String,
    pub labels: Vec<(String, String)>,
    pub value: MetricValue,
}

impl ExtractedMetric {
    pub fn numeric(metric: &str, value: f64) -> Self {
        Self {
            metric: metric.to_string(),
            labels: Vec::new(),
            value: MetricValue::Numeric(value),
        }
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.push((key.to_string(), value.to_string()));
        self
    }

    /// Group label by key; `metric` is the metric name.
    pub fn label(&self, key: &str) -> Option<&str> {
        if key == "metric" {
            return Some(&self.metric);
        }
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Outcome of extracting one metric from one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Value(MetricValue),
    Absent,
    Failed(TransformError),
}

impl MetricSpec {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("metric name must not be empty".to_string());
        }
        if self.path.trim().is_empty() {
            return Err(format!("metric '{}' has an empty path", self.name));
        }
        if let Some(transform) = &self.transform {
            transform
                .validate()
                .map_err(|e| format!("metric '{}': {}", self.name, e))?;
        }
        Ok(())
    }

    pub fn extract(&self, record: &Record) -> Extraction {
        let Some(value) = record.lookup(&self.path) else {
            return Extraction::Absent;
        };

        match &self.transform {
            Some(transform) => match transform.apply(&value) {
                Ok(v) => Extraction::Value(v),
                Err(e) => Extraction::Failed(e),
            },
            None => MetricValue::from_json(&value)
                .map(Extraction::Value)
                .unwrap_or(Extraction::Absent),
        }
    }
}
