//! Payload access: path resolution, value transforms, embedded JSON and
//! metric extraction.

pub mod path;
pub mod transform;
pub mod embedded;
pub mod metric;

pub use metric::{ExtractedMetric, MetricSpec, MetricValue};
pub use transform::{Transform, TransformError};
