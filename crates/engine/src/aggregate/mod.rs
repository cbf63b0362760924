//! Grouped descriptive statistics.

pub mod stats;
pub mod group;

pub use group::{AggregateRow, AggregateTable, MetricAggregator, RowOrder, RowStats};
pub use stats::Summary;
