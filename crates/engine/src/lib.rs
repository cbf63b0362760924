//! Structured log extraction and statistical aggregation.
//!
//! A run moves one direction through the stages below; no stage mutates
//! a value produced upstream.
//!
//! - `line`: raw bytes → classified [`line::LogLine`]s
//! - `stream`: classified lines → per-worker [`stream::WorkerStream`]s
//! - `block`: worker streams → typed [`record::Record`]s
//! - `payload`: path resolution, transforms and metric extraction
//! - `aggregate`: grouped descriptive statistics
//! - `table`: the tabular output contract consumed by report sinks
//! - `pipeline`: wires the stages for one input file
//! - `compare`: deltas between the same table of two runs

pub mod error;
pub mod line;
pub mod stream;
pub mod block;
pub mod record;
pub mod payload;
pub mod aggregate;
pub mod dialect;
pub mod table;
pub mod report;
pub mod pipeline;
pub mod compare;

// Re-export commonly used types
pub use dialect::{Dialect, DialectConfig};
pub use error::{EngineError, SinkError};
pub use pipeline::{Pipeline, RunOutput};
pub use report::RunReport;
pub use table::{ReportSink, Table};

/// Number of samples kept for every bounded error class.
pub const DEFAULT_SAMPLE_LIMIT: usize = 5;
