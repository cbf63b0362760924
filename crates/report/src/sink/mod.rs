//! Report sinks writing tables to disk.

pub mod csv;
pub mod json;

pub use self::csv::CsvSink;
pub use self::json::JsonSink;
