//! Line layer: decoding raw input bytes and classifying each physical line.
//!
//! - `decode.rs`: BOM removal, encoding detection with CP949 and Latin fallbacks, ANSI stripping
//! - `classify.rs`: prefix matching into [`LogLine`]s
//! - `sniff.rs`: cheap dialect keyword test run before any regex
//! - `timestamp.rs`: sortable timestamp normalization

pub mod model;
pub mod decode;
pub mod sniff;
pub mod timestamp;
pub mod classify;

pub use classify::LineClassifier;
pub use decode::{decode_lines, Decoded, DecodedLine};
pub use model::{LineKind, LogLine, StructuralError};
