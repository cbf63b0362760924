//! Block recognition inside a single worker stream.
//!
//! - `shape.rs`: compiled record shapes (header + positional sub-patterns)
//! - `parser.rs`: the cursor state machine emitting records or incomplete blocks
//! - `paired.rs`: header followed by free statement/bound-value text lines
//! - `sql.rs`: analysis of the statement text captured by paired shapes

pub mod shape;
pub mod parser;
pub mod paired;
pub mod sql;

pub use parser::{BlockParser, IncompleteBlock, IncompleteReason, StreamParse};
pub use shape::{BlockShape, FieldDecl, FieldKind, PayloadMode, ShapeKind};
