//! Dialects: declarative description of one log family, its loading
//! from TOML, the built-in set, and compilation into matchers.

pub mod model;
pub mod load;
pub mod builtin;
pub mod compile;

pub use compile::Dialect;
pub use model::{
    DialectConfig, ReportConfig, ShapeConfig, ShapeKindConfig, SlowestConfig, SummaryConfig,
};
