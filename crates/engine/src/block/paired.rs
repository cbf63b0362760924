//! Paired records: a header line followed by free statement text.
//!
//! The first collected line is the template (placeholders such as `?`), the
//! second the resolved statement with bound values. When only one line
//! follows, it is used as both and the record says so through
//! `single_line_pair`, since the two readings cannot be told apart.

use super::sql::SqlAnalyzer;
use crate::line::{LineKind, LogLine};
use crate::record::FieldValue;

/// Fields a paired record adds after its header fields.
pub const DERIVED_FIELDS: &[&str] = &[
    "prepared_sql",
    "executed_sql",
    "single_line_pair",
    "sql_type",
    "table_name",
    "parameter_count",
    "in_clause_count",
    "parameter_values",
    "sql_id",
];

#[derive(Debug, Clone)]
pub struct PairedSpec {
    pub max_lines: usize,
    /// Header field values that must all hold for statement text to be collected
    pub collect_if: Vec<(String, String)>,
    analyzer: SqlAnalyzer,
}

impl PairedSpec {
    pub fn new(max_lines: usize, collect_if: Vec<(String, String)>) -> Result<Self, String> {
        if max_lines == 0 {
            return Err("paired shapes need max_lines > 0".to_string());
        }
        let analyzer = SqlAnalyzer::new().map_err(|e| e.to_string())?;
        Ok(Self {
            max_lines,
            collect_if,
            analyzer,
        })
    }

    /// Whether the header announces statement text at all (e.g. `statement`
    /// entries do, `commit` entries do not).
    pub fn wants_statement(&self, header_fields: &[(String, FieldValue)]) -> bool {
        self.collect_if.iter().all(|(field, expected)| {
            header_fields
                .iter()
                .any(|(name, value)| name == field && value.to_string() == *expected)
        })
    }

    /// Collect statement lines starting at `start`.
    ///
    /// Blank lines are skipped; any line that is not a continuation ends the
    /// statement. Returns the collected lines and the index after the last
    /// consumed line.
    pub fn collect<'a>(&self, lines: &'a [LogLine], start: usize) -> (Vec<&'a LogLine>, usize) {
        let mut collected = Vec::with_capacity(self.max_lines);
        let mut next = start;

        while next < lines.len() && collected.len() < self.max_lines {
            match lines[next].kind {
                LineKind::Blank => next += 1,
                LineKind::Continuation => {
                    collected.push(&lines[next]);
                    next += 1;
                }
                _ => break,
            }
        }
        (collected, next)
    }

    /// Derived fields for the collected statement text; `texts` is non-empty.
    pub fn statement_fields(&self, texts: &[&str]) -> Vec<(String, FieldValue)> {
        let (prepared, executed, single) = match texts {
            [only] => {
                let text = only.trim_end_matches(';').to_string();
                (text.clone(), text, self.max_lines >= 2)
            }
            [first, second, ..] => (first.to_string(), second.trim_end_matches(';').to_string(), false),
            [] => (String::new(), String::new(), false),
        };

        let summary = self.analyzer.analyze(&prepared, &executed);

        vec![
            ("prepared_sql".to_string(), FieldValue::Text(prepared)),
            ("executed_sql".to_string(), FieldValue::Text(executed)),
            ("single_line_pair".to_string(), FieldValue::Bool(single)),
            ("sql_type".to_string(), FieldValue::Text(summary.sql_type.to_string())),
            ("table_name".to_string(), FieldValue::Text(summary.table_name)),
            ("parameter_count".to_string(), FieldValue::Int(summary.parameter_count as i64)),
            ("in_clause_count".to_string(), FieldValue::Int(summary.in_clause_count as i64)),
            ("parameter_values".to_string(), FieldValue::Text(summary.parameter_values.join("|"))),
            ("sql_id".to_string(), FieldValue::Text(summary.sql_id)),
        ]
    }
}
