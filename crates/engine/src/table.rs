//! Tabular output contract.
//!
//! Every consumer of engine results (CSV writer, JSON writer, tests) sees the
//! same thing: an ordered list of column names and rows of typed cells.
//! Decimal precision is a column property applied only when a cell is
//! rendered.

use serde::Serialize;

use crate::error::SinkError;
use crate::record::FieldValue;
use crate::report::RunReport;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl From<&FieldValue> for Cell {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Int(i) => Cell::Int(*i),
            FieldValue::Float(f) => Cell::Float(*f),
            FieldValue::Text(s) => Cell::Text(s.clone()),
            FieldValue::Bool(b) => Cell::Bool(*b),
        }
    }
}

impl From<Option<&str>> for Cell {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Cell::Empty, |s| Cell::Text(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    /// Decimal places for float cells; `None` renders full precision
    pub decimals: Option<usize>,
}

impl Column {
    pub fn text(name: &str) -> Self {
        Self {
            name: name.to_string(),
            decimals: None,
        }
    }

    pub fn number(name: &str, decimals: usize) -> Self {
        Self {
            name: name.to_string(),
            decimals: Some(decimals),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(name: &str, columns: Vec<Column>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn header(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Insert a column at `at`, filling rows from `cells` (missing cells are empty).
    pub fn insert_column(&mut self, at: usize, column: Column, cells: Vec<Cell>) {
        let at = at.min(self.columns.len());
        self.columns.insert(at, column);
        let mut cells = cells.into_iter();
        for row in &mut self.rows {
            row.insert(at.min(row.len()), cells.next().unwrap_or(Cell::Empty));
        }
    }

    /// Every row must be exactly as wide as the header.
    pub fn check_shape(&self) -> Result<(), SinkError> {
        let expected = self.columns.len();
        match self.rows.iter().position(|row| row.len() != expected) {
            Some(row) => Err(SinkError::RowWidth {
                table: self.name.clone(),
                row,
                width: self.rows[row].len(),
                expected,
            }),
            None => Ok(()),
        }
    }

    pub fn render_cell(&self, column: usize, cell: &Cell) -> String {
        let decimals = self.columns.get(column).and_then(|c| c.decimals);
        match cell {
            Cell::Empty => String::new(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => format_float(*f, decimals),
            Cell::Text(s) => s.clone(),
            Cell::Bool(b) => b.to_string(),
        }
    }

    pub fn rendered_rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows.iter().map(move |row| {
            row.iter()
                .enumerate()
                .map(|(i, cell)| self.render_cell(i, cell))
                .collect()
        })
    }
}

pub fn format_float(value: f64, decimals: Option<usize>) -> String {
    match decimals {
        Some(d) => format!("{value:.d$}"),
        None => value.to_string(),
    }
}

/// Receives the tables of one run.
#[cfg_attr(test, mockall::automock)]
pub trait ReportSink {
    fn write_table(&mut self, table: &Table) -> Result<(), SinkError>;

    /// Called once, before `finish`, with the run's counters and samples.
    fn write_report(&mut self, _report: &RunReport) -> Result<(), SinkError> {
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Collects tables in memory.
impl ReportSink for Vec<Table> {
    fn write_table(&mut self, table: &Table) -> Result<(), SinkError> {
        self.push(table.clone());
        Ok(())
    }
}
