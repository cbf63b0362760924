use std::io::Write;

use engine::table::Cell;
use engine::{ReportSink, RunReport, SinkError, Table};
use serde_json::{json, Map, Value};

/// Buffers every table and writes one JSON document on `finish`:
/// `{"report": {...}, "tables": [{"name", "columns", "rows"}]}`.
pub struct JsonSink<W: Write> {
    out: W,
    tables: Vec<Value>,
    report: Value,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            tables: Vec::new(),
            report: Value::Null,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for JsonSink<W> {
    fn write_table(&mut self, table: &Table) -> Result<(), SinkError> {
        let rows: Vec<Value> = table
            .rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = table
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| (column.name.clone(), cell_value(cell, column.decimals)))
                    .collect();
                Value::Object(object)
            })
            .collect();

        self.tables.push(json!({
            "name": table.name,
            "columns": table.header(),
            "rows": rows,
        }));
        Ok(())
    }

    fn write_report(&mut self, report: &RunReport) -> Result<(), SinkError> {
        self.report = serde_json::to_value(report).map_err(|e| SinkError::Serialize(e.to_string()))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        let document = json!({
            "report": self.report,
            "tables": self.tables,
        });
        serde_json::to_writer_pretty(&mut self.out, &document)
            .map_err(|e| SinkError::Serialize(e.to_string()))?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Floats are rounded to the column's precision; non-finite floats become null.
fn cell_value(cell: &Cell, decimals: Option<usize>) -> Value {
    match cell {
        Cell::Empty => Value::Null,
        Cell::Int(i) => Value::from(*i),
        Cell::Float(f) => {
            let rounded = match decimals {
                Some(d) => {
                    let scale = 10f64.powi(d as i32);
                    (f * scale).round() / scale
                }
                None => *f,
            };
            serde_json::Number::from_f64(rounded).map_or(Value::Null, Value::Number)
        }
        Cell::Text(s) => Value::String(s.clone()),
        Cell::Bool(b) => Value::Bool(*b),
    }
}

#[cfg(test)]
mod tests {
    use engine::table::Column;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_document_shape() {
        let mut table = Table::new("summary", vec![Column::text("worker"), Column::number("mean", 2)]);
        table.rows.push(vec![Cell::Text("A".into()), Cell::Float(2.0 / 3.0)]);
        let empty = Table::new("records", vec![Column::text("line_number")]);

        let mut sink = JsonSink::new(Vec::new());
        sink.write_table(&table).expect("writes");
        sink.write_table(&empty).expect("writes");
        sink.write_report(&RunReport::new("app.log", "p6spy", 5)).expect("writes");
        sink.finish().expect("finishes");

        let doc: Value = serde_json::from_slice(&sink.into_inner()).expect("valid JSON");
        assert_eq!(doc["report"]["dialect"], json!("p6spy"));
        assert_eq!(doc["tables"][0]["columns"], json!(["worker", "mean"]));
        assert_eq!(doc["tables"][0]["rows"][0]["worker"], json!("A"));
        assert_eq!(doc["tables"][0]["rows"][0]["mean"].as_f64(), Some(0.67));
        assert_eq!(doc["tables"][1]["rows"], json!([]));
    }

    #[test]
    fn test_cell_values() {
        assert_eq!(cell_value(&Cell::Empty, None), Value::Null);
        assert_eq!(cell_value(&Cell::Int(3), Some(2)), json!(3));
        assert_eq!(cell_value(&Cell::Float(f64::NAN), None), Value::Null);
        assert_eq!(cell_value(&Cell::Bool(true), None), json!(true));
    }
}
