//! Run comparison: one aggregate table from two runs, matched row by row.
//!
//! The left run is the baseline. `diff` is right minus left and `pct` is that
//! difference relative to the left mean, so a faster right run shows negative
//! values.

use std::collections::HashMap;

use tracing::debug;

use crate::dialect::Dialect;
use crate::error::EngineError;
use crate::pipeline::RunOutput;
use crate::table::{Cell, Column, Table};

/// Columns appended after the group key columns.
pub const DELTA_COLUMNS: &[&str] = &["left_count", "right_count", "left_mean", "right_mean", "diff", "pct"];

/// Key-side columns that describe a row rather than identify it.
const DESCRIPTIVE: &[&str] = &["description"];

/// Name of the produced table.
pub const COMPARISON_TABLE: &str = "comparison";

/// `metrics` when the dialect declares metrics, else its first summary.
pub fn default_table(dialect: &Dialect) -> Option<&str> {
    let config = dialect.config();
    if !config.metrics.is_empty() {
        return Some("metrics");
    }
    config.summaries.first().map(|s| s.name.as_str())
}

/// Compare the aggregate table `table` of two runs.
pub fn compare_runs(left: &RunOutput, right: &RunOutput, table: &str, decimals: usize) -> Result<Table, EngineError> {
    fn find<'a>(run: &'a RunOutput, table: &str) -> Result<&'a Table, EngineError> {
        run.table(table)
            .ok_or_else(|| EngineError::Compare(format!("run '{}' has no table '{table}'", run.report.source)))
    }
    compare_tables(find(left, table)?, find(right, table)?, decimals)
}

/// Rows present in `left` come first in their order, then rows only in `right`.
pub fn compare_tables(left: &Table, right: &Table, decimals: usize) -> Result<Table, EngineError> {
    let left = Side::new(left)?;
    let right = Side::new(right)?;
    if left.key_names() != right.key_names() {
        return Err(EngineError::Compare(format!(
            "tables group by different keys: {:?} vs {:?}",
            left.key_names(),
            right.key_names()
        )));
    }

    let mut columns: Vec<Column> = left.key_names().into_iter().map(Column::text).collect();
    columns.extend(DELTA_COLUMNS[..2].iter().map(|c| Column::text(c)));
    columns.extend(DELTA_COLUMNS[2..].iter().map(|c| Column::number(c, decimals)));
    let mut out = Table::new(COMPARISON_TABLE, columns);

    let right_index: HashMap<Vec<String>, &[Cell]> =
        right.table.rows.iter().map(|row| (right.key(row), row.as_slice())).collect();
    let mut matched = 0;

    for row in &left.table.rows {
        let key = left.key(row);
        let other = right_index.get(&key).copied();
        if other.is_some() {
            matched += 1;
        }
        out.rows.push(delta_row(key, Some((&left, row)), other.map(|r| (&right, r))));
    }
    let left_keys: Vec<Vec<String>> = left.table.rows.iter().map(|row| left.key(row)).collect();
    for row in &right.table.rows {
        let key = right.key(row);
        if !left_keys.contains(&key) {
            out.rows.push(delta_row(key, None, Some((&right, row))));
        }
    }

    debug!(
        left = left.table.rows.len(),
        right = right.table.rows.len(),
        matched,
        "compare: matched aggregate rows"
    );
    Ok(out)
}

/// Column positions of one aggregate table.
struct Side<'a> {
    table: &'a Table,
    keys: Vec<usize>,
    count: usize,
    mean: usize,
}

impl<'a> Side<'a> {
    fn new(table: &'a Table) -> Result<Self, EngineError> {
        let (Some(count), Some(mean)) = (table.column_index("count"), table.column_index("mean")) else {
            return Err(EngineError::Compare(format!(
                "table '{}' has no count and mean columns",
                table.name
            )));
        };
        let keys = (0..count)
            .filter(|&i| !DESCRIPTIVE.contains(&table.columns[i].name.as_str()))
            .collect();
        Ok(Self {
            table,
            keys,
            count,
            mean,
        })
    }

    fn key_names(&self) -> Vec<&str> {
        self.keys.iter().map(|&i| self.table.columns[i].name.as_str()).collect()
    }

    fn key(&self, row: &[Cell]) -> Vec<String> {
        self.keys
            .iter()
            .map(|&i| row.get(i).map_or(String::new(), |cell| self.table.render_cell(i, cell)))
            .collect()
    }

    fn count(&self, row: &[Cell]) -> Cell {
        row.get(self.count).cloned().unwrap_or(Cell::Empty)
    }

    /// `None` for categorical rows, which carry no mean.
    fn mean(&self, row: &[Cell]) -> Option<f64> {
        match row.get(self.mean) {
            Some(Cell::Float(f)) => Some(*f),
            Some(Cell::Int(i)) => Some(*i as f64),
            _ => None,
        }
    }
}

fn delta_row(key: Vec<String>, left: Option<(&Side<'_>, &[Cell])>, right: Option<(&Side<'_>, &[Cell])>) -> Vec<Cell> {
    let count = |side: Option<(&Side<'_>, &[Cell])>| side.map_or(Cell::Empty, |(s, row)| s.count(row));
    let mean = |side: Option<(&Side<'_>, &[Cell])>| side.and_then(|(s, row)| s.mean(row));

    let (left_mean, right_mean) = (mean(left), mean(right));
    let diff = left_mean.zip(right_mean).map(|(l, r)| r - l);
    let pct = left_mean
        .zip(diff)
        .filter(|(l, _)| *l != 0.0)
        .map(|(l, d)| d / l * 100.0);

    let mut row: Vec<Cell> = key.into_iter().map(Cell::Text).collect();
    row.push(count(left));
    row.push(count(right));
    row.extend(
        [left_mean, right_mean, diff, pct]
            .into_iter()
            .map(|v| v.map_or(Cell::Empty, Cell::Float)),
    );
    row
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::dialect::DialectConfig;
    use crate::pipeline::Pipeline;

    const PHASES: &str = r#"
        name = "phases"

        [[shapes]]
        name = "call"
        header = 'district=(?P<district>\w+), methodTime=(?P<method_ms>[\d.]+) ms'

        [shapes.fields]
        method_ms = "float"

        [[metrics]]
        name = "method_ms"
        path = "method_ms"
        description = "Method time (ms)"
    "#;

    fn pipeline() -> Pipeline {
        let config = DialectConfig::from_toml_str(PHASES).expect("test dialect parses");
        Pipeline::new(Dialect::compile(config).expect("test dialect compiles"))
    }

    fn run(source: &str, times: &[(&str, f64)]) -> RunOutput {
        let text: String = times
            .iter()
            .enumerate()
            .map(|(i, (district, ms))| {
                format!("2024-01-01 10:00:0{i}.000 [exec-1] INFO app - district={district}, methodTime={ms} ms\n")
            })
            .collect();
        pipeline().run_text(source, &text).expect("runs")
    }

    fn by_district() -> Table {
        let mut table = Table::new(
            "by_district",
            vec![Column::text("district"), Column::text("count"), Column::number("mean", 3)],
        );
        table.rows = vec![
            vec![Cell::Text("gangnam".into()), Cell::Int(2), Cell::Float(40.0)],
            vec![Cell::Text("seocho".into()), Cell::Int(1), Cell::Float(0.0)],
        ];
        table
    }

    // ── Whole runs ───────────────────────────────────────────────

    #[test]
    fn test_metrics_delta_between_runs() {
        let sequential = run("phase1.log", &[("gangnam", 100.0), ("seocho", 200.0)]);
        let pipelined = run("phase2.log", &[("gangnam", 50.0), ("seocho", 100.0)]);

        let delta = compare_runs(&sequential, &pipelined, "metrics", 3).expect("compares");

        assert_eq!(delta.name, COMPARISON_TABLE);
        assert_eq!(
            delta.header(),
            vec!["metric", "left_count", "right_count", "left_mean", "right_mean", "diff", "pct"]
        );
        let rows: Vec<Vec<String>> = delta.rendered_rows().collect();
        assert_eq!(rows, vec![vec!["method_ms", "2", "2", "150.000", "75.000", "-75.000", "-50.000"]]);
    }

    #[test]
    fn test_default_table() {
        assert_eq!(default_table(pipeline().dialect()), Some("metrics"));
        let hikari = Dialect::load("hikaricp").expect("builtin");
        assert_eq!(default_table(&hikari), Some("metrics"));
        let chunks = Dialect::load("perf-chunks").expect("builtin");
        assert_eq!(default_table(&chunks), Some("load_by_type"));
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let left = run("a.log", &[("gangnam", 1.0)]);
        let right = run("b.log", &[("gangnam", 2.0)]);
        let err = compare_runs(&left, &right, "by_nothing", 3).unwrap_err();
        assert!(matches!(err, EngineError::Compare(msg) if msg.contains("by_nothing")));
    }

    #[test]
    fn test_sequential_against_pipelined_districts() {
        let prefix = "INFO  c.w.DistrictLoader -";
        let phase1 = format!(
            "2026-01-06 11:00:00.000 [exec-1] {prefix} [Metrics-Sequential] district=강남구, commands=3, methodTime=12.40 ms, totalCmdLatency=11.20 ms, ioRatio=90.3 %, nonIoTime=1.20 ms, cmd1=4.10 ms (120건), cmd2=3.90 ms (80건), cmd3=3.20 ms (45건), status=OK\n\
             2026-01-06 11:00:00.100 [exec-1] {prefix} [Metrics-Sequential] district=서초구, commands=3, methodTime=10.00 ms, totalCmdLatency=9.00 ms, ioRatio=90.0 %, nonIoTime=1.00 ms, cmd1=3.00 ms (90건), cmd2=3.00 ms (60건), cmd3=3.00 ms (30건), status=OK\n"
        );
        let phase2 = format!(
            "2026-01-06 12:00:00.000 [exec-1] {prefix} [Metrics-Pipeline] district=강남구, commands=3 (pipelined), methodTime=5.10 ms, pipelineLatency=4.30 ms, ioRatio=84.3 %, nonIoTime=0.80 ms, result1=120 건, result2=80 건, result3=45 건, status=OK\n\
             2026-01-06 12:00:00.100 [exec-1] {prefix} [Metrics-Pipeline] district=서초구, commands=3 (pipelined), methodTime=4.50 ms, pipelineLatency=3.70 ms, ioRatio=82.2 %, nonIoTime=0.80 ms, result1=90 건, result2=60 건, result3=30 건, status=OK\n"
        );
        let dialect = Dialect::load("rtt-phase2").expect("builtin");
        let table = default_table(&dialect).expect("has metrics").to_string();
        let pipeline = Pipeline::new(dialect);
        let left = pipeline.run_text("phase1.log", &phase1).expect("runs");
        let right = pipeline.run_text("phase2.log", &phase2).expect("runs");

        let delta = compare_runs(&left, &right, &table, 2).expect("compares");

        let rows: Vec<Vec<String>> = delta.rendered_rows().collect();
        assert_eq!(rows[0], vec!["method_ms", "2", "2", "11.20", "4.80", "-6.40", "-57.14"]);
        assert_eq!(rows.len(), 4);
    }

    // ── Row matching ─────────────────────────────────────────────

    #[test]
    fn test_unmatched_rows_keep_both_sides() {
        let left = by_district();
        let mut right = by_district();
        right.rows.remove(0);
        right
            .rows
            .push(vec![Cell::Text("songpa".into()), Cell::Int(4), Cell::Float(10.0)]);

        let delta = compare_tables(&left, &right, 1).expect("compares");
        let rows: Vec<Vec<String>> = delta.rendered_rows().collect();
        assert_eq!(
            rows,
            vec![
                vec!["gangnam", "2", "", "40.0", "", "", ""],
                // Zero baseline: no percentage.
                vec!["seocho", "1", "1", "0.0", "0.0", "0.0", ""],
                vec!["songpa", "", "4", "", "10.0", "", ""],
            ]
        );
    }

    #[test]
    fn test_non_aggregate_table_is_rejected() {
        let records = Table::new("records", vec![Column::text("line_number")]);
        let err = compare_tables(&records, &by_district(), 3).unwrap_err();
        assert!(matches!(err, EngineError::Compare(msg) if msg.contains("records")));
    }

    #[test]
    fn test_different_keys_are_rejected() {
        let mut other = by_district();
        other.columns[0].name = "pool".to_string();
        assert!(compare_tables(&by_district(), &other, 3).is_err());
    }
}
