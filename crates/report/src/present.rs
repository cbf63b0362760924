//! Human-readable run summary.

use std::fmt::{self, Write};
use std::path::PathBuf;

use engine::report::{BoundedSamples, SampleLine};
use engine::{RunReport, Table};

const RULE: &str = "============================================================";

/// Render the run summary printed to stdout.
pub fn render(report: &RunReport, tables: &[Table], written: &[PathBuf]) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_summary(&mut out, report, tables, written)?;
    Ok(out)
}

/// Render the summary of a two-run comparison: both inputs, then the delta table.
pub fn render_comparison(
    left: &RunReport,
    right: &RunReport,
    compared: &str,
    delta: &Table,
    written: &[PathBuf],
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{RULE}")?;
    writeln!(out, "logsift compare: {} -> {} ({})", left.source, right.source, left.dialect)?;
    writeln!(out, "{RULE}")?;

    writeln!(out, "Inputs")?;
    for (side, report) in [("left", left), ("right", right)] {
        writeln!(
            out,
            "  {side:<16}{} ({} record(s), {})",
            report.source, report.selected_records, report.encoding
        )?;
    }

    writeln!(out, "Comparison of '{compared}' ({} row(s))", delta.rows.len())?;
    write_grid(&mut out, delta)?;

    if !written.is_empty() {
        writeln!(out, "Output")?;
        for path in written {
            writeln!(out, "  {}", path.display())?;
        }
    }
    let advisories: Vec<(&str, &String)> = [("left", left), ("right", right)]
        .into_iter()
        .flat_map(|(side, report)| report.advisories.iter().map(move |a| (side, a)))
        .collect();
    if !advisories.is_empty() {
        writeln!(out, "Advisories")?;
        for (side, advisory) in advisories {
            writeln!(out, "  ! {side}: {advisory}")?;
        }
    }
    Ok(out)
}

/// Left-aligned columns, two spaces apart.
fn write_grid(out: &mut String, table: &Table) -> fmt::Result {
    let rows: Vec<Vec<String>> = table.rendered_rows().collect();
    let header = table.header();
    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, name)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .fold(name.chars().count(), usize::max)
        })
        .collect();

    let mut write_row = |cells: Vec<&str>| -> fmt::Result {
        let mut line = String::from("  ");
        for (cell, width) in cells.iter().zip(&widths) {
            write!(line, "{cell:<width$}  ")?;
        }
        writeln!(out, "{}", line.trim_end())
    };
    write_row(header.clone())?;
    for row in &rows {
        write_row(row.iter().map(String::as_str).collect())?;
    }
    Ok(())
}

fn write_summary(out: &mut String, report: &RunReport, tables: &[Table], written: &[PathBuf]) -> fmt::Result {
    writeln!(out, "{RULE}")?;
    writeln!(out, "logsift: {} ({})", report.source, report.dialect)?;
    writeln!(out, "{RULE}")?;

    writeln!(out, "Lines")?;
    writeln!(out, "  encoding        {}", report.encoding)?;
    writeln!(out, "  physical        {}", report.physical_lines)?;
    writeln!(out, "  classified      {}", report.classified_lines)?;
    for (kind, count) in &report.line_kinds {
        writeln!(out, "    {:<14}{count}", kind.as_str())?;
    }
    if report.lossy_lines > 0 {
        writeln!(out, "  lossy           {}", report.lossy_lines)?;
    }
    if let Some(marker) = &report.marker {
        writeln!(
            out,
            "  marker '{}'     {}/{} lines",
            marker.keyword, marker.lines_matched, marker.lines_scanned
        )?;
    }
    writeln!(out, "  workers         {}", report.workers)?;
    if report.discarded_lines > 0 {
        writeln!(out, "  discarded       {}", report.discarded_lines)?;
    }

    writeln!(out, "Records")?;
    writeln!(out, "  headers matched {}", report.headers_matched)?;
    writeln!(out, "  parsed          {}", report.records)?;
    for (label, count) in [
        ("missing fields", report.missing_required),
        ("filtered", report.filtered_records),
        ("duplicates", report.duplicate_records),
    ] {
        if count > 0 {
            writeln!(out, "  {label:<16}{count}")?;
        }
    }
    writeln!(out, "  selected        {}", report.selected_records)?;
    writeln!(out, "  observations    {}", report.observations)?;

    write_samples(out, "Unmatched lines", &report.structural_errors)?;
    write_samples(out, "Incomplete blocks", &report.incomplete_blocks)?;
    write_samples(out, "Transform failures", &report.transform_failures)?;

    if !tables.is_empty() {
        writeln!(out, "Tables")?;
        for table in tables {
            writeln!(out, "  {:<24}{} row(s)", table.name, table.rows.len())?;
        }
    }
    if !written.is_empty() {
        writeln!(out, "Output")?;
        for path in written {
            writeln!(out, "  {}", path.display())?;
        }
    }
    if !report.advisories.is_empty() {
        writeln!(out, "Advisories")?;
        for advisory in &report.advisories {
            writeln!(out, "  ! {advisory}")?;
        }
    }
    Ok(())
}

fn write_samples(out: &mut String, title: &str, samples: &BoundedSamples<SampleLine>) -> fmt::Result {
    if samples.is_empty() {
        return Ok(());
    }
    writeln!(out, "{title} ({})", samples.total)?;
    for sample in &samples.samples {
        writeln!(out, "  line {:>6}: {}", sample.line_number, sample.text)?;
    }
    if samples.overflow() > 0 {
        writeln!(out, "  ... and {} more", samples.overflow())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use engine::table::{Cell, Column};

    use super::*;

    #[test]
    fn test_render_counts_and_samples() {
        let mut report = RunReport::new("app.log", "p6spy", 2);
        report.physical_lines = 10;
        report.classified_lines = 7;
        for n in [3, 5, 8] {
            report.structural_errors.record(SampleLine::new(n, "???"));
        }
        report.finalize();

        let tables = vec![Table::new("records", vec![Column::text("line_number")])];
        let text = render(&report, &tables, &[PathBuf::from("out/x_records.csv")]).expect("renders");

        assert!(text.contains("logsift: app.log (p6spy)"));
        assert!(text.contains("Unmatched lines (3)"));
        assert!(text.contains("line      3: ???"));
        assert!(text.contains("... and 1 more"));
        assert!(text.contains("records                 0 row(s)"));
        assert!(text.contains("out/x_records.csv"));
        assert!(text.contains("! 3 line(s) matched no prefix pattern"));
    }

    #[test]
    fn test_render_hides_empty_sections() {
        let report = RunReport::new("app.log", "hikaricp", 5);
        let text = render(&report, &[], &[]).expect("renders");
        assert!(!text.contains("Incomplete blocks"));
        assert!(!text.contains("Tables"));
        assert!(!text.contains("Output"));
    }

    // ── Comparison ───────────────────────────────────────────────

    #[test]
    fn test_render_comparison_aligns_columns() {
        let mut left = RunReport::new("phase1.log", "rtt-phase2", 5);
        left.selected_records = 3;
        let mut right = RunReport::new("phase2.log", "rtt-phase2", 5);
        right.selected_records = 3;
        right.advisories.push("1 block(s) were incomplete".to_string());

        let mut delta = Table::new(
            "comparison",
            vec![Column::text("metric"), Column::number("diff", 1), Column::number("pct", 1)],
        );
        delta.rows = vec![
            vec![Cell::Text("method_ms".into()), Cell::Float(-75.0), Cell::Float(-50.0)],
            vec![Cell::Text("io_ratio_pct".into()), Cell::Float(2.5), Cell::Empty],
        ];

        let text = render_comparison(&left, &right, "metrics", &delta, &[]).expect("renders");

        assert!(text.contains("logsift compare: phase1.log -> phase2.log (rtt-phase2)"));
        assert!(text.contains("right           phase2.log (3 record(s), UTF-8)"));
        assert!(text.contains("Comparison of 'metrics' (2 row(s))"));
        assert!(text.contains("\n  metric        diff   pct\n"));
        assert!(text.contains("\n  method_ms     -75.0  -50.0\n"));
        assert!(text.contains("\n  io_ratio_pct  2.5\n"));
        assert!(text.contains("! right: 1 block(s) were incomplete"));
        assert!(!text.contains("Output"));
    }
}
