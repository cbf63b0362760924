//! Subcommand execution.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use engine::compare::{compare_runs, default_table};
use engine::dialect::builtin;
use engine::{Dialect, DialectConfig, Pipeline, ReportSink, SinkError, Table};
use tracing::info;

use crate::cli::{CompareArgs, RunArgs};
use crate::conf::{OutputFormat, RunConfig};
use crate::naming::{output_path, output_stem};
use crate::present;
use crate::sink::{CsvSink, JsonSink};

/// Analyze one file, write its tables, and return the printable summary.
pub fn run(args: &RunArgs, config: &RunConfig) -> Result<String> {
    let pipeline = build_pipeline(&args.dialect, &args.filters, config)?;

    let output = pipeline
        .run_file(&args.input)
        .with_context(|| format!("Failed to analyze {}", args.input.display()))?;

    let written = if args.output.dry_run {
        Vec::new()
    } else {
        let stem = output_stem(pipeline.dialect().name(), &args.input, Local::now().naive_local());
        write_output(|sink| output.emit(sink), config, &stem)?
    };

    present::render(&output.report, &output.tables, &written).context("Failed to render run summary")
}

/// Run both inputs through one dialect and write the delta of one aggregate table.
pub fn compare(args: &CompareArgs, config: &RunConfig) -> Result<String> {
    let pipeline = build_pipeline(&args.dialect, &args.filters, config)?;
    let table = match &args.table {
        Some(table) => table.clone(),
        None => default_table(pipeline.dialect())
            .map(str::to_string)
            .with_context(|| format!("Dialect '{}' declares no metrics or summaries", args.dialect))?,
    };

    let analyze = |input: &Path| {
        pipeline
            .run_file(input)
            .with_context(|| format!("Failed to analyze {}", input.display()))
    };
    let left = analyze(&args.left)?;
    let right = analyze(&args.right)?;

    let decimals = config.decimals.unwrap_or(pipeline.dialect().config().report.decimals);
    let delta = compare_runs(&left, &right, &table, decimals).context("Failed to compare runs")?;
    info!(table = %table, rows = delta.rows.len(), "comparison built");

    let written = if args.output.dry_run {
        Vec::new()
    } else {
        let prefix = format!("{}_compare", pipeline.dialect().name());
        let stem = output_stem(&prefix, &args.left, Local::now().naive_local());
        write_output(|sink| emit_table(&delta, sink), config, &stem)?
    };

    present::render_comparison(&left.report, &right.report, &table, &delta, &written)
        .context("Failed to render comparison summary")
}

fn build_pipeline(dialect: &str, filters: &[(String, String)], config: &RunConfig) -> Result<Pipeline> {
    let dialect = Dialect::load(dialect).with_context(|| format!("Failed to load dialect '{dialect}'"))?;

    let mut pipeline = Pipeline::new(dialect).with_sample_limit(config.sample_limit);
    if let Some(decimals) = config.decimals {
        pipeline = pipeline.with_decimals(decimals);
    }
    for (key, value) in filters {
        pipeline = pipeline.with_filter(key, value);
    }
    Ok(pipeline)
}

fn emit_table(table: &Table, sink: &mut dyn ReportSink) -> Result<(), SinkError> {
    table.check_shape()?;
    sink.write_table(table)?;
    sink.finish()
}

fn write_output<F>(emit: F, config: &RunConfig, stem: &str) -> Result<Vec<PathBuf>>
where
    F: Fn(&mut dyn ReportSink) -> Result<(), SinkError>,
{
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;

    let written = match config.format {
        OutputFormat::Csv => {
            let mut sink = CsvSink::new(&config.output_dir, stem, config.bom);
            emit(&mut sink).context("Failed to write CSV output")?;
            sink.written().to_vec()
        }
        OutputFormat::Json => {
            let path = output_path(&config.output_dir, stem, None, config.format.extension());
            let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
            let mut sink = JsonSink::new(BufWriter::new(file));
            emit(&mut sink).context("Failed to write JSON output")?;
            vec![path]
        }
    };

    info!(files = written.len(), dir = %config.output_dir.display(), "output written");
    Ok(written)
}

/// One line per built-in dialect: name and description.
pub fn list_dialects() -> Result<String> {
    let mut out = String::new();
    for name in builtin::names() {
        let config = DialectConfig::builtin(name).with_context(|| format!("Built-in dialect '{name}' is invalid"))?;
        out.push_str(&format!("{name:<14}{}\n", config.description));
    }
    Ok(out)
}
