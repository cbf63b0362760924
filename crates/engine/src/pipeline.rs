//! Pipeline: one input file through every stage, into tables.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::aggregate::MetricAggregator;
use crate::block::{BlockParser, FieldKind, PayloadMode};
use crate::dialect::{Dialect, SummaryConfig};
use crate::error::{EngineError, SinkError};
use crate::line::decode_lines;
use crate::payload::metric::Extraction;
use crate::payload::{ExtractedMetric, MetricSpec};
use crate::record::Record;
use crate::report::{MarkerStats, RunReport, SampleLine};
use crate::stream::ThreadDeinterleaver;
use crate::table::{Cell, Column, ReportSink, Table};
use crate::DEFAULT_SAMPLE_LIMIT;

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub report: RunReport,
    /// Selected records, ordered by (timestamp, line number)
    pub records: Vec<Record>,
    pub tables: Vec<Table>,
}

impl RunOutput {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Hand every table, then the report, to `sink`, and finish it.
    ///
    /// Nothing is written when any table is malformed.
    pub fn emit(&self, sink: &mut dyn ReportSink) -> Result<(), SinkError> {
        for table in &self.tables {
            table.check_shape()?;
        }
        for table in &self.tables {
            sink.write_table(table)?;
        }
        sink.write_report(&self.report)?;
        sink.finish()
    }
}

pub struct Pipeline {
    dialect: Dialect,
    sample_limit: usize,
    filters: Vec<(String, String)>,
    decimals: Option<usize>,
}

impl Pipeline {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            filters: Vec::new(),
            decimals: None,
        }
    }

    /// Samples kept per error class.
    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit;
        self
    }

    /// Extra record condition on top of the dialect's `[report.filter]`.
    pub fn with_filter(mut self, key: &str, value: &str) -> Self {
        self.filters.push((key.to_string(), value.to_string()));
        self
    }

    /// Override the dialect's rendered precision.
    pub fn with_decimals(mut self, decimals: usize) -> Self {
        self.decimals = Some(decimals);
        self
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn run_file(&self, path: &Path) -> Result<RunOutput, EngineError> {
        let bytes = std::fs::read(path).map_err(|e| EngineError::io(path, e))?;
        info!(path = %path.display(), bytes = bytes.len(), "pipeline: input read");
        self.run_bytes(&path.display().to_string(), &bytes)
    }

    pub fn run_text(&self, source: &str, text: &str) -> Result<RunOutput, EngineError> {
        self.run_bytes(source, text.as_bytes())
    }

    pub fn run_bytes(&self, source: &str, bytes: &[u8]) -> Result<RunOutput, EngineError> {
        let config = self.dialect.config();
        let mut report = RunReport::new(source, self.dialect.name(), self.sample_limit);

        // Classify
        let classifier = self.dialect.classifier()?;
        let decoded = decode_lines(bytes);
        report.encoding = decoded.encoding.name().to_string();
        report.physical_lines = decoded.lines.len();
        let mut lines = Vec::with_capacity(decoded.lines.len());
        for line in decoded.lines {
            if line.lossy {
                report.lossy_lines += 1;
            }
            match classifier.classify(line.line_number, &line.text) {
                Ok(classified) => {
                    report.classified_lines += 1;
                    report.count_kind(classified.kind);
                    lines.push(classified);
                }
                Err(e) => report.structural_errors.record(SampleLine::new(e.line_number, e.raw)),
            }
        }
        report.marker = classifier.marker_stats().map(|(scanned, matched)| MarkerStats {
            keyword: config.marker.clone().unwrap_or_default(),
            lines_scanned: scanned,
            lines_matched: matched,
        });
        debug!(
            encoding = %report.encoding,
            physical = report.physical_lines,
            classified = report.classified_lines,
            structural_errors = report.structural_errors.total,
            "pipeline: lines classified"
        );

        // Deinterleave
        let grouped = ThreadDeinterleaver::new(config.unattributed).group(lines);
        report.workers = grouped.streams.len();
        report.discarded_lines = grouped.discarded;

        // Parse
        let mut records = Vec::new();
        for shape in self.dialect.shapes() {
            for stream in &grouped.streams {
                let parsed = BlockParser::parse_stream(stream, shape);
                report.headers_matched += parsed.headers;
                for block in parsed.incomplete {
                    report
                        .incomplete_blocks
                        .record(SampleLine::new(block.line_number, block.to_string()));
                }
                records.extend(parsed.records);
            }
        }
        report.records = records.len();
        records.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.line_number.cmp(&b.line_number))
        });

        let records = self.select(records, &mut report);

        // Tables
        let decimals = self.decimals.unwrap_or(config.report.decimals);
        let mut tables = Vec::new();
        if config.report.detail {
            tables.push(self.detail_table("records", &records, decimals));
        }
        for summary in &config.summaries {
            tables.push(summary_table(summary, &records, decimals, &mut report));
        }
        if !config.metrics.is_empty() {
            tables.push(self.metrics_table(&records, decimals, &mut report));
        }
        if let Some(slowest) = &config.report.slowest {
            tables.push(self.slowest_table(&slowest.field, slowest.limit, &records, decimals));
        }

        report.finalize();
        for advisory in &report.advisories {
            warn!(source, "{advisory}");
        }
        info!(
            source,
            dialect = self.dialect.name(),
            records = report.selected_records,
            tables = tables.len(),
            "pipeline: run complete"
        );

        Ok(RunOutput {
            report,
            records,
            tables,
        })
    }

    /// Apply `require`, then filters, then dedup, in that order.
    fn select(&self, records: Vec<Record>, report: &mut RunReport) -> Vec<Record> {
        let rc = &self.dialect.config().report;
        let filters: Vec<(&str, &str)> = rc
            .filter
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(self.filters.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .collect();
        let mut seen: HashSet<Vec<Option<String>>> = HashSet::new();

        let mut selected = Vec::with_capacity(records.len());
        for record in records {
            if !rc.require.iter().all(|path| record.lookup(path).is_some()) {
                report.missing_required += 1;
                continue;
            }
            if !matches_all(&record, filters.iter().copied()) {
                report.filtered_records += 1;
                continue;
            }
            if !rc.dedup.is_empty() {
                let key = rc.dedup.iter().map(|path| record.lookup_text(path)).collect();
                if !seen.insert(key) {
                    report.duplicate_records += 1;
                    continue;
                }
            }
            selected.push(record);
        }
        report.selected_records = selected.len();
        selected
    }

    /// Detail columns: fixed labels, every shape field, payload, raw header.
    fn detail_columns(&self, decimals: usize) -> (Vec<Column>, Vec<String>, bool) {
        let mut columns = ["line_number", "timestamp", "worker", "level", "logger", "shape"]
            .iter()
            .map(|c| Column::text(c))
            .collect::<Vec<_>>();

        let mut fields: Vec<String> = Vec::new();
        for shape in self.dialect.shapes() {
            let floats: HashSet<&str> = std::iter::once(shape.header())
                .chain(shape.lines())
                .flat_map(|p| p.fields())
                .filter(|f| f.kind == FieldKind::Float)
                .map(|f| f.name.as_str())
                .collect();
            for name in shape.field_names() {
                if fields.contains(&name) {
                    continue;
                }
                columns.push(if floats.contains(name.as_str()) {
                    Column::number(&name, decimals)
                } else {
                    Column::text(&name)
                });
                fields.push(name);
            }
        }

        let with_payload = self
            .dialect
            .shapes()
            .iter()
            .any(|s| s.payload == PayloadMode::EmbeddedJson);
        if with_payload {
            columns.push(Column::text("payload"));
        }
        columns.push(Column::text("raw_header"));
        (columns, fields, with_payload)
    }

    fn detail_table(&self, name: &str, records: &[Record], decimals: usize) -> Table {
        let (columns, fields, with_payload) = self.detail_columns(decimals);
        let mut table = Table::new(name, columns);
        table.rows = records
            .iter()
            .map(|r| detail_row(r, &fields, with_payload))
            .collect();
        table
    }

    fn slowest_table(&self, field: &str, limit: usize, records: &[Record], decimals: usize) -> Table {
        let mut ranked: Vec<(f64, &Record)> = records
            .iter()
            .filter_map(|r| r.lookup(field).and_then(|v| v.as_f64()).map(|v| (v, r)))
            .collect();
        // Stable: ties keep record order.
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
        ranked.truncate(limit);

        let (mut columns, fields, with_payload) = self.detail_columns(decimals);
        columns.insert(0, Column::text("rank"));
        let mut table = Table::new("slowest", columns);
        for (rank, (_, record)) in ranked.into_iter().enumerate() {
            let mut row = vec![Cell::Int(rank as i64 + 1)];
            row.extend(detail_row(record, &fields, with_payload));
            table.rows.push(row);
        }
        table
    }

    fn metrics_table(&self, records: &[Record], decimals: usize, report: &mut RunReport) -> Table {
        let config = self.dialect.config();
        let group_labels = &config.report.metrics_group_by;
        let conditions = config
            .report
            .metrics_filter
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()));

        let mut observations = Vec::new();
        for record in records.iter().filter(|r| matches_all(r, conditions.clone())) {
            for spec in &config.metrics {
                if let Some(metric) = observe(spec, record, group_labels, report) {
                    observations.push(metric);
                }
            }
        }

        let group_by: Vec<String> = std::iter::once("metric".to_string())
            .chain(group_labels.iter().cloned())
            .collect();
        let aggregate = MetricAggregator::new(group_by).aggregate(&observations);
        let descriptions: Vec<Cell> = aggregate
            .rows
            .iter()
            .map(|row| {
                config
                    .metrics
                    .iter()
                    .find(|m| Some(&m.name) == row.key.first())
                    .map_or(Cell::Empty, |m| Cell::Text(m.description.clone()))
            })
            .collect();

        let mut table = aggregate.to_table("metrics", decimals);
        table.insert_column(1, Column::text("description"), descriptions);
        table
    }
}

fn summary_table(summary: &SummaryConfig, records: &[Record], decimals: usize, report: &mut RunReport) -> Table {
    let spec = MetricSpec {
        name: summary.value.clone(),
        path: summary.value.clone(),
        description: String::new(),
        transform: summary.transform.clone(),
    };
    let conditions = summary.filter.iter().map(|(k, v)| (k.as_str(), v.as_str()));

    let observations: Vec<ExtractedMetric> = records
        .iter()
        .filter(|r| summary.shape.as_ref().map_or(true, |s| *s == r.shape))
        .filter(|r| matches_all(r, conditions.clone()))
        .filter_map(|r| observe(&spec, r, &summary.group_by, report))
        .collect();

    MetricAggregator::new(summary.group_by.clone())
        .with_order(summary.order)
        .aggregate(&observations)
        .to_table(&summary.name, decimals)
}

/// One metric from one record, labelled with every resolvable group label.
fn observe(spec: &MetricSpec, record: &Record, labels: &[String], report: &mut RunReport) -> Option<ExtractedMetric> {
    match spec.extract(record) {
        Extraction::Value(value) => {
            report.observations += 1;
            let labels = labels
                .iter()
                .filter_map(|l| record.lookup_text(l).map(|v| (l.clone(), v)))
                .collect();
            Some(ExtractedMetric {
                metric: spec.name.clone(),
                labels,
                value,
            })
        }
        Extraction::Absent => {
            report.absent_values += 1;
            None
        }
        Extraction::Failed(e) => {
            report.transform_failures.record(SampleLine::new(
                record.line_number,
                format!("{} ({}): {e}", spec.name, spec.path),
            ));
            None
        }
    }
}

fn matches_all<'a>(record: &Record, mut conditions: impl Iterator<Item = (&'a str, &'a str)>) -> bool {
    conditions.all(|(path, expected)| record.lookup_text(path).is_some_and(|v| v == expected))
}

fn detail_row(record: &Record, fields: &[String], with_payload: bool) -> Vec<Cell> {
    let mut row = vec![
        Cell::Int(record.line_number as i64),
        Cell::from(record.timestamp.as_deref()),
        Cell::Text(record.worker_id.clone()),
        Cell::from(record.level.as_deref()),
        Cell::from(record.logger.as_deref()),
        Cell::Text(record.shape.clone()),
    ];
    row.extend(
        fields
            .iter()
            .map(|name| record.field(name).map_or(Cell::Empty, Cell::from)),
    );
    if with_payload {
        row.push(
            record
                .payload
                .as_ref()
                .map_or(Cell::Empty, |p| Cell::Text(p.to_string())),
        );
    }
    row.push(Cell::Text(record.raw_header.clone()));
    row
}
