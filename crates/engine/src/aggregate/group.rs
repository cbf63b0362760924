use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::stats::Summary;
use crate::payload::{ExtractedMetric, MetricValue};
use crate::table::{Cell, Column, Table};

/// Row order of an aggregate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOrder {
    /// Order in which each group was first observed
    #[default]
    FirstSeen,
    /// Ascending by group key
    Key,
    TotalDesc,
    MeanDesc,
    CountDesc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RowStats {
    Numeric(Summary),
    /// At least one value in the group was not numeric
    Categorical { count: usize, sample_value: String },
}

impl RowStats {
    pub fn count(&self) -> usize {
        match self {
            RowStats::Numeric(s) => s.count,
            RowStats::Categorical { count, .. } => *count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: Vec<String>,
    pub stats: RowStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    pub group_by: Vec<String>,
    pub rows: Vec<AggregateRow>,
    /// Observations dropped because a group label was missing
    pub unlabeled: usize,
}

/// Statistic columns appended after the group key columns.
pub const STAT_COLUMNS: &[&str] = &["count", "mean", "median", "p95", "min", "max", "stdev", "sample_value"];

impl AggregateTable {
    pub fn row(&self, key: &[&str]) -> Option<&AggregateRow> {
        self.rows.iter().find(|r| r.key.iter().map(String::as_str).eq(key.iter().copied()))
    }

    /// Header is always present, even with zero rows.
    pub fn to_table(&self, name: &str, decimals: usize) -> Table {
        let mut columns: Vec<Column> = self.group_by.iter().map(|g| Column::text(g)).collect();
        columns.push(Column::text("count"));
        columns.extend(
            ["mean", "median", "p95", "min", "max", "stdev"]
                .iter()
                .map(|c| Column::number(c, decimals)),
        );
        columns.push(Column::text("sample_value"));

        let mut table = Table::new(name, columns);
        for row in &self.rows {
            let mut cells: Vec<Cell> = row.key.iter().map(|k| Cell::Text(k.clone())).collect();
            match &row.stats {
                RowStats::Numeric(s) => {
                    cells.push(Cell::Int(s.count as i64));
                    cells.extend(
                        [s.mean, s.median, s.p95, s.min, s.max, s.stdev]
                            .into_iter()
                            .map(Cell::Float),
                    );
                    cells.push(Cell::Empty);
                }
                RowStats::Categorical { count, sample_value } => {
                    cells.push(Cell::Int(*count as i64));
                    cells.extend(std::iter::repeat(Cell::Empty).take(6));
                    cells.push(Cell::Text(sample_value.clone()));
                }
            }
            table.rows.push(cells);
        }
        table
    }
}

/// Groups observations by a composite key and summarizes each group.
pub struct MetricAggregator {
    group_by: Vec<String>,
    order: RowOrder,
}

impl MetricAggregator {
    /// `group_by` names labels of [`ExtractedMetric`]; `metric` is the metric name.
    pub fn new(group_by: Vec<String>) -> Self {
        Self {
            group_by,
            order: RowOrder::default(),
        }
    }

    pub fn with_order(mut self, order: RowOrder) -> Self {
        self.order = order;
        self
    }

    pub fn aggregate(&self, metrics: &[ExtractedMetric]) -> AggregateTable {
        let mut index: HashMap<Vec<String>, usize> = HashMap::new();
        let mut groups: Vec<(Vec<String>, Vec<&MetricValue>)> = Vec::new();
        let mut unlabeled = 0;

        for metric in metrics {
            let key: Option<Vec<String>> = self
                .group_by
                .iter()
                .map(|g| metric.label(g).map(str::to_string))
                .collect();
            let Some(key) = key else {
                unlabeled += 1;
                continue;
            };

            let slot = match index.get(&key) {
                Some(&slot) => slot,
                None => {
                    groups.push((key.clone(), Vec::new()));
                    index.insert(key, groups.len() - 1);
                    groups.len() - 1
                }
            };
            groups[slot].1.push(&metric.value);
        }

        let mut rows: Vec<AggregateRow> = groups
            .into_iter()
            .filter_map(|(key, values)| summarize(&values).map(|stats| AggregateRow { key, stats }))
            .collect();
        self.sort(&mut rows);

        debug!(
            group_by = ?self.group_by,
            observations = metrics.len(),
            rows = rows.len(),
            unlabeled,
            "aggregate: grouped observations"
        );

        AggregateTable {
            group_by: self.group_by.clone(),
            rows,
            unlabeled,
        }
    }

    fn sort(&self, rows: &mut [AggregateRow]) {
        match self.order {
            RowOrder::FirstSeen => {}
            RowOrder::Key => rows.sort_by(|a, b| a.key.cmp(&b.key)),
            RowOrder::TotalDesc => rows.sort_by(|a, b| numeric_desc(a, b, |s| s.total)),
            RowOrder::MeanDesc => rows.sort_by(|a, b| numeric_desc(a, b, |s| s.mean)),
            RowOrder::CountDesc => rows.sort_by(|a, b| b.stats.count().cmp(&a.stats.count())),
        }
    }
}

/// Categorical rows carry no total or mean and sort after numeric ones.
fn numeric_desc(a: &AggregateRow, b: &AggregateRow, by: fn(&Summary) -> f64) -> Ordering {
    match (&a.stats, &b.stats) {
        (RowStats::Numeric(x), RowStats::Numeric(y)) => by(y).total_cmp(&by(x)),
        (RowStats::Numeric(_), _) => Ordering::Less,
        (_, RowStats::Numeric(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn summarize(values: &[&MetricValue]) -> Option<RowStats> {
    let numeric: Option<Vec<f64>> = values
        .iter()
        .map(|v| match v {
            MetricValue::Numeric(f) => Some(*f),
            MetricValue::Categorical(_) => None,
        })
        .collect();

    match numeric {
        Some(numbers) => Summary::from_values(&numbers).map(RowStats::Numeric),
        None => values.first().map(|first| RowStats::Categorical {
            count: values.len(),
            sample_value: match first {
                MetricValue::Numeric(f) => f.to_string(),
                MetricValue::Categorical(s) => s.clone(),
            },
        }),
    }
}
