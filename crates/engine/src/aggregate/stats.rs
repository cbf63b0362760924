use serde::Serialize;

/// Descriptive statistics over one group of numeric observations.
///
/// Computed at full precision; rounding belongs to presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Middle value; mean of the two middle values for an even count
    pub median: f64,
    /// Nearest-rank 95th percentile
    pub p95: f64,
    /// Sample standard deviation (n - 1); 0 for a single observation
    pub stdev: f64,
    pub total: f64,
}

impl Summary {
    /// `None` for an empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let total: f64 = sorted.iter().sum();
        let mean = total / count as f64;

        let median = if count % 2 == 1 {
            sorted[count / 2]
        } else {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        };

        let stdev = if count > 1 {
            let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        } else {
            0.0
        };

        Some(Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean,
            median,
            p95: nearest_rank(&sorted, 95),
            stdev,
            total,
        })
    }
}

/// Nearest-rank percentile of an ascending, non-empty slice.
///
/// rank = ceil(p/100 * n), computed in integers so that e.g. 0.95 * 20 does
/// not land on 19.000000000000004.
pub fn nearest_rank(sorted: &[f64], percentile: usize) -> f64 {
    let n = sorted.len();
    let rank = (percentile * n).div_ceil(100).clamp(1, n);
    sorted[rank - 1]
}
