use crate::error::{ChartError, ChartResult};

/// Descriptive statistics over one fully-interpolated series.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct SeriesSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

/// Pure aggregation: min/max/mean/median. The input must be non-empty and
/// fully defined (gap filling happens upstream).
pub fn summarize(values: &[f64]) -> ChartResult<SeriesSummary> {
    if values.is_empty() {
        return Err(ChartError::validation("cannot summarize an empty series"));
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    Ok(SeriesSummary {
        min,
        max,
        mean: sum / values.len() as f64,
        median,
    })
}
