use crate::{
    error::{ChartError, ChartResult},
    timebase::Sample,
};

/// Fixed output cadence: one grid point per 60 Hz frame.
pub const GRID_INTERVAL_MS: f64 = 1000.0 / 60.0;

/// Irregular samples regridded onto a fixed-interval time axis.
///
/// Immutable once produced. `length_original` is the pre-resample row count,
/// reported separately from the grid length.
#[derive(Clone, Debug)]
pub struct ResampledSeries {
    pub interval_ms: f64,
    pub times_ms: Vec<f64>,
    pub values: Vec<f64>,
    pub length_original: usize,
}

impl ResampledSeries {
    pub fn len(&self) -> usize {
        self.times_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times_ms.is_empty()
    }
}

/// Regrid `samples` (ascending time axis) onto `interval_ms` spacing using
/// nearest-neighbor lookup, ties broken toward the earlier sample.
///
/// The grid starts at 0 and spans the final original timestamp; grid points
/// outside the sampled range clamp to the boundary samples.
pub fn resample(samples: &[Sample], interval_ms: f64) -> ChartResult<ResampledSeries> {
    if samples.is_empty() {
        return Err(ChartError::validation("cannot resample an empty log"));
    }
    if !(interval_ms.is_finite() && interval_ms > 0.0) {
        return Err(ChartError::validation("resample interval must be positive"));
    }

    let duration = samples[samples.len() - 1].time_ms;
    let n = grid_len(duration, interval_ms);

    let mut times_ms = Vec::with_capacity(n);
    let mut values = Vec::with_capacity(n);
    for k in 0..n {
        let t = k as f64 * interval_ms;
        times_ms.push(t);
        values.push(nearest_value(samples, t));
    }

    Ok(ResampledSeries {
        interval_ms,
        times_ms,
        values,
        length_original: samples.len(),
    })
}

/// Number of grid points needed to span `duration` at `interval` spacing.
///
/// The epsilon keeps durations that are an exact multiple of the interval
/// from gaining a spurious extra point through float noise.
fn grid_len(duration_ms: f64, interval_ms: f64) -> usize {
    if !(duration_ms > 0.0) {
        return 1;
    }
    let ratio = duration_ms / interval_ms;
    (ratio - 1e-6).ceil().max(0.0) as usize + 1
}

fn nearest_value(samples: &[Sample], t: f64) -> f64 {
    let idx = samples.partition_point(|s| s.time_ms < t);
    if idx == 0 {
        return samples[0].value;
    }
    if idx == samples.len() {
        return samples[samples.len() - 1].value;
    }

    let before = &samples[idx - 1];
    let after = &samples[idx];
    if t - before.time_ms <= after.time_ms - t {
        before.value
    } else {
        after.value
    }
}
