use crate::{
    error::{ChartError, ChartResult},
    resample::ResampledSeries,
};

/// Fully-defined primary (FPS) and derived (frame time, ms) series on the
/// resampled grid. No NaN or infinite entries remain after derivation.
#[derive(Clone, Debug)]
pub struct DerivedSeries {
    pub fps: Vec<f64>,
    pub frametime_ms: Vec<f64>,
}

/// Derive frame times and fill gaps in both series.
///
/// Frame time is `1000 / fps`; zero or non-finite FPS entries become gaps
/// instead of infinities. Gaps are computed against the *uninterpolated*
/// primary series, then both series are gap-filled independently by cubic
/// interpolation over the index axis.
pub fn derive(resampled: &ResampledSeries) -> ChartResult<DerivedSeries> {
    let mut fps = resampled.values.clone();
    let mut frametime_ms = frametime_from_fps(&resampled.values);

    fill_gaps(&mut fps)?;
    fill_gaps(&mut frametime_ms)?;

    debug_assert!(fps.iter().all(|v| v.is_finite()));
    debug_assert!(frametime_ms.iter().all(|v| v.is_finite()));

    Ok(DerivedSeries { fps, frametime_ms })
}

/// Per-entry `1000 / fps` with divide-by-zero and infinity suppression.
/// Undefined entries are marked NaN.
pub fn frametime_from_fps(fps: &[f64]) -> Vec<f64> {
    fps.iter()
        .map(|&v| {
            if v == 0.0 || !v.is_finite() {
                f64::NAN
            } else {
                let ft = 1000.0 / v;
                if ft.is_finite() { ft } else { f64::NAN }
            }
        })
        .collect()
}

/// Replace every NaN entry by cubic interpolation over the index axis.
///
/// Boundary gaps are extrapolated from the nearest spline segment. A series
/// with no gaps is returned untouched; filling requires at least 4 defined
/// points.
pub fn fill_gaps(values: &mut [f64]) -> ChartResult<()> {
    if values.iter().all(|v| v.is_finite()) {
        return Ok(());
    }

    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (i, &v) in values.iter().enumerate() {
        if v.is_finite() {
            xs.push(i as f64);
            ys.push(v);
        }
    }

    if xs.len() < 4 {
        return Err(ChartError::insufficient_data(format!(
            "need at least 4 defined points for cubic interpolation, got {}",
            xs.len()
        )));
    }

    let spline = CubicSpline::fit(xs, ys);
    for (i, v) in values.iter_mut().enumerate() {
        if !v.is_finite() {
            *v = spline.eval(i as f64);
        }
    }

    Ok(())
}

/// Natural cubic spline through strictly increasing knots.
struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the knots (natural boundary: zero at both ends).
    m2: Vec<f64>,
}

impl CubicSpline {
    fn fit(xs: Vec<f64>, ys: Vec<f64>) -> Self {
        let n = xs.len();
        debug_assert!(n >= 3);

        // Tridiagonal system for the interior second derivatives, solved with
        // the Thomas algorithm.
        let mut sub = vec![0.0; n];
        let mut diag = vec![0.0; n];
        let mut sup = vec![0.0; n];
        let mut rhs = vec![0.0; n];

        diag[0] = 1.0;
        diag[n - 1] = 1.0;
        for i in 1..n - 1 {
            let h0 = xs[i] - xs[i - 1];
            let h1 = xs[i + 1] - xs[i];
            sub[i] = h0;
            diag[i] = 2.0 * (h0 + h1);
            sup[i] = h1;
            rhs[i] = 6.0 * ((ys[i + 1] - ys[i]) / h1 - (ys[i] - ys[i - 1]) / h0);
        }

        for i in 1..n {
            let w = sub[i] / diag[i - 1];
            diag[i] -= w * sup[i - 1];
            rhs[i] -= w * rhs[i - 1];
        }

        let mut m2 = vec![0.0; n];
        m2[n - 1] = rhs[n - 1] / diag[n - 1];
        for i in (0..n - 1).rev() {
            m2[i] = (rhs[i] - sup[i] * m2[i + 1]) / diag[i];
        }

        Self { xs, ys, m2 }
    }

    /// Evaluate at `x`. Outside the knot range the nearest segment's
    /// polynomial is used (standard cubic-spline extrapolation).
    fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let seg = if x <= self.xs[0] {
            0
        } else if x >= self.xs[n - 1] {
            n - 2
        } else {
            self.xs.partition_point(|&k| k < x).saturating_sub(1)
        };

        let (x0, x1) = (self.xs[seg], self.xs[seg + 1]);
        let (y0, y1) = (self.ys[seg], self.ys[seg + 1]);
        let (m0, m1) = (self.m2[seg], self.m2[seg + 1]);
        let h = x1 - x0;

        let a = (x1 - x) / h;
        let b = (x - x0) / h;
        a * y0
            + b * y1
            + ((a * a * a - a) * m0 + (b * b * b - b) * m1) * (h * h) / 6.0
    }
}
