/// Scroll look-behind width, in grid samples (~2 s at the 60 Hz grid rate).
pub const SCROLL_SAMPLES: usize = 120;

/// Visible x-axis extent for one animation frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportWindow {
    pub left_ms: f64,
    pub right_ms: f64,
}

impl ViewportWindow {
    pub fn width_ms(self) -> f64 {
        self.right_ms - self.left_ms
    }
}

/// Compute the scroll window for frame `i` of `n`.
///
/// Three regions, checked in this order:
/// - lead-in (`i <= 120`): the not-yet-elapsed portion is mirrored as
///   negative time so the visible span keeps constant width;
/// - lead-out (`i + 120 >= n`): the right edge extrapolates one interval past
///   the last real sample so the curve does not appear to stop abruptly;
/// - steady state: a constant-width window trailing 120 samples behind `i`.
///
/// Pure function of the frame index; a combined chart applies the same window
/// to both of its axes. Indices clamp to the axis length so logs shorter than
/// the scroll width render with a narrower lead-in instead of panicking.
pub fn window(i: usize, n: usize, time_axis_ms: &[f64], interval_ms: f64) -> ViewportWindow {
    debug_assert_eq!(n, time_axis_ms.len());
    let at = |k: usize| time_axis_ms[k.min(n.saturating_sub(1))];

    if i <= SCROLL_SAMPLES {
        ViewportWindow {
            left_ms: -at(SCROLL_SAMPLES - i),
            right_ms: at(i),
        }
    } else if i + SCROLL_SAMPLES >= n {
        ViewportWindow {
            left_ms: at(i - SCROLL_SAMPLES),
            right_ms: at(i) + interval_ms,
        }
    } else {
        ViewportWindow {
            left_ms: at(i - SCROLL_SAMPLES),
            right_ms: at(i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resample::GRID_INTERVAL_MS;

    fn axis(n: usize) -> Vec<f64> {
        (0..n).map(|k| k as f64 * GRID_INTERVAL_MS).collect()
    }

    #[test]
    fn lead_in_mirrors_negative_time() {
        let t = axis(1000);
        let w0 = window(0, 1000, &t, GRID_INTERVAL_MS);
        assert_eq!(w0.left_ms, -t[SCROLL_SAMPLES]);
        assert_eq!(w0.right_ms, 0.0);

        let w60 = window(60, 1000, &t, GRID_INTERVAL_MS);
        assert_eq!(w60.left_ms, -t[60]);
        assert_eq!(w60.right_ms, t[60]);
    }

    #[test]
    fn steady_state_width_is_constant() {
        let t = axis(1000);
        let span = t[SCROLL_SAMPLES];
        for i in (SCROLL_SAMPLES + 1)..(1000 - SCROLL_SAMPLES) {
            let w = window(i, 1000, &t, GRID_INTERVAL_MS);
            assert!((w.width_ms() - span).abs() < 1e-9, "frame {i}");
        }
    }

    #[test]
    fn bounds_are_monotone_in_frame_index() {
        let t = axis(600);
        let mut prev = window(0, 600, &t, GRID_INTERVAL_MS);
        for i in 1..600 {
            let w = window(i, 600, &t, GRID_INTERVAL_MS);
            assert!(w.left_ms >= prev.left_ms, "left regressed at {i}");
            assert!(w.right_ms >= prev.right_ms, "right regressed at {i}");
            prev = w;
        }
    }

    #[test]
    fn lead_out_extends_one_interval_past_last_sample() {
        let t = axis(500);
        let last = 499;
        let w = window(last, 500, &t, GRID_INTERVAL_MS);
        assert_eq!(w.left_ms, t[last - SCROLL_SAMPLES]);
        assert_eq!(w.right_ms, t[last] + GRID_INTERVAL_MS);
    }

    #[test]
    fn lead_in_branch_wins_over_lead_out_for_short_logs() {
        // 150 samples: frame 100 satisfies both i <= 120 and i + 120 >= n;
        // the lead-in branch is checked first.
        let t = axis(150);
        let w = window(100, 150, &t, GRID_INTERVAL_MS);
        assert_eq!(w.left_ms, -t[SCROLL_SAMPLES - 100]);
        assert_eq!(w.right_ms, t[100]);
    }

    #[test]
    fn indices_clamp_for_logs_shorter_than_scroll_width() {
        let t = axis(50);
        let w = window(0, 50, &t, GRID_INTERVAL_MS);
        assert_eq!(w.left_ms, -t[49]);
        assert_eq!(w.right_ms, 0.0);
    }
}
