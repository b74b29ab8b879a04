use std::path::Path;

use tiny_skia::{
    Color, FillRule, LineCap, LineJoin, Mask, Paint, PathBuilder, Pixmap, PixmapPaint, Rect,
    Stroke, Transform,
};

use crate::{
    chart::{ChartKind, ChartSpec, RenderStyle, secondary_ticks},
    encode_ffmpeg::{EncodeConfig, FfmpegEncoder},
    error::{ChartError, ChartResult},
    text::{Anchor, TextSpan, rasterize_spans},
    viewport,
};

/// Output frame rate of every exported chart video.
pub const OUTPUT_FPS: u32 = 60;

/// One finished frame. `data` is RGBA8, premultiplied when produced by the
/// raster path.
#[derive(Clone, Debug)]
pub struct FrameRgba {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

/// Progress capability, injected by the caller instead of a raw callback.
/// The chart hooks default to no-ops so frame-only consumers stay small.
pub trait ProgressSink {
    /// Called once per enabled chart, before its first frame is encoded.
    fn on_chart_start(&mut self, _name: &str, _out_path: &Path) {}

    fn on_frame(&mut self, current: usize, total: usize);

    /// Called after the chart's video file has been finalized.
    fn on_chart_done(&mut self, _name: &str) {}
}

/// Progress sink that discards everything.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_frame(&mut self, _current: usize, _total: usize) {}
}

/// Borrowed view of the fully-interpolated series a chart draws from.
#[derive(Clone, Copy, Debug)]
pub struct ChartData<'a> {
    pub times_ms: &'a [f64],
    pub fps: &'a [f64],
    pub frametime_ms: &'a [f64],
    pub interval_ms: f64,
}

impl ChartData<'_> {
    pub fn len(&self) -> usize {
        self.times_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times_ms.is_empty()
    }

    fn validate(&self) -> ChartResult<()> {
        if self.is_empty() {
            return Err(ChartError::validation("chart data must be non-empty"));
        }
        if self.fps.len() != self.len() || self.frametime_ms.len() != self.len() {
            return Err(ChartError::validation(
                "chart series lengths must match the time axis",
            ));
        }
        Ok(())
    }
}

/// Rasterizes one chart spec frame by frame.
///
/// Owns the reusable pixmap and the plot-area clip mask; the scroll window is
/// recomputed per frame index, so frames can be produced in any order.
pub struct ChartRenderer {
    kind: ChartKind,
    style: RenderStyle,
    width: u32,
    height: u32,
    /// Primary y range is 0..y_max.
    y_max: f64,
    /// Secondary-axis tick values, combined charts only.
    ticks: Vec<f64>,
    pixmap: Pixmap,
    plot_clip: Mask,
    plot: PlotArea,
    /// Axis labels and tick numerals, rasterized once per chart.
    overlay: Option<Pixmap>,
}

#[derive(Clone, Copy, Debug)]
struct PlotArea {
    left: f32,
    top: f32,
    width: f32,
    height: f32,
}

impl ChartRenderer {
    pub fn new(
        spec: &ChartSpec,
        style: RenderStyle,
        width: u32,
        height: u32,
        data: &ChartData<'_>,
    ) -> ChartResult<Self> {
        data.validate()?;

        let margin = style.margin_px;
        if (width as f32) <= 2.0 * margin + 4.0 || (height as f32) <= 2.0 * margin + 4.0 {
            return Err(ChartError::validation(format!(
                "frame {width}x{height} is too small for {margin}px margins"
            )));
        }

        let primary = match spec.kind {
            ChartKind::Frametime => data.frametime_ms,
            ChartKind::Fps | ChartKind::Combined => data.fps,
        };
        let primary_max = primary.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let y_max = if primary_max > 0.0 {
            primary_max * style.y_headroom
        } else {
            1.0
        };

        let ticks = if spec.kind == ChartKind::Combined {
            let ft_max = data
                .frametime_ms
                .iter()
                .cloned()
                .fold(f64::NEG_INFINITY, f64::max);
            secondary_ticks(ft_max)
        } else {
            Vec::new()
        };

        let plot = PlotArea {
            left: margin,
            top: margin,
            width: width as f32 - 2.0 * margin,
            height: height as f32 - 2.0 * margin,
        };

        let pixmap = Pixmap::new(width, height)
            .ok_or_else(|| ChartError::validation("failed to allocate frame pixmap"))?;
        let plot_clip = build_plot_clip(width, height, plot)?;
        let overlay = build_axis_text(spec, &style, width, height, plot, &ticks)?;

        Ok(Self {
            kind: spec.kind,
            style,
            width,
            height,
            y_max,
            ticks,
            pixmap,
            plot_clip,
            plot,
            overlay,
        })
    }

    /// Rasterize animation frame `i`.
    pub fn render_frame(&mut self, data: &ChartData<'_>, i: usize) -> ChartResult<FrameRgba> {
        let n = data.len();
        if i >= n {
            return Err(ChartError::validation(format!(
                "frame index {i} out of bounds (total {n})"
            )));
        }

        let [r, g, b, a] = self.style.background_rgba;
        self.pixmap.fill(Color::from_rgba8(r, g, b, a));

        let win = viewport::window(i, n, data.times_ms, data.interval_ms);
        let span = if win.width_ms() > 0.0 {
            win.width_ms()
        } else {
            data.interval_ms
        };

        self.draw_axes()?;

        match self.kind {
            ChartKind::Fps => {
                self.draw_series(data.times_ms, data.fps, win.left_ms, span, self.style.fps_rgba)?;
            }
            ChartKind::Frametime => {
                self.draw_series(
                    data.times_ms,
                    data.frametime_ms,
                    win.left_ms,
                    span,
                    self.style.frametime_rgba,
                )?;
            }
            ChartKind::Combined => {
                // Both polylines map through the primary y range; the twin
                // axis only contributes tick marks and numerals.
                self.draw_series(data.times_ms, data.fps, win.left_ms, span, self.style.fps_rgba)?;
                self.draw_series(
                    data.times_ms,
                    data.frametime_ms,
                    win.left_ms,
                    span,
                    self.style.frametime_rgba,
                )?;
            }
        }

        if let Some(overlay) = &self.overlay {
            self.pixmap.draw_pixmap(
                0,
                0,
                overlay.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
        }

        Ok(FrameRgba {
            width: self.width,
            height: self.height,
            data: self.pixmap.data().to_vec(),
            premultiplied: true,
        })
    }

    fn draw_axes(&mut self) -> ChartResult<()> {
        let p = self.plot;
        let bottom = p.top + p.height;
        let right = p.left + p.width;

        let mut pb = PathBuilder::new();
        pb.move_to(p.left, p.top);
        pb.line_to(p.left, bottom);
        pb.line_to(right, bottom);
        if self.kind == ChartKind::Combined {
            pb.move_to(right, p.top);
            pb.line_to(right, bottom);
        }

        // Secondary ticks normalized against the headroom-scaled maximum.
        for &t in &self.ticks {
            let frac = tick_fraction(&self.ticks, self.style.y_headroom, t);
            let y = bottom - frac * p.height;
            pb.move_to(right, y);
            pb.line_to(right + self.style.tick_len_px, y);
        }

        let path = pb
            .finish()
            .ok_or_else(|| ChartError::validation("axis path construction failed"))?;

        let mut paint = Paint::default();
        paint.anti_alias = true;
        let [r, g, b, a] = self.style.axis_rgba;
        paint.set_color_rgba8(r, g, b, a);

        let stroke = Stroke {
            width: (self.style.stroke_width * 0.5).max(1.0),
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &paint, &stroke, Transform::identity(), None);

        Ok(())
    }

    fn draw_series(
        &mut self,
        times_ms: &[f64],
        values: &[f64],
        left_ms: f64,
        span_ms: f64,
        rgba: [u8; 4],
    ) -> ChartResult<()> {
        let right_ms = left_ms + span_ms;

        // One extra sample on each side so the polyline enters and leaves the
        // clipped plot area instead of stopping at its edge.
        let start = times_ms.partition_point(|&t| t < left_ms).saturating_sub(1);
        let end = (times_ms.partition_point(|&t| t <= right_ms) + 1).min(times_ms.len());
        if start >= end {
            return Ok(());
        }

        let p = self.plot;
        let mut pb = PathBuilder::new();
        for (k, (&t, &v)) in times_ms[start..end]
            .iter()
            .zip(&values[start..end])
            .enumerate()
        {
            let x = p.left + ((t - left_ms) / span_ms) as f32 * p.width;
            let y_frac = (v / self.y_max).clamp(0.0, 1.0) as f32;
            let y = p.top + p.height - y_frac * p.height;
            if k == 0 {
                pb.move_to(x, y);
            } else {
                pb.line_to(x, y);
            }
        }

        let Some(path) = pb.finish() else {
            // Single-point windows produce no strokeable path.
            return Ok(());
        };

        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.set_color_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);

        let stroke = Stroke {
            width: self.style.stroke_width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        self.pixmap.stroke_path(
            &path,
            &paint,
            &stroke,
            Transform::identity(),
            Some(&self.plot_clip),
        );
        Ok(())
    }
}

/// Vertical position of a secondary tick, as a fraction of the plot height.
/// Ticks share the primary axis' headroom so the topmost numeral does not
/// collide with the plot border.
fn tick_fraction(ticks: &[f64], y_headroom: f64, t: f64) -> f32 {
    let top = ticks.last().copied().unwrap_or(1.0).max(1.0) * y_headroom;
    (t / top).clamp(0.0, 1.0) as f32
}

/// Lay out the static text of one chart: the y-axis labels (rotated along
/// their axes, tinted with the series color like the source lines) and the
/// secondary tick numerals. Returns `None` when the chart carries no text.
fn build_axis_text(
    spec: &ChartSpec,
    style: &RenderStyle,
    width: u32,
    height: u32,
    plot: PlotArea,
    ticks: &[f64],
) -> ChartResult<Option<Pixmap>> {
    let bottom = plot.top + plot.height;
    let right = plot.left + plot.width;
    let label_px = (height as f32 / 30.0).max(12.0);
    let numeral_px = (height as f32 / 45.0).max(10.0);

    let mut spans = Vec::new();

    if let Some(label) = &spec.y_label {
        let rgba = match spec.kind {
            ChartKind::Frametime => style.frametime_rgba,
            ChartKind::Fps | ChartKind::Combined => style.fps_rgba,
        };
        spans.push(TextSpan {
            text: label.clone(),
            x: (plot.left - style.tick_len_px - label_px * 0.5).max(label_px * 0.8),
            y: plot.top + plot.height * 0.5,
            size_px: label_px,
            rgba,
            rotate_deg: -90.0,
            anchor: Anchor::Middle,
        });
    }

    for &t in ticks {
        let frac = tick_fraction(ticks, style.y_headroom, t);
        spans.push(TextSpan {
            text: format!("{t:.0}"),
            x: right + style.tick_len_px + 4.0,
            y: bottom - frac * plot.height + numeral_px * 0.35,
            size_px: numeral_px,
            rgba: style.axis_rgba,
            rotate_deg: 0.0,
            anchor: Anchor::Start,
        });
    }

    if let Some(label) = &spec.y2_label {
        spans.push(TextSpan {
            text: label.clone(),
            x: (right + style.tick_len_px + numeral_px * 3.5).min(width as f32 - label_px * 0.5),
            y: plot.top + plot.height * 0.5,
            size_px: label_px,
            rgba: style.frametime_rgba,
            rotate_deg: 90.0,
            anchor: Anchor::Middle,
        });
    }

    rasterize_spans(width, height, &spans)
}

fn build_plot_clip(width: u32, height: u32, plot: PlotArea) -> ChartResult<Mask> {
    let mut mask = Mask::new(width, height)
        .ok_or_else(|| ChartError::validation("failed to allocate clip mask"))?;
    let rect = Rect::from_xywh(plot.left, plot.top, plot.width, plot.height)
        .ok_or_else(|| ChartError::validation("plot area rectangle is degenerate"))?;
    let path = PathBuilder::from_rect(rect);
    mask.fill_path(&path, FillRule::Winding, true, Transform::identity());
    Ok(mask)
}

/// Render every frame of one enabled chart spec and stream them to the video
/// sink in frame-index order.
#[tracing::instrument(skip(spec, data, style, sink), fields(chart = spec.kind.display_name()))]
pub fn render_chart(
    spec: &ChartSpec,
    data: &ChartData<'_>,
    style: &RenderStyle,
    encode: EncodeConfig,
    sink: &mut dyn ProgressSink,
) -> ChartResult<()> {
    if !spec.enabled {
        tracing::debug!("chart disabled, skipping");
        return Ok(());
    }

    let mut renderer = ChartRenderer::new(spec, *style, encode.width, encode.height, data)?;

    // Announced before the video sink opens so the destination is on record
    // even when the encoder fails to start.
    sink.on_chart_start(spec.kind.display_name(), &spec.out_path);
    let mut encoder = FfmpegEncoder::new(encode, [0, 0, 0, 255])?;

    let n = data.len();
    tracing::info!(frames = n, out = %spec.out_path.display(), "encoding chart");
    for i in 0..n {
        let frame = renderer.render_frame(data, i)?;
        encoder.encode_frame(&frame)?;
        sink.on_frame(i, n);
    }
    encoder.finish()?;
    sink.on_frame(n, n);
    sink.on_chart_done(spec.kind.display_name());

    Ok(())
}

/// Rasterize a single animation frame without touching the video sink.
/// Used by the `frame` inspection command.
pub fn render_single_frame(
    spec: &ChartSpec,
    data: &ChartData<'_>,
    style: &RenderStyle,
    width: u32,
    height: u32,
    i: usize,
) -> ChartResult<FrameRgba> {
    let mut renderer = ChartRenderer::new(spec, *style, width, height, data)?;
    renderer.render_frame(data, i)
}
