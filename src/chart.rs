use std::path::PathBuf;

use crate::error::{ChartError, ChartResult};

/// Which series a chart draws. Combined draws both series with a secondary
/// tick axis on the right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChartKind {
    Fps,
    Frametime,
    Combined,
}

impl ChartKind {
    pub fn file_suffix(self) -> &'static str {
        match self {
            ChartKind::Fps => "fps",
            ChartKind::Frametime => "frametime",
            ChartKind::Combined => "combined",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ChartKind::Fps => "FPS",
            ChartKind::Frametime => "Frametime",
            ChartKind::Combined => "Combined",
        }
    }
}

/// Output resolution presets, mapped to pixel dimensions at DPI 100.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Resolution {
    #[serde(rename = "720p")]
    R720p,
    #[default]
    #[serde(rename = "1080p")]
    R1080p,
    #[serde(rename = "1440p")]
    R1440p,
    #[serde(rename = "4k")]
    R4k,
}

impl Resolution {
    pub fn base_pixels(self) -> (u32, u32) {
        match self {
            Resolution::R720p => (1280, 720),
            Resolution::R1080p => (1920, 1080),
            Resolution::R1440p => (2560, 1440),
            Resolution::R4k => (3840, 2160),
        }
    }
}

pub const DPI_MIN: u32 = 2;
pub const DPI_MAX: u32 = 200;

/// Export configuration supplied by the CLI layer.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ExportOptions {
    pub export_fps: bool,
    pub export_frametime: bool,
    pub export_combined: bool,
    pub resolution: Resolution,
    /// 100 means the preset's native size, 200 doubles it.
    pub dpi: u32,
    pub yaxis_label: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            export_fps: false,
            export_frametime: false,
            export_combined: false,
            resolution: Resolution::default(),
            dpi: 100,
            yaxis_label: false,
        }
    }
}

impl ExportOptions {
    pub fn validate(&self) -> ChartResult<()> {
        if !(DPI_MIN..=DPI_MAX).contains(&self.dpi) {
            return Err(ChartError::validation(format!(
                "dpi must be in {DPI_MIN}..={DPI_MAX}, got {}",
                self.dpi
            )));
        }
        Ok(())
    }

    pub fn any_export(&self) -> bool {
        self.export_fps || self.export_frametime || self.export_combined
    }

    /// Final frame dimensions: preset scaled by DPI, rounded to even for the
    /// video encoder.
    pub fn pixel_size(&self) -> (u32, u32) {
        let (w, h) = self.resolution.base_pixels();
        let scale = self.dpi as f64 / 100.0;
        (scale_even(w, scale), scale_even(h, scale))
    }
}

fn scale_even(v: u32, scale: f64) -> u32 {
    let scaled = ((v as f64 * scale).round() as u32).max(2);
    scaled & !1
}

/// Configuration for one output artifact. Created once from the export
/// options; read-only thereafter.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub enabled: bool,
    pub out_path: PathBuf,
    /// Present when the y-axis label flag is set.
    pub y_label: Option<String>,
    /// Secondary-axis label, combined charts only.
    pub y2_label: Option<String>,
}

impl ChartSpec {
    /// Build the three chart specs for one run. Disabled specs are kept so
    /// the caller can report what was skipped.
    pub fn build_all(output_stem: &str, opts: &ExportOptions) -> ChartResult<Vec<ChartSpec>> {
        if output_stem.trim().is_empty() {
            return Err(ChartError::validation("output stem must be non-empty"));
        }

        let spec = |kind: ChartKind, enabled: bool| {
            let y_label = opts.yaxis_label.then(|| match kind {
                ChartKind::Frametime => "Frame time (ms)".to_string(),
                _ => "FPS".to_string(),
            });
            let y2_label = (opts.yaxis_label && kind == ChartKind::Combined)
                .then(|| "Frame time (ms)".to_string());
            ChartSpec {
                kind,
                enabled,
                out_path: PathBuf::from(format!("{output_stem}_{}.mov", kind.file_suffix())),
                y_label,
                y2_label,
            }
        };

        Ok(vec![
            spec(ChartKind::Fps, opts.export_fps),
            spec(ChartKind::Frametime, opts.export_frametime),
            spec(ChartKind::Combined, opts.export_combined),
        ])
    }
}

/// Immutable plotting style, passed into the renderer instead of mutating
/// process-wide state.
#[derive(Clone, Copy, Debug)]
pub struct RenderStyle {
    pub background_rgba: [u8; 4],
    pub fps_rgba: [u8; 4],
    pub frametime_rgba: [u8; 4],
    pub axis_rgba: [u8; 4],
    pub stroke_width: f32,
    pub margin_px: f32,
    pub tick_len_px: f32,
    /// Y range runs 0 .. headroom * series max.
    pub y_headroom: f64,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            background_rgba: [0, 0, 0, 0],
            fps_rgba: [0, 0, 255, 255],
            frametime_rgba: [255, 0, 0, 255],
            axis_rgba: [200, 200, 200, 255],
            stroke_width: 3.0,
            margin_px: 80.0,
            tick_len_px: 12.0,
            y_headroom: 1.1,
        }
    }
}

/// Secondary-axis tick values for a combined chart: the ceiling of the
/// series maximum divided into ten equal steps. Display-only.
pub fn secondary_ticks(series_max: f64) -> Vec<f64> {
    if !series_max.is_finite() || series_max <= 0.0 {
        return Vec::new();
    }
    let top = series_max.ceil() as i64;
    let step = (series_max / 10.0).ceil().max(1.0) as i64;
    (0..top).step_by(step as usize).map(|t| t as f64).collect()
}
