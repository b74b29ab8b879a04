use std::path::PathBuf;

use crate::{
    chart::{ChartSpec, ExportOptions, RenderStyle},
    encode_ffmpeg::EncodeConfig,
    error::ChartResult,
    input, metric,
    render::{ChartData, OUTPUT_FPS, ProgressSink, render_chart},
    resample::{self, GRID_INTERVAL_MS},
    stats::{self, SeriesSummary},
    timebase,
};

/// Everything one batch run needs: a validated input path plus the export
/// options from the CLI layer.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub input: PathBuf,
    pub output_stem: String,
    pub export: ExportOptions,
    pub style: RenderStyle,
}

/// Outcome of a run: the diagnostic counts and summaries, which artifacts
/// were written, and which charts failed.
#[derive(Clone, Debug, serde::Serialize)]
pub struct RunReport {
    pub length_original: usize,
    pub frame_count: usize,
    pub fps: SeriesSummary,
    pub frametime: SeriesSummary,
    pub artifacts: Vec<PathBuf>,
    pub failed_charts: Vec<ChartFailure>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct ChartFailure {
    pub chart: String,
    pub error: String,
}

/// Run the full pipeline: read, normalize, resample, derive, summarize, then
/// render each enabled chart.
///
/// Input, schema and timestamp errors abort before any artifact is produced.
/// A rendering failure is scoped to its chart; the remaining charts still
/// attempt to complete and the failure is carried in the report.
#[tracing::instrument(skip(opts, sink), fields(input = %opts.input.display()))]
pub fn run(opts: &RunOptions, sink: &mut dyn ProgressSink) -> ChartResult<RunReport> {
    opts.export.validate()?;

    let rows = input::read_log(&opts.input)?;
    let samples = timebase::normalize(&rows)?;
    let resampled = resample::resample(&samples, GRID_INTERVAL_MS)?;
    let derived = metric::derive(&resampled)?;

    tracing::info!(
        original = resampled.length_original,
        frames = resampled.len(),
        "series resampled"
    );

    write_diagnostic_table(&opts.output_stem, &resampled.times_ms, &resampled.values);

    let fps_summary = stats::summarize(&derived.fps)?;
    let frametime_summary = stats::summarize(&derived.frametime_ms)?;

    let data = ChartData {
        times_ms: &resampled.times_ms,
        fps: &derived.fps,
        frametime_ms: &derived.frametime_ms,
        interval_ms: resampled.interval_ms,
    };

    let specs = ChartSpec::build_all(&opts.output_stem, &opts.export)?;
    let (width, height) = opts.export.pixel_size();

    let mut artifacts = Vec::new();
    let mut failed_charts = Vec::new();
    for spec in specs.iter().filter(|s| s.enabled) {
        let encode = EncodeConfig {
            width,
            height,
            fps: OUTPUT_FPS,
            out_path: spec.out_path.clone(),
            overwrite: true,
            transparent: opts.style.background_rgba[3] != 255,
        };

        match render_chart(spec, &data, &opts.style, encode, sink) {
            Ok(()) => artifacts.push(spec.out_path.clone()),
            Err(err) => {
                tracing::error!(chart = spec.kind.display_name(), %err, "chart export failed");
                failed_charts.push(ChartFailure {
                    chart: spec.kind.display_name().to_string(),
                    error: err.to_string(),
                });
            }
        }
    }

    Ok(RunReport {
        length_original: resampled.length_original,
        frame_count: resampled.len(),
        fps: fps_summary,
        frametime: frametime_summary,
        artifacts,
        failed_charts,
    })
}

/// Persist the intermediate resampled table next to the output stem. Debug
/// aid only; failure to write it does not fail the run.
fn write_diagnostic_table(output_stem: &str, times_ms: &[f64], values: &[f64]) {
    let path = PathBuf::from(format!("{output_stem}_resampled.csv"));
    let result = (|| -> Result<(), csv::Error> {
        let mut w = csv::WriterBuilder::new().delimiter(b';').from_path(&path)?;
        w.write_record(["time_ms", "framerate"])?;
        for (&t, &v) in times_ms.iter().zip(values) {
            w.write_record([format!("{t:.3}"), format!("{v}")])?;
        }
        w.flush()?;
        Ok(())
    })();

    if let Err(err) = result {
        tracing::warn!(path = %path.display(), %err, "failed to write diagnostic table");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChartError;
    use crate::render::NullProgress;
    use std::io::Write as _;

    fn write_fixture(name: &str, contents: &str) -> PathBuf {
        let dir = PathBuf::from("target").join("pipeline_unit");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn stats_only_opts(input: PathBuf, stem: &str) -> RunOptions {
        RunOptions {
            input,
            output_stem: format!("target/pipeline_unit/{stem}"),
            export: ExportOptions::default(),
            style: RenderStyle::default(),
        }
    }

    #[test]
    fn missing_input_file_is_fatal() {
        let opts = stats_only_opts(PathBuf::from("target/pipeline_unit/nope.csv"), "x");
        assert!(matches!(
            run(&opts, &mut NullProgress),
            Err(ChartError::InputRead(_))
        ));
    }

    #[test]
    fn bad_timestamp_aborts_before_any_artifact() {
        let input = write_fixture(
            "bad_ts.csv",
            "TIMESTAMP;FRAMERATE\n2020_06_01-10:00:00;60\n",
        );
        let opts = stats_only_opts(input, "bad_ts");
        assert!(matches!(
            run(&opts, &mut NullProgress),
            Err(ChartError::MalformedTimestamp(_))
        ));
    }

    #[test]
    fn stats_only_run_reports_and_writes_no_videos() {
        let mut csv = String::from("TIMESTAMP;FRAMERATE\n");
        for s in 0..10 {
            csv.push_str(&format!("2020_06_01-10:00:{s:02}:000;60\n"));
        }
        let input = write_fixture("stats_only.csv", &csv);
        let opts = stats_only_opts(input, "stats_only");

        let report = run(&opts, &mut NullProgress).unwrap();
        assert_eq!(report.length_original, 10);
        assert_eq!(report.fps.mean, 60.0);
        assert!(report.artifacts.is_empty());
        assert!(report.failed_charts.is_empty());
        assert!(
            !PathBuf::from("target/pipeline_unit/stats_only_fps.mov").exists()
        );
        // The diagnostic table is the only side artifact.
        assert!(PathBuf::from("target/pipeline_unit/stats_only_resampled.csv").exists());
    }
}
