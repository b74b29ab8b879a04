use std::{io::Write as _, path::PathBuf};

use fpschart::{
    ExportOptions, GRID_INTERVAL_MS, NullProgress, RenderStyle, RunOptions, metric, resample,
    timebase,
};

fn fixture_dir() -> PathBuf {
    let dir = PathBuf::from("target").join("pipeline_it");
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_fixture(name: &str, contents: &str) -> PathBuf {
    let path = fixture_dir().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

/// 181 rows, one per second, constant 60 FPS.
fn constant_60_log() -> String {
    let mut csv = String::from("TIMESTAMP;FRAMERATE\n");
    for i in 0..181u32 {
        let min = 10 + i / 60;
        let sec = i % 60;
        csv.push_str(&format!("2020_06_01-09:{min:02}:{sec:02}:000;60\n"));
    }
    csv
}

#[test]
fn constant_framerate_log_resamples_to_60hz_grid() {
    let input = write_fixture("constant60.csv", &constant_60_log());
    let opts = RunOptions {
        input,
        output_stem: fixture_dir().join("constant60").to_string_lossy().into_owned(),
        export: ExportOptions::default(),
        style: RenderStyle::default(),
    };

    let report = fpschart::run(&opts, &mut NullProgress).unwrap();

    assert_eq!(report.length_original, 181);
    // 180 s of data at 60 Hz cadence, endpoint included.
    assert_eq!(report.frame_count, 10_801);

    assert_eq!(report.fps.min, 60.0);
    assert_eq!(report.fps.max, 60.0);
    assert_eq!(report.fps.mean, 60.0);
    assert_eq!(report.fps.median, 60.0);

    let expected_ft = 1000.0 / 60.0;
    assert!((report.frametime.min - expected_ft).abs() < 1e-9);
    assert!((report.frametime.max - expected_ft).abs() < 1e-9);
    assert!((report.frametime.mean - expected_ft).abs() < 1e-9);
    assert!((report.frametime.median - expected_ft).abs() < 1e-9);
}

#[test]
fn stats_only_run_creates_no_video_artifacts() {
    let input = write_fixture("stats_only.csv", &constant_60_log());
    let stem = fixture_dir().join("stats_only").to_string_lossy().into_owned();
    let opts = RunOptions {
        input,
        output_stem: stem.clone(),
        export: ExportOptions::default(),
        style: RenderStyle::default(),
    };

    let report = fpschart::run(&opts, &mut NullProgress).unwrap();

    assert!(report.artifacts.is_empty());
    assert!(report.failed_charts.is_empty());
    for suffix in ["fps", "frametime", "combined"] {
        assert!(
            !PathBuf::from(format!("{stem}_{suffix}.mov")).exists(),
            "unexpected artifact for {suffix}"
        );
    }
}

#[test]
fn render_failure_is_scoped_to_the_failing_chart() {
    let input = write_fixture("scoped_failure.csv", &constant_60_log());

    // A regular file sits where the output directory should be, so opening
    // the video sink fails for every requested chart. The run itself must
    // still complete and report the failures instead of aborting.
    let blocker = fixture_dir().join("not_a_dir");
    std::fs::write(&blocker, b"blocker").unwrap();
    let stem = blocker.join("g").to_string_lossy().into_owned();

    let opts = RunOptions {
        input,
        output_stem: stem,
        export: ExportOptions {
            export_fps: true,
            export_frametime: true,
            ..ExportOptions::default()
        },
        style: RenderStyle::default(),
    };

    let report = fpschart::run(&opts, &mut NullProgress).unwrap();

    assert!(report.artifacts.is_empty());
    let failed: Vec<&str> = report.failed_charts.iter().map(|f| f.chart.as_str()).collect();
    assert_eq!(failed, ["FPS", "Frametime"]);
    assert!(report.failed_charts.iter().all(|f| !f.error.is_empty()));

    // The numeric side of the run is unaffected by the sink failures.
    assert_eq!(report.length_original, 181);
    assert_eq!(report.fps.mean, 60.0);
}

#[test]
fn zero_framerate_rows_yield_finite_series_end_to_end() {
    let mut csv = String::from("TIMESTAMP;FRAMERATE\n");
    for i in 0..30u32 {
        // A stall in the middle of the log: several seconds at 0 FPS.
        let fps = if (10..14).contains(&i) { 0 } else { 60 };
        csv.push_str(&format!("2020_06_01-09:10:{i:02}:000;{fps}\n"));
    }
    let input = write_fixture("stall.csv", &csv);

    let rows = fpschart::input::read_log(&input).unwrap();
    let samples = timebase::normalize(&rows).unwrap();
    let resampled = resample::resample(&samples, GRID_INTERVAL_MS).unwrap();
    let derived = metric::derive(&resampled).unwrap();

    assert!(derived.fps.iter().all(|v| v.is_finite()));
    assert!(derived.frametime_ms.iter().all(|v| v.is_finite()));
    for (&fps, &ft) in derived.fps.iter().zip(&derived.frametime_ms) {
        if fps > 0.0 {
            assert!(ft.is_finite());
        }
    }
}

#[test]
fn irregular_log_snaps_to_nearest_samples() {
    // Two plateaus with an irregular boundary; nearest-neighbor regridding
    // must produce only values that exist in the source.
    let csv = "TIMESTAMP;FRAMERATE\n\
               2020_06_01-09:10:00:000;30\n\
               2020_06_01-09:10:00:437;30\n\
               2020_06_01-09:10:01:112;90\n\
               2020_06_01-09:10:02:000;90\n";
    let input = write_fixture("irregular.csv", csv);

    let rows = fpschart::input::read_log(&input).unwrap();
    let samples = timebase::normalize(&rows).unwrap();
    let resampled = resample::resample(&samples, GRID_INTERVAL_MS).unwrap();

    assert!(resampled.values.iter().all(|&v| v == 30.0 || v == 90.0));
    assert_eq!(resampled.values[0], 30.0);
    assert_eq!(resampled.values[resampled.len() - 1], 90.0);
    // The switch happens at the midpoint between the middle samples.
    let mid = (437.0 + 1112.0) / 2.0;
    for (&t, &v) in resampled.times_ms.iter().zip(&resampled.values) {
        if t < mid - GRID_INTERVAL_MS {
            assert_eq!(v, 30.0, "t={t}");
        }
        if t > mid + GRID_INTERVAL_MS {
            assert_eq!(v, 90.0, "t={t}");
        }
    }
}
