use super::*;
use crate::{
    foundation::core::GridShape,
    pipeline::config::PipelinePaths,
    render::frame::{FrameStyle, frame_file_name},
    series::store::write_series_csv,
    series::synth::SeriesParams,
};
use chrono::NaiveDate;

fn small_config(name: &str) -> (PipelineConfig, PathBuf) {
    let root = PathBuf::from("target").join("unit_pipeline_run").join(name);
    let _ = std::fs::remove_dir_all(&root);

    let mut cfg = PipelineConfig::default();
    cfg.paths = PipelinePaths {
        series: root.join("series.csv"),
        trend: root.join("figures").join("trend.png"),
        frames_dir: root.join("frames"),
        video: root.join("output").join("lake.gif"),
        manifest: None,
    };
    cfg.series = SeriesParams {
        first_month: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        last_month: NaiveDate::from_ymd_opt(2021, 12, 1).unwrap(),
        ..SeriesParams::default()
    };
    cfg.raster.grid = GridShape { nx: 20, ny: 16 };
    cfg.frame = FrameStyle {
        cell_px: 2,
        ..FrameStyle::default()
    };
    cfg.chart.width = 320;
    cfg.chart.height = 200;
    cfg.assemble.backend = VideoBackend::Gif;
    cfg.assemble.strictness = Strictness::Strict;
    (cfg, root)
}

#[test]
fn synthetic_run_produces_every_artifact() {
    let (cfg, root) = small_config("synthetic");
    let report = run_pipeline(&cfg).unwrap();
    let m = &report.manifest;

    assert!(m.series_synthetic);
    assert!(m.frames_synthetic);
    assert_eq!(m.series_origin, SeriesOrigin::Synthesized);
    assert_eq!(m.summary.months, 24);
    assert_eq!(m.frames, 4);
    assert!(!m.frames_reused);
    assert_eq!(report.render_stats.map(|s| s.frames_rendered), Some(4));

    assert!(cfg.paths.series.is_file());
    assert!(cfg.paths.trend.is_file());
    for i in 0..4 {
        assert!(cfg.paths.frames_dir.join(frame_file_name(i)).is_file());
    }
    let video = m.video.as_ref().unwrap();
    assert_eq!(video.frames, 4);
    assert_eq!(video.codec, "gif");
    assert!(cfg.paths.video.is_file());

    assert_eq!(report.manifest_path, root.join("output").join("manifest.json"));
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report.manifest_path).unwrap()).unwrap();
    assert_eq!(json["series_synthetic"], true);
    assert_eq!(json["frames_synthetic"], true);
    assert_eq!(json["frames"], 4);
    assert_eq!(json["video"]["codec"], "gif");
}

#[test]
fn persisted_series_is_loaded_not_regenerated() {
    let (cfg, _root) = small_config("loaded");
    let records: Vec<_> = (1..=12)
        .map(|m| {
            crate::series::record::TimeSeriesRecord::new(
                NaiveDate::from_ymd_opt(2010, m, 1).unwrap(),
                10.0 + f64::from(m),
            )
        })
        .collect();
    write_series_csv(&cfg.paths.series, &records).unwrap();

    let report = run_pipeline(&cfg).unwrap();
    assert!(!report.manifest.series_synthetic);
    assert!(report.manifest.frames_synthetic);
    assert_eq!(report.manifest.series_origin, SeriesOrigin::Loaded);
    assert_eq!(report.manifest.summary.months, 12);
    assert_eq!(report.manifest.frames, 2);
}

#[test]
fn second_run_on_generated_series_stays_synthetic() {
    let (cfg, _root) = small_config("rerun");
    run_pipeline(&cfg).unwrap();

    let report = run_pipeline(&cfg).unwrap();
    let m = &report.manifest;
    assert_eq!(m.series_origin, SeriesOrigin::Loaded);
    assert!(m.series_synthetic);
    assert!(m.frames_synthetic);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report.manifest_path).unwrap()).unwrap();
    assert_eq!(json["series_synthetic"], true);
    assert_eq!(json["frames_synthetic"], true);
}

#[test]
fn reuse_keeps_existing_frames() {
    let (mut cfg, _root) = small_config("reuse");
    run_pipeline(&cfg).unwrap();
    let first = std::fs::read(cfg.paths.frames_dir.join(frame_file_name(0))).unwrap();

    cfg.reuse_frames = true;
    cfg.raster.kernel.seed = 7;
    let report = run_pipeline(&cfg).unwrap();
    assert!(report.manifest.frames_reused);
    assert!(report.render_stats.is_none());
    assert_eq!(
        std::fs::read(cfg.paths.frames_dir.join(frame_file_name(0))).unwrap(),
        first
    );
}

#[test]
fn rerender_drops_frames_from_a_longer_run() {
    let (mut cfg, _root) = small_config("stale");
    run_pipeline(&cfg).unwrap();

    cfg.frame_step_months = 12;
    let report = run_pipeline(&cfg).unwrap();
    assert_eq!(report.manifest.frames, 2);
    assert!(!cfg.paths.frames_dir.join(frame_file_name(2)).exists());
}

#[test]
fn malformed_series_fails_without_fallback() {
    let (cfg, _root) = small_config("malformed");
    std::fs::create_dir_all(cfg.paths.series.parent().unwrap()).unwrap();
    std::fs::write(&cfg.paths.series, "date,mean_chla\n2020-01-01,abc\n").unwrap();

    let err = run_pipeline(&cfg).unwrap_err();
    assert!(matches!(err, LakebloomError::DataFormat(_)));
    assert!(!cfg.paths.frames_dir.exists());
    assert!(!cfg.paths.video.exists());
}
