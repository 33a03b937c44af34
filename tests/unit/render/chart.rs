use super::*;
use crate::series::synth::{SeriesParams, synthesize_series};
use chrono::NaiveDate;

#[test]
fn empty_series_is_rejected() {
    let err = trend_chart_pixels(&[], &TrendChartOpts::default()).unwrap_err();
    assert!(matches!(err, LakebloomError::EmptyInput(_)));
}

#[test]
fn zero_window_is_rejected() {
    let records = vec![TimeSeriesRecord::new(
        NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
        5.0,
    )];
    let opts = TrendChartOpts {
        window: 0,
        ..TrendChartOpts::default()
    };
    assert!(matches!(
        trend_chart_pixels(&records, &opts),
        Err(LakebloomError::InvalidParameter(_))
    ));
}

#[test]
fn single_record_still_renders() {
    let records = vec![TimeSeriesRecord::new(
        NaiveDate::from_ymd_opt(2010, 6, 1).unwrap(),
        12.0,
    )];
    let img = trend_chart_pixels(&records, &TrendChartOpts::default()).unwrap();
    assert_eq!((img.width, img.height), (1200, 500));
}

#[test]
fn threshold_line_is_drawn_in_red() {
    let records = synthesize_series(&SeriesParams::default()).unwrap();
    let opts = TrendChartOpts {
        width: 400,
        height: 300,
        ..TrendChartOpts::default()
    };
    let img = trend_chart_pixels(&records, &opts).unwrap();

    let reddish = (0..img.height).any(|y| {
        (0..img.width).any(|x| {
            let [r, g, b, _] = img.pixel(x, y);
            r > 180 && g < 80 && b < 80
        })
    });
    assert!(reddish, "expected a red threshold line");
}

#[test]
fn chart_is_written_to_disk() {
    let dir = std::path::PathBuf::from("target").join("unit_render_chart");
    let _ = std::fs::remove_dir_all(&dir);
    let out = dir.join("nested").join("trend.png");

    let records = synthesize_series(&SeriesParams::default()).unwrap();
    render_trend_chart(
        &records,
        &TrendChartOpts {
            synthetic: true,
            ..TrendChartOpts::default()
        },
        &out,
    )
    .unwrap();

    assert_eq!(image::image_dimensions(&out).unwrap(), (1200, 500));
    assert!(!dir.join("nested").join("trend.png.partial").exists());
}
