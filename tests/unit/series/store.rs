use super::*;
use crate::series::synth::SeriesParams;

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("unit_series_store").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn synthesizes_then_reuses_persisted_series() {
    let dir = scratch("reuse");
    let path = dir.join("series.csv");
    let params = SeriesParams::default();

    let first = load_or_synthesize(&path, &params).unwrap();
    assert!(first.is_synthetic());
    assert!(path.exists());
    let bytes_first = std::fs::read(&path).unwrap();

    assert!(synthetic_marker_path(&path).is_file());

    let second = load_or_synthesize(&path, &params).unwrap();
    assert_eq!(second.origin, SeriesOrigin::Loaded);
    assert!(second.is_synthetic());
    assert_eq!(std::fs::read(&path).unwrap(), bytes_first);

    assert_eq!(first.records.len(), second.records.len());
    for (a, b) in first.records.iter().zip(&second.records) {
        assert_eq!(a.date, b.date);
        assert!((a.value - b.value).abs() < 1e-12);
    }
}

#[test]
fn marker_sits_next_to_the_series() {
    assert_eq!(
        synthetic_marker_path(Path::new("data/series.csv")),
        PathBuf::from("data/series.csv.synthetic")
    );
}

#[test]
fn same_seed_writes_identical_bytes() {
    let dir = scratch("bytes");
    let a = dir.join("a.csv");
    let b = dir.join("b.csv");
    load_or_synthesize(&a, &SeriesParams::default()).unwrap();
    load_or_synthesize(&b, &SeriesParams::default()).unwrap();
    assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
}

#[test]
fn reads_gee_export_with_extra_columns_and_month_dates() {
    let dir = scratch("gee");
    let path = dir.join("export.csv");
    std::fs::write(
        &path,
        "system:index,date,mean_chla,std_chla,.geo\n\
         0,2000-01,8.5,1.2,\n\
         1,2000-02,9.25,,\n",
    )
    .unwrap();
    let loaded = load_or_synthesize(&path, &SeriesParams::default()).unwrap();
    assert_eq!(loaded.origin, SeriesOrigin::Loaded);
    assert!(!loaded.is_synthetic());

    let records = read_series_csv(&path).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
    assert_eq!(records[0].std, Some(1.2));
    assert_eq!(records[1].value, 9.25);
    assert_eq!(records[1].std, None);
}

#[test]
fn reads_pandas_timestamps() {
    let dir = scratch("pandas");
    let path = dir.join("pandas.csv");
    std::fs::write(&path, "date,mean_chla\n2003-05-01 00:00:00,12.0\n").unwrap();
    let records = read_series_csv(&path).unwrap();
    assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2003, 5, 1).unwrap());
}

#[test]
fn file_order_is_preserved_without_sorting() {
    let dir = scratch("order");
    let path = dir.join("unsorted.csv");
    std::fs::write(&path, "date,mean_chla\n2001-02-01,3\n2001-01-01,4\n").unwrap();
    let records = read_series_csv(&path).unwrap();
    assert!(records[0].date > records[1].date);
}

#[test]
fn malformed_rows_fail_with_data_format_naming_the_line() {
    let dir = scratch("malformed");

    let bad_date = dir.join("bad_date.csv");
    std::fs::write(&bad_date, "date,mean_chla\n2001-01-01,3\nnot-a-date,4\n").unwrap();
    let err = read_series_csv(&bad_date).unwrap_err();
    assert!(matches!(err, LakebloomError::DataFormat(_)));
    let msg = err.to_string();
    assert!(msg.contains("not-a-date") && msg.contains("line 3"), "{msg}");

    let bad_value = dir.join("bad_value.csv");
    std::fs::write(&bad_value, "date,mean_chla\n2001-01-01,lots\n").unwrap();
    let msg = read_series_csv(&bad_value).unwrap_err().to_string();
    assert!(msg.contains("lots"), "{msg}");

    let missing_col = dir.join("missing.csv");
    std::fs::write(&missing_col, "date,value\n2001-01-01,1\n").unwrap();
    let msg = read_series_csv(&missing_col).unwrap_err().to_string();
    assert!(msg.contains("mean_chla"), "{msg}");
}

#[test]
fn malformed_file_is_not_replaced_by_synthesis() {
    let dir = scratch("no_fallback");
    let path = dir.join("series.csv");
    std::fs::write(&path, "date,mean_chla\n2001-01-01,NaN\n").unwrap();
    assert!(load_or_synthesize(&path, &SeriesParams::default()).is_err());
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "date,mean_chla\n2001-01-01,NaN\n"
    );
}

#[test]
fn header_only_file_is_rejected() {
    let dir = scratch("empty");
    let path = dir.join("empty.csv");
    std::fs::write(&path, "date,mean_chla\n").unwrap();
    assert!(matches!(
        read_series_csv(&path),
        Err(LakebloomError::DataFormat(_))
    ));
}

#[test]
fn write_then_read_keeps_std_column() {
    let dir = scratch("std");
    let path = dir.join("with_std.csv");
    let mut records = vec![
        TimeSeriesRecord::new(NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(), 10.125),
        TimeSeriesRecord::new(NaiveDate::from_ymd_opt(2010, 2, 1).unwrap(), 11.0),
    ];
    records[0].std = Some(0.5);
    write_series_csv(&path, &records).unwrap();
    assert_eq!(read_series_csv(&path).unwrap(), records);
}

#[test]
fn parse_month_accepts_known_formats() {
    let d = NaiveDate::from_ymd_opt(2020, 7, 1).unwrap();
    assert_eq!(parse_month("2020-07-01"), Some(d));
    assert_eq!(parse_month("2020-07"), Some(d));
    assert_eq!(parse_month("2020-07-01T00:00:00"), Some(d));
    assert_eq!(parse_month("07/2020"), None);
}
