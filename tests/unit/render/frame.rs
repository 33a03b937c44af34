use super::*;
use crate::foundation::core::GridShape;
use chrono::NaiveDate;

fn field(index: usize, nx: usize, ny: usize, value: f64) -> ConcentrationField {
    ConcentrationField {
        date: NaiveDate::from_ymd_opt(2014, 3, 1).unwrap(),
        index,
        shape: GridShape { nx, ny },
        amplitude: 8.0,
        values: vec![value; nx * ny],
    }
}

fn scratch(name: &str) -> std::path::PathBuf {
    let dir = std::path::PathBuf::from("target").join("unit_render_frame").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn file_names_are_zero_padded() {
    assert_eq!(frame_file_name(0), "spatial_0000.png");
    assert_eq!(frame_file_name(51), "spatial_0051.png");
    assert_eq!(frame_file_name(9999), "spatial_9999.png");
}

#[test]
fn canvas_is_even_on_both_sides() {
    let r = FrameRenderer::new(FrameStyle {
        cell_px: 3,
        ..FrameStyle::default()
    })
    .unwrap();
    let (w, h) = r.canvas_size(7, 5);
    assert_eq!(w % 2, 0);
    assert_eq!(h % 2, 0);
    assert!(w >= 21 && h >= 15);
}

#[test]
fn heatmap_uses_fixed_display_range() {
    let r = FrameRenderer::new(FrameStyle::default()).unwrap();
    let low = r.render_pixels(&field(0, 10, 10, 0.0)).unwrap();
    let high = r.render_pixels(&field(1, 10, 10, 500.0)).unwrap();

    // Center of the map, well inside the heatmap block.
    let cx = 16 + 15;
    let cy = 56 + 15;
    assert_eq!(low.pixel(cx, cy), [0x00, 0x00, 0x33, 255]);
    assert_eq!(high.pixel(cx, cy), [0xcc, 0x00, 0x00, 255]);
}

#[test]
fn render_pixels_rejects_shape_mismatch() {
    let r = FrameRenderer::new(FrameStyle::default()).unwrap();
    let mut f = field(0, 4, 4, 1.0);
    f.values.pop();
    assert!(matches!(
        r.render_pixels(&f),
        Err(LakebloomError::InvalidParameter(_))
    ));
}

#[test]
fn zero_cell_size_is_rejected() {
    let err = FrameRenderer::new(FrameStyle {
        cell_px: 0,
        ..FrameStyle::default()
    })
    .unwrap_err();
    assert!(matches!(err, LakebloomError::InvalidParameter(_)));
}

#[test]
fn render_creates_directory_and_writes_one_png() {
    let dir = scratch("one_png");
    let r = FrameRenderer::new(FrameStyle::default())
        .unwrap()
        .with_synthetic_marker(true);

    let path = r.render(&field(3, 12, 8, 10.0), 3, &dir).unwrap();
    assert_eq!(path, dir.join("spatial_0003.png"));

    let names: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["spatial_0003.png".to_string()]);

    let (w, h) = image::image_dimensions(&path).unwrap();
    assert_eq!((w, h), r.canvas_size(12, 8));
}

#[test]
fn index_past_padding_width_is_rejected() {
    let dir = scratch("too_many");
    let r = FrameRenderer::new(FrameStyle::default()).unwrap();
    let err = r.render(&field(0, 2, 2, 1.0), 10_000, &dir).unwrap_err();
    assert!(matches!(err, LakebloomError::InvalidParameter(_)));
    assert!(!dir.exists());
}

#[test]
fn unwritable_directory_is_a_render_error() {
    let dir = scratch("blocked");
    std::fs::create_dir_all(&dir).unwrap();
    let blocker = dir.join("file");
    std::fs::write(&blocker, b"x").unwrap();

    let r = FrameRenderer::new(FrameStyle::default()).unwrap();
    let err = r.render(&field(0, 2, 2, 1.0), 0, &blocker).unwrap_err();
    assert!(matches!(err, LakebloomError::Render(ref m) if m.contains("file")));
}
