use super::*;

fn scale() -> ColorScale {
    ColorScale::chla(ValueRange::new(0.0, 30.0).unwrap()).unwrap()
}

#[test]
fn ends_map_to_first_and_last_stop() {
    let s = scale();
    assert_eq!(s.map(0.0), [0x00, 0x00, 0x33]);
    assert_eq!(s.map(30.0), [0xcc, 0x00, 0x00]);
}

#[test]
fn out_of_range_values_clamp_to_end_colors() {
    let s = scale();
    assert_eq!(s.map(-5.0), s.map(0.0));
    assert_eq!(s.map(49.0), s.map(30.0));
    assert_eq!(s.map(f64::NAN), s.map(0.0));
}

#[test]
fn interior_stops_are_hit_exactly() {
    let s = scale();
    // 6 stops over [0, 30] put a stop every 6 units.
    assert_eq!(s.map(6.0), [0x00, 0x66, 0xff]);
    assert_eq!(s.map(18.0), [0xff, 0xff, 0x00]);
}

#[test]
fn mapping_does_not_depend_on_other_frames() {
    let s = scale();
    let low_frame_color = s.map(12.0);
    let _ = s.map(29.0);
    assert_eq!(s.map(12.0), low_frame_color);
}

#[test]
fn hex_parsing_round_trips() {
    assert_eq!(parse_hex_rgb("#0066ff").unwrap(), [0, 0x66, 0xff]);
    assert_eq!(to_hex([0, 0x66, 0xff]), "#0066ff");
    assert!(parse_hex_rgb("#06f").is_err());
    assert!(parse_hex_rgb("#zz66ff").is_err());
}

#[test]
fn needs_two_stops_and_a_valid_range() {
    let range = ValueRange::new(0.0, 1.0).unwrap();
    assert!(ColorScale::new(&["#000000"], range).is_err());
    let bad = ValueRange { lo: 3.0, hi: 1.0 };
    assert!(ColorScale::chla(bad).is_err());
}
