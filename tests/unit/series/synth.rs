use super::*;
use proptest::prelude::*;

#[test]
fn default_series_spans_310_months() {
    let records = synthesize_series(&SeriesParams::default()).unwrap();
    assert_eq!(records.len(), 310);
    assert_eq!(
        records[0].date,
        NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
    );
    assert_eq!(
        records[309].date,
        NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()
    );
    assert!(records.windows(2).all(|w| w[0].date < w[1].date));
}

#[test]
fn same_seed_is_bit_identical() {
    let params = SeriesParams::default();
    let a = synthesize_series(&params).unwrap();
    let b = synthesize_series(&params).unwrap();
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.date, y.date);
        assert_eq!(x.value.to_bits(), y.value.to_bits());
    }
}

#[test]
fn different_seed_changes_values() {
    let a = synthesize_series(&SeriesParams::default()).unwrap();
    let b = synthesize_series(&SeriesParams {
        seed: 7,
        ..SeriesParams::default()
    })
    .unwrap();
    assert!(a.iter().zip(&b).any(|(x, y)| x.value != y.value));
}

#[test]
fn first_value_is_clip_of_its_components() {
    let params = SeriesParams::default();
    let mut rng = StdRng::seed_from_u64(params.seed);
    let components = synthesize_components(&params, &mut rng).unwrap();
    let records = synthesize_series(&params).unwrap();

    let (_, c0) = components[0];
    assert_eq!(c0.trend, 8.0);
    assert_eq!(c0.seasonal, 0.0);
    assert!(c0.spike == 0.0 || c0.spike == 10.0);
    assert_eq!(records[0].value, c0.raw().clamp(2.0, 45.0));

    let (_, last) = components[309];
    assert!((last.trend - 15.0).abs() < 1e-12);
}

#[test]
fn noise_is_drawn_before_spikes() {
    let params = SeriesParams::default();
    let mut rng = StdRng::seed_from_u64(params.seed);
    let normal = Normal::new(0.0, params.noise_std).unwrap();
    let first_noise: f64 = normal.sample(&mut rng);

    let mut rng = StdRng::seed_from_u64(params.seed);
    let components = synthesize_components(&params, &mut rng).unwrap();
    assert_eq!(components[0].1.noise.to_bits(), first_noise.to_bits());
}

#[test]
fn single_month_series_uses_trend_start() {
    let params = SeriesParams {
        last_month: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
        noise_std: 0.0,
        spike_probability: 0.0,
        ..SeriesParams::default()
    };
    let records = synthesize_series(&params).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value, 8.0);
}

#[test]
fn invalid_params_are_rejected() {
    let bad = SeriesParams {
        spike_probability: 1.5,
        ..SeriesParams::default()
    };
    assert!(matches!(
        synthesize_series(&bad),
        Err(LakebloomError::InvalidParameter(_))
    ));

    let bad = SeriesParams {
        noise_std: -1.0,
        ..SeriesParams::default()
    };
    assert!(synthesize_series(&bad).is_err());

    let bad = SeriesParams {
        first_month: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
        ..SeriesParams::default()
    };
    assert!(synthesize_series(&bad).is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn values_stay_in_valid_range(
        seed in any::<u64>(),
        noise_std in 0.0f64..20.0,
        spike_probability in 0.0f64..=1.0,
        spike_magnitude in 0.0f64..80.0,
    ) {
        let params = SeriesParams {
            seed,
            noise_std,
            spike_probability,
            spike_magnitude,
            ..SeriesParams::default()
        };
        let records = synthesize_series(&params).unwrap();
        prop_assert_eq!(records.len(), 310);
        for r in &records {
            prop_assert!(params.valid_range.contains(r.value), "{} out of range", r.value);
        }
    }

    #[test]
    fn any_seed_reproduces(seed in any::<u64>()) {
        let params = SeriesParams { seed, ..SeriesParams::default() };
        let a = synthesize_series(&params).unwrap();
        let b = synthesize_series(&params).unwrap();
        prop_assert_eq!(a, b);
    }
}
