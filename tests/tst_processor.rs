use calendar_scan::processor::{TermStructure, average_volume, find_atm_iv, yang_zhang};
use calendar_scan::{ChainRow, PriceBar, TermStructurePoint};
use chrono::{Duration, NaiveDate};

fn bars(closes: &[f64]) -> Vec<PriceBar> {
    let start = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PriceBar {
            date: start + Duration::days(i as i64),
            open: c,
            high: c * 1.01,
            low: c * 0.99,
            close: c,
            volume: 1_000.0 * (i + 1) as f64,
        })
        .collect()
}

#[test]
fn test_interpolation_matches_linear_midpoint() {
    let ts = TermStructure::new(vec![
        TermStructurePoint::new(30.0, 0.20),
        TermStructurePoint::new(60.0, 0.18),
    ])
    .unwrap();

    assert_eq!(ts.interpolate(30.0), 0.20);
    assert!((ts.interpolate(45.0) - 0.19).abs() < 1e-12);
}

#[test]
fn test_unsorted_points_are_sorted() {
    let ts = TermStructure::new(vec![
        TermStructurePoint::new(90.0, 0.22),
        TermStructurePoint::new(45.0, 0.30),
        TermStructurePoint::new(60.0, 0.26),
    ])
    .unwrap();

    let days: Vec<f64> = ts.points().iter().map(|p| p.days).collect();
    assert_eq!(days, vec![45.0, 60.0, 90.0]);
    assert_eq!(ts.front_days(), 45.0);
}

#[test]
fn test_constant_series_zero_not_nan() {
    let flat = bars(&[50.0; 60]);
    let mut flat_no_range = flat.clone();
    for b in flat_no_range.iter_mut() {
        b.high = b.open;
        b.low = b.open;
    }
    let rv = yang_zhang(&flat_no_range, 30, 252.0);
    assert!(!rv.is_nan());
    assert!(rv.abs() < 1e-12);
}

#[test]
fn test_intraday_range_adds_volatility() {
    // Same closes, but a 1% high/low band each session
    let ranged = bars(&[50.0; 60]);
    let rv = yang_zhang(&ranged, 30, 252.0);
    assert!(rv > 0.0);

    let log_h = (1.01f64).ln();
    let log_l = (0.99f64).ln();
    let rs = log_h * log_h + log_l * log_l;
    let w = 30.0;
    let k = 0.34 / (1.34 + (w + 1.0) / (w - 1.0));
    let expected = ((1.0 - k) * 30.0 * rs / (w - 1.0)).sqrt() * 252f64.sqrt();
    assert!((rv - expected).abs() < 1e-12);
}

#[test]
fn test_only_last_window_counts() {
    // A shock well before the final window leaves the estimate unchanged
    let mut closes = vec![80.0; 60];
    closes[5] = 120.0;
    let shocked = yang_zhang(&bars(&closes), 30, 252.0);
    let calm = yang_zhang(&bars(&[80.0; 60]), 30, 252.0);
    assert_eq!(shocked, calm);
}

#[test]
fn test_average_volume_last_thirty() {
    let b = bars(&[10.0; 40]);
    // volumes 11_000..=40_000 step 1_000
    assert_eq!(average_volume(&b, 30), Some(25_500.0));
}

#[test]
fn test_atm_iv_picks_nearest_strike() {
    let chain = vec![
        ChainRow::new(150.0, Some(0.40)),
        ChainRow::new(160.0, Some(0.38)),
        ChainRow::new(170.0, Some(0.37)),
    ];
    assert_eq!(find_atm_iv(&chain, 163.2), Some(0.38));
    assert_eq!(find_atm_iv(&chain, 1_000.0), Some(0.37));
}
