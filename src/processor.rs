//! Numeric side of scoring: expiry selection, ATM implied volatility,
//! the term-structure interpolant, Yang-Zhang realized volatility and
//! average volume. Nothing here touches the network.

use crate::config::{self, ExpiryPolicy};
use crate::models::{ChainRow, PriceBar, TermStructurePoint};
use chrono::NaiveDate;

/// Calendar days from `as_of` to `expiry` (negative once expired)
pub fn calculate_days_to_expiry(expiry: NaiveDate, as_of: NaiveDate) -> i64 {
    (expiry - as_of).num_days()
}

/// Pick the expirations used for the term structure, sorted by date.
///
/// Returns `(expiry, days_to_expiry)` pairs.
pub fn select_expirations(
    expirations: &[NaiveDate],
    as_of: NaiveDate,
    policy: ExpiryPolicy,
) -> Vec<(NaiveDate, i64)> {
    let mut dated: Vec<(NaiveDate, i64)> = expirations
        .iter()
        .map(|&d| (d, calculate_days_to_expiry(d, as_of)))
        .collect();
    dated.sort_by_key(|(d, _)| *d);
    dated.dedup_by_key(|(d, _)| *d);

    match policy {
        ExpiryPolicy::AllBeyondMinimum => dated
            .into_iter()
            .filter(|(_, dte)| *dte >= config::MIN_EXPIRY_DAYS)
            .collect(),
        ExpiryPolicy::NearestBeyondMinimum => {
            let Some(cut) = dated
                .iter()
                .position(|(_, dte)| *dte >= config::MIN_EXPIRY_DAYS)
            else {
                return Vec::new();
            };
            dated
                .into_iter()
                .take(cut + 1)
                .filter(|(_, dte)| *dte > 0)
                .collect()
        }
    }
}

/// Implied volatility of the strike closest to spot.
///
/// Ties keep the first row. A missing, zero or non-finite IV on that row
/// means the expiration has no usable ATM value.
pub fn find_atm_iv(chain: &[ChainRow], spot: f64) -> Option<f64> {
    let mut closest: Option<&ChainRow> = None;
    let mut min_distance = f64::MAX;

    for row in chain {
        let distance = (row.strike - spot).abs();
        if distance < min_distance {
            min_distance = distance;
            closest = Some(row);
        }
    }

    closest
        .and_then(|row| row.implied_vol)
        .filter(|iv| iv.is_finite() && *iv > 0.0)
}

/// Piecewise-linear curve over (days, iv) with linear extrapolation at
/// both ends.
#[derive(Debug, Clone, PartialEq)]
pub struct TermStructure {
    points: Vec<TermStructurePoint>,
}

impl TermStructure {
    /// `None` unless there are at least two distinct tenors.
    pub fn new(mut points: Vec<TermStructurePoint>) -> Option<Self> {
        points.retain(|p| p.days.is_finite() && p.iv.is_finite());
        points.sort_by(|a, b| a.days.total_cmp(&b.days));
        points.dedup_by(|a, b| a.days == b.days);

        if points.len() < config::MIN_TERM_POINTS {
            return None;
        }
        Some(Self { points })
    }

    pub fn points(&self) -> &[TermStructurePoint] {
        &self.points
    }

    /// Nearest observed tenor
    pub fn front_days(&self) -> f64 {
        self.points[0].days
    }

    pub fn interpolate(&self, days: f64) -> f64 {
        let seg = self.segment_for(days);
        let (a, b) = (self.points[seg], self.points[seg + 1]);
        if days == a.days {
            return a.iv;
        }
        if days == b.days {
            return b.iv;
        }
        a.iv + (days - a.days) * (b.iv - a.iv) / (b.days - a.days)
    }

    /// Slope from the front tenor to `SLOPE_TENOR_DAYS`.
    ///
    /// NaN when the front tenor sits exactly on 45 days (0/0).
    pub fn slope_to_45(&self) -> f64 {
        let d0 = self.front_days();
        let target = config::SLOPE_TENOR_DAYS;
        (self.interpolate(target) - self.interpolate(d0)) / (target - d0)
    }

    /// Index of the segment used for `days`; the outer segments extend
    /// past the observed range.
    fn segment_for(&self, days: f64) -> usize {
        let last = self.points.len() - 2;
        self.points[1..=last]
            .iter()
            .position(|p| days <= p.days)
            .unwrap_or(last)
    }
}

/// Yang-Zhang realized volatility for the most recent `window` sessions,
/// annualized. NaN when there are fewer than `window + 1` bars.
pub fn yang_zhang(bars: &[PriceBar], window: usize, periods_per_year: f64) -> f64 {
    if window < 2 || bars.len() < window + 1 {
        return f64::NAN;
    }

    let n = bars.len();
    let mut overnight = 0.0;
    let mut close_close = 0.0;
    let mut range = 0.0;

    for i in (n - window)..n {
        let bar = &bars[i];
        let prev_close = bars[i - 1].close;

        let log_ho = (bar.high / bar.open).ln();
        let log_lo = (bar.low / bar.open).ln();
        let log_co = (bar.close / bar.open).ln();
        let log_oc = (bar.open / prev_close).ln();
        let log_cc = (bar.close / prev_close).ln();

        overnight += log_oc * log_oc;
        close_close += log_cc * log_cc;
        range += log_ho * (log_ho - log_co) + log_lo * (log_lo - log_co);
    }

    let w = window as f64;
    let ov = overnight / (w - 1.0);
    let cv = close_close / (w - 1.0);
    let rv = range / (w - 1.0);

    let k = 0.34 / (1.34 + (w + 1.0) / (w - 1.0));
    (ov + k * cv + (1.0 - k) * rv).sqrt() * periods_per_year.sqrt()
}

/// Mean volume over the most recent `window` bars
pub fn average_volume(bars: &[PriceBar], window: usize) -> Option<f64> {
    if window == 0 || bars.len() < window {
        return None;
    }
    let recent = &bars[bars.len() - window..];
    Some(recent.iter().map(|b| b.volume).sum::<f64>() / window as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn curve(points: &[(f64, f64)]) -> TermStructure {
        TermStructure::new(
            points
                .iter()
                .map(|&(d, iv)| TermStructurePoint::new(d, iv))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_select_all_beyond_minimum() {
        let as_of = date(2025, 1, 1);
        let exps = vec![date(2025, 3, 21), date(2025, 1, 17), date(2025, 2, 15), date(2025, 6, 20)];

        let picked = select_expirations(&exps, as_of, ExpiryPolicy::AllBeyondMinimum);
        let days: Vec<i64> = picked.iter().map(|(_, d)| *d).collect();
        // 2025-02-15 is exactly 45 days out and qualifies
        assert_eq!(days, vec![45, 79, 170]);
    }

    #[test]
    fn test_select_nearest_beyond_minimum() {
        let as_of = date(2025, 1, 1);
        let exps = vec![date(2025, 1, 1), date(2025, 1, 17), date(2025, 3, 21), date(2025, 6, 20)];

        let picked = select_expirations(&exps, as_of, ExpiryPolicy::NearestBeyondMinimum);
        let days: Vec<i64> = picked.iter().map(|(_, d)| *d).collect();
        // today's expiry dropped, front month kept, stop at first >= 45
        assert_eq!(days, vec![16, 79]);
    }

    #[test]
    fn test_select_none_qualifying() {
        let as_of = date(2025, 1, 1);
        let exps = vec![date(2025, 1, 17), date(2025, 2, 1)];
        assert!(select_expirations(&exps, as_of, ExpiryPolicy::AllBeyondMinimum).is_empty());
        assert!(select_expirations(&exps, as_of, ExpiryPolicy::NearestBeyondMinimum).is_empty());
    }

    #[test]
    fn test_find_atm_iv() {
        let chain = vec![
            ChainRow::new(95.0, Some(0.31)),
            ChainRow::new(100.0, Some(0.28)),
            ChainRow::new(105.0, Some(0.26)),
        ];
        assert_eq!(find_atm_iv(&chain, 101.0), Some(0.28));
        assert_eq!(find_atm_iv(&chain, 104.0), Some(0.26));
        // equidistant: first row wins
        assert_eq!(find_atm_iv(&chain, 97.5), Some(0.31));
    }

    #[test]
    fn test_find_atm_iv_missing() {
        assert_eq!(find_atm_iv(&[], 100.0), None);

        let chain = vec![ChainRow::new(100.0, None), ChainRow::new(110.0, Some(0.2))];
        assert_eq!(find_atm_iv(&chain, 100.0), None);

        let chain = vec![ChainRow::new(100.0, Some(0.0))];
        assert_eq!(find_atm_iv(&chain, 100.0), None);
    }

    #[test]
    fn test_interpolation_midpoint() {
        let ts = curve(&[(30.0, 0.20), (60.0, 0.18)]);
        assert_eq!(ts.interpolate(30.0), 0.20);
        assert!((ts.interpolate(45.0) - 0.19).abs() < 1e-12);
        assert_eq!(ts.interpolate(60.0), 0.18);
    }

    #[test]
    fn test_interpolation_extrapolates() {
        let ts = curve(&[(50.0, 0.30), (80.0, 0.24), (110.0, 0.23)]);
        // backwards from the first segment
        assert!((ts.interpolate(30.0) - 0.34).abs() < 1e-12);
        // forwards from the last segment
        assert!((ts.interpolate(140.0) - 0.22).abs() < 1e-12);
        // interior uses the right segment
        assert!((ts.interpolate(95.0) - 0.235).abs() < 1e-12);
    }

    #[test]
    fn test_term_structure_needs_two_tenors() {
        assert!(TermStructure::new(vec![TermStructurePoint::new(50.0, 0.2)]).is_none());
        assert!(
            TermStructure::new(vec![
                TermStructurePoint::new(50.0, 0.2),
                TermStructurePoint::new(50.0, 0.3),
            ])
            .is_none()
        );
    }

    #[test]
    fn test_points_sorted_by_day() {
        let ts = curve(&[(80.0, 0.24), (50.0, 0.30)]);
        assert_eq!(ts.front_days(), 50.0);
    }

    #[test]
    fn test_slope_to_45() {
        let ts = curve(&[(30.0, 0.30), (60.0, 0.20)]);
        let expected = (0.25 - 0.30) / 15.0;
        assert!((ts.slope_to_45() - expected).abs() < 1e-12);

        // front tenor beyond 45 days: extrapolated backwards
        let ts = curve(&[(50.0, 0.30), (80.0, 0.24)]);
        assert!((ts.slope_to_45() - (-0.002)).abs() < 1e-12);
    }

    #[test]
    fn test_slope_when_front_is_45() {
        let ts = curve(&[(45.0, 0.30), (75.0, 0.27)]);
        assert!(ts.slope_to_45().is_nan());
    }

    fn flat_bars(n: usize, price: f64, volume: f64) -> Vec<PriceBar> {
        let start = date(2025, 1, 1);
        (0..n)
            .map(|i| PriceBar {
                date: start + chrono::Duration::days(i as i64),
                open: price,
                high: price,
                low: price,
                close: price,
                volume,
            })
            .collect()
    }

    #[test]
    fn test_yang_zhang_constant_series_is_zero() {
        let bars = flat_bars(90, 100.0, 1.0);
        let rv = yang_zhang(&bars, 30, 252.0);
        assert!(!rv.is_nan());
        assert!(rv.abs() < 1e-12);
    }

    #[test]
    fn test_yang_zhang_needs_window_plus_one() {
        let bars = flat_bars(30, 100.0, 1.0);
        assert!(yang_zhang(&bars, 30, 252.0).is_nan());
        let bars = flat_bars(31, 100.0, 1.0);
        assert!(!yang_zhang(&bars, 30, 252.0).is_nan());
    }

    #[test]
    fn test_yang_zhang_known_value() {
        // Alternating closes with no intraday range: only overnight and
        // close-to-close terms contribute.
        let start = date(2025, 1, 1);
        let bars: Vec<PriceBar> = (0..4)
            .map(|i| {
                let p = if i % 2 == 0 { 100.0 } else { 110.0 };
                PriceBar {
                    date: start + chrono::Duration::days(i),
                    open: p,
                    high: p,
                    low: p,
                    close: p,
                    volume: 1.0,
                }
            })
            .collect();

        let jump = (1.1f64).ln();
        let w = 3.0;
        let ov = 3.0 * jump * jump / (w - 1.0);
        let cv = ov;
        let k = 0.34 / (1.34 + (w + 1.0) / (w - 1.0));
        let expected = (ov + k * cv).sqrt() * 252f64.sqrt();

        let rv = yang_zhang(&bars, 3, 252.0);
        assert!((rv - expected).abs() < 1e-12);
    }

    #[test]
    fn test_average_volume_uses_recent_window() {
        let mut bars = flat_bars(40, 10.0, 1_000.0);
        for bar in bars.iter_mut().skip(10) {
            bar.volume = 3_000.0;
        }
        assert_eq!(average_volume(&bars, 30), Some(3_000.0));
        assert_eq!(average_volume(&bars[..20], 30), None);
    }
}
