use crate::error::{ScreenError, ScreenResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized ticker: trimmed, uppercased, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickerSymbol(String);

impl TickerSymbol {
    pub fn parse(raw: &str) -> ScreenResult<Self> {
        let symbol = raw.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ScreenError::InvalidSymbol(raw.to_string()));
        }
        Ok(Self(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One strike of an option chain for a single expiration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainRow {
    pub strike: f64,
    pub implied_vol: Option<f64>,
}

impl ChainRow {
    pub fn new(strike: f64, implied_vol: Option<f64>) -> Self {
        Self { strike, implied_vol }
    }
}

/// Daily OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// (days-to-expiry, ATM implied volatility)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TermStructurePoint {
    pub days: f64,
    pub iv: f64,
}

impl TermStructurePoint {
    pub fn new(days: f64, iv: f64) -> Self {
        Self { days, iv }
    }
}

/// Signals derived for one symbol in one run.
///
/// Only `avg_volume`, `iv30_rv30` and `ts_slope_0_45` feed the threshold
/// rule; the remaining fields are diagnostics for the scorecard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub avg_volume: f64,
    pub iv30_rv30: f64,
    pub ts_slope_0_45: f64,

    pub iv30: f64,
    pub rv30: f64,
    pub spot: f64,
    pub term_points: usize,
}

/// Row of the hits CSV
#[derive(Debug, Clone, Serialize)]
pub struct HitRecord<'a> {
    #[serde(rename = "Symbol")]
    pub symbol: &'a str,

    #[serde(rename = "AvgVol")]
    pub avg_volume: f64,

    #[serde(rename = "IV30/RV30")]
    pub iv30_rv30: f64,

    #[serde(rename = "TS_slope_0_45")]
    pub ts_slope_0_45: f64,
}

impl<'a> HitRecord<'a> {
    pub fn new(symbol: &'a TickerSymbol, score: &ScoreResult) -> Self {
        Self {
            symbol: symbol.as_str(),
            avg_volume: score.avg_volume,
            iv30_rv30: score.iv30_rv30,
            ts_slope_0_45: score.ts_slope_0_45,
        }
    }
}
