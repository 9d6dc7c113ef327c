#![allow(dead_code)]

use async_trait::async_trait;
use calendar_scan::{ChainRow, MarketDataProvider, PriceBar, ScreenError, ScreenResult, TickerSymbol};
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()
}

/// Canned data for one symbol
#[derive(Clone, Default)]
pub struct SymbolData {
    pub spot: Option<f64>,
    pub chains: Vec<(NaiveDate, Vec<ChainRow>)>,
    pub bars: Vec<PriceBar>,
    pub fail_expirations: Option<ScreenError>,
    pub missing_chains: Vec<NaiveDate>,
    pub failing_chains: Vec<(NaiveDate, ScreenError)>,
}

impl SymbolData {
    pub fn new(spot: f64) -> Self {
        Self {
            spot: Some(spot),
            ..Default::default()
        }
    }

    /// Adds an expiry `days` out whose ATM (strike == spot) row carries `iv`
    pub fn with_tenor(mut self, days: i64, iv: f64) -> Self {
        let spot = self.spot.unwrap_or(100.0);
        let rows = vec![
            ChainRow::new(spot - 10.0, Some(iv + 0.05)),
            ChainRow::new(spot, Some(iv)),
            ChainRow::new(spot + 10.0, Some(iv - 0.02)),
        ];
        self.chains.push((as_of() + Duration::days(days), rows));
        self
    }

    pub fn with_bars(mut self, bars: Vec<PriceBar>) -> Self {
        self.bars = bars;
        self
    }
}

/// In-memory provider keyed by symbol
#[derive(Default)]
pub struct StaticProvider {
    pub data: HashMap<String, SymbolData>,
    pub calls: AtomicUsize,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, symbol: &str, data: SymbolData) -> Self {
        self.data.insert(symbol.to_string(), data);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, symbol: &TickerSymbol) -> Option<&SymbolData> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.data.get(symbol.as_str())
    }
}

#[async_trait]
impl MarketDataProvider for StaticProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn last_price(&self, symbol: &TickerSymbol) -> ScreenResult<Option<f64>> {
        Ok(self.lookup(symbol).and_then(|d| d.spot))
    }

    async fn expirations(&self, symbol: &TickerSymbol) -> ScreenResult<Vec<NaiveDate>> {
        let Some(data) = self.lookup(symbol) else {
            return Ok(Vec::new());
        };
        if let Some(err) = &data.fail_expirations {
            return Err(err.clone());
        }
        let mut dates: Vec<NaiveDate> = data.chains.iter().map(|(d, _)| *d).collect();
        dates.extend(data.missing_chains.iter().copied());
        Ok(dates)
    }

    async fn option_chain(&self, symbol: &TickerSymbol, expiry: NaiveDate) -> ScreenResult<Vec<ChainRow>> {
        let data = self.lookup(symbol);
        if let Some((_, err)) = data.and_then(|d| d.failing_chains.iter().find(|(d, _)| *d == expiry)) {
            return Err(err.clone());
        }
        if data.is_some_and(|d| d.missing_chains.contains(&expiry)) {
            return Err(ScreenError::DataUnavailable(format!("no chain for {}", expiry)));
        }
        Ok(data
            .and_then(|d| d.chains.iter().find(|(d, _)| *d == expiry))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    async fn history(&self, symbol: &TickerSymbol, start: NaiveDate) -> ScreenResult<Vec<PriceBar>> {
        Ok(self
            .lookup(symbol)
            .map(|d| d.bars.iter().filter(|b| b.date >= start).copied().collect())
            .unwrap_or_default())
    }
}

/// `n` sessions ending the day before `as_of()`, closes produced by `price`
pub fn bars_with(n: usize, volume: f64, price: impl Fn(usize) -> f64) -> Vec<PriceBar> {
    (0..n)
        .map(|i| {
            let p = price(i);
            PriceBar {
                date: as_of() - Duration::days((n - i) as i64),
                open: p,
                high: p,
                low: p,
                close: p,
                volume,
            }
        })
        .collect()
}

pub fn flat_bars(n: usize, price: f64, volume: f64) -> Vec<PriceBar> {
    bars_with(n, volume, |_| price)
}

/// Closes alternating between 100 and 101
pub fn choppy_bars(n: usize, volume: f64) -> Vec<PriceBar> {
    bars_with(n, volume, |i| if i % 2 == 0 { 100.0 } else { 101.0 })
}
