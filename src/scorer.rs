use crate::config::{self, ExpiryPolicy};
use crate::error::{ScreenError, ScreenResult};
use crate::models::{ScoreResult, TermStructurePoint, TickerSymbol};
use crate::processor::{self, TermStructure};
use crate::provider::MarketDataProvider;
use chrono::{Duration, Local, NaiveDate};
use std::sync::Arc;

/// Turns provider responses for one symbol into a `ScoreResult`.
///
/// Holds no per-symbol state; one instance serves a whole run.
#[derive(Clone)]
pub struct Scorer {
    provider: Arc<dyn MarketDataProvider>,
    policy: ExpiryPolicy,
    as_of: NaiveDate,
}

impl Scorer {
    /// Scorer dated today (local time)
    pub fn new(provider: Arc<dyn MarketDataProvider>, policy: ExpiryPolicy) -> Self {
        Self::with_as_of(provider, policy, Local::now().date_naive())
    }

    pub fn with_as_of(
        provider: Arc<dyn MarketDataProvider>,
        policy: ExpiryPolicy,
        as_of: NaiveDate,
    ) -> Self {
        Self { provider, policy, as_of }
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Score `raw_symbol`, or `None` when data is missing or unusable
    pub async fn score(&self, raw_symbol: &str) -> Option<ScoreResult> {
        match TickerSymbol::parse(raw_symbol) {
            Ok(symbol) => self.try_score(&symbol).await.ok(),
            Err(_) => None,
        }
    }

    /// Same as `score`, keeping the reason a symbol was skipped
    pub async fn try_score(&self, symbol: &TickerSymbol) -> ScreenResult<ScoreResult> {
        let result = self.evaluate(symbol).await;
        match &result {
            Ok(score) => tracing::debug!(
                %symbol,
                avg_volume = score.avg_volume,
                iv30_rv30 = score.iv30_rv30,
                ts_slope_0_45 = score.ts_slope_0_45,
                "scored"
            ),
            Err(e) if e.is_unexpected() => {
                tracing::warn!(%symbol, kind = e.kind(), error = %e, "skipped")
            }
            Err(e) => tracing::debug!(%symbol, kind = e.kind(), error = %e, "skipped"),
        }
        result
    }

    async fn evaluate(&self, symbol: &TickerSymbol) -> ScreenResult<ScoreResult> {
        let spot = self
            .provider
            .last_price(symbol)
            .await?
            .ok_or_else(|| ScreenError::DataUnavailable(format!("No last price for {}", symbol)))?;

        let term = self.term_structure(symbol, spot).await?;
        let iv30 = term.interpolate(config::IV_TENOR_DAYS);
        let ts_slope_0_45 = term.slope_to_45();

        let start = self.as_of - Duration::days(config::HISTORY_LOOKBACK_DAYS);
        let mut bars = self.provider.history(symbol, start).await?;
        bars.sort_by_key(|b| b.date);

        if bars.len() < config::RV_WINDOW + 1 {
            return Err(ScreenError::DataUnavailable(format!(
                "{} sessions of history for {}, need {}",
                bars.len(),
                symbol,
                config::RV_WINDOW + 1
            )));
        }

        let rv30 = processor::yang_zhang(&bars, config::RV_WINDOW, config::PERIODS_PER_YEAR);
        if rv30.is_nan() || rv30 == 0.0 {
            return Err(ScreenError::ComputationInvalid(format!(
                "Realized volatility is {} for {}",
                rv30, symbol
            )));
        }

        let avg_volume = processor::average_volume(&bars, config::VOLUME_WINDOW).ok_or_else(|| {
            ScreenError::DataUnavailable(format!("Not enough volume history for {}", symbol))
        })?;

        let score = ScoreResult {
            avg_volume,
            iv30_rv30: iv30 / rv30,
            ts_slope_0_45,
            iv30,
            rv30,
            spot,
            term_points: term.points().len(),
        };

        if !(score.avg_volume.is_finite()
            && score.iv30_rv30.is_finite()
            && score.ts_slope_0_45.is_finite())
        {
            return Err(ScreenError::ComputationInvalid(format!(
                "Non-finite signal for {}",
                symbol
            )));
        }

        Ok(score)
    }

    /// ATM implied volatility for each qualifying expiration
    async fn term_structure(&self, symbol: &TickerSymbol, spot: f64) -> ScreenResult<TermStructure> {
        let expirations = self.provider.expirations(symbol).await?;
        let selected = processor::select_expirations(&expirations, self.as_of, self.policy);
        if selected.is_empty() {
            return Err(ScreenError::DataUnavailable(format!(
                "No expirations at least {} days out for {}",
                config::MIN_EXPIRY_DAYS,
                symbol
            )));
        }

        let mut points = Vec::with_capacity(selected.len());
        for (expiry, dte) in selected {
            // A missing or failed chain only loses that tenor; parse faults end the symbol
            let chain = match self.provider.option_chain(symbol, expiry).await {
                Ok(chain) => chain,
                Err(e @ (ScreenError::DataUnavailable(_) | ScreenError::Request(_))) => {
                    tracing::trace!(%symbol, %expiry, kind = e.kind(), error = %e, "chain skipped");
                    continue;
                }
                Err(e) => return Err(e),
            };
            match processor::find_atm_iv(&chain, spot) {
                Some(iv) => points.push(TermStructurePoint::new(dte as f64, iv)),
                None => tracing::trace!(%symbol, %expiry, rows = chain.len(), "no ATM iv"),
            }
        }

        let found = points.len();
        TermStructure::new(points).ok_or_else(|| {
            ScreenError::ComputationInvalid(format!(
                "{} term-structure point(s) for {}, need {}",
                found,
                symbol,
                config::MIN_TERM_POINTS
            ))
        })
    }
}
