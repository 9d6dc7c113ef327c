use super::MarketDataProvider;
use crate::error::ScreenResult;
use crate::models::{ChainRow, PriceBar, TickerSymbol};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

/// Quotes and options from one source, price history from another.
pub struct HybridProvider {
    options: Arc<dyn MarketDataProvider>,
    history: Arc<dyn MarketDataProvider>,
}

impl HybridProvider {
    pub fn new(
        options: Arc<dyn MarketDataProvider>,
        history: Arc<dyn MarketDataProvider>,
    ) -> Self {
        Self { options, history }
    }
}

#[async_trait]
impl MarketDataProvider for HybridProvider {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    async fn last_price(&self, symbol: &TickerSymbol) -> ScreenResult<Option<f64>> {
        self.options.last_price(symbol).await
    }

    async fn expirations(&self, symbol: &TickerSymbol) -> ScreenResult<Vec<NaiveDate>> {
        self.options.expirations(symbol).await
    }

    async fn option_chain(
        &self,
        symbol: &TickerSymbol,
        expiry: NaiveDate,
    ) -> ScreenResult<Vec<ChainRow>> {
        self.options.option_chain(symbol, expiry).await
    }

    async fn history(
        &self,
        symbol: &TickerSymbol,
        start: NaiveDate,
    ) -> ScreenResult<Vec<PriceBar>> {
        self.history.history(symbol, start).await
    }
}
