pub mod http;
pub mod hybrid;
pub mod tradier;
pub mod yahoo;

use crate::config::{ProviderKind, ScreenerConfig};
use crate::error::ScreenResult;
use crate::models::{ChainRow, PriceBar, TickerSymbol};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

pub use http::HttpFetcher;
pub use hybrid::HybridProvider;
pub use tradier::TradierClient;
pub use yahoo::YahooClient;

/// Source of quotes, option chains and daily bars.
///
/// Empty responses come back as `Ok(None)` / `Ok(vec![])`. Deciding that
/// empty means "no score" is the scorer's job.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn last_price(&self, symbol: &TickerSymbol) -> ScreenResult<Option<f64>>;

    async fn expirations(&self, symbol: &TickerSymbol) -> ScreenResult<Vec<NaiveDate>>;

    async fn option_chain(
        &self,
        symbol: &TickerSymbol,
        expiry: NaiveDate,
    ) -> ScreenResult<Vec<ChainRow>>;

    /// Daily bars from `start` up to the latest session
    async fn history(&self, symbol: &TickerSymbol, start: NaiveDate)
    -> ScreenResult<Vec<PriceBar>>;
}

/// Build the provider selected in `config`
pub fn build_provider(config: &ScreenerConfig) -> Result<Arc<dyn MarketDataProvider>> {
    let fetcher = HttpFetcher::new(config.http_timeout)?;

    let tradier = || -> Result<TradierClient> {
        let cfg = config
            .tradier
            .clone()
            .context("TRADIER_TOKEN is required for the Tradier provider")?;
        Ok(TradierClient::new(fetcher.clone(), cfg))
    };

    let provider: Arc<dyn MarketDataProvider> = match config.provider {
        ProviderKind::Tradier => Arc::new(tradier()?),
        ProviderKind::Yahoo => Arc::new(YahooClient::new(fetcher.clone())),
        ProviderKind::Hybrid => Arc::new(HybridProvider::new(
            Arc::new(tradier()?),
            Arc::new(YahooClient::new(fetcher.clone())),
        )),
    };

    tracing::info!(provider = provider.name(), "market data provider ready");
    Ok(provider)
}
