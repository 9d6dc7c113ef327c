//! Public market-data endpoints. No credentials; the options endpoint wants
//! a session cookie plus crumb, fetched once per client.

use super::MarketDataProvider;
use super::http::{HttpFetcher, parse_json};
use crate::config;
use crate::error::{ScreenError, ScreenResult};
use crate::models::{ChainRow, PriceBar, TickerSymbol};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;

const SESSION_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";

pub struct YahooClient {
    fetcher: HttpFetcher,
    chart_url: String,
    options_url: String,
    crumb: Arc<RwLock<Option<String>>>,
}

impl YahooClient {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self::with_base_urls(fetcher, config::YAHOO_CHART_URL, config::YAHOO_OPTIONS_URL)
    }

    pub fn with_base_urls(fetcher: HttpFetcher, chart_url: &str, options_url: &str) -> Self {
        Self {
            fetcher,
            chart_url: chart_url.to_string(),
            options_url: options_url.to_string(),
            crumb: Arc::new(RwLock::new(None)),
        }
    }

    /// Session cookie + crumb (only once per client)
    async fn crumb(&self) -> ScreenResult<String> {
        if let Some(crumb) = self.crumb.read().await.as_ref() {
            return Ok(crumb.clone());
        }

        let mut cached = self.crumb.write().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // The landing page 404s but still sets the cookie the crumb needs
        if let Err(e) = self.fetcher.client().get(SESSION_URL).send().await {
            tracing::debug!(error = %e, "session warmup request failed");
        }
        let crumb = self.fetcher.fetch_text(CRUMB_URL).await?.trim().to_string();
        if crumb.is_empty() || crumb.contains('<') {
            return Err(ScreenError::Request("Could not obtain session crumb".into()));
        }

        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    async fn options(&self, symbol: &TickerSymbol, date: Option<i64>) -> ScreenResult<OptionResult> {
        let crumb = self.crumb().await?;
        let url = format!(
            "{}{}crumb={}",
            config::yahoo_options_url(&self.options_url, symbol.as_str(), date),
            if date.is_some() { "&" } else { "?" },
            urlencoding::encode(&crumb)
        );
        let text = self.fetcher.fetch_json(&url, None).await?;
        let body: OptionsResponse = parse_json(&text, "options")?;
        body.option_chain
            .result
            .into_iter()
            .next()
            .ok_or_else(|| ScreenError::DataUnavailable(format!("No options data for {}", symbol)))
    }

    async fn chart(&self, symbol: &TickerSymbol, period1: i64, period2: i64) -> ScreenResult<ChartResult> {
        let url = config::yahoo_chart_url(&self.chart_url, symbol.as_str(), period1, period2);
        let text = self.fetcher.fetch_json(&url, None).await?;
        let body: ChartResponse = parse_json(&text, "chart")?;
        body.chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| ScreenError::DataUnavailable(format!("No chart data for {}", symbol)))
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn last_price(&self, symbol: &TickerSymbol) -> ScreenResult<Option<f64>> {
        let now = Utc::now();
        let chart = self
            .chart(symbol, (now - Duration::days(7)).timestamp(), now.timestamp())
            .await?;
        Ok(chart
            .meta
            .regular_market_price
            .filter(|p| p.is_finite() && *p > 0.0))
    }

    async fn expirations(&self, symbol: &TickerSymbol) -> ScreenResult<Vec<NaiveDate>> {
        let result = self.options(symbol, None).await?;
        Ok(result
            .expiration_dates
            .iter()
            .filter_map(|&ts| DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()))
            .collect())
    }

    async fn option_chain(
        &self,
        symbol: &TickerSymbol,
        expiry: NaiveDate,
    ) -> ScreenResult<Vec<ChainRow>> {
        let result = self.options(symbol, Some(midnight_utc(expiry))).await?;
        Ok(result
            .options
            .into_iter()
            .next()
            .map(OptionSet::rows)
            .unwrap_or_default())
    }

    async fn history(
        &self,
        symbol: &TickerSymbol,
        start: NaiveDate,
    ) -> ScreenResult<Vec<PriceBar>> {
        let chart = self
            .chart(symbol, midnight_utc(start), Utc::now().timestamp())
            .await?;
        Ok(chart.bars())
    }
}

fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

// -----------------------------------------------
// RESPONSE SHAPES
// -----------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

impl ChartResult {
    /// Zip the column arrays into bars, dropping sessions with any gap
    fn bars(self) -> Vec<PriceBar> {
        let Some(q) = self.indicators.quote.into_iter().next() else {
            return Vec::new();
        };
        let at = |col: &[Option<f64>], i: usize| col.get(i).copied().flatten();

        self.timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                Some(PriceBar {
                    date: DateTime::from_timestamp(ts, 0)?.date_naive(),
                    open: at(&q.open, i)?,
                    high: at(&q.high, i)?,
                    low: at(&q.low, i)?,
                    close: at(&q.close, i)?,
                    volume: at(&q.volume, i)?,
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct OptionsResponse {
    #[serde(rename = "optionChain")]
    option_chain: OptionChainBody,
}

#[derive(Debug, Deserialize)]
struct OptionChainBody {
    #[serde(default)]
    result: Vec<OptionResult>,
}

#[derive(Debug, Deserialize)]
struct OptionResult {
    #[serde(rename = "expirationDates", default)]
    expiration_dates: Vec<i64>,
    #[serde(default)]
    options: Vec<OptionSet>,
}

#[derive(Debug, Deserialize)]
struct OptionSet {
    #[serde(default)]
    calls: Vec<YahooContract>,
    #[serde(default)]
    puts: Vec<YahooContract>,
}

#[derive(Debug, Deserialize)]
struct YahooContract {
    strike: Option<f64>,
    #[serde(rename = "impliedVolatility")]
    implied_volatility: Option<f64>,
}

impl OptionSet {
    /// Calls first, then puts
    fn rows(self) -> Vec<ChainRow> {
        self.calls
            .into_iter()
            .chain(self.puts)
            .filter_map(|c| Some(ChainRow::new(c.strike?, c.implied_volatility)))
            .collect()
    }
}
