use super::MarketDataProvider;
use super::http::{HttpFetcher, parse_json};
use crate::config::{self, TradierConfig};
use crate::error::{ScreenError, ScreenResult};
use crate::models::{ChainRow, PriceBar, TickerSymbol};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

// -----------------------------------------------
// BROKERAGE REST CLIENT
// -----------------------------------------------
pub struct TradierClient {
    fetcher: HttpFetcher,
    config: TradierConfig,
}

impl TradierClient {
    pub fn new(fetcher: HttpFetcher, config: TradierConfig) -> Self {
        Self { fetcher, config }
    }

    async fn get(&self, url: &str) -> ScreenResult<String> {
        self.fetcher.fetch_json(url, Some(&self.config.token)).await
    }
}

#[async_trait]
impl MarketDataProvider for TradierClient {
    fn name(&self) -> &'static str {
        "tradier"
    }

    async fn last_price(&self, symbol: &TickerSymbol) -> ScreenResult<Option<f64>> {
        let url = config::tradier_quote_url(&self.config.base_url, symbol.as_str());
        let text = self.get(&url).await?;
        let body: QuotesResponse = parse_json(&text, "quote")?;
        Ok(body.last_price())
    }

    async fn expirations(&self, symbol: &TickerSymbol) -> ScreenResult<Vec<NaiveDate>> {
        let url = config::tradier_expirations_url(&self.config.base_url, symbol.as_str());
        let text = self.get(&url).await?;
        let body: ExpirationsResponse = parse_json(&text, "expirations")?;
        body.dates()
    }

    async fn option_chain(
        &self,
        symbol: &TickerSymbol,
        expiry: NaiveDate,
    ) -> ScreenResult<Vec<ChainRow>> {
        let expiry = expiry.format(DATE_FORMAT).to_string();
        let url = config::tradier_chain_url(&self.config.base_url, symbol.as_str(), &expiry);
        let text = self.get(&url).await?;
        let body: ChainResponse = parse_json(&text, "option chain")?;
        Ok(body.rows())
    }

    async fn history(
        &self,
        symbol: &TickerSymbol,
        start: NaiveDate,
    ) -> ScreenResult<Vec<PriceBar>> {
        let start = start.format(DATE_FORMAT).to_string();
        let url = config::tradier_history_url(&self.config.base_url, symbol.as_str(), &start);
        let text = self.get(&url).await?;
        let body: HistoryResponse = parse_json(&text, "history")?;
        body.bars()
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_date(s: &str) -> ScreenResult<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| ScreenError::Parse(format!("Bad date '{}': {}", s, e)))
}

// -----------------------------------------------
// RESPONSE SHAPES
// -----------------------------------------------
// Tradier returns `null` for an empty section and collapses single-element
// lists to a bare object.

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuotesResponse {
    quotes: Option<QuotesBody>,
}

#[derive(Debug, Deserialize)]
struct QuotesBody {
    #[serde(default)]
    quote: Option<OneOrMany<Quote>>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    last: Option<f64>,
}

impl QuotesResponse {
    fn last_price(self) -> Option<f64> {
        self.quotes
            .and_then(|q| q.quote)
            .and_then(|q| q.into_vec().into_iter().next())
            .and_then(|q| q.last)
            .filter(|p| p.is_finite() && *p > 0.0)
    }
}

#[derive(Debug, Deserialize)]
struct ExpirationsResponse {
    expirations: Option<ExpirationsBody>,
}

#[derive(Debug, Deserialize)]
struct ExpirationsBody {
    #[serde(default)]
    date: Option<OneOrMany<String>>,
}

impl ExpirationsResponse {
    fn dates(self) -> ScreenResult<Vec<NaiveDate>> {
        self.expirations
            .and_then(|e| e.date)
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .iter()
            .map(|s| parse_date(s))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ChainResponse {
    options: Option<ChainBody>,
}

#[derive(Debug, Deserialize)]
struct ChainBody {
    #[serde(default)]
    option: Option<OneOrMany<OptionContract>>,
}

#[derive(Debug, Deserialize)]
struct OptionContract {
    strike: f64,
    #[serde(default)]
    greeks: Option<Greeks>,
}

#[derive(Debug, Deserialize)]
struct Greeks {
    mid_iv: Option<f64>,
}

impl ChainResponse {
    fn rows(self) -> Vec<ChainRow> {
        self.options
            .and_then(|o| o.option)
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .map(|c| ChainRow::new(c.strike, c.greeks.and_then(|g| g.mid_iv)))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    history: Option<HistoryBody>,
}

#[derive(Debug, Deserialize)]
struct HistoryBody {
    #[serde(default)]
    day: Option<OneOrMany<HistoryDay>>,
}

#[derive(Debug, Deserialize)]
struct HistoryDay {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl HistoryResponse {
    fn bars(self) -> ScreenResult<Vec<PriceBar>> {
        self.history
            .and_then(|h| h.day)
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .map(|d| {
                Ok(PriceBar {
                    date: parse_date(&d.date)?,
                    open: d.open,
                    high: d.high,
                    low: d.low,
                    close: d.close,
                    volume: d.volume,
                })
            })
            .collect()
    }
}
