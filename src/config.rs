use anyhow::{Result, bail};
use std::path::PathBuf;
use std::time::Duration;

// -----------------------------------------------
// PROVIDER ENDPOINTS
// -----------------------------------------------
pub const TRADIER_SANDBOX_URL: &str = "https://sandbox.tradier.com/v1";
pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
pub const YAHOO_OPTIONS_URL: &str = "https://query2.finance.yahoo.com/v7/finance/options";
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

pub fn tradier_quote_url(base: &str, symbol: &str) -> String {
    format!("{}/markets/quotes?symbols={}", base, urlencoding::encode(symbol))
}

pub fn tradier_expirations_url(base: &str, symbol: &str) -> String {
    format!(
        "{}/markets/options/expirations?symbol={}",
        base,
        urlencoding::encode(symbol)
    )
}

pub fn tradier_chain_url(base: &str, symbol: &str, expiry: &str) -> String {
    format!(
        "{}/markets/options/chains?symbol={}&expiration={}&greeks=true",
        base,
        urlencoding::encode(symbol),
        urlencoding::encode(expiry)
    )
}

pub fn tradier_history_url(base: &str, symbol: &str, start: &str) -> String {
    format!(
        "{}/markets/history?symbol={}&interval=daily&session_filter=all&start={}",
        base,
        urlencoding::encode(symbol),
        urlencoding::encode(start)
    )
}

pub fn yahoo_chart_url(base: &str, symbol: &str, period1: i64, period2: i64) -> String {
    format!(
        "{}/{}?interval=1d&period1={}&period2={}",
        base,
        urlencoding::encode(symbol),
        period1,
        period2
    )
}

pub fn yahoo_options_url(base: &str, symbol: &str, date: Option<i64>) -> String {
    match date {
        Some(ts) => format!("{}/{}?date={}", base, urlencoding::encode(symbol), ts),
        None => format!("{}/{}", base, urlencoding::encode(symbol)),
    }
}

pub fn telegram_send_url(base: &str, token: &str) -> String {
    format!("{}/bot{}/sendMessage", base, token)
}

// -----------------------------------------------
// HTTP CLIENT CONFIG
// -----------------------------------------------
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                               AppleWebKit/537.36 (KHTML, like Gecko) \
                               Chrome/131.0.0.0 Safari/537.36";

pub const ACCEPT_LANGUAGES: &[&str] = &["en-US,en;q=0.9", "en-GB,en;q=0.8"];

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

// -----------------------------------------------
// RETRY CONFIG (transient HTTP statuses only)
// -----------------------------------------------
pub const RETRY_BASE_DELAY_MS: u64 = 200;
pub const RETRY_FACTOR: u64 = 2;
pub const RETRY_MAX_DELAY_SECS: u64 = 3;
pub const RETRY_MAX_ATTEMPTS: usize = 3;

// -----------------------------------------------
// SCORING CONSTANTS
// -----------------------------------------------
pub const MIN_EXPIRY_DAYS: i64 = 45;
pub const IV_TENOR_DAYS: f64 = 30.0;
pub const SLOPE_TENOR_DAYS: f64 = 45.0;
pub const MIN_TERM_POINTS: usize = 2;

pub const RV_WINDOW: usize = 30;
pub const PERIODS_PER_YEAR: f64 = 252.0;
pub const VOLUME_WINDOW: usize = 30;
pub const HISTORY_LOOKBACK_DAYS: i64 = 120;

// -----------------------------------------------
// THRESHOLDS (fixed business rule)
// -----------------------------------------------
pub const MIN_AVG_VOLUME: f64 = 1_500_000.0;
pub const MIN_IV30_RV30: f64 = 1.25;
pub const MAX_TS_SLOPE_0_45: f64 = -0.00406;

// -----------------------------------------------
// SCAN DEFAULTS
// -----------------------------------------------
pub const DEFAULT_TICKERS_FILE: &str = "tickers.csv";
pub const DEFAULT_OUTPUT_DIR: &str = ".";
pub const DEFAULT_MAX_CONCURRENT: usize = 1;
pub const MAX_CONCURRENT_LIMIT: usize = 16;

// -----------------------------------------------
// RUNTIME CONFIGURATION
// -----------------------------------------------

/// How expirations are picked for the term-structure fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryPolicy {
    /// Every expiration at least `MIN_EXPIRY_DAYS` out
    #[default]
    AllBeyondMinimum,
    /// Front expirations plus the single nearest one at least
    /// `MIN_EXPIRY_DAYS` out
    NearestBeyondMinimum,
}

impl ExpiryPolicy {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::AllBeyondMinimum),
            "nearest" => Ok(Self::NearestBeyondMinimum),
            other => bail!("Unknown expiry policy '{}'. Use 'all' or 'nearest'", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    Tradier,
    Yahoo,
    /// Tradier options, Yahoo price history
    Hybrid,
}

impl ProviderKind {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "tradier" => Ok(Self::Tradier),
            "yahoo" => Ok(Self::Yahoo),
            "hybrid" => Ok(Self::Hybrid),
            other => bail!(
                "Unknown provider '{}'. Use 'tradier', 'yahoo' or 'hybrid'",
                other
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanMode {
    #[default]
    Batch,
    Single(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradierConfig {
    pub token: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
}

/// Everything a run needs, resolved once at startup
#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    pub mode: ScanMode,
    pub provider: ProviderKind,
    pub expiry_policy: ExpiryPolicy,
    pub tickers_file: PathBuf,
    pub output_dir: PathBuf,
    pub max_concurrent: usize,
    pub http_timeout: Duration,
    pub tradier: Option<TradierConfig>,
    pub telegram: Option<TelegramConfig>,
}

impl ScreenerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mode = match get("SCAN_MODE").as_deref().map(str::trim) {
            None | Some("batch") => ScanMode::Batch,
            Some("single") => ScanMode::Single(
                get("SCAN_SYMBOL").unwrap_or_else(|| "SPY".to_string()),
            ),
            Some(other) => bail!("Invalid mode '{}'. Use 'batch' or 'single'", other),
        };

        let provider = get("SCAN_PROVIDER")
            .map(|v| ProviderKind::parse(&v))
            .transpose()?
            .unwrap_or_default();

        let expiry_policy = get("SCAN_EXPIRY_POLICY")
            .map(|v| ExpiryPolicy::parse(&v))
            .transpose()?
            .unwrap_or_default();

        let max_concurrent = get("SCAN_MAX_CONCURRENT")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .map(|n| n.clamp(1, MAX_CONCURRENT_LIMIT))
            .unwrap_or(DEFAULT_MAX_CONCURRENT);

        let http_timeout = get("SCAN_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(HTTP_TIMEOUT);

        let tradier = get("TRADIER_TOKEN").map(|token| TradierConfig {
            token,
            base_url: get("TRADIER_BASE_URL").unwrap_or_else(|| TRADIER_SANDBOX_URL.to_string()),
        });

        let telegram = match (get("TG_TOKEN"), get("TG_CHAT")) {
            (Some(token), Some(chat_id)) => Some(TelegramConfig { token, chat_id }),
            _ => None,
        };

        Ok(Self {
            mode,
            provider,
            expiry_policy,
            tickers_file: get("SCAN_TICKERS_FILE")
                .unwrap_or_else(|| DEFAULT_TICKERS_FILE.to_string())
                .into(),
            output_dir: get("SCAN_OUTPUT_DIR")
                .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string())
                .into(),
            max_concurrent,
            http_timeout,
            tradier,
            telegram,
        })
    }

    /// Providers backed by Tradier need a token
    pub fn validate(&self) -> Result<()> {
        let needs_tradier = matches!(self.provider, ProviderKind::Tradier | ProviderKind::Hybrid);
        if needs_tradier && self.tradier.is_none() {
            bail!("TRADIER_TOKEN must be set for provider {:?}", self.provider);
        }
        Ok(())
    }
}
