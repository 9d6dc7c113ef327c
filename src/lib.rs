pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod notifier;
pub mod processor;
pub mod provider;
pub mod report;
pub mod rules;
pub mod scorer;

// Re-exports for convenience
pub use config::{ExpiryPolicy, ProviderKind, ScreenerConfig};
pub use error::{ScreenError, ScreenResult};
pub use models::{ChainRow, PriceBar, ScoreResult, TermStructurePoint, TickerSymbol};
pub use provider::MarketDataProvider;
pub use rules::passes;
pub use scorer::Scorer;
