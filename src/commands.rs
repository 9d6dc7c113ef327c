use crate::config::ScreenerConfig;
use crate::models::TickerSymbol;
use crate::notifier::TelegramNotifier;
use crate::provider::{self, HttpFetcher};
use crate::report::{self, ScanOutcome, ScanReport};
use crate::rules;
use crate::scorer::Scorer;

use anyhow::{Context, Result};
use colored::Colorize;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

/// One symbol per line; blanks skipped, duplicates dropped (first wins)
pub fn parse_tickers(text: &str) -> Vec<TickerSymbol> {
    let mut seen = HashSet::new();
    text.lines()
        .filter_map(|line| TickerSymbol::parse(line).ok())
        .filter(|sym| seen.insert(sym.clone()))
        .collect()
}

pub fn load_tickers(path: &Path) -> Result<Vec<TickerSymbol>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ticker list {}", path.display()))?;
    Ok(parse_tickers(&text))
}

/// Score every symbol, at most `max_concurrent` at a time. Outcomes keep
/// input order.
pub async fn run_scan(scorer: &Scorer, symbols: &[TickerSymbol], max_concurrent: usize) -> ScanReport {
    let outcomes: Vec<ScanOutcome> = stream::iter(symbols.iter().cloned())
        .map(|symbol| async move {
            let result = scorer.try_score(&symbol).await;
            let glyph = match &result {
                Ok(score) if rules::passes(score) => "✓".green(),
                Ok(_) => ".".green(),
                Err(e) if e.is_unexpected() => "✗".red(),
                Err(_) => "·".yellow(),
            };
            print!("{}", glyph);
            let _ = std::io::stdout().flush();
            ScanOutcome { symbol, result }
        })
        .buffered(max_concurrent.max(1))
        .collect()
        .await;

    println!();
    ScanReport::new(outcomes)
}

/// Scan command handler
pub struct ScanCommands;

impl ScanCommands {
    /// Score the whole ticker list, write hits and notify
    pub async fn run_batch(config: &ScreenerConfig) -> Result<()> {
        println!("{}", "=".repeat(60).blue());
        println!("{}", "Calendar-Spread Scan".green().bold());
        println!("{}", "=".repeat(60).blue());
        println!();

        let provider = provider::build_provider(config)?;
        let scorer = Scorer::new(provider, config.expiry_policy);

        // Step 1: Load ticker universe
        println!("{}", "Step 1: Loading tickers...".cyan());
        let symbols = load_tickers(&config.tickers_file)?;
        println!("{} Found {} tickers", "✓".green(), symbols.len());
        println!();

        // Step 2: Score
        println!("{}", "Step 2: Scoring tickers...".cyan());
        println!(
            "{} Provider: {}, expiry policy: {:?}, concurrency: {}",
            "ℹ".blue(),
            scorer.provider_name(),
            config.expiry_policy,
            config.max_concurrent
        );

        let start_time = Instant::now();
        let report = run_scan(&scorer, &symbols, config.max_concurrent).await;
        let elapsed = start_time.elapsed();

        println!();
        Self::display_batch_summary(&report, elapsed.as_secs_f64());

        // Step 3: Output
        let date = scorer.as_of();
        match report::write_hits_csv(&config.output_dir, date, &report)? {
            Some(path) => println!("{} Saved hits to {}", "✓".green(), path.display()),
            None => println!("{} No hits, no CSV written", "ℹ".blue()),
        }

        // Step 4: Notify
        let summary = report::format_summary(date, &report);
        Self::notify(config, &summary).await;

        println!();
        println!("{}", "=".repeat(60).blue());
        println!("{}", "Done!".green().bold());
        println!("{}", "=".repeat(60).blue());

        Ok(())
    }

    /// Score one symbol and print its diagnostics
    pub async fn run_single(config: &ScreenerConfig, raw_symbol: &str) -> Result<()> {
        println!("{}", "=".repeat(60).blue());
        println!("{}", "Calendar-Spread Single Symbol".green().bold());
        println!("{}", "=".repeat(60).blue());
        println!();

        let symbol = TickerSymbol::parse(raw_symbol)?;
        let provider = provider::build_provider(config)?;
        let scorer = Scorer::new(provider, config.expiry_policy);

        println!("{} Scoring {} via {}...", "→".cyan(), symbol.as_str().yellow(), scorer.provider_name());
        println!();

        match scorer.try_score(&symbol).await {
            Ok(score) => {
                println!("{} Spot: {:.2}", "✓".green(), score.spot);
                println!("{} Term points: {}", "✓".green(), score.term_points);
                println!("{} IV30: {:.4}  RV30: {:.4}", "✓".green(), score.iv30, score.rv30);
                println!("{} AvgVol: {:.0}", "✓".green(), score.avg_volume);
                println!("{} IV30/RV30: {:.3}", "✓".green(), score.iv30_rv30);
                println!("{} TS_slope_0_45: {:.5}", "✓".green(), score.ts_slope_0_45);

                let missed = rules::failed_criteria(&score);
                if missed.is_empty() {
                    println!("{} {}", "★".green(), "Passes all three filters".green().bold());
                } else {
                    let labels: Vec<&str> = missed.iter().map(|c| c.label()).collect();
                    println!("{} Misses: {}", "✗".red(), labels.join(", "));
                }
            }
            Err(e) => {
                println!("{} No score ({}): {}", "✗".red(), e.kind(), e);
            }
        }
        println!("{}", "=".repeat(60).blue());

        Ok(())
    }

    fn display_batch_summary(report: &ScanReport, elapsed_secs: f64) {
        let total = report.outcomes.len();

        println!("{}", "=".repeat(60).blue());
        println!("{}", "Summary".cyan().bold());
        println!("{}", "=".repeat(60).blue());
        println!("{} Hits: {}", "★".green(), report.hits().len());
        println!("{} Scored: {}", "✓".green(), report.all_scores().len());
        for (kind, count) in report.skip_counts() {
            println!("{} Skipped ({}): {}", "✗".red(), kind, count);
        }
        println!("{} Time taken: {:.2}s", "⏱".yellow(), elapsed_secs);
        if total > 0 {
            println!("{} Avg time per ticker: {:.2}s", "⏱".yellow(), elapsed_secs / total as f64);
        }
        println!();

        let unexpected: Vec<_> = report
            .skipped()
            .into_iter()
            .filter(|(_, e)| e.is_unexpected())
            .collect();
        if !unexpected.is_empty() {
            println!("{}", "Unexpected faults:".red());
            for (symbol, error) in unexpected.iter().take(10) {
                println!(
                    "  {} {} → {}",
                    "✗".red(),
                    symbol.as_str().yellow(),
                    error.to_string().chars().take(80).collect::<String>()
                );
            }
            if unexpected.len() > 10 {
                println!("  ... and {} more", unexpected.len() - 10);
            }
            println!();
        }
    }

    /// Failures here are logged, never fatal for the run
    async fn notify(config: &ScreenerConfig, summary: &str) {
        let Some(tg) = config.telegram.clone() else {
            tracing::info!("no Telegram config, summary not sent");
            println!("{}", summary);
            return;
        };

        let sent = match HttpFetcher::new(config.http_timeout) {
            Ok(fetcher) => TelegramNotifier::new(fetcher, tg).send(summary).await,
            Err(e) => Err(e),
        };

        match sent {
            Ok(()) => println!("{} Notification sent", "✓".green()),
            Err(e) => {
                tracing::error!(error = %e, "notification failed");
                println!("{} Notification failed: {}", "✗".red(), e);
            }
        }
    }
}
