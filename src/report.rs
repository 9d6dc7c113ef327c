use crate::error::ScreenError;
use crate::models::{HitRecord, ScoreResult, TickerSymbol};
use crate::rules;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Result of scoring one symbol in a run
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub symbol: TickerSymbol,
    pub result: Result<ScoreResult, ScreenError>,
}

impl ScanOutcome {
    pub fn passed(&self) -> bool {
        self.result.as_ref().is_ok_and(rules::passes)
    }
}

/// Every outcome of a run, in input order
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub outcomes: Vec<ScanOutcome>,
}

impl ScanReport {
    pub fn new(outcomes: Vec<ScanOutcome>) -> Self {
        Self { outcomes }
    }

    /// Scored symbols that pass the threshold rule
    pub fn hits(&self) -> Vec<(&TickerSymbol, &ScoreResult)> {
        self.all_scores()
            .into_iter()
            .filter(|(_, score)| rules::passes(score))
            .collect()
    }

    /// Every symbol that produced a score, passing or not
    pub fn all_scores(&self) -> Vec<(&TickerSymbol, &ScoreResult)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|s| (&o.symbol, s)))
            .collect()
    }

    pub fn skipped(&self) -> Vec<(&TickerSymbol, &ScreenError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.symbol, e)))
            .collect()
    }

    /// Skipped symbols per error kind
    pub fn skip_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for (_, err) in self.skipped() {
            *counts.entry(err.kind()).or_insert(0) += 1;
        }
        counts
    }
}

pub fn hits_file_name(date: NaiveDate) -> String {
    format!("list{}.csv", date.format("%Y%m%d"))
}

/// Write the passing symbols as CSV. Nothing is written when there are
/// no hits.
pub fn write_hits_csv(dir: &Path, date: NaiveDate, report: &ScanReport) -> Result<Option<PathBuf>> {
    let hits = report.hits();
    if hits.is_empty() {
        return Ok(None);
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output dir {}", dir.display()))?;
    let path = dir.join(hits_file_name(date));

    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    for (symbol, score) in hits {
        writer.serialize(HitRecord::new(symbol, score))?;
    }
    writer.flush()?;

    Ok(Some(path))
}

fn score_line(symbol: &TickerSymbol, score: &ScoreResult) -> String {
    format!(
        "{:<6} | avgVol={:.1} M | IV30/RV30={:.2} | TS_slope={:.5}",
        symbol.as_str(),
        score.avg_volume / 1_000_000.0,
        score.iv30_rv30,
        score.ts_slope_0_45
    )
}

/// Notification text for a run.
///
/// Lists the hits; when there are none, falls back to the scorecard of
/// every evaluated symbol with the criteria it missed.
pub fn format_summary(date: NaiveDate, report: &ScanReport) -> String {
    let day = date.format("%Y-%m-%d");
    let hits = report.hits();

    if !hits.is_empty() {
        let lines: Vec<String> = hits.iter().map(|(sym, score)| score_line(sym, score)).collect();
        return format!(
            "📆 {} Calendar-spread scan ({} hits)\n\n{}",
            day,
            hits.len(),
            lines.join("\n")
        );
    }

    let mut msg = format!("📆 {}: no tickers met all three filters.", day);

    let scores = report.all_scores();
    if !scores.is_empty() {
        msg.push_str("\n\nAll scores:\n");
        let lines: Vec<String> = scores
            .iter()
            .map(|(sym, score)| {
                let missed: Vec<&str> = rules::failed_criteria(score)
                    .iter()
                    .map(|c| c.label())
                    .collect();
                format!("{} | miss: {}", score_line(sym, score), missed.join(", "))
            })
            .collect();
        msg.push_str(&lines.join("\n"));
    }

    msg
}
