use crate::config;
use crate::models::ScoreResult;
use serde::{Deserialize, Serialize};

/// One of the three screening criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    AvgVolume,
    IvRvRatio,
    TermSlope,
}

impl Criterion {
    pub fn label(&self) -> &'static str {
        match self {
            Criterion::AvgVolume => "avgVol",
            Criterion::IvRvRatio => "IV30/RV30",
            Criterion::TermSlope => "TS_slope",
        }
    }
}

/// Calendar-spread setup: liquid, implied vol rich to realized, and a term
/// structure falling off from the front tenor. All bounds are inclusive.
pub fn passes(score: &ScoreResult) -> bool {
    failed_criteria(score).is_empty()
}

/// Criteria `score` misses, in fixed order
pub fn failed_criteria(score: &ScoreResult) -> Vec<Criterion> {
    let mut failed = Vec::new();

    if !(score.avg_volume >= config::MIN_AVG_VOLUME) {
        failed.push(Criterion::AvgVolume);
    }
    if !(score.iv30_rv30 >= config::MIN_IV30_RV30) {
        failed.push(Criterion::IvRvRatio);
    }
    if !(score.ts_slope_0_45 <= config::MAX_TS_SLOPE_0_45) {
        failed.push(Criterion::TermSlope);
    }

    failed
}
