use thiserror::Error;

/// Why a symbol produced no score.
///
/// Every variant is recovered per symbol: the scan records it and moves on.
/// `Parse` is kept apart from `DataUnavailable` so a malformed provider
/// response never passes for an ordinary gap in the data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScreenError {
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Computation invalid: {0}")]
    ComputationInvalid(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type ScreenResult<T> = Result<T, ScreenError>;

impl ScreenError {
    /// Stable label used in logs and the scorecard.
    pub fn kind(&self) -> &'static str {
        match self {
            ScreenError::InvalidSymbol(_) => "invalid_symbol",
            ScreenError::DataUnavailable(_) => "data_unavailable",
            ScreenError::ComputationInvalid(_) => "computation_invalid",
            ScreenError::Request(_) => "request",
            ScreenError::Parse(_) => "parse",
        }
    }

    /// True for faults that point at a bug or an API change rather than a
    /// symbol that simply lacks data.
    pub fn is_unexpected(&self) -> bool {
        matches!(self, ScreenError::Parse(_))
    }
}

impl From<reqwest::Error> for ScreenError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ScreenError::Parse(err.to_string())
        } else {
            ScreenError::Request(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ScreenError {
    fn from(err: serde_json::Error) -> Self {
        ScreenError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(ScreenError::DataUnavailable("x".into()).kind(), "data_unavailable");
        assert_eq!(ScreenError::ComputationInvalid("x".into()).kind(), "computation_invalid");
        assert_eq!(ScreenError::Parse("x".into()).kind(), "parse");
    }

    #[test]
    fn test_json_error_is_parse_fault() {
        let err: ScreenError = serde_json::from_str::<Vec<f64>>("{oops").unwrap_err().into();
        assert!(err.is_unexpected());
        assert_eq!(err.kind(), "parse");
    }
}
