use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The quote provider has no record for this ticker.
    #[error("Stock ticker '{0}' not found.")]
    NotFound(String),

    /// The provider answered, but without a usable current price.
    #[error("Insufficient financial data for {0}")]
    InsufficientData(String),

    #[error("API error: {0}")]
    ApiError(String),
}

impl AnalysisError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AnalysisError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_ticker() {
        assert_eq!(
            AnalysisError::NotFound("ZZZZ".to_string()).to_string(),
            "Stock ticker 'ZZZZ' not found."
        );
        assert_eq!(
            AnalysisError::InsufficientData("AAPL".to_string()).to_string(),
            "Insufficient financial data for AAPL"
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(AnalysisError::NotFound("X".to_string()).is_not_found());
        assert!(!AnalysisError::ApiError("boom".to_string()).is_not_found());
    }
}
