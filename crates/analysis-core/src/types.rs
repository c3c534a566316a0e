use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel reported in place of a P/E ratio when earnings are missing or non-positive.
pub const PE_NOT_AVAILABLE: &str = "N/A (Negative or Missing Earnings)";

/// Currency assumed when the provider does not report one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Qualitative valuation bucket derived from the P/E ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Valuation {
    #[serde(rename = "Potentially Undervalued (Low P/E)")]
    Undervalued,
    #[serde(rename = "Fair Value Range")]
    FairValue,
    #[serde(rename = "Potentially Overvalued (High P/E)")]
    Overvalued,
    #[serde(rename = "High Risk (Unprofitable or No Data)")]
    HighRisk,
}

impl Valuation {
    pub fn label(&self) -> &'static str {
        match self {
            Valuation::Undervalued => "Potentially Undervalued (Low P/E)",
            Valuation::FairValue => "Fair Value Range",
            Valuation::Overvalued => "Potentially Overvalued (High P/E)",
            Valuation::HighRisk => "High Risk (Unprofitable or No Data)",
        }
    }
}

impl std::fmt::Display for Valuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Derived valuation indicators, all pre-formatted to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Indicators {
    /// Formatted ratio, or [`PE_NOT_AVAILABLE`].
    pub pe_ratio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eps: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pb_ratio: Option<String>,
}

/// Valuation analysis for a single ticker.
///
/// Built once per cache miss and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AnalysisResult {
    pub ticker: String,
    pub currency: String,
    pub price: String,
    pub analysis: Valuation,
    pub indicators: Indicators,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valuation_serializes_to_label() {
        for v in [
            Valuation::Undervalued,
            Valuation::FairValue,
            Valuation::Overvalued,
            Valuation::HighRisk,
        ] {
            assert_eq!(serde_json::to_value(v).unwrap(), json!(v.label()));
        }
    }

    #[test]
    fn test_absent_indicators_are_omitted() {
        let indicators = Indicators {
            pe_ratio: PE_NOT_AVAILABLE.to_string(),
            eps: None,
            pb_ratio: None,
        };
        let value = serde_json::to_value(&indicators).unwrap();
        assert_eq!(value, json!({ "pe_ratio": PE_NOT_AVAILABLE }));
    }
}
