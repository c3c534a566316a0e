use analysis_core::{Indicators, Valuation, PE_NOT_AVAILABLE};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

/// Below this P/E a stock is flagged as potentially undervalued.
const LOW_PE_THRESHOLD: Decimal = dec!(15);
/// Above this P/E a stock is flagged as potentially overvalued.
const HIGH_PE_THRESHOLD: Decimal = dec!(30);

/// Price/earnings and price/book valuation in fixed-precision decimal arithmetic.
///
/// All ratios are computed on `Decimal` (28 significant digits) and only
/// rounded when formatted for output, half away from zero, to two places.
#[derive(Debug, Default, Clone, Copy)]
pub struct FundamentalAnalysisEngine;

/// Outcome of a valuation pass: the bucket plus the formatted indicators.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationSummary {
    pub analysis: Valuation,
    pub indicators: Indicators,
}

impl FundamentalAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    /// P/E is only meaningful for positive earnings.
    fn calculate_pe_ratio(&self, price: Decimal, eps: Decimal) -> Option<Decimal> {
        if eps > Decimal::ZERO {
            price.checked_div(eps)
        } else {
            None
        }
    }

    pub fn classify_pe(&self, pe_ratio: Decimal) -> Valuation {
        if pe_ratio < LOW_PE_THRESHOLD {
            Valuation::Undervalued
        } else if pe_ratio > HIGH_PE_THRESHOLD {
            Valuation::Overvalued
        } else {
            Valuation::FairValue
        }
    }

    /// Value a stock from its price, trailing EPS and price-to-book.
    ///
    /// Missing, zero or negative EPS yields [`Valuation::HighRisk`] with the
    /// P/E sentinel and no `eps` indicator. Price-to-book is reported whenever
    /// present, regardless of sign.
    pub fn evaluate(
        &self,
        price: Decimal,
        eps: Option<Decimal>,
        price_to_book: Option<Decimal>,
    ) -> ValuationSummary {
        let pe = eps.and_then(|e| self.calculate_pe_ratio(price, e).map(|pe| (e, pe)));

        let (analysis, pe_ratio, eps) = match pe {
            Some((eps, pe)) => (self.classify_pe(pe), format_decimal(pe), Some(format_decimal(eps))),
            None => (Valuation::HighRisk, PE_NOT_AVAILABLE.to_string(), None),
        };

        ValuationSummary {
            analysis,
            indicators: Indicators {
                pe_ratio,
                eps,
                pb_ratio: price_to_book.map(format_decimal),
            },
        }
    }
}

/// Convert an upstream float into a decimal. Non-finite values have no decimal form.
pub fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value)
}

/// Format with exactly two fractional digits, rounding half away from zero.
pub fn format_decimal(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded.to_string()
}
