//! # Tax Snapshot
//!
//! The immutable, auditable output of one calculation.
//!
//! ## Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          TaxSnapshot                                    │
//! │                                                                         │
//! │  currency, orderType, pricesIncludeTax, rounding                        │
//! │                                                                         │
//! │  summaryByRate[]      code, label, rateBps, baseCents, taxCents         │
//! │                       (line tax + taxable surcharge tax, sorted by code)│
//! │  summaryZeroRated[]?  code, baseCents                                   │
//! │  summaryExempt[]?     code, baseCents   (EXEMPT, NO_RULE, rule codes)   │
//! │  surcharges[]?        code, label, percentBps, baseCents, taxCents      │
//! │  lines[]              per-line classification and tax                   │
//! │  totals               subTotalCents, surchargeCents, taxCents,          │
//! │                       grandTotalCents                                   │
//! │  customer?            echoed                                            │
//! │  jurisdictionApplied  code or null                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Empty optional arrays are omitted from JSON. Every collection is sorted
//! by code, so identical inputs serialize to identical bytes and the
//! snapshot can be stored verbatim.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::RoundingMode;
use crate::order::{Customer, OrderType};

/// Exempt bucket for lines flagged exempt (or B2B-exempt customers).
pub const EXEMPT_CODE: &str = "EXEMPT";

/// Exempt-style bucket for lines no rule applied to.
pub const NO_RULE_CODE: &str = "NO_RULE";

// =============================================================================
// Summary Rows
// =============================================================================

/// Aggregated tax for one rate code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RateSummary {
    pub code: String,
    pub label: String,
    pub rate_bps: u32,
    /// Net taxable base (inclusive pricing: gross minus embedded tax).
    pub base_cents: i64,
    pub tax_cents: i64,
}

/// Aggregated base for one zero-rated or exempt classification code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BucketSummary {
    pub code: String,
    pub base_cents: i64,
}

/// One applied surcharge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SurchargeLine {
    pub code: String,
    pub label: String,
    pub percent_bps: u32,
    /// Surcharge amount: `round(subTotal × percentBps / 10000)`.
    pub base_cents: i64,
    pub tax_cents: i64,
    /// Rate the surcharge was taxed with, if taxable and a rate existed.
    #[serde(default)]
    pub rate_code: Option<String>,
}

// =============================================================================
// Line Breakdown
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LineClassification {
    Taxed,
    ZeroRated,
    Exempt,
    NoRule,
    /// Effective total of 0: counted in no bucket.
    ZeroValue,
}

/// How one working line was treated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineBreakdown {
    pub line_id: String,
    /// Effective line total (gross).
    pub base_cents: i64,
    pub tax_cents: i64,
    pub classification: LineClassification,
    /// Bucket code for zero-rated / exempt / no-rule lines.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Rate codes the line was taxed under (in profile order).
    #[serde(default)]
    pub rate_codes: Vec<String>,
}

// =============================================================================
// Totals & Snapshot
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub sub_total_cents: i64,
    /// Sum of surcharge amounts. Informational; not part of the grand total.
    pub surcharge_cents: i64,
    pub tax_cents: i64,
    pub grand_total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TaxSnapshot {
    pub currency: String,
    pub order_type: OrderType,
    pub prices_include_tax: bool,
    pub rounding: RoundingMode,

    pub summary_by_rate: Vec<RateSummary>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_zero_rated: Option<Vec<BucketSummary>>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_exempt: Option<Vec<BucketSummary>>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surcharges: Option<Vec<SurchargeLine>>,

    pub lines: Vec<LineBreakdown>,

    pub totals: Totals,

    #[serde(default)]
    pub customer: Option<Customer>,

    /// Always serialized, `null` when no jurisdiction rule was selected.
    pub jurisdiction_applied: Option<String>,
}

impl TaxSnapshot {
    /// Row of `summaryByRate` for a code.
    pub fn rate(&self, code: &str) -> Option<&RateSummary> {
        self.summary_by_rate.iter().find(|r| r.code == code)
    }

    /// Exempt base recorded under `code` (0 if absent).
    pub fn exempt_base(&self, code: &str) -> i64 {
        bucket_base(self.summary_exempt.as_deref(), code)
    }

    /// Zero-rated base recorded under `code` (0 if absent).
    pub fn zero_rated_base(&self, code: &str) -> i64 {
        bucket_base(self.summary_zero_rated.as_deref(), code)
    }

    pub fn line(&self, line_id: &str) -> Option<&LineBreakdown> {
        self.lines.iter().find(|l| l.line_id == line_id)
    }

    pub fn surcharge(&self, code: &str) -> Option<&SurchargeLine> {
        self.surcharges.as_deref()?.iter().find(|s| s.code == code)
    }
}

fn bucket_base(buckets: Option<&[BucketSummary]>, code: &str) -> i64 {
    buckets
        .unwrap_or_default()
        .iter()
        .filter(|b| b.code == code)
        .map(|b| b.base_cents)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> TaxSnapshot {
        TaxSnapshot {
            currency: "USD".into(),
            order_type: OrderType::DineIn,
            prices_include_tax: false,
            rounding: RoundingMode::HalfUp,
            summary_by_rate: vec![],
            summary_zero_rated: None,
            summary_exempt: Some(vec![BucketSummary {
                code: EXEMPT_CODE.into(),
                base_cents: 500,
            }]),
            surcharges: None,
            lines: vec![],
            totals: Totals::default(),
            customer: None,
            jurisdiction_applied: None,
        }
    }

    #[test]
    fn test_json_shape() {
        let value = serde_json::to_value(snapshot()).unwrap();
        assert_eq!(value["orderType"], json!("dine-in"));
        assert_eq!(value["jurisdictionApplied"], json!(null));
        assert!(value.get("summaryZeroRated").is_none());
        assert!(value.get("surcharges").is_none());
        assert_eq!(value["summaryExempt"][0]["baseCents"], json!(500));
        assert_eq!(value["totals"]["subTotalCents"], json!(0));
        assert_eq!(value["totals"]["grandTotalCents"], json!(0));
    }

    #[test]
    fn test_bucket_lookups() {
        let s = snapshot();
        assert_eq!(s.exempt_base(EXEMPT_CODE), 500);
        assert_eq!(s.exempt_base(NO_RULE_CODE), 0);
        assert_eq!(s.zero_rated_base("ZR"), 0);
        assert!(s.surcharge("SVC").is_none());
    }
}
