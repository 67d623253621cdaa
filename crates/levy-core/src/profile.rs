//! # Tax Profile Model
//!
//! Typed representation of a tenant's tax configuration.
//!
//! ## Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          TaxProfile                                     │
//! │                                                                         │
//! │  country, currency, pricesIncludeTax, rounding                          │
//! │                                                                         │
//! │  rates[] ──────────► TaxRateRule      code, label, rateBps,             │
//! │                                       appliesTo / itemCategoryIn /      │
//! │                                       itemTagIn / excludeItemTagIn,     │
//! │                                       orderTypeIn, zeroRated, exempt    │
//! │                                                                         │
//! │  surcharges[] ─────► SurchargeRule    percentBps of subtotal,           │
//! │                                       applyWhenOrderTypeIn, taxable,    │
//! │                                       taxCode                           │
//! │                                                                         │
//! │  delivery ─────────► DeliveryPolicy   as_line | out_of_scope            │
//! │                                                                         │
//! │  jurisdictions[] ──► JurisdictionRule match{country,state,city,zip}    │
//! │                                       + optional overrides              │
//! │                                                                         │
//! │  b2b ──────────────► B2bConfig        taxExemptWithTaxId,               │
//! │                                       invoiceNumbering (carried only)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A profile is immutable input to a calculation. [`TaxProfile::normalized`]
//! and jurisdiction layering both build new values; nothing here mutates the
//! profile a caller passed in.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::warn;
use ts_rs::TS;

use crate::error::{TaxError, TaxResult};
use crate::money::RoundingMode;
use crate::order::OrderType;
use crate::validation::{validate_currency, validate_rate_bps};

/// The `appliesTo` value that makes a rate rule universal.
pub const APPLIES_TO_ALL: &str = "all";

// =============================================================================
// Tax Rate Rule
// =============================================================================

/// A named tax rate plus the predicate deciding which lines it taxes.
///
/// How the predicate fields combine is decided in
/// [`RuleSelector`](crate::matcher::RuleSelector).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TaxRateRule {
    pub code: String,

    #[serde(default)]
    pub label: String,

    /// 1 bp = 0.01%.
    pub rate_bps: u32,

    /// `"all"` makes the rule a universal fallback. Other values are ignored.
    #[serde(default)]
    pub applies_to: Option<String>,

    #[serde(default)]
    pub item_category_in: Vec<String>,

    /// Any-of.
    #[serde(default)]
    pub item_tag_in: Vec<String>,

    /// Any-of; vetoes a category/tag match.
    #[serde(default)]
    pub exclude_item_tag_in: Vec<String>,

    /// Unset or empty = every order type.
    #[serde(default)]
    pub order_type_in: Option<Vec<OrderType>>,

    /// In the taxable base, taxed at 0%, reported separately.
    #[serde(default)]
    pub zero_rated: bool,

    /// Outside the taxable base entirely.
    #[serde(default)]
    pub exempt: bool,
}

impl TaxRateRule {
    /// True if `appliesTo` is `"all"` (case-insensitive).
    pub fn is_universal(&self) -> bool {
        self.applies_to
            .as_deref()
            .map(|v| v.trim().eq_ignore_ascii_case(APPLIES_TO_ALL))
            .unwrap_or(false)
    }

    /// Order-type restriction check.
    pub fn allows_order_type(&self, order_type: OrderType) -> bool {
        allows(self.order_type_in.as_deref(), order_type)
    }
}

fn allows(filter: Option<&[OrderType]>, order_type: OrderType) -> bool {
    match filter {
        None | Some([]) => true,
        Some(types) => types.contains(&order_type),
    }
}

// =============================================================================
// Surcharge Rule
// =============================================================================

/// A percentage-of-subtotal charge such as a service charge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SurchargeRule {
    pub code: String,

    #[serde(default)]
    pub label: String,

    pub percent_bps: u32,

    /// Unset or empty = every order type.
    #[serde(default)]
    pub apply_when_order_type_in: Option<Vec<OrderType>>,

    #[serde(default)]
    pub taxable: bool,

    /// Rate rule to tax this surcharge with. Falls back to the first
    /// universal rule, then to the first rule.
    #[serde(default)]
    pub tax_code: Option<String>,
}

impl SurchargeRule {
    pub fn applies_to(&self, order_type: OrderType) -> bool {
        allows(self.apply_when_order_type_in.as_deref(), order_type)
    }
}

// =============================================================================
// Delivery Policy
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// A non-zero delivery fee becomes a synthetic order line.
    AsLine,
    /// The delivery fee is not part of this calculation at all.
    #[default]
    OutOfScope,
}

/// How a delivery fee enters the calculation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPolicy {
    #[serde(default)]
    pub mode: DeliveryMode,

    #[serde(default)]
    pub taxable: bool,

    /// Rate rule the synthetic delivery line is taxed with, bypassing rule
    /// matching. Ignored if it names no configured rule.
    #[serde(default)]
    pub tax_code: Option<String>,
}

// =============================================================================
// Jurisdictions
// =============================================================================

/// Address predicate. Unspecified (or blank) fields are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct JurisdictionMatcher {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub zip_prefix: Option<String>,
}

/// A jurisdiction matcher plus the profile fields it overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct JurisdictionRule {
    /// Reported as `jurisdictionApplied`. Derived from the matcher if unset.
    #[serde(default)]
    pub code: Option<String>,

    #[serde(rename = "match")]
    #[serde(default)]
    pub matcher: JurisdictionMatcher,

    /// Replaces `rates` wholesale (no merge).
    #[serde(default)]
    pub rates_override: Option<Vec<TaxRateRule>>,

    /// Replaces `surcharges` wholesale (no merge).
    #[serde(default)]
    pub surcharges_override: Option<Vec<SurchargeRule>>,

    #[serde(default)]
    pub delivery_override: Option<DeliveryPolicy>,

    #[serde(default)]
    pub prices_include_tax_override: Option<bool>,

    #[serde(default)]
    pub rounding_override: Option<RoundingMode>,
}

// =============================================================================
// B2B & Invoice Numbering
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NumberingReset {
    #[default]
    Never,
    Yearly,
    Monthly,
}

/// Invoice numbering policy. Carried with the profile; the engine never
/// allocates numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceNumberingConfig {
    #[serde(default)]
    pub prefix: String,

    #[serde(default = "default_next_number")]
    pub next_number: u64,

    /// Minimum digits, zero-padded.
    #[serde(default = "default_padding")]
    pub padding: u8,

    #[serde(default)]
    pub reset_policy: NumberingReset,
}

fn default_next_number() -> u64 {
    1
}

fn default_padding() -> u8 {
    6
}

impl Default for InvoiceNumberingConfig {
    fn default() -> Self {
        InvoiceNumberingConfig {
            prefix: String::new(),
            next_number: default_next_number(),
            padding: default_padding(),
            reset_policy: NumberingReset::default(),
        }
    }
}

impl InvoiceNumberingConfig {
    /// Renders invoice number `n` under this policy.
    ///
    /// ## Example
    /// ```rust
    /// use levy_core::profile::InvoiceNumberingConfig;
    ///
    /// let cfg = InvoiceNumberingConfig { prefix: "INV-".into(), ..Default::default() };
    /// assert_eq!(cfg.format_number(42), "INV-000042");
    /// ```
    pub fn format_number(&self, n: u64) -> String {
        format!("{}{:0width$}", self.prefix, n, width = self.padding as usize)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct B2bConfig {
    /// A customer tax id (or explicit customer exemption) exempts every line.
    #[serde(default)]
    pub tax_exempt_with_tax_id: bool,

    #[serde(default)]
    pub invoice_numbering: Option<InvoiceNumberingConfig>,
}

// =============================================================================
// Tax Profile
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TaxProfile {
    #[serde(default)]
    pub country: String,

    pub currency: String,

    #[serde(default)]
    pub prices_include_tax: bool,

    #[serde(default)]
    pub rounding: RoundingMode,

    #[serde(default)]
    pub rates: Vec<TaxRateRule>,

    #[serde(default)]
    pub surcharges: Vec<SurchargeRule>,

    #[serde(default)]
    pub delivery: DeliveryPolicy,

    #[serde(default)]
    pub jurisdictions: Vec<JurisdictionRule>,

    #[serde(default)]
    pub b2b: B2bConfig,
}

impl TaxProfile {
    /// Looks up a rate rule by code, ignoring ASCII case.
    pub fn rate(&self, code: &str) -> Option<&TaxRateRule> {
        let code = code.trim();
        self.rates
            .iter()
            .find(|r| r.code.trim().eq_ignore_ascii_case(code))
    }

    /// Rate used to tax a surcharge.
    ///
    /// ```text
    /// taxCode names a rule?  ──yes──► that rule
    ///        │ no
    ///        ▼
    /// first appliesTo "all"  ──yes──► that rule
    ///        │ no
    ///        ▼
    /// first configured rule (or none)
    /// ```
    pub fn surcharge_rate(&self, surcharge: &SurchargeRule) -> Option<&TaxRateRule> {
        surcharge
            .tax_code
            .as_deref()
            .and_then(|code| self.rate(code))
            .or_else(|| self.rates.iter().find(|r| r.is_universal()))
            .or_else(|| self.rates.first())
    }

    /// Returns a canonical copy of this profile.
    ///
    /// ## What Changes
    /// - currency and country: trimmed, upper-case
    /// - rate/surcharge codes and tax codes: trimmed, case kept as configured
    /// - categories and tags: trimmed, lower-case, de-duplicated, blanks dropped
    /// - empty order-type filters: treated as unset
    /// - jurisdiction matcher fields: trimmed, lower-case, blank = unset
    pub fn normalized(&self) -> TaxProfile {
        TaxProfile {
            country: self.country.trim().to_uppercase(),
            currency: self.currency.trim().to_uppercase(),
            prices_include_tax: self.prices_include_tax,
            rounding: self.rounding,
            rates: self.rates.iter().map(normalize_rate).collect(),
            surcharges: self.surcharges.iter().map(normalize_surcharge).collect(),
            delivery: normalize_delivery(&self.delivery),
            jurisdictions: self.jurisdictions.iter().map(normalize_jurisdiction).collect(),
            b2b: self.b2b.clone(),
        }
    }

    /// Checks a profile before it is stored.
    ///
    /// The engine does not call this: a calculation never fails on business
    /// configuration. Profile editors should.
    pub fn validate(&self) -> TaxResult<()> {
        validate_currency(&self.currency).map_err(|e| TaxError::InvalidProfile(e.to_string()))?;

        validate_rates("rates", &self.rates)?;
        validate_surcharges("surcharges", &self.surcharges, &self.rates)?;

        for (i, rule) in self.jurisdictions.iter().enumerate() {
            let rates = rule.rates_override.as_ref().unwrap_or(&self.rates);
            if let Some(overrides) = &rule.rates_override {
                validate_rates(&format!("jurisdictions[{}].ratesOverride", i), overrides)?;
            }
            if let Some(overrides) = &rule.surcharges_override {
                validate_surcharges(
                    &format!("jurisdictions[{}].surchargesOverride", i),
                    overrides,
                    rates,
                )?;
            }
        }

        Ok(())
    }
}

fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Case-folded code, for duplicate checks only.
fn code_key(value: &str) -> String {
    value.trim().to_uppercase()
}

fn trimmed_code(value: &str) -> String {
    value.trim().to_string()
}

fn fold_set(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|v| fold(v))
        .filter(|v| !v.is_empty() && seen.insert(v.clone()))
        .collect()
}

fn fold_opt(value: &Option<String>) -> Option<String> {
    value.as_deref().map(fold).filter(|v| !v.is_empty())
}

fn non_empty_types(types: &Option<Vec<OrderType>>) -> Option<Vec<OrderType>> {
    types.clone().filter(|t| !t.is_empty())
}

fn normalize_rate(rule: &TaxRateRule) -> TaxRateRule {
    TaxRateRule {
        code: trimmed_code(&rule.code),
        label: rule.label.trim().to_string(),
        rate_bps: rule.rate_bps,
        applies_to: fold_opt(&rule.applies_to),
        item_category_in: fold_set(&rule.item_category_in),
        item_tag_in: fold_set(&rule.item_tag_in),
        exclude_item_tag_in: fold_set(&rule.exclude_item_tag_in),
        order_type_in: non_empty_types(&rule.order_type_in),
        zero_rated: rule.zero_rated,
        exempt: rule.exempt,
    }
}

fn normalize_surcharge(rule: &SurchargeRule) -> SurchargeRule {
    SurchargeRule {
        code: trimmed_code(&rule.code),
        label: rule.label.trim().to_string(),
        percent_bps: rule.percent_bps,
        apply_when_order_type_in: non_empty_types(&rule.apply_when_order_type_in),
        taxable: rule.taxable,
        tax_code: rule.tax_code.as_deref().map(trimmed_code).filter(|c| !c.is_empty()),
    }
}

fn normalize_delivery(policy: &DeliveryPolicy) -> DeliveryPolicy {
    DeliveryPolicy {
        mode: policy.mode,
        taxable: policy.taxable,
        tax_code: policy.tax_code.as_deref().map(trimmed_code).filter(|c| !c.is_empty()),
    }
}

fn normalize_jurisdiction(rule: &JurisdictionRule) -> JurisdictionRule {
    JurisdictionRule {
        code: rule
            .code
            .as_deref()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
        matcher: JurisdictionMatcher {
            country: fold_opt(&rule.matcher.country),
            state: fold_opt(&rule.matcher.state),
            city: fold_opt(&rule.matcher.city),
            zip_prefix: fold_opt(&rule.matcher.zip_prefix),
        },
        rates_override: rule
            .rates_override
            .as_ref()
            .map(|rates| rates.iter().map(normalize_rate).collect()),
        surcharges_override: rule
            .surcharges_override
            .as_ref()
            .map(|s| s.iter().map(normalize_surcharge).collect()),
        delivery_override: rule.delivery_override.as_ref().map(normalize_delivery),
        prices_include_tax_override: rule.prices_include_tax_override,
        rounding_override: rule.rounding_override,
    }
}

fn validate_rates(path: &str, rates: &[TaxRateRule]) -> TaxResult<()> {
    let mut codes = HashSet::new();

    for rule in rates {
        let rule_code = code_key(&rule.code);
        if rule_code.is_empty() {
            return Err(TaxError::InvalidProfile(format!("{}: rate code is required", path)));
        }
        if !codes.insert(rule_code.clone()) {
            return Err(TaxError::InvalidProfile(format!(
                "{}: duplicate rate code '{}'",
                path, rule_code
            )));
        }
        validate_rate_bps(&format!("{}[{}].rateBps", path, rule_code), rule.rate_bps)
            .map_err(|e| TaxError::InvalidProfile(e.to_string()))?;
        if rule.zero_rated && rule.exempt {
            return Err(TaxError::InvalidProfile(format!(
                "{}: rate '{}' cannot be both zeroRated and exempt",
                path, rule_code
            )));
        }
    }

    Ok(())
}

fn validate_surcharges(path: &str, surcharges: &[SurchargeRule], rates: &[TaxRateRule]) -> TaxResult<()> {
    let mut codes = HashSet::new();

    for rule in surcharges {
        let rule_code = code_key(&rule.code);
        if rule_code.is_empty() {
            return Err(TaxError::InvalidProfile(format!(
                "{}: surcharge code is required",
                path
            )));
        }
        if !codes.insert(rule_code.clone()) {
            return Err(TaxError::InvalidProfile(format!(
                "{}: duplicate surcharge code '{}'",
                path, rule_code
            )));
        }
        validate_rate_bps(&format!("{}[{}].percentBps", path, rule_code), rule.percent_bps)
            .map_err(|e| TaxError::InvalidProfile(e.to_string()))?;

        // Unknown tax codes fall back at calculation time; flag them only.
        if let Some(tax_code) = rule.tax_code.as_deref() {
            if !rates.iter().any(|r| code_key(&r.code) == code_key(tax_code)) {
                warn!(
                    surcharge = %rule_code,
                    tax_code = %tax_code,
                    "Surcharge names an unknown tax code, fallback rate will be used"
                );
            }
        }
    }

    Ok(())
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryMode::AsLine => write!(f, "as_line"),
            DeliveryMode::OutOfScope => write!(f, "out_of_scope"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
