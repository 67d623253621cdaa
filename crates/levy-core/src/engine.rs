//! # Tax Engine
//!
//! Turns a draft order and a tax profile into a [`TaxSnapshot`].
//!
//! ## Calculation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        calculate(draft, profile)                        │
//! │                                                                         │
//! │  1. validate draft ───────────────── contract violation → TaxError      │
//! │  2. normalize profile, check currency                                   │
//! │  3. resolve jurisdiction ─────────── effective profile + code           │
//! │  4. working lines = draft lines (+ synthetic delivery line)             │
//! │  5. subtotal = Σ line totals        (before any classification)         │
//! │  6. per line with total > 0:                                            │
//! │       exempt flag / B2B ──► EXEMPT bucket                               │
//! │       no rule           ──► NO_RULE bucket (or reject)                  │
//! │       zero-rated rule   ──► zero-rated bucket                           │
//! │       exempt rule       ──► exempt bucket (rule code)                   │
//! │       otherwise         ──► tax under EVERY effective rule              │
//! │  7. surcharges: % of subtotal, taxed with their own rate, folded into   │
//! │     summaryByRate and also listed standalone                            │
//! │  8. totals: tax = Σ summaryByRate.tax                                   │
//! │            grand = subtotal            (inclusive)                      │
//! │            grand = subtotal + tax      (exclusive)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine is pure: no I/O, no clock, no randomness, no shared state.
//! Concurrent calls need no coordination.

use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::error::{TaxError, TaxResult, ValidationError};
use crate::jurisdiction::resolve;
use crate::matcher::effective_rules;
use crate::money::{line_total, Money};
use crate::options::{EngineOptions, UnmatchedLinePolicy};
use crate::order::{DraftLine, DraftOrder, OrderType};
use crate::profile::{DeliveryMode, TaxProfile, TaxRateRule};
use crate::snapshot::{
    BucketSummary, LineBreakdown, LineClassification, RateSummary, SurchargeLine, TaxSnapshot,
    Totals, EXEMPT_CODE, NO_RULE_CODE,
};
use crate::validation::validate_draft;

/// Id, category and tag of the synthetic delivery line.
pub const DELIVERY_LINE_ID: &str = "delivery_fee";
pub const DELIVERY_CATEGORY: &str = "delivery";
pub const DELIVERY_TAG: &str = "delivery_fee";

// =============================================================================
// Entry Points
// =============================================================================

/// Calculates a snapshot with default [`EngineOptions`].
///
/// ## Example
/// ```rust
/// use levy_core::{calculate, DraftLine, DraftOrder, OrderType, TaxProfile, TaxRateRule};
///
/// let profile = TaxProfile {
///     currency: "USD".into(),
///     rates: vec![TaxRateRule {
///         code: "VAT".into(),
///         label: "VAT".into(),
///         rate_bps: 1200,
///         applies_to: Some("all".into()),
///         ..Default::default()
///     }],
///     ..Default::default()
/// };
/// let draft = DraftOrder {
///     currency: "USD".into(),
///     order_type: OrderType::DineIn,
///     lines: vec![DraftLine {
///         id: "a".into(),
///         quantity: 2,
///         unit_price_cents: 1000,
///         ..Default::default()
///     }],
///     customer: None,
///     delivery_fee_cents: 0,
///     delivery_address_info: None,
/// };
///
/// let snapshot = calculate(&draft, &profile).unwrap();
/// assert_eq!(snapshot.totals.tax_cents, 240);
/// assert_eq!(snapshot.totals.grand_total_cents, 2240);
/// ```
pub fn calculate(draft: &DraftOrder, profile: &TaxProfile) -> TaxResult<TaxSnapshot> {
    calculate_with(draft, profile, &EngineOptions::default())
}

/// Calculates a snapshot.
pub fn calculate_with(
    draft: &DraftOrder,
    profile: &TaxProfile,
    options: &EngineOptions,
) -> TaxResult<TaxSnapshot> {
    validate_draft(draft, options)?;

    let base = profile.normalized();
    let currency = draft.currency.trim().to_uppercase();
    if currency != base.currency {
        return Err(TaxError::CurrencyMismatch {
            order: currency,
            profile: base.currency,
        });
    }

    let order_type = draft.order_type;
    let resolution = resolve(&base, draft.delivery_address_info.as_ref());
    let effective = resolution.profile.as_ref();

    let lines = working_lines(draft, effective)?;
    let sub_total = checked_sum(lines.iter().map(|l| l.total), "subtotal")?;

    let b2b_exempt = effective.b2b.tax_exempt_with_tax_id
        && draft
            .customer
            .as_ref()
            .map(|c| c.has_tax_id() || c.tax_exempt)
            .unwrap_or(false);

    let mut ledger = Ledger::default();
    for line in &lines {
        ledger.record_line(line, effective, order_type, b2b_exempt, options)?;
    }

    let surcharges = ledger.record_surcharges(effective, order_type, sub_total)?;
    let surcharge_total = checked_sum(
        surcharges.iter().map(|s| Money::from_cents(s.base_cents)),
        "surcharges",
    )?;

    let tax = checked_sum(
        ledger.rates.values().map(|r| Money::from_cents(r.tax_cents)),
        "tax total",
    )?;
    let grand_total = if effective.prices_include_tax {
        sub_total
    } else {
        add(sub_total, tax, "grand total")?
    };

    debug!(
        order_type = %order_type,
        jurisdiction = ?resolution.jurisdiction,
        sub_total = sub_total.cents(),
        tax = tax.cents(),
        grand_total = grand_total.cents(),
        "Tax snapshot calculated"
    );

    Ok(TaxSnapshot {
        currency,
        order_type,
        prices_include_tax: effective.prices_include_tax,
        rounding: effective.rounding,
        summary_by_rate: ledger.rates.into_values().collect(),
        summary_zero_rated: buckets(ledger.zero_rated),
        summary_exempt: buckets(ledger.exempt),
        surcharges: if surcharges.is_empty() {
            None
        } else {
            Some(surcharges)
        },
        lines: ledger.lines,
        totals: Totals {
            sub_total_cents: sub_total.cents(),
            surcharge_cents: surcharge_total.cents(),
            tax_cents: tax.cents(),
            grand_total_cents: grand_total.cents(),
        },
        customer: draft.customer.clone(),
        jurisdiction_applied: resolution.jurisdiction,
    })
}

// =============================================================================
// Working Lines
// =============================================================================

/// A draft line (or the synthetic delivery line) with its effective total.
#[derive(Debug, Clone)]
struct WorkingLine {
    line: DraftLine,
    total: Money,
    /// Delivery policy rate hint; bypasses rule matching when it names a
    /// rule valid for the order type.
    forced_rate: Option<String>,
}

fn working_lines(draft: &DraftOrder, profile: &TaxProfile) -> TaxResult<Vec<WorkingLine>> {
    let mut lines = Vec::with_capacity(draft.lines.len() + 1);

    for line in &draft.lines {
        lines.push(WorkingLine {
            total: line_total(line)?,
            line: line.clone(),
            forced_rate: None,
        });
    }

    let policy = &profile.delivery;
    if draft.delivery_fee_cents > 0 && policy.mode == DeliveryMode::AsLine {
        if draft.lines.iter().any(|l| l.id.trim() == DELIVERY_LINE_ID) {
            return Err(ValidationError::Duplicate {
                field: "lines[].id".to_string(),
                value: DELIVERY_LINE_ID.to_string(),
            }
            .into());
        }

        let delivery = DraftLine {
            id: DELIVERY_LINE_ID.to_string(),
            quantity: 1,
            unit_price_cents: draft.delivery_fee_cents,
            tax_exempt: !policy.taxable,
            category: DELIVERY_CATEGORY.to_string(),
            tags: vec![DELIVERY_TAG.to_string()],
            code: Some(DELIVERY_TAG.to_string()),
            ..DraftLine::default()
        };
        lines.push(WorkingLine {
            total: line_total(&delivery)?,
            line: delivery,
            forced_rate: policy.tax_code.clone(),
        });
    }

    Ok(lines)
}

// =============================================================================
// Line Treatment
// =============================================================================

/// The single classification a line receives.
#[derive(Debug)]
enum Treatment<'p> {
    Exempt(String),
    NoRule,
    ZeroRated(String),
    Taxed(Vec<&'p TaxRateRule>),
}

fn treatment<'p>(
    line: &WorkingLine,
    profile: &'p TaxProfile,
    order_type: OrderType,
    b2b_exempt: bool,
) -> Treatment<'p> {
    if line.line.tax_exempt || b2b_exempt {
        return Treatment::Exempt(EXEMPT_CODE.to_string());
    }

    let hinted = line
        .forced_rate
        .as_deref()
        .and_then(|code| profile.rate(code))
        .filter(|rule| rule.allows_order_type(order_type));

    let rules = match hinted {
        Some(rule) => vec![rule],
        None => effective_rules(&profile.rates, &line.line, order_type),
    };

    if rules.is_empty() {
        return Treatment::NoRule;
    }
    if let Some(rule) = rules.iter().find(|r| r.zero_rated) {
        return Treatment::ZeroRated(rule.code.clone());
    }
    if let Some(rule) = rules.iter().find(|r| r.exempt) {
        return Treatment::Exempt(rule.code.clone());
    }

    Treatment::Taxed(rules)
}

/// Tax on `gross` at `rate_bps`: returns `(recorded base, tax)`.
///
/// Inclusive pricing records the net base, so base + tax = gross.
fn tax_on(gross: Money, rate_bps: u32, profile: &TaxProfile) -> TaxResult<(Money, Money)> {
    let overflow = || TaxError::Overflow {
        context: format!("tax at {} bps", rate_bps),
    };

    if profile.prices_include_tax {
        let tax = gross
            .inclusive_tax(rate_bps, profile.rounding)
            .ok_or_else(overflow)?;
        let net = gross.checked_sub(tax).ok_or_else(overflow)?;
        Ok((net, tax))
    } else {
        let tax = gross
            .exclusive_tax(rate_bps, profile.rounding)
            .ok_or_else(overflow)?;
        Ok((gross, tax))
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// Running aggregates. BTreeMaps keep every output sorted by code.
#[derive(Debug, Default)]
struct Ledger {
    rates: BTreeMap<String, RateSummary>,
    zero_rated: BTreeMap<String, Money>,
    exempt: BTreeMap<String, Money>,
    lines: Vec<LineBreakdown>,
}

impl Ledger {
    fn record_line(
        &mut self,
        working: &WorkingLine,
        profile: &TaxProfile,
        order_type: OrderType,
        b2b_exempt: bool,
        options: &EngineOptions,
    ) -> TaxResult<()> {
        let id = working.line.id.clone();
        let gross = working.total;

        if !gross.is_positive() {
            self.lines.push(breakdown(id, gross, LineClassification::ZeroValue, None));
            return Ok(());
        }

        let treatment = treatment(working, profile, order_type, b2b_exempt);
        trace!(line = %id, ?treatment, "Line classified");

        match treatment {
            Treatment::Exempt(code) => {
                add_bucket(&mut self.exempt, &code, gross)?;
                self.lines
                    .push(breakdown(id, gross, LineClassification::Exempt, Some(code)));
            }
            Treatment::NoRule => {
                if options.unmatched_lines == UnmatchedLinePolicy::Reject {
                    return Err(TaxError::UnmatchedLine { line_id: id });
                }
                add_bucket(&mut self.exempt, NO_RULE_CODE, gross)?;
                self.lines.push(breakdown(
                    id,
                    gross,
                    LineClassification::NoRule,
                    Some(NO_RULE_CODE.to_string()),
                ));
            }
            Treatment::ZeroRated(code) => {
                add_bucket(&mut self.zero_rated, &code, gross)?;
                self.lines
                    .push(breakdown(id, gross, LineClassification::ZeroRated, Some(code)));
            }
            Treatment::Taxed(rules) => {
                let mut line_tax = Money::zero();
                let mut codes = Vec::with_capacity(rules.len());
                for rule in rules {
                    let (base, tax) = tax_on(gross, rule.rate_bps, profile)?;
                    self.add_tax(rule, base, tax)?;
                    line_tax = add(line_tax, tax, "line tax")?;
                    codes.push(rule.code.clone());
                }
                self.lines.push(LineBreakdown {
                    line_id: id,
                    base_cents: gross.cents(),
                    tax_cents: line_tax.cents(),
                    classification: LineClassification::Taxed,
                    bucket: None,
                    rate_codes: codes,
                });
            }
        }

        Ok(())
    }

    /// Applies every surcharge valid for the order type.
    ///
    /// Zero-amount surcharges are skipped so an empty order stays empty.
    fn record_surcharges(
        &mut self,
        profile: &TaxProfile,
        order_type: OrderType,
        sub_total: Money,
    ) -> TaxResult<Vec<SurchargeLine>> {
        let mut applied = Vec::new();

        for surcharge in profile.surcharges.iter().filter(|s| s.applies_to(order_type)) {
            let amount = sub_total
                .percentage(surcharge.percent_bps, profile.rounding)
                .ok_or_else(|| TaxError::Overflow {
                    context: format!("surcharge {}", surcharge.code),
                })?;
            if !amount.is_positive() {
                continue;
            }

            let mut tax = Money::zero();
            let mut rate_code = None;
            if surcharge.taxable {
                if let Some(rule) = profile.surcharge_rate(surcharge) {
                    let (base, surcharge_tax) = tax_on(amount, rule.rate_bps, profile)?;
                    self.add_tax(rule, base, surcharge_tax)?;
                    tax = surcharge_tax;
                    rate_code = Some(rule.code.clone());
                }
            }

            applied.push(SurchargeLine {
                code: surcharge.code.clone(),
                label: surcharge.label.clone(),
                percent_bps: surcharge.percent_bps,
                base_cents: amount.cents(),
                tax_cents: tax.cents(),
                rate_code,
            });
        }

        applied.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(applied)
    }

    fn add_tax(&mut self, rule: &TaxRateRule, base: Money, tax: Money) -> TaxResult<()> {
        let row = self
            .rates
            .entry(rule.code.clone())
            .or_insert_with(|| RateSummary {
                code: rule.code.clone(),
                label: rule.label.clone(),
                rate_bps: rule.rate_bps,
                base_cents: 0,
                tax_cents: 0,
            });

        row.base_cents = add(Money::from_cents(row.base_cents), base, "rate base")?.cents();
        row.tax_cents = add(Money::from_cents(row.tax_cents), tax, "rate tax")?.cents();
        Ok(())
    }
}

fn breakdown(
    line_id: String,
    gross: Money,
    classification: LineClassification,
    bucket: Option<String>,
) -> LineBreakdown {
    LineBreakdown {
        line_id,
        base_cents: gross.cents(),
        tax_cents: 0,
        classification,
        bucket,
        rate_codes: Vec::new(),
    }
}

fn add_bucket(map: &mut BTreeMap<String, Money>, code: &str, amount: Money) -> TaxResult<()> {
    let entry = map.entry(code.to_string()).or_insert_with(Money::zero);
    *entry = add(*entry, amount, code)?;
    Ok(())
}

fn buckets(map: BTreeMap<String, Money>) -> Option<Vec<BucketSummary>> {
    if map.is_empty() {
        return None;
    }
    Some(
        map.into_iter()
            .map(|(code, base)| BucketSummary {
                code,
                base_cents: base.cents(),
            })
            .collect(),
    )
}

fn add(a: Money, b: Money, context: &str) -> TaxResult<Money> {
    a.checked_add(b).ok_or_else(|| TaxError::Overflow {
        context: context.to_string(),
    })
}

fn checked_sum<I: Iterator<Item = Money>>(amounts: I, context: &str) -> TaxResult<Money> {
    amounts.fold(Ok(Money::zero()), |acc, m| add(acc?, m, context))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::RoundingMode;
    use crate::order::{Customer, DeliveryAddress};
    use crate::profile::{
        B2bConfig, DeliveryPolicy, JurisdictionMatcher, JurisdictionRule, SurchargeRule,
    };

    fn vat(bps: u32) -> TaxRateRule {
        TaxRateRule {
            code: "VAT".into(),
            label: "VAT".into(),
            rate_bps: bps,
            applies_to: Some("all".into()),
            ..Default::default()
        }
    }

    fn profile(rates: Vec<TaxRateRule>) -> TaxProfile {
        TaxProfile {
            country: "XX".into(),
            currency: "USD".into(),
            rates,
            ..Default::default()
        }
    }

    fn line(id: &str, qty: i64, unit: i64) -> DraftLine {
        DraftLine {
            id: id.into(),
            quantity: qty,
            unit_price_cents: unit,
            ..Default::default()
        }
    }

    fn draft(lines: Vec<DraftLine>) -> DraftOrder {
        DraftOrder {
            currency: "USD".into(),
            order_type: OrderType::DineIn,
            lines,
            customer: None,
            delivery_fee_cents: 0,
            delivery_address_info: None,
        }
    }

    #[test]
    fn test_exclusive_single_line() {
        let s = calculate(&draft(vec![line("a", 2, 1000)]), &profile(vec![vat(1200)])).unwrap();
        assert_eq!(s.totals.sub_total_cents, 2000);
        assert_eq!(s.totals.tax_cents, 240);
        assert_eq!(s.totals.grand_total_cents, 2240);
        let row = s.rate("VAT").unwrap();
        assert_eq!((row.base_cents, row.tax_cents), (2000, 240));
        assert_eq!(s.line("a").unwrap().rate_codes, vec!["VAT".to_string()]);
    }

    #[test]
    fn test_inclusive_single_line() {
        let mut p = profile(vec![vat(1200)]);
        p.prices_include_tax = true;
        let s = calculate(&draft(vec![line("a", 2, 1000)]), &p).unwrap();
        let row = s.rate("VAT").unwrap();
        assert_eq!((row.base_cents, row.tax_cents), (1786, 214));
        assert_eq!(s.totals.grand_total_cents, 2000);
        assert!(s.prices_include_tax);
    }

    #[test]
    fn test_stacked_rates_tax_the_same_line_twice() {
        let city = TaxRateRule {
            code: "CITY".into(),
            label: "City".into(),
            rate_bps: 200,
            applies_to: Some("all".into()),
            ..Default::default()
        };
        let s = calculate(&draft(vec![line("a", 1, 1000)]), &profile(vec![vat(600), city])).unwrap();
        assert_eq!(s.rate("VAT").unwrap().tax_cents, 60);
        assert_eq!(s.rate("CITY").unwrap().tax_cents, 20);
        assert_eq!(s.totals.tax_cents, 80);
        // Sorted by code.
        assert_eq!(s.summary_by_rate[0].code, "CITY");
    }

    #[test]
    fn test_zero_rated_takes_priority() {
        let zr = TaxRateRule {
            code: "ZR".into(),
            rate_bps: 0,
            item_category_in: vec!["books".into()],
            zero_rated: true,
            ..Default::default()
        };
        let std = TaxRateRule {
            item_category_in: vec!["books".into()],
            ..vat(2000)
        };
        let mut book = line("b", 1, 1500);
        book.category = "books".into();

        let s = calculate(&draft(vec![book]), &profile(vec![std, zr])).unwrap();
        assert_eq!(s.zero_rated_base("ZR"), 1500);
        assert!(s.summary_by_rate.is_empty());
        assert_eq!(s.totals.tax_cents, 0);
        assert_eq!(s.line("b").unwrap().classification, LineClassification::ZeroRated);
    }

    #[test]
    fn test_exempt_rule_records_rule_code() {
        let ex = TaxRateRule {
            code: "MED".into(),
            rate_bps: 0,
            item_tag_in: vec!["medical".into()],
            exempt: true,
            ..Default::default()
        };
        let mut l = line("m", 1, 900);
        l.tags = vec!["medical".into()];

        let s = calculate(&draft(vec![l]), &profile(vec![ex, vat(1000)])).unwrap();
        assert_eq!(s.exempt_base("MED"), 900);
        assert_eq!(s.totals.tax_cents, 0);
    }

    #[test]
    fn test_no_rule_bucket_and_strict_policy() {
        let food_only = TaxRateRule {
            code: "FOOD".into(),
            rate_bps: 700,
            item_category_in: vec!["food".into()],
            ..Default::default()
        };
        let d = draft(vec![line("x", 1, 400)]);
        let s = calculate(&d, &profile(vec![food_only.clone()])).unwrap();
        assert_eq!(s.exempt_base(NO_RULE_CODE), 400);
        assert_eq!(s.totals.grand_total_cents, 400);

        let err = calculate_with(&d, &profile(vec![food_only]), &EngineOptions::strict()).unwrap_err();
        assert_eq!(
            err,
            TaxError::UnmatchedLine {
                line_id: "x".into()
            }
        );
    }

    #[test]
    fn test_b2b_exemption_needs_policy_and_customer() {
        let mut p = profile(vec![vat(2000)]);
        let mut d = draft(vec![line("a", 1, 1000)]);
        d.customer = Some(Customer {
            tax_id: Some("DE999".into()),
            ..Default::default()
        });

        // Policy off: taxed.
        assert_eq!(calculate(&d, &p).unwrap().totals.tax_cents, 200);

        p.b2b = B2bConfig {
            tax_exempt_with_tax_id: true,
            invoice_numbering: None,
        };
        let s = calculate(&d, &p).unwrap();
        assert_eq!(s.totals.tax_cents, 0);
        assert_eq!(s.exempt_base(EXEMPT_CODE), 1000);
        assert_eq!(s.customer, d.customer);

        // Explicit customer exemption without tax id.
        d.customer = Some(Customer {
            tax_exempt: true,
            ..Default::default()
        });
        assert_eq!(calculate(&d, &p).unwrap().totals.tax_cents, 0);
    }

    #[test]
    fn test_delivery_line_taxable_with_hint() {
        let delivery_rate = TaxRateRule {
            code: "DLV".into(),
            label: "Delivery".into(),
            rate_bps: 500,
            item_category_in: vec!["nothing".into()],
            ..Default::default()
        };
        let mut p = profile(vec![vat(1000), delivery_rate]);
        p.delivery = DeliveryPolicy {
            mode: DeliveryMode::AsLine,
            taxable: true,
            tax_code: Some("dlv".into()),
        };
        let mut d = draft(vec![line("a", 1, 1000)]);
        d.order_type = OrderType::Delivery;
        d.delivery_fee_cents = 300;

        let s = calculate(&d, &p).unwrap();
        assert_eq!(s.totals.sub_total_cents, 1300);
        assert_eq!(s.rate("DLV").unwrap().tax_cents, 15);
        assert_eq!(s.rate("VAT").unwrap().base_cents, 1000);
        assert_eq!(s.line(DELIVERY_LINE_ID).unwrap().rate_codes, vec!["DLV".to_string()]);
    }

    #[test]
    fn test_delivery_hint_respects_order_type_filter() {
        let dine_only = TaxRateRule {
            code: "DINE".into(),
            rate_bps: 2000,
            order_type_in: Some(vec![OrderType::DineIn]),
            ..Default::default()
        };
        let mut p = profile(vec![dine_only, vat(1000)]);
        p.delivery = DeliveryPolicy {
            mode: DeliveryMode::AsLine,
            taxable: true,
            tax_code: Some("DINE".into()),
        };
        let mut d = draft(vec![]);
        d.order_type = OrderType::Delivery;
        d.delivery_fee_cents = 300;

        let s = calculate(&d, &p).unwrap();
        assert!(s.rate("DINE").is_none());
        assert_eq!(s.rate("VAT").unwrap().tax_cents, 30);
        assert_eq!(s.line(DELIVERY_LINE_ID).unwrap().rate_codes, vec!["VAT".to_string()]);
    }

    #[test]
    fn test_delivery_line_id_cannot_be_reused() {
        let mut p = profile(vec![vat(1000)]);
        p.delivery = DeliveryPolicy {
            mode: DeliveryMode::AsLine,
            taxable: false,
            tax_code: None,
        };
        let mut d = draft(vec![line(DELIVERY_LINE_ID, 1, 1000)]);
        d.delivery_fee_cents = 300;

        assert!(matches!(
            calculate(&d, &p),
            Err(TaxError::Validation(ValidationError::Duplicate { .. }))
        ));

        // Without a synthetic line the id is free to use.
        d.delivery_fee_cents = 0;
        assert_eq!(calculate(&d, &p).unwrap().lines.len(), 1);
    }

    #[test]
    fn test_rate_codes_keep_configured_case() {
        let lower = TaxRateRule {
            code: "vat_std".into(),
            label: "Standard".into(),
            ..vat(1000)
        };
        let upper = TaxRateRule {
            code: "VAT_STD".into(),
            label: "Food".into(),
            rate_bps: 500,
            applies_to: None,
            item_category_in: vec!["food".into()],
            ..Default::default()
        };
        let mut food = line("f", 1, 1000);
        food.category = "food".into();

        let s = calculate(&draft(vec![food]), &profile(vec![lower, upper])).unwrap();
        assert_eq!(s.summary_by_rate.len(), 2);
        let row = s.rate("vat_std").unwrap();
        assert_eq!((row.rate_bps, row.base_cents, row.tax_cents), (1000, 1000, 100));
        let row = s.rate("VAT_STD").unwrap();
        assert_eq!((row.rate_bps, row.base_cents, row.tax_cents), (500, 1000, 50));
        assert_eq!(s.totals.tax_cents, 150);
    }

    #[test]
    fn test_delivery_out_of_scope_is_ignored() {
        let mut d = draft(vec![line("a", 1, 1000)]);
        d.delivery_fee_cents = 500;
        let s = calculate(&d, &profile(vec![vat(1000)])).unwrap();
        assert_eq!(s.totals.sub_total_cents, 1000);
        assert!(s.line(DELIVERY_LINE_ID).is_none());
    }

    #[test]
    fn test_surcharge_taxed_and_folded() {
        let mut p = profile(vec![vat(1000)]);
        p.surcharges = vec![SurchargeRule {
            code: "SVC".into(),
            label: "Service".into(),
            percent_bps: 1000,
            apply_when_order_type_in: Some(vec![OrderType::DineIn]),
            taxable: true,
            tax_code: None,
        }];
        let s = calculate(&draft(vec![line("a", 1, 2000)]), &p).unwrap();

        let svc = s.surcharge("SVC").unwrap();
        assert_eq!((svc.base_cents, svc.tax_cents), (200, 20));
        assert_eq!(svc.rate_code.as_deref(), Some("VAT"));
        let row = s.rate("VAT").unwrap();
        assert_eq!((row.base_cents, row.tax_cents), (2200, 220));
        assert_eq!(s.totals.tax_cents, 220);
        assert_eq!(s.totals.surcharge_cents, 200);
        assert_eq!(s.totals.grand_total_cents, 2220);

        // Not applicable to pickup.
        let mut d = draft(vec![line("a", 1, 2000)]);
        d.order_type = OrderType::Pickup;
        assert!(calculate(&d, &p).unwrap().surcharges.is_none());
    }

    #[test]
    fn test_taxable_surcharge_without_rates() {
        let mut p = profile(vec![]);
        p.surcharges = vec![SurchargeRule {
            code: "SVC".into(),
            percent_bps: 500,
            taxable: true,
            ..Default::default()
        }];
        let s = calculate(&draft(vec![line("a", 1, 1000)]), &p).unwrap();
        let svc = s.surcharge("SVC").unwrap();
        assert_eq!((svc.base_cents, svc.tax_cents), (50, 0));
        assert!(svc.rate_code.is_none());
        assert_eq!(s.totals.tax_cents, 0);
    }

    #[test]
    fn test_jurisdiction_threaded_into_snapshot() {
        let mut p = profile(vec![vat(1000)]);
        p.jurisdictions = vec![JurisdictionRule {
            code: Some("NYC".into()),
            matcher: JurisdictionMatcher {
                city: Some("New York".into()),
                ..Default::default()
            },
            rates_override: Some(vec![vat(887)]),
            rounding_override: Some(RoundingMode::HalfEven),
            ..Default::default()
        }];
        let mut d = draft(vec![line("a", 1, 1000)]);
        d.delivery_address_info = Some(DeliveryAddress {
            city: Some("new york".into()),
            ..Default::default()
        });

        let s = calculate(&d, &p).unwrap();
        assert_eq!(s.jurisdiction_applied.as_deref(), Some("NYC"));
        assert_eq!(s.rounding, RoundingMode::HalfEven);
        // 1000 × 8.87% = 88.7
        assert_eq!(s.totals.tax_cents, 89);
    }

    #[test]
    fn test_currency_mismatch_rejected() {
        let mut d = draft(vec![line("a", 1, 100)]);
        d.currency = "eur".into();
        assert!(matches!(
            calculate(&d, &profile(vec![vat(1000)])),
            Err(TaxError::CurrencyMismatch { .. })
        ));

        d.currency = "usd".into();
        assert_eq!(calculate(&d, &profile(vec![vat(1000)])).unwrap().currency, "USD");
    }

    #[test]
    fn test_zero_value_line_is_recorded_but_unbucketed() {
        let s = calculate(&draft(vec![line("free", 1, 0)]), &profile(vec![vat(1000)])).unwrap();
        assert_eq!(s.line("free").unwrap().classification, LineClassification::ZeroValue);
        assert!(s.summary_by_rate.is_empty());
        assert!(s.summary_exempt.is_none());
        assert_eq!(s.totals, Totals::default());
    }

    #[test]
    fn test_validation_errors_surface() {
        assert!(matches!(
            calculate(&draft(vec![line("a", 0, 100)]), &profile(vec![])),
            Err(TaxError::Validation(_))
        ));
    }
}
