//! # Rule Matcher
//!
//! Decides which rate rules apply to a line.
//!
//! ## Selector Dispatch
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    TaxRateRule → RuleSelector                           │
//! │                                                                         │
//! │  appliesTo = "all"                ──►  All                              │
//! │                                                                         │
//! │  itemCategoryIn or itemTagIn set  ──►  Filtered { categories, tags,     │
//! │                                                   exclude_tags }        │
//! │                                                                         │
//! │  anything else                    ──►  Dead  (never matches)            │
//! │  (an excludeItemTagIn on its own                                        │
//! │   has nothing to veto)                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The order-type restriction is checked before the selector, for every
//! variant.

use tracing::trace;

use crate::order::{DraftLine, OrderType};
use crate::profile::TaxRateRule;

// =============================================================================
// Rule Selector
// =============================================================================

/// The line predicate of a rate rule, as an explicit variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSelector<'a> {
    /// Matches every line.
    All,
    /// Category any-of OR tag any-of, vetoed by any excluded tag.
    Filtered {
        categories: &'a [String],
        tags: &'a [String],
        exclude_tags: &'a [String],
    },
    /// No selector configured.
    Dead,
}

impl<'a> RuleSelector<'a> {
    pub fn of(rule: &'a TaxRateRule) -> Self {
        if rule.is_universal() {
            return RuleSelector::All;
        }

        if rule.item_category_in.is_empty() && rule.item_tag_in.is_empty() {
            return RuleSelector::Dead;
        }

        RuleSelector::Filtered {
            categories: &rule.item_category_in,
            tags: &rule.item_tag_in,
            exclude_tags: &rule.exclude_item_tag_in,
        }
    }

    /// Evaluates the selector against a line (case-insensitive).
    pub fn matches(&self, line: &DraftLine) -> bool {
        match self {
            RuleSelector::All => true,
            RuleSelector::Dead => false,
            RuleSelector::Filtered {
                categories,
                tags,
                exclude_tags,
            } => {
                if any_tag_in(line, exclude_tags) {
                    return false;
                }
                let category = fold(&line.category);
                let category_hit =
                    !category.is_empty() && categories.iter().any(|c| fold(c) == category);
                category_hit || any_tag_in(line, tags)
            }
        }
    }
}

fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

fn any_tag_in(line: &DraftLine, set: &[String]) -> bool {
    if set.is_empty() {
        return false;
    }
    line.tags.iter().map(|t| fold(t)).any(|tag| {
        !tag.is_empty() && set.iter().any(|s| fold(s) == tag)
    })
}

// =============================================================================
// Matching
// =============================================================================

/// Does `rule` apply to `line` for this order type?
///
/// ## Example
/// ```rust
/// use levy_core::matcher::applies;
/// use levy_core::order::{DraftLine, OrderType};
/// use levy_core::profile::TaxRateRule;
///
/// let rule = TaxRateRule {
///     code: "FOOD".into(),
///     rate_bps: 700,
///     item_category_in: vec!["food".into()],
///     ..Default::default()
/// };
/// let line = DraftLine { id: "a".into(), quantity: 1, category: "Food".into(), ..Default::default() };
///
/// assert!(applies(&rule, &line, OrderType::Pickup));
/// ```
pub fn applies(rule: &TaxRateRule, line: &DraftLine, order_type: OrderType) -> bool {
    rule.allows_order_type(order_type) && RuleSelector::of(rule).matches(line)
}

/// Every rule that applies to `line`, in profile order.
///
/// ## Resolution
/// ```text
/// rules where applies() ── non-empty ──► those rules
///        │ empty
///        ▼
/// universal rules valid for the order type ── non-empty ──► those rules
///        │ empty
///        ▼
/// [] (the line has no applicable rule)
/// ```
pub fn effective_rules<'r>(
    rules: &'r [TaxRateRule],
    line: &DraftLine,
    order_type: OrderType,
) -> Vec<&'r TaxRateRule> {
    let matched: Vec<&TaxRateRule> = rules
        .iter()
        .filter(|rule| applies(rule, line, order_type))
        .collect();

    if !matched.is_empty() {
        return matched;
    }

    let fallback: Vec<&TaxRateRule> = rules
        .iter()
        .filter(|rule| rule.is_universal() && rule.allows_order_type(order_type))
        .collect();

    trace!(line = %line.id, fallback = fallback.len(), "No direct rule match");
    fallback
}

// =============================================================================
// Unit Tests
// =============================================================================
