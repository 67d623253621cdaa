//! # Jurisdiction Resolver
//!
//! Picks the single best jurisdiction rule for a delivery address and layers
//! its overrides onto the base profile.
//!
//! ## Resolution Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  base profile + address?                                                │
//! │       │                                                                 │
//! │       ├── no rules / no address ──────────────► base (borrowed)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  keep rules whose EVERY specified field matches                        │
//! │  (lower-case, trimmed; zipPrefix is a prefix match)                    │
//! │       │                                                                 │
//! │       ├── none match ─────────────────────────► base (borrowed)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  winner = highest specificity, first one on ties                       │
//! │       zipPrefix 4 > city 3 > state 2 > country 1                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  effective = base with ONLY the overridden fields replaced             │
//! │              (rates/surcharges replaced wholesale, never merged)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::borrow::Cow;
use tracing::debug;

use crate::order::DeliveryAddress;
use crate::profile::{JurisdictionMatcher, JurisdictionRule, TaxProfile};

// =============================================================================
// Resolution
// =============================================================================

/// Output of [`resolve`]: the profile to calculate with and the jurisdiction
/// that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'a> {
    pub profile: Cow<'a, TaxProfile>,
    pub jurisdiction: Option<String>,
}

impl<'a> Resolution<'a> {
    fn base(profile: &'a TaxProfile) -> Self {
        Resolution {
            profile: Cow::Borrowed(profile),
            jurisdiction: None,
        }
    }
}

/// Resolves the effective profile for an address.
///
/// Borrowing when nothing matches keeps one tenant profile reusable across
/// many calculations without cloning.
pub fn resolve<'a>(base: &'a TaxProfile, address: Option<&DeliveryAddress>) -> Resolution<'a> {
    let address = match address {
        Some(address) if !base.jurisdictions.is_empty() => address,
        _ => return Resolution::base(base),
    };

    let Some(winner) = select(&base.jurisdictions, address) else {
        debug!("No jurisdiction matched the delivery address");
        return Resolution::base(base);
    };

    let code = jurisdiction_code(winner);
    debug!(jurisdiction = %code, "Jurisdiction override applied");

    Resolution {
        profile: Cow::Owned(apply_overrides(base, winner)),
        jurisdiction: Some(code),
    }
}

/// Selects the winning rule among those matching `address`.
pub fn select<'r>(rules: &'r [JurisdictionRule], address: &DeliveryAddress) -> Option<&'r JurisdictionRule> {
    let mut best: Option<(&JurisdictionRule, u8)> = None;

    for rule in rules {
        if !matches(&rule.matcher, address) {
            continue;
        }
        let score = specificity(&rule.matcher);
        // Strictly greater: the first rule wins ties.
        if best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((rule, score));
        }
    }

    best.map(|(rule, _)| rule)
}

/// Score of the most specific field the matcher sets (0 if none).
pub fn specificity(matcher: &JurisdictionMatcher) -> u8 {
    if specified(&matcher.zip_prefix).is_some() {
        4
    } else if specified(&matcher.city).is_some() {
        3
    } else if specified(&matcher.state).is_some() {
        2
    } else if specified(&matcher.country).is_some() {
        1
    } else {
        0
    }
}

/// True if every field the matcher specifies matches the address.
pub fn matches(matcher: &JurisdictionMatcher, address: &DeliveryAddress) -> bool {
    field_equals(&matcher.country, &address.country)
        && field_equals(&matcher.state, &address.state)
        && field_equals(&matcher.city, &address.city)
        && zip_matches(&matcher.zip_prefix, &address.zip)
}

fn specified(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

fn field_equals(expected: &Option<String>, actual: &Option<String>) -> bool {
    match specified(expected) {
        None => true,
        Some(expected) => specified(actual).map(|a| a == expected).unwrap_or(false),
    }
}

fn zip_matches(prefix: &Option<String>, zip: &Option<String>) -> bool {
    match specified(prefix) {
        None => true,
        Some(prefix) => specified(zip).map(|z| z.starts_with(&prefix)).unwrap_or(false),
    }
}

/// The rule's explicit code, else one derived from its matcher,
/// e.g. `US-CA-SAN FRANCISCO-941`.
pub fn jurisdiction_code(rule: &JurisdictionRule) -> String {
    if let Some(code) = rule.code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        return code.to_string();
    }

    let m = &rule.matcher;
    let parts: Vec<String> = [&m.country, &m.state, &m.city, &m.zip_prefix]
        .into_iter()
        .filter_map(specified)
        .map(|p| p.to_uppercase())
        .collect();

    if parts.is_empty() {
        "*".to_string()
    } else {
        parts.join("-")
    }
}

/// Shallow override: each field comes from the rule if it overrides it,
/// else from `base`.
fn apply_overrides(base: &TaxProfile, rule: &JurisdictionRule) -> TaxProfile {
    TaxProfile {
        country: base.country.clone(),
        currency: base.currency.clone(),
        prices_include_tax: rule
            .prices_include_tax_override
            .unwrap_or(base.prices_include_tax),
        rounding: rule.rounding_override.unwrap_or(base.rounding),
        rates: rule
            .rates_override
            .clone()
            .unwrap_or_else(|| base.rates.clone()),
        surcharges: rule
            .surcharges_override
            .clone()
            .unwrap_or_else(|| base.surcharges.clone()),
        delivery: rule
            .delivery_override
            .clone()
            .unwrap_or_else(|| base.delivery.clone()),
        jurisdictions: base.jurisdictions.clone(),
        b2b: base.b2b.clone(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::RoundingMode;
    use crate::profile::{DeliveryMode, DeliveryPolicy, TaxRateRule};

    fn address(country: &str, state: &str, city: &str, zip: &str) -> DeliveryAddress {
        let opt = |s: &str| if s.is_empty() { None } else { Some(s.to_string()) };
        DeliveryAddress {
            country: opt(country),
            state: opt(state),
            city: opt(city),
            zip: opt(zip),
            ..DeliveryAddress::default()
        }
    }

    fn rule(code: &str, matcher: JurisdictionMatcher) -> JurisdictionRule {
        JurisdictionRule {
            code: Some(code.to_string()),
            matcher,
            ..JurisdictionRule::default()
        }
    }

    fn m(country: Option<&str>, state: Option<&str>, city: Option<&str>, zip: Option<&str>) -> JurisdictionMatcher {
        JurisdictionMatcher {
            country: country.map(String::from),
            state: state.map(String::from),
            city: city.map(String::from),
            zip_prefix: zip.map(String::from),
        }
    }

    fn base_profile(jurisdictions: Vec<JurisdictionRule>) -> TaxProfile {
        TaxProfile {
            country: "US".into(),
            currency: "USD".into(),
            rates: vec![TaxRateRule {
                code: "STATE".into(),
                rate_bps: 600,
                applies_to: Some("all".into()),
                ..Default::default()
            }],
            jurisdictions,
            ..TaxProfile::default()
        }
    }

    #[test]
    fn test_no_address_or_no_rules_returns_base() {
        let profile = base_profile(vec![rule("X", m(Some("us"), None, None, None))]);
        let resolution = resolve(&profile, None);
        assert!(matches!(resolution.profile, Cow::Borrowed(_)));
        assert_eq!(resolution.jurisdiction, None);

        let bare = base_profile(vec![]);
        let resolution = resolve(&bare, Some(&address("US", "", "", "")));
        assert!(matches!(resolution.profile, Cow::Borrowed(_)));
    }

    #[test]
    fn test_every_specified_field_must_match() {
        let matcher = m(Some("US"), None, Some("Austin"), None);
        assert!(matches(&matcher, &address(" us ", "TX", "AUSTIN", "78701")));
        assert!(!matches(&matcher, &address("US", "TX", "Dallas", "75201")));
        assert!(!matches(&matcher, &address("US", "TX", "", "78701")));
    }

    #[test]
    fn test_zip_prefix_is_prefix_match() {
        let matcher = m(None, None, None, Some("787"));
        assert!(matches(&matcher, &address("", "", "", "78701")));
        assert!(!matches(&matcher, &address("", "", "", "77001")));
        assert!(!matches(&matcher, &address("", "", "", "")));
    }

    #[test]
    fn test_specificity_order() {
        assert_eq!(specificity(&m(Some("us"), Some("tx"), Some("austin"), Some("787"))), 4);
        assert_eq!(specificity(&m(Some("us"), None, Some("austin"), None)), 3);
        assert_eq!(specificity(&m(Some("us"), Some("tx"), None, None)), 2);
        assert_eq!(specificity(&m(Some("us"), None, None, None)), 1);
        assert_eq!(specificity(&m(None, None, None, Some("  "))), 0);
    }

    #[test]
    fn test_most_specific_wins_regardless_of_order() {
        let rules = vec![
            rule("COUNTRY", m(Some("us"), None, None, None)),
            rule("ZIP", m(None, None, None, Some("787"))),
            rule("CITY", m(None, None, Some("austin"), None)),
        ];
        let addr = address("US", "TX", "Austin", "78701");
        assert_eq!(select(&rules, &addr).unwrap().code.as_deref(), Some("ZIP"));

        let mut reversed = rules.clone();
        reversed.reverse();
        assert_eq!(select(&reversed, &addr).unwrap().code.as_deref(), Some("ZIP"));
    }

    #[test]
    fn test_ties_go_to_first_rule() {
        let rules = vec![
            rule("FIRST", m(Some("us"), Some("tx"), None, None)),
            rule("SECOND", m(None, Some("tx"), None, None)),
        ];
        let addr = address("US", "TX", "", "");
        for _ in 0..3 {
            assert_eq!(select(&rules, &addr).unwrap().code.as_deref(), Some("FIRST"));
        }
    }

    #[test]
    fn test_overrides_are_shallow_and_inherit() {
        let mut texas = rule("TX", m(None, Some("tx"), None, None));
        texas.rates_override = Some(vec![TaxRateRule {
            code: "TX".into(),
            rate_bps: 625,
            applies_to: Some("all".into()),
            ..Default::default()
        }]);
        texas.rounding_override = Some(RoundingMode::HalfEven);
        texas.delivery_override = Some(DeliveryPolicy {
            mode: DeliveryMode::AsLine,
            taxable: true,
            tax_code: None,
        });

        let base = base_profile(vec![texas]);
        let resolution = resolve(&base, Some(&address("US", "TX", "Austin", "")));
        let effective = resolution.profile.as_ref();

        assert_eq!(resolution.jurisdiction.as_deref(), Some("TX"));
        assert_eq!(effective.rates.len(), 1);
        assert_eq!(effective.rates[0].code, "TX");
        assert_eq!(effective.rounding, RoundingMode::HalfEven);
        assert_eq!(effective.delivery.mode, DeliveryMode::AsLine);
        // Not overridden: inherited, never zeroed.
        assert_eq!(effective.prices_include_tax, base.prices_include_tax);
        assert_eq!(effective.currency, "USD");
        assert_eq!(effective.surcharges, base.surcharges);
        // Base untouched.
        assert_eq!(base.rates[0].code, "STATE");
    }

    #[test]
    fn test_no_match_returns_base() {
        let base = base_profile(vec![rule("CA", m(None, Some("ca"), None, None))]);
        let resolution = resolve(&base, Some(&address("US", "TX", "", "")));
        assert_eq!(resolution.jurisdiction, None);
        assert_eq!(resolution.profile.as_ref(), &base);
    }

    #[test]
    fn test_derived_code() {
        let r = JurisdictionRule {
            matcher: m(Some("us"), Some("ca"), None, Some("941")),
            ..Default::default()
        };
        assert_eq!(jurisdiction_code(&r), "US-CA-941");
        assert_eq!(jurisdiction_code(&JurisdictionRule::default()), "*");
    }
}
