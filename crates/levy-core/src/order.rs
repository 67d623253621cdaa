//! # Draft Order Types
//!
//! The validated draft an external caller hands to the engine.
//!
//! ## Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         DraftOrder                                      │
//! │                                                                         │
//! │  currency        "EUR"                                                  │
//! │  orderType       "dine-in" | "delivery" | "pickup"   ("dine_in" ok)    │
//! │  lines[]  ───────► DraftLine                                            │
//! │                     id, quantity, unitPriceCents,                       │
//! │                     addonsCents, optionsDeltaCents, lineTotalCents?,    │
//! │                     taxExempt, category, tags[], code?                  │
//! │  customer?       { taxId?, name?, taxExempt }                           │
//! │  deliveryFeeCents                                                       │
//! │  deliveryAddressInfo? { line1?, city?, state?, country?, zip?, notes? } │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Order Type
// =============================================================================

/// How the order reaches the customer.
///
/// The legacy spelling `dine_in` is accepted on input and always written
/// back as `dine-in`, so rules only ever see the canonical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum OrderType {
    #[serde(rename = "dine-in")]
    #[serde(alias = "dine_in")]
    DineIn,
    #[serde(rename = "delivery")]
    Delivery,
    #[serde(rename = "pickup")]
    Pickup,
}

impl OrderType {
    /// Canonical wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderType::DineIn => "dine-in",
            OrderType::Delivery => "delivery",
            OrderType::Pickup => "pickup",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dine-in" | "dine_in" => Ok(OrderType::DineIn),
            "delivery" => Ok(OrderType::Delivery),
            "pickup" => Ok(OrderType::Pickup),
            other => Err(ValidationError::InvalidFormat {
                field: "orderType".to_string(),
                reason: format!("unknown order type '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Draft Line
// =============================================================================

/// One line of the order, already priced by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DraftLine {
    /// Stable line identifier, echoed in the snapshot's line breakdown.
    #[serde(alias = "lineId")]
    pub id: String,

    pub quantity: i64,

    pub unit_price_cents: i64,

    /// Sum of paid add-ons per unit.
    #[serde(default)]
    pub addons_cents: i64,

    /// Sum of option price deltas per unit (may be negative, e.g. a smaller size).
    #[serde(default)]
    pub options_delta_cents: i64,

    /// Precomputed total; when present it wins over the per-unit parts.
    #[serde(default)]
    pub line_total_cents: Option<i64>,

    /// Explicitly exempt line (never taxed, whatever the rules say).
    #[serde(default)]
    pub tax_exempt: bool,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Semantic code such as `delivery_fee`.
    #[serde(default)]
    pub code: Option<String>,
}

// =============================================================================
// Customer & Address
// =============================================================================

/// Customer data relevant to B2B exemption, echoed into the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default)]
    pub tax_id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub tax_exempt: bool,
}

impl Customer {
    /// True if a non-blank tax id was supplied.
    pub fn has_tax_id(&self) -> bool {
        self.tax_id
            .as_deref()
            .map(|id| !id.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Where a delivery order goes. Only used to pick a jurisdiction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// Draft Order
// =============================================================================

/// Input to [`calculate`](crate::engine::calculate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DraftOrder {
    pub currency: String,

    pub order_type: OrderType,

    pub lines: Vec<DraftLine>,

    #[serde(default)]
    pub customer: Option<Customer>,

    #[serde(default)]
    pub delivery_fee_cents: i64,

    #[serde(default)]
    pub delivery_address_info: Option<DeliveryAddress>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_type_alias_normalizes() {
        let parsed: OrderType = serde_json::from_value(json!("dine_in")).unwrap();
        assert_eq!(parsed, OrderType::DineIn);
        assert_eq!(serde_json::to_value(parsed).unwrap(), json!("dine-in"));
    }

    #[test]
    fn test_order_type_from_str() {
        assert_eq!("dine_in".parse::<OrderType>().unwrap(), OrderType::DineIn);
        assert_eq!(" Pickup ".parse::<OrderType>().unwrap(), OrderType::Pickup);
        assert!("drive-thru".parse::<OrderType>().is_err());
    }

    #[test]
    fn test_draft_order_deserializes_with_defaults() {
        let draft: DraftOrder = serde_json::from_value(json!({
            "currency": "EUR",
            "orderType": "delivery",
            "lines": [
                { "id": "a", "quantity": 2, "unitPriceCents": 450, "tags": ["vegan"] }
            ],
            "deliveryAddressInfo": { "city": "Lyon", "zip": "69001" }
        }))
        .unwrap();

        assert_eq!(draft.order_type, OrderType::Delivery);
        assert_eq!(draft.delivery_fee_cents, 0);
        assert!(draft.customer.is_none());
        let line = &draft.lines[0];
        assert_eq!(line.addons_cents, 0);
        assert_eq!(line.line_total_cents, None);
        assert!(!line.tax_exempt);
        assert_eq!(line.tags, vec!["vegan".to_string()]);
    }

    #[test]
    fn test_customer_has_tax_id() {
        let mut customer = Customer::default();
        assert!(!customer.has_tax_id());
        customer.tax_id = Some("   ".to_string());
        assert!(!customer.has_tax_id());
        customer.tax_id = Some("FR123".to_string());
        assert!(customer.has_tax_id());
    }
}
