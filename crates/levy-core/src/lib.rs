//! # levy-core: Pure Tax Engine for Levy
//!
//! This crate turns a draft order and a tenant tax profile into an immutable,
//! auditable tax snapshot. It is pure: no I/O, no clock, no shared state.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Levy Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Checkout / Ordering Service                     │   │
//! │  │        cart ──► draft order ──► quote ──► persisted snapshot    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            levy-runtime (config, profile cache, sources)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ &TaxProfile                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ levy-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  profile  │  │jurisdiction│ │  matcher  │  │  engine   │  │   │
//! │  │   │ TaxProfile│  │  resolve  │  │ RuleSel.  │  │ calculate │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │   order   │  │ snapshot  │  │ validation│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CLOCK • NO NETWORK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - `calculate`: the whole pipeline
//! - [`profile`] - Tax profile model, normalization, validation
//! - [`jurisdiction`] - Address-based profile overrides
//! - [`matcher`] - Which rate rules apply to a line
//! - [`money`] - Integer cents and exact rounding
//! - [`order`] - Draft order input
//! - [`snapshot`] - Snapshot output
//! - [`options`] - Engine knobs
//! - [`validation`] - Input contract checks
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: same draft + same profile = same snapshot bytes
//! 2. **Integer Money**: every amount is i64 cents, every rate is basis points
//! 3. **Business config never fails**: odd profiles degrade, bad input errors
//! 4. **Explicit Errors**: typed errors, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use levy_core::{calculate, DraftLine, DraftOrder, OrderType, TaxProfile};
//!
//! let profile: TaxProfile = serde_json::from_str(r#"{
//!     "currency": "EUR",
//!     "pricesIncludeTax": true,
//!     "rates": [{ "code": "VAT", "label": "VAT 12%", "rateBps": 1200, "appliesTo": "all" }]
//! }"#).unwrap();
//!
//! let draft = DraftOrder {
//!     currency: "EUR".into(),
//!     order_type: OrderType::Pickup,
//!     lines: vec![DraftLine { id: "a".into(), quantity: 2, unit_price_cents: 1000, ..Default::default() }],
//!     customer: None,
//!     delivery_fee_cents: 0,
//!     delivery_address_info: None,
//! };
//!
//! let snapshot = calculate(&draft, &profile).unwrap();
//! assert_eq!(snapshot.totals.tax_cents, 214);
//! assert_eq!(snapshot.totals.grand_total_cents, 2000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod jurisdiction;
pub mod matcher;
pub mod money;
pub mod options;
pub mod order;
pub mod profile;
pub mod snapshot;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use engine::{calculate, calculate_with};
pub use error::{TaxError, TaxResult, ValidationError};
pub use money::{Money, RoundingMode};
pub use options::{EngineOptions, UnmatchedLinePolicy};
pub use order::{Customer, DeliveryAddress, DraftLine, DraftOrder, OrderType};
pub use profile::{
    B2bConfig, DeliveryMode, DeliveryPolicy, InvoiceNumberingConfig, JurisdictionMatcher,
    JurisdictionRule, NumberingReset, SurchargeRule, TaxProfile, TaxRateRule,
};
pub use snapshot::{
    BucketSummary, LineBreakdown, LineClassification, RateSummary, SurchargeLine, TaxSnapshot,
    Totals,
};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines accepted in one draft order.
///
/// ## Business Reason
/// Bounds the work one calculation can do. Overridable via
/// [`EngineOptions::max_lines`].
pub const DEFAULT_MAX_LINES: usize = 500;

/// Maximum quantity of a single line.
///
/// Catches fat-fingered quantities before they reach a stored snapshot.
pub const DEFAULT_MAX_QUANTITY: i64 = 9999;
