//! # levy-runtime: I/O Around the Levy Tax Engine
//!
//! Everything `levy-core` is not allowed to do: read configuration, reach a
//! profile store, cache profiles between calls.
//!
//! ## Modules
//!
//! - [`config`] - `LevyConfig`: TOML file + environment + defaults
//! - [`cache`] - `ProfileCache`: tenant profiles with a TTL
//! - [`source`] - `ProfileSource` trait, in-memory and directory sources
//! - [`service`] - `TaxService::quote`
//! - [`error`] - Runtime error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use levy_core::{DraftLine, DraftOrder, OrderType, TaxProfile};
//! use levy_runtime::{LevyConfig, MemoryProfileSource, TaxService};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let profile: TaxProfile = serde_json::from_str(
//!     r#"{ "currency": "USD", "rates": [{ "code": "VAT", "rateBps": 1000, "appliesTo": "all" }] }"#,
//! ).unwrap();
//! let service = TaxService::new(
//!     LevyConfig::default(),
//!     MemoryProfileSource::new().with_profile("acme", profile),
//! );
//!
//! let draft = DraftOrder {
//!     currency: "USD".into(),
//!     order_type: OrderType::Pickup,
//!     lines: vec![DraftLine { id: "a".into(), quantity: 1, unit_price_cents: 500, ..Default::default() }],
//!     customer: None,
//!     delivery_fee_cents: 0,
//!     delivery_address_info: None,
//! };
//!
//! let snapshot = service.quote("acme", &draft, Utc::now()).await.unwrap();
//! assert_eq!(snapshot.totals.grand_total_cents, 550);
//! # });
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cache;
pub mod config;
pub mod error;
pub mod service;
pub mod source;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cache::ProfileCache;
pub use config::{CacheSettings, LevyConfig, ProfileSettings};
pub use error::{RuntimeError, RuntimeResult};
pub use service::TaxService;
pub use source::{DirProfileSource, MemoryProfileSource, ProfileSource};
