//! # Error Types
//!
//! Domain-specific error types for levy-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  levy-core errors (this file)                                          │
//! │  ├── TaxError         - A calculation was refused                      │
//! │  └── ValidationError  - Input contract violations (field level)        │
//! │                                                                         │
//! │  levy-runtime errors (separate crate)                                  │
//! │  └── RuntimeError     - Config, source and cache failures              │
//! │                                                                         │
//! │  Flow: ValidationError → TaxError → RuntimeError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What Is NOT an Error
//! Business degeneracies never surface here. A dead rule, an address that
//! matches no jurisdiction, a line with no applicable rule or a surcharge
//! naming an unknown tax code all resolve to documented fallbacks and show
//! up in the snapshot instead.

use thiserror::Error;

// =============================================================================
// Tax Error
// =============================================================================

/// Reasons a calculation is refused.
///
/// A refused calculation produces no partial snapshot.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxError {
    /// Draft order failed input validation.
    #[error("Invalid draft order: {0}")]
    Validation(#[from] ValidationError),

    /// The draft was priced in a different currency than the profile.
    ///
    /// ## When This Occurs
    /// The caller is expected to pick the profile matching the order's
    /// currency before calling the engine. Currency conversion is never
    /// attempted here.
    #[error("Currency mismatch: order is {order}, profile is {profile}")]
    CurrencyMismatch { order: String, profile: String },

    /// A line matched no rate rule and the engine runs with
    /// [`UnmatchedLinePolicy::Reject`](crate::options::UnmatchedLinePolicy).
    #[error("No tax rule applies to line {line_id}")]
    UnmatchedLine { line_id: String },

    /// An intermediate amount left the i64 cents range.
    #[error("Amount overflow while computing {context}")]
    Overflow { context: String },

    /// A tax profile failed [`TaxProfile::validate`](crate::profile::TaxProfile::validate).
    #[error("Invalid tax profile: {0}")]
    InvalidProfile(String),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Each variant names the offending field, including the line id when the
/// field belongs to a draft line (e.g. `lines[burger-1].quantity`).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative, got {value}")]
    Negative { field: String, value: i64 },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., a currency that is not three letters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., two lines sharing an id).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with TaxError.
pub type TaxResult<T> = Result<T, TaxError>;

// =============================================================================
// Unit Tests
// =============================================================================
