//! # Validation Module
//!
//! Input contract checks run before any tax math.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  ├── Types: integers only, known order types                           │
//! │  └── Non-finite numbers cannot even be represented                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (contract violations → error, no snapshot)       │
//! │  ├── Required identifiers                                              │
//! │  ├── Signs: quantity > 0, prices and fees >= 0                         │
//! │  └── Limits: max lines, max quantity                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Engine (business degeneracies → fallback, never an error)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::options::EngineOptions;
use crate::order::{DraftLine, DraftOrder};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates an ISO-4217 style currency code.
///
/// ## Example
/// ```rust
/// use levy_core::validation::validate_currency;
///
/// assert!(validate_currency("EUR").is_ok());
/// assert!(validate_currency("eur").is_ok());
/// assert!(validate_currency("").is_err());
/// assert!(validate_currency("EURO").is_err());
/// ```
pub fn validate_currency(currency: &str) -> ValidationResult<()> {
    let currency = currency.trim();

    if currency.is_empty() {
        return Err(ValidationError::Required {
            field: "currency".to_string(),
        });
    }

    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "must be a three-letter code".to_string(),
        });
    }

    Ok(())
}

/// Validates a line quantity: `1..=max`.
pub fn validate_quantity(field: &str, qty: i64, max: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if qty > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max,
        });
    }

    Ok(())
}

/// Validates a cents amount that may be zero but never negative.
///
/// ## Example
/// ```rust
/// use levy_core::validation::validate_non_negative_cents;
///
/// assert!(validate_non_negative_cents("fee", 0).is_ok());
/// assert!(validate_non_negative_cents("fee", 500).is_ok());
/// assert!(validate_non_negative_cents("fee", -1).is_err());
/// ```
pub fn validate_non_negative_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
            value: cents,
        });
    }

    Ok(())
}

/// Validates a rate in basis points: 0% to 100%.
pub fn validate_rate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// Draft Validators
// =============================================================================

/// Validates one draft line.
pub fn validate_line(line: &DraftLine, options: &EngineOptions) -> ValidationResult<()> {
    if line.id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "lines[].id".to_string(),
        });
    }

    let field = |name: &str| format!("lines[{}].{}", line.id, name);

    validate_quantity(&field("quantity"), line.quantity, options.max_quantity)?;
    validate_non_negative_cents(&field("unitPriceCents"), line.unit_price_cents)?;
    validate_non_negative_cents(&field("addonsCents"), line.addons_cents)?;

    if let Some(total) = line.line_total_cents {
        validate_non_negative_cents(&field("lineTotalCents"), total)?;
    }

    Ok(())
}

/// Validates a whole draft order.
///
/// Stops at the first violation; the engine never computes on a draft that
/// fails here.
pub fn validate_draft(draft: &DraftOrder, options: &EngineOptions) -> ValidationResult<()> {
    validate_currency(&draft.currency)?;
    validate_non_negative_cents("deliveryFeeCents", draft.delivery_fee_cents)?;

    if draft.lines.len() > options.max_lines {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 0,
            max: options.max_lines as i64,
        });
    }

    let mut seen = HashSet::with_capacity(draft.lines.len());
    for line in &draft.lines {
        validate_line(line, options)?;

        if !seen.insert(line.id.trim()) {
            return Err(ValidationError::Duplicate {
                field: "lines[].id".to_string(),
                value: line.id.clone(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
