//! # Money Module
//!
//! Integer-cents arithmetic and the rounding primitive every rate
//! multiplication goes through.
//!
//! ## Why Exact Ratios Instead of Floats?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  2000 - 2000 / 1.12 = 214.28571428571422   (f64)                       │
//! │  1050 * 0.05        =  52.50000000000001   (f64)  → half_even says 53! │
//! │                                                                         │
//! │  OUR SOLUTION: keep the fraction as numerator / denominator            │
//! │    exclusive:  base × bps / 10000                                      │
//! │    inclusive:  base × bps / (10000 + bps)                              │
//! │  and round the exact ratio once, in i128.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The inclusive form is `base − base / (1 + r)` with the fraction cleared:
//! `base − base·10000/(10000+bps) = base·bps/(10000+bps)`.
//!
//! ## Usage
//! ```rust
//! use levy_core::money::{Money, RoundingMode};
//!
//! let base = Money::from_cents(2000);
//! let tax = base.exclusive_tax(1200, RoundingMode::HalfUp).unwrap();
//! assert_eq!(tax.cents(), 240);
//!
//! let embedded = base.inclusive_tax(1200, RoundingMode::HalfUp).unwrap();
//! assert_eq!(embedded.cents(), 214);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{TaxError, TaxResult, ValidationError};
use crate::order::DraftLine;

/// Basis points in 100%.
pub const BPS_DENOMINATOR: i128 = 10_000;

// =============================================================================
// Rounding Mode
// =============================================================================

/// How a fractional cents value is brought back to an integer.
///
/// ## Comparison
/// ```text
/// ┌──────────┬──────────┬───────────┐
/// │  value   │ half_up  │ half_even │
/// ├──────────┼──────────┼───────────┤
/// │   0.5    │    1     │     0     │
/// │   1.5    │    2     │     2     │
/// │   2.5    │    3     │     2     │
/// │  52.5    │   53     │    52     │
/// │  -2.5    │   -3     │    -2     │
/// └──────────┴──────────┴───────────┘
/// ```
/// `half_up` rounds ties away from zero. `half_even` (Bankers Rounding)
/// rounds ties to the nearest even integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    #[default]
    HalfUp,
    HalfEven,
}

impl RoundingMode {
    /// Rounds `numerator / denominator` to the nearest integer.
    ///
    /// `denominator` must be positive; every caller in this crate passes a
    /// constant or `10000 + bps`.
    pub fn round_ratio(self, numerator: i128, denominator: i128) -> i128 {
        debug_assert!(denominator > 0);

        let quotient = numerator / denominator;
        let remainder = numerator % denominator;
        if remainder == 0 {
            return quotient;
        }

        // Truncation went toward zero; "away" is the sign of the numerator.
        let away = if numerator < 0 { -1 } else { 1 };
        let twice = remainder.abs() * 2;

        if twice > denominator {
            quotient + away
        } else if twice < denominator {
            quotient
        } else {
            match self {
                RoundingMode::HalfUp => quotient + away,
                RoundingMode::HalfEven if quotient % 2 == 0 => quotient,
                RoundingMode::HalfEven => quotient + away,
            }
        }
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundingMode::HalfUp => write!(f, "half_up"),
            RoundingMode::HalfEven => write!(f, "half_even"),
        }
    }
}

/// Rounds a fractional cents value, expressed exactly as a ratio.
///
/// Free-function form of [`RoundingMode::round_ratio`] that also narrows the
/// result back into the i64 cents range.
pub fn round_cents(numerator: i128, denominator: i128, mode: RoundingMode) -> Option<i64> {
    i64::try_from(mode.round_ratio(numerator, denominator)).ok()
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the currency's minor unit ("cents").
///
/// ## Design Decisions
/// - **i64**: matches the JSON integers callers send and store
/// - **No float constructor**: a float never reaches a stored amount
/// - **Rate helpers return `Option`**: `None` means the result left i64
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    pub fn checked_mul_quantity(self, quantity: i64) -> Option<Money> {
        self.0.checked_mul(quantity).map(Money)
    }

    /// Tax added on top of an exclusive price: `round(self × bps / 10000)`.
    ///
    /// ## Example
    /// ```rust
    /// use levy_core::money::{Money, RoundingMode};
    ///
    /// // 10.50 at 5% = 0.525 → half_up 53, half_even 52
    /// let base = Money::from_cents(1050);
    /// assert_eq!(base.exclusive_tax(500, RoundingMode::HalfUp).unwrap().cents(), 53);
    /// assert_eq!(base.exclusive_tax(500, RoundingMode::HalfEven).unwrap().cents(), 52);
    /// ```
    pub fn exclusive_tax(self, rate_bps: u32, mode: RoundingMode) -> Option<Money> {
        round_cents(self.0 as i128 * rate_bps as i128, BPS_DENOMINATOR, mode).map(Money)
    }

    /// Tax embedded in an inclusive price: `round(self − self / (1 + r))`.
    ///
    /// The net base is `self - inclusive_tax`, so the two always add back up
    /// to the gross amount.
    pub fn inclusive_tax(self, rate_bps: u32, mode: RoundingMode) -> Option<Money> {
        let denominator = BPS_DENOMINATOR + rate_bps as i128;
        round_cents(self.0 as i128 * rate_bps as i128, denominator, mode).map(Money)
    }

    /// A percentage of this amount, e.g. a service charge on a subtotal.
    pub fn percentage(self, bps: u32, mode: RoundingMode) -> Option<Money> {
        round_cents(self.0 as i128 * bps as i128, BPS_DENOMINATOR, mode).map(Money)
    }
}

/// Display shows major.minor units without a currency symbol (debug only).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

// =============================================================================
// Line Totals
// =============================================================================

/// Effective total of one draft line.
///
/// ## Precedence
/// ```text
/// lineTotalCents present?  ──yes──►  lineTotalCents
///          │
///          no
///          ▼
/// (unitPriceCents + addonsCents + optionsDeltaCents) × quantity
/// ```
/// Overflow is reported, and a negative result is a contract violation.
pub fn line_total(line: &DraftLine) -> TaxResult<Money> {
    let overflow = || TaxError::Overflow {
        context: format!("line total of {}", line.id),
    };

    let total = match line.line_total_cents {
        Some(cents) => Money::from_cents(cents),
        None => {
            let unit = Money::from_cents(line.unit_price_cents)
                .checked_add(Money::from_cents(line.addons_cents))
                .and_then(|m| m.checked_add(Money::from_cents(line.options_delta_cents)))
                .ok_or_else(overflow)?;
            unit.checked_mul_quantity(line.quantity)
                .ok_or_else(overflow)?
        }
    };

    if total.cents() < 0 {
        return Err(ValidationError::Negative {
            field: format!("lines[{}].total", line.id),
            value: total.cents(),
        }
        .into());
    }

    Ok(total)
}

/// [`line_total`] in raw cents.
pub fn line_total_cents(line: &DraftLine) -> TaxResult<i64> {
    line_total(line).map(|m| m.cents())
}

// =============================================================================
// Unit Tests
// =============================================================================
