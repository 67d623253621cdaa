//! # Engine Options
//!
//! Knobs passed into [`calculate_with`](crate::engine::calculate_with).
//!
//! Options are plain data. levy-core never reads files or the environment;
//! `levy-runtime` deserializes these from the `[engine]` section of its
//! TOML config and applies environment overrides.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::{DEFAULT_MAX_LINES, DEFAULT_MAX_QUANTITY};

// =============================================================================
// Unmatched Line Policy
// =============================================================================

/// What happens to a line that no rate rule applies to.
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  UNTAXED (Default)                 │  REJECT                            │
/// │  ─────────────────                 │  ──────                            │
/// │  Line base goes to the NO_RULE     │  Calculation fails with            │
/// │  exempt bucket, tax 0.             │  TaxError::UnmatchedLine.          │
/// │  Misconfigured profiles degrade    │  For tenants who would rather      │
/// │  visibly in the snapshot.          │  block checkout than under-tax.    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedLinePolicy {
    #[default]
    Untaxed,
    Reject,
}

impl fmt::Display for UnmatchedLinePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmatchedLinePolicy::Untaxed => write!(f, "untaxed"),
            UnmatchedLinePolicy::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for UnmatchedLinePolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "untaxed" | "permissive" => Ok(UnmatchedLinePolicy::Untaxed),
            "reject" | "strict" => Ok(UnmatchedLinePolicy::Reject),
            other => Err(ValidationError::InvalidFormat {
                field: "unmatched_lines".to_string(),
                reason: format!("unknown policy '{}', expected untaxed or reject", other),
            }),
        }
    }
}

// =============================================================================
// Engine Options
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    #[serde(default)]
    pub unmatched_lines: UnmatchedLinePolicy,

    /// Largest accepted draft (lines before the synthetic delivery line).
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,

    /// Largest accepted quantity on a single line.
    #[serde(default = "default_max_quantity")]
    pub max_quantity: i64,
}

fn default_max_lines() -> usize {
    DEFAULT_MAX_LINES
}

fn default_max_quantity() -> i64 {
    DEFAULT_MAX_QUANTITY
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            unmatched_lines: UnmatchedLinePolicy::default(),
            max_lines: default_max_lines(),
            max_quantity: default_max_quantity(),
        }
    }
}

impl EngineOptions {
    /// Strict variant used by tenants that opt out of the NO_RULE bucket.
    pub fn strict() -> Self {
        EngineOptions {
            unmatched_lines: UnmatchedLinePolicy::Reject,
            ..EngineOptions::default()
        }
    }
}
