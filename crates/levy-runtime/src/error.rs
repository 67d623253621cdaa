//! # Runtime Error Types
//!
//! Errors raised around the engine: configuration, profile sources, and the
//! engine's own [`TaxError`] passed through unchanged.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Runtime Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────┐  ┌─────────────────────┐ │
//! │  │  Configuration  │  │   Profile Source    │  │      Engine         │ │
//! │  │                 │  │                     │  │                     │ │
//! │  │  InvalidConfig  │  │  ProfileNotFound    │  │  Tax(TaxError)      │ │
//! │  │  ConfigLoad     │  │  InvalidTenant      │  │  (contract          │ │
//! │  │                 │  │  SourceUnavailable ◄┼──┼── retryable only)   │ │
//! │  │                 │  │  ProfileParse       │  │                     │ │
//! │  └─────────────────┘  └─────────────────────┘  └─────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use levy_core::TaxError;
use thiserror::Error;

/// Result type alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid levy configuration: {0}")]
    InvalidConfig(String),

    /// Config file could not be read or parsed.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Profile Source Errors
    // =========================================================================
    #[error("No tax profile for tenant '{tenant}'")]
    ProfileNotFound { tenant: String },

    /// Tenant id that cannot name a profile (empty, path separators, ...).
    #[error("Invalid tenant id '{0}'")]
    InvalidTenant(String),

    /// The profile store could not be reached or read.
    #[error("Profile source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Profile document for tenant '{tenant}' is malformed: {reason}")]
    ProfileParseFailed { tenant: String, reason: String },

    // =========================================================================
    // Engine Errors
    // =========================================================================
    #[error(transparent)]
    Tax(#[from] TaxError),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for RuntimeError {
    fn from(err: std::io::Error) -> Self {
        RuntimeError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for RuntimeError {
    fn from(err: toml::de::Error) -> Self {
        RuntimeError::ConfigLoadFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl RuntimeError {
    /// Returns true if the operation can be retried unchanged.
    ///
    /// Only source availability is transient. A rejected draft or a broken
    /// profile document fails the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RuntimeError::SourceUnavailable(_))
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            RuntimeError::InvalidConfig(_) | RuntimeError::ConfigLoadFailed(_)
        )
    }

    /// Returns true if the caller sent something the engine refuses.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            RuntimeError::Tax(TaxError::Validation(_))
                | RuntimeError::Tax(TaxError::CurrencyMismatch { .. })
                | RuntimeError::Tax(TaxError::UnmatchedLine { .. })
                | RuntimeError::InvalidTenant(_)
        )
    }
}
