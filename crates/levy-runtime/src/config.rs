//! # Levy Configuration
//!
//! Runtime configuration for the tax service.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     LEVY_UNMATCHED_LINES=reject                                        │
//! │     LEVY_MAX_LINES=200                                                 │
//! │     LEVY_CACHE_TTL_SECS=60                                             │
//! │     LEVY_PROFILE_DIR=/srv/levy/profiles                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/levy/levy.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.levy.tax/levy.toml (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     untaxed unmatched lines, 500 lines, 5 minute cache                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # levy.toml
//! [engine]
//! unmatched_lines = "untaxed"  # untaxed | reject
//! max_lines = 500
//! max_quantity = 9999
//!
//! [cache]
//! ttl_secs = 300
//! max_entries = 1024
//!
//! [profiles]
//! dir = "/srv/levy/profiles"  # <dir>/<tenant>.json
//! ```

use chrono::Duration;
use levy_core::EngineOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{RuntimeError, RuntimeResult};

/// Longest accepted cache TTL (30 days).
pub const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;

// =============================================================================
// Cache Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// How long a fetched profile is served before refetching.
    /// 0 disables caching.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Upper bound on cached tenants. The oldest insert is evicted first.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_max_entries() -> usize {
    1024
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.ttl_secs.min(MAX_CACHE_TTL_SECS) as i64)
    }
}

// =============================================================================
// Profile Settings
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSettings {
    /// Directory holding one `<tenant>.json` profile per tenant.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevyConfig {
    #[serde(default)]
    pub engine: EngineOptions,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub profiles: ProfileSettings,
}

impl LevyConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (levy.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> RuntimeResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading levy config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load levy config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document and validates it. No environment overrides.
    pub fn from_toml_str(contents: &str) -> RuntimeResult<Self> {
        let config: LevyConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> RuntimeResult<()> {
        if self.engine.max_lines == 0 {
            return Err(RuntimeError::InvalidConfig(
                "engine.max_lines must be greater than 0".into(),
            ));
        }

        if self.engine.max_quantity <= 0 {
            return Err(RuntimeError::InvalidConfig(
                "engine.max_quantity must be greater than 0".into(),
            ));
        }

        if self.cache.max_entries == 0 {
            return Err(RuntimeError::InvalidConfig(
                "cache.max_entries must be greater than 0".into(),
            ));
        }

        if self.cache.ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(RuntimeError::InvalidConfig(format!(
                "cache.ttl_secs must be at most {}, got {}",
                MAX_CACHE_TTL_SECS, self.cache.ttl_secs
            )));
        }

        if let Some(dir) = &self.profiles.dir {
            if dir.as_os_str().is_empty() {
                return Err(RuntimeError::InvalidConfig(
                    "profiles.dir must not be empty".into(),
                ));
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup (the process environment in
    /// production).
    pub(crate) fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(policy) = lookup("LEVY_UNMATCHED_LINES") {
            match policy.parse() {
                Ok(parsed) => {
                    debug!(policy = %policy, "Overriding unmatched line policy from environment");
                    self.engine.unmatched_lines = parsed;
                }
                Err(_) => warn!(policy = %policy, "Unknown unmatched line policy in environment"),
            }
        }

        if let Some(max) = lookup("LEVY_MAX_LINES") {
            if let Ok(m) = max.parse::<usize>() {
                self.engine.max_lines = m;
            }
        }

        if let Some(ttl) = lookup("LEVY_CACHE_TTL_SECS") {
            if let Ok(t) = ttl.parse::<u64>() {
                debug!(ttl_secs = t, "Overriding cache TTL from environment");
                self.cache.ttl_secs = t;
            }
        }

        if let Some(dir) = lookup("LEVY_PROFILE_DIR") {
            debug!(dir = %dir, "Overriding profile directory from environment");
            self.profiles.dir = Some(PathBuf::from(dir));
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "levy", "tax")
            .map(|dirs| dirs.config_dir().join("levy.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use levy_core::UnmatchedLinePolicy;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = LevyConfig::default();
        assert_eq!(config.engine.unmatched_lines, UnmatchedLinePolicy::Untaxed);
        assert_eq!(config.engine.max_lines, 500);
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.cache.max_entries, 1024);
        assert!(config.profiles.dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_sections() {
        let config = LevyConfig::from_toml_str(
            r#"
            [engine]
            unmatched_lines = "reject"

            [cache]
            ttl_secs = 60

            [profiles]
            dir = "/srv/levy/profiles"
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.unmatched_lines, UnmatchedLinePolicy::Reject);
        assert_eq!(config.engine.max_quantity, 9999);
        assert_eq!(config.cache.ttl(), Duration::seconds(60));
        assert_eq!(config.cache.max_entries, 1024);
        assert_eq!(config.profiles.dir, Some(PathBuf::from("/srv/levy/profiles")));
    }

    #[test]
    fn test_config_validation() {
        let mut config = LevyConfig::default();
        config.engine.max_lines = 0;
        assert!(config.validate().is_err());

        config = LevyConfig::default();
        config.cache.max_entries = 0;
        assert!(config.validate().is_err());

        config = LevyConfig::default();
        config.cache.ttl_secs = MAX_CACHE_TTL_SECS + 1;
        assert!(config.validate().is_err());

        assert!(matches!(
            LevyConfig::from_toml_str("[engine]\nmax_lines = \"many\""),
            Err(RuntimeError::ConfigLoadFailed(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("LEVY_UNMATCHED_LINES", "strict"),
            ("LEVY_MAX_LINES", "50"),
            ("LEVY_CACHE_TTL_SECS", "not-a-number"),
            ("LEVY_PROFILE_DIR", "/tmp/profiles"),
        ]
        .into_iter()
        .collect();

        let mut config = LevyConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.engine.unmatched_lines, UnmatchedLinePolicy::Reject);
        assert_eq!(config.engine.max_lines, 50);
        // Unparseable values are ignored.
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.profiles.dir, Some(PathBuf::from("/tmp/profiles")));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("levy-config-that-does-not-exist.toml");
        let config = LevyConfig::load_or_default(Some(path));
        assert_eq!(config.cache.ttl_secs, default_ttl_secs());
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&LevyConfig::default()).unwrap();
        assert!(toml_str.contains("[engine]"));
        assert!(toml_str.contains("[cache]"));
    }
}
