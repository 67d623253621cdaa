//! # Profile Sources
//!
//! Where tenant tax profiles come from.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ProfileSource::fetch(tenant)                                           │
//! │                                                                         │
//! │  MemoryProfileSource   HashMap behind a RwLock (tests, embedding)       │
//! │  DirProfileSource      <dir>/<tenant>.json read with tokio::fs          │
//! │                                                                         │
//! │  missing tenant ──► ProfileNotFound                                    │
//! │  unreadable     ──► SourceUnavailable (retryable)                      │
//! │  bad JSON       ──► ProfileParseFailed                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use levy_core::TaxProfile;
use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::LevyConfig;
use crate::error::{RuntimeError, RuntimeResult};

/// Fetches the current profile for a tenant.
pub trait ProfileSource: Send + Sync {
    fn fetch(&self, tenant: &str) -> impl Future<Output = RuntimeResult<TaxProfile>> + Send;
}

/// Checks a tenant id can safely name a profile.
///
/// Allowed: ASCII letters, digits, `-`, `_`, `.` (not leading).
pub fn validate_tenant(tenant: &str) -> RuntimeResult<()> {
    let valid = !tenant.is_empty()
        && tenant.len() <= 128
        && !tenant.starts_with('.')
        && tenant
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(RuntimeError::InvalidTenant(tenant.to_string()))
    }
}

// =============================================================================
// In-Memory Source
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryProfileSource {
    profiles: RwLock<HashMap<String, TaxProfile>>,
}

impl MemoryProfileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert for setup code.
    pub fn with_profile(mut self, tenant: &str, profile: TaxProfile) -> Self {
        self.profiles.get_mut().insert(tenant.to_string(), profile);
        self
    }

    /// Replaces (or adds) a tenant's profile.
    pub async fn put(&self, tenant: &str, profile: TaxProfile) {
        self.profiles
            .write()
            .await
            .insert(tenant.to_string(), profile);
    }

    pub async fn remove(&self, tenant: &str) -> Option<TaxProfile> {
        self.profiles.write().await.remove(tenant)
    }
}

impl ProfileSource for MemoryProfileSource {
    async fn fetch(&self, tenant: &str) -> RuntimeResult<TaxProfile> {
        self.profiles
            .read()
            .await
            .get(tenant)
            .cloned()
            .ok_or_else(|| RuntimeError::ProfileNotFound {
                tenant: tenant.to_string(),
            })
    }
}

// =============================================================================
// Directory Source
// =============================================================================

/// One JSON profile document per tenant: `<dir>/<tenant>.json`.
#[derive(Debug, Clone)]
pub struct DirProfileSource {
    dir: PathBuf,
}

impl DirProfileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirProfileSource { dir: dir.into() }
    }

    /// Builds the source from `[profiles] dir`.
    pub fn from_config(config: &LevyConfig) -> RuntimeResult<Self> {
        config
            .profiles
            .dir
            .as_ref()
            .map(|dir| Self::new(dir.clone()))
            .ok_or_else(|| RuntimeError::InvalidConfig("profiles.dir is not set".into()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, tenant: &str) -> RuntimeResult<PathBuf> {
        validate_tenant(tenant)?;
        Ok(self.dir.join(format!("{}.json", tenant)))
    }
}

impl ProfileSource for DirProfileSource {
    async fn fetch(&self, tenant: &str) -> RuntimeResult<TaxProfile> {
        let path = self.path_for(tenant)?;
        debug!(?path, "Reading tax profile");

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RuntimeError::ProfileNotFound {
                    tenant: tenant.to_string(),
                })
            }
            Err(e) => {
                return Err(RuntimeError::SourceUnavailable(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&contents).map_err(|e| RuntimeError::ProfileParseFailed {
            tenant: tenant.to_string(),
            reason: e.to_string(),
        })
    }
}
