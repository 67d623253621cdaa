//! # Tax Service
//!
//! Thin façade: tenant → profile (through the cache) → engine.
//!
//! ```text
//! quote(tenant, draft, now)
//!    │
//!    ├── cache.get(tenant, now) ── hit ──────────────┐
//!    │        │ miss / expired                        │
//!    │        ▼                                       │
//!    │   source.fetch(tenant) ── cache.insert ───────┤
//!    │                                                ▼
//!    └────────────► levy_core::calculate_with(draft, profile, engine options)
//! ```
//!
//! The service adds no tax semantics of its own. Engine errors come back
//! unchanged inside [`RuntimeError::Tax`].

use chrono::{DateTime, Utc};
use levy_core::{calculate_with, DraftOrder, TaxProfile, TaxSnapshot};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::ProfileCache;
use crate::config::LevyConfig;
use crate::error::RuntimeResult;
use crate::source::ProfileSource;

#[derive(Debug)]
pub struct TaxService<S> {
    config: LevyConfig,
    source: S,
    cache: ProfileCache,
}

impl<S: ProfileSource> TaxService<S> {
    /// Builds a service with a cache sized from `config.cache`.
    pub fn new(config: LevyConfig, source: S) -> Self {
        let cache = ProfileCache::from_settings(&config.cache);
        TaxService {
            config,
            source,
            cache,
        }
    }

    pub fn config(&self) -> &LevyConfig {
        &self.config
    }

    pub fn cache(&self) -> &ProfileCache {
        &self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Current profile for a tenant, fetched on a cache miss.
    pub async fn profile(&self, tenant: &str, now: DateTime<Utc>) -> RuntimeResult<Arc<TaxProfile>> {
        if let Some(profile) = self.cache.get(tenant, now).await {
            return Ok(profile);
        }

        let profile = self.source.fetch(tenant).await?;
        info!(tenant = %tenant, currency = %profile.currency, "Tax profile fetched");
        Ok(self.cache.insert(tenant, profile, now).await)
    }

    /// Calculates a snapshot for a tenant's draft order.
    pub async fn quote(
        &self,
        tenant: &str,
        draft: &DraftOrder,
        now: DateTime<Utc>,
    ) -> RuntimeResult<TaxSnapshot> {
        let profile = self.profile(tenant, now).await?;
        let snapshot = calculate_with(draft, &profile, &self.config.engine)?;

        debug!(
            tenant = %tenant,
            grand_total = snapshot.totals.grand_total_cents,
            "Quote calculated"
        );
        Ok(snapshot)
    }

    /// Forces the next quote for `tenant` to refetch its profile.
    pub async fn invalidate(&self, tenant: &str) -> bool {
        self.cache.invalidate(tenant).await
    }
}
