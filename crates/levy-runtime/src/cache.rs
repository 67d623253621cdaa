//! # Profile Cache
//!
//! Tenant profiles keyed by tenant id, served until their TTL runs out.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ProfileCache                                    │
//! │                                                                         │
//! │  get(tenant, now)                                                      │
//! │     ├── absent ─────────────────────────────────► None (miss)          │
//! │     ├── now - inserted_at >= ttl ── remove ─────► None (expired)       │
//! │     └── fresh ──────────────────────────────────► Some(Arc<profile>)   │
//! │                                                                         │
//! │  insert(tenant, profile, now)                                          │
//! │     ├── drop expired entries                                           │
//! │     ├── still full? evict the OLDEST insert                            │
//! │     └── store (tenant → profile, now)                                  │
//! │                                                                         │
//! │  invalidate(tenant) / clear()                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cache never reads the clock. Callers pass `now`, so expiry is a
//! plain function of its inputs. It is an explicit value owned by whoever
//! builds it; there is no process-wide instance.

use chrono::{DateTime, Duration, Utc};
use levy_core::TaxProfile;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::CacheSettings;

#[derive(Debug, Clone)]
struct CacheEntry {
    profile: Arc<TaxProfile>,
    inserted_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.inserted_at >= ttl
    }
}

#[derive(Debug)]
pub struct ProfileCache {
    ttl: Duration,
    max_entries: usize,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ProfileCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        ProfileCache {
            ttl,
            max_entries: max_entries.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.ttl(), settings.max_entries)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached profile if it is still fresh at `now`.
    pub async fn get(&self, tenant: &str, now: DateTime<Utc>) -> Option<Arc<TaxProfile>> {
        {
            let entries = self.entries.read().await;
            match entries.get(tenant) {
                None => {
                    debug!(tenant = %tenant, "Profile cache miss");
                    return None;
                }
                Some(entry) if !entry.is_expired(now, self.ttl) => {
                    debug!(tenant = %tenant, "Profile cache hit");
                    return Some(Arc::clone(&entry.profile));
                }
                Some(_) => {}
            }
        }

        // Expired: re-check under the write lock, another task may have
        // refreshed it in between.
        let mut entries = self.entries.write().await;
        match entries.get(tenant) {
            Some(entry) if !entry.is_expired(now, self.ttl) => Some(Arc::clone(&entry.profile)),
            Some(_) => {
                debug!(tenant = %tenant, "Profile cache entry expired");
                entries.remove(tenant);
                None
            }
            None => None,
        }
    }

    /// Stores a profile fetched at `now` and returns the shared handle.
    pub async fn insert(
        &self,
        tenant: &str,
        profile: TaxProfile,
        now: DateTime<Utc>,
    ) -> Arc<TaxProfile> {
        let profile = Arc::new(profile);
        let mut entries = self.entries.write().await;

        if !entries.contains_key(tenant) && entries.len() >= self.max_entries {
            let ttl = self.ttl;
            entries.retain(|_, entry| !entry.is_expired(now, ttl));

            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by(|(ka, a), (kb, b)| {
                        a.inserted_at.cmp(&b.inserted_at).then_with(|| ka.cmp(kb))
                    })
                    .map(|(key, _)| key.clone());
                if let Some(key) = oldest {
                    debug!(tenant = %key, "Evicting oldest cached profile");
                    entries.remove(&key);
                }
            }
        }

        entries.insert(
            tenant.to_string(),
            CacheEntry {
                profile: Arc::clone(&profile),
                inserted_at: now,
            },
        );
        profile
    }

    /// Drops one tenant's profile. Returns true if it was cached.
    pub async fn invalidate(&self, tenant: &str) -> bool {
        let removed = self.entries.write().await.remove(tenant).is_some();
        if removed {
            debug!(tenant = %tenant, "Profile cache entry invalidated");
        }
        removed
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn profile(currency: &str) -> TaxProfile {
        TaxProfile {
            currency: currency.to_string(),
            ..TaxProfile::default()
        }
    }

    #[tokio::test]
    async fn test_hit_until_ttl() {
        let cache = ProfileCache::new(Duration::seconds(60), 8);
        cache.insert("acme", profile("USD"), t0()).await;

        let hit = cache.get("acme", t0() + Duration::seconds(59)).await;
        assert_eq!(hit.unwrap().currency, "USD");

        assert!(cache.get("acme", t0() + Duration::seconds(60)).await.is_none());
        // Expired entries are dropped on read.
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_zero_ttl_never_serves() {
        let cache = ProfileCache::new(Duration::zero(), 8);
        cache.insert("acme", profile("USD"), t0()).await;
        assert!(cache.get("acme", t0()).await.is_none());
    }

    #[tokio::test]
    async fn test_evicts_oldest_insert() {
        let cache = ProfileCache::new(Duration::seconds(600), 2);
        cache.insert("a", profile("USD"), t0()).await;
        cache.insert("b", profile("EUR"), t0() + Duration::seconds(1)).await;
        cache.insert("c", profile("GBP"), t0() + Duration::seconds(2)).await;

        let now = t0() + Duration::seconds(3);
        assert_eq!(cache.len().await, 2);
        assert!(cache.get("a", now).await.is_none());
        assert!(cache.get("b", now).await.is_some());
        assert!(cache.get("c", now).await.is_some());
    }

    #[tokio::test]
    async fn test_reinsert_does_not_evict() {
        let cache = ProfileCache::new(Duration::seconds(600), 2);
        cache.insert("a", profile("USD"), t0()).await;
        cache.insert("b", profile("EUR"), t0()).await;
        cache.insert("a", profile("CHF"), t0() + Duration::seconds(5)).await;

        let now = t0() + Duration::seconds(6);
        assert_eq!(cache.get("a", now).await.unwrap().currency, "CHF");
        assert!(cache.get("b", now).await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache = ProfileCache::new(Duration::seconds(60), 8);
        cache.insert("a", profile("USD"), t0()).await;
        cache.insert("b", profile("EUR"), t0()).await;

        assert!(cache.invalidate("a").await);
        assert!(!cache.invalidate("a").await);
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
