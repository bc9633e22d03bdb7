//! Time-bounded cache of validated principals
//!
//! Entries live for the duration the identity provider advertised in its
//! `Cache-Control: max-age` response header, so the ttl is stored per entry.

use crate::types::Principal;
use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cache key scoping a credential to its tenant
pub fn cache_key(tenant_id: &str, credential: &str) -> String {
    format!("{tenant_id}/{credential}")
}

/// Store of principals keyed by `tenant/credential`.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait PrincipalCache: Send + Sync {
    /// Cached principal for the key, if present and not expired
    async fn get(&self, key: &str) -> Option<Principal>;

    /// Store a principal for `ttl`. Callers only store positive ttls.
    async fn set(&self, key: String, principal: Principal, ttl: Duration);
}

#[derive(Clone)]
struct CachedPrincipal {
    principal: Arc<Principal>,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, CachedPrincipal> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedPrincipal,
        _created_at: Instant,
    ) -> Option<Duration> {
        // a zero ttl never reaches the cache through the validator; treat it as unbounded
        (!value.ttl.is_zero()).then_some(value.ttl)
    }

    fn expire_after_update(
        &self,
        key: &String,
        value: &CachedPrincipal,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        self.expire_after_create(key, value, updated_at)
    }
}

/// In-process [`PrincipalCache`] backed by moka
pub struct MokaPrincipalCache {
    cache: Cache<String, CachedPrincipal>,
}

impl std::fmt::Debug for MokaPrincipalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaPrincipalCache")
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl MokaPrincipalCache {
    /// Create a cache holding at most `max_capacity` principals
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl PrincipalCache for MokaPrincipalCache {
    async fn get(&self, key: &str) -> Option<Principal> {
        self.cache
            .get(key)
            .await
            .map(|entry| (*entry.principal).clone())
    }

    async fn set(&self, key: String, principal: Principal, ttl: Duration) {
        let entry = CachedPrincipal {
            principal: Arc::new(principal),
            ttl,
        };
        self.cache.insert(key, entry).await;
    }
}
