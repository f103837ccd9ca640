//! # Warden Cache - Caching Layer
//!
//! Key-value cache primitives for memoizing permission-resolution results:
//! the [`CacheStore`] capability, the cache key scheme, serialized cache
//! values, and an in-memory moka-backed store.
//!
//! Entries are stored forever, with no TTL. Staleness is resolved by
//! explicit invalidation only, either per authority or by flushing the
//! whole scope tag.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use warden_types::{Ability, Entity, RolesLookup, StoreError, StoreResult};

// ============================================================================
// Cache Keys
// ============================================================================

/// The four kinds of per-authority cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Abilities,
    RestrictedAbilities,
    Roles,
    RestrictedRoles,
}

impl CacheKind {
    pub const ALL: [CacheKind; 4] = [
        CacheKind::Abilities,
        CacheKind::RestrictedAbilities,
        CacheKind::Roles,
        CacheKind::RestrictedRoles,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Abilities => "abilities",
            CacheKind::RestrictedAbilities => "restricted-abilities",
            CacheKind::Roles => "roles",
            CacheKind::RestrictedRoles => "restricted-roles",
        }
    }
}

/// The cache key for an authority's entry of the given kind.
///
/// Layout: `{tag}-{kind}-{authority type}-{authority id}-{a|f}`, plus a
/// `-restricted-to-{type}[-{id}]` suffix when a restriction is in play.
pub fn cache_key(
    tag: &str,
    kind: CacheKind,
    authority: &Entity,
    allowed: bool,
    restriction: Option<&Entity>,
) -> String {
    let mut key = authority_prefix(tag, kind, authority, allowed);

    if let Some(entity) = restriction {
        key.push_str("-restricted-to-");
        key.push_str(&entity.kind);
        if let Some(id) = entity.id {
            key.push('-');
            key.push_str(&id.to_string());
        }
    }

    key
}

/// The restriction-independent prefix shared by every key of this kind for
/// this authority. Targeted invalidation evicts by prefix match.
pub fn authority_prefix(tag: &str, kind: CacheKind, authority: &Entity, allowed: bool) -> String {
    let id = authority.id.map(|id| id.to_string()).unwrap_or_default();
    let flag = if allowed { "a" } else { "f" };

    format!("{tag}-{}-{}-{id}-{flag}", kind.as_str(), authority.kind)
}

// ============================================================================
// Cached Values
// ============================================================================

/// A cache entry payload, serialized for storage and rehydrated on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CachedValue {
    Abilities(Vec<Ability>),
    Roles(RolesLookup),
}

impl CachedValue {
    pub fn serialize(&self) -> StoreResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn deserialize(value: Value) -> StoreResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn into_abilities(self) -> StoreResult<Vec<Ability>> {
        match self {
            CachedValue::Abilities(abilities) => Ok(abilities),
            CachedValue::Roles(_) => {
                Err(StoreError::Internal("cache entry holds roles, expected abilities".into()))
            }
        }
    }

    pub fn into_roles(self) -> StoreResult<RolesLookup> {
        match self {
            CachedValue::Roles(lookup) => Ok(lookup),
            CachedValue::Abilities(_) => {
                Err(StoreError::Internal("cache entry holds abilities, expected roles".into()))
            }
        }
    }
}

// ============================================================================
// Cache Store Capability
// ============================================================================

/// An external key-value cache.
///
/// Implementations may block on I/O; errors propagate unchanged. `forever`
/// stores without expiry. Backends that can drop their whole namespace in
/// one call report `supports_flush`; callers fall back to per-key eviction
/// otherwise.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    async fn forever(&self, key: &str, value: Value) -> StoreResult<()>;

    async fn forget(&self, key: &str) -> StoreResult<()>;

    fn supports_flush(&self) -> bool {
        false
    }

    /// Drop every entry in this store's namespace. Only meaningful when
    /// `supports_flush` is true.
    async fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// In-memory [`CacheStore`] backed by moka, with no TTL.
pub struct MemoryCacheStore {
    entries: Cache<String, Value>,
    bulk_flush: bool,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl MemoryCacheStore {
    const DEFAULT_CAPACITY: u64 = 10_000;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max_capacity).build(),
            bulk_flush: true,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// A store that cannot drop its namespace in bulk, like a shared
    /// backend without tag support. Callers must evict tracked keys
    /// one by one.
    pub fn without_bulk_flush() -> Self {
        Self { bulk_flush: false, ..Self::new() }
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);

        let total = hits + misses;
        let hit_rate = if total > 0 { (hits as f64 / total as f64) * 100.0 } else { 0.0 };

        CacheStats {
            entry_count: self.entries.entry_count(),
            hits,
            misses,
            hit_rate,
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let value = self.entries.get(key).await;
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(value)
    }

    async fn forever(&self, key: &str, value: Value) -> StoreResult<()> {
        self.entries.insert(key.to_string(), value).await;
        Ok(())
    }

    async fn forget(&self, key: &str) -> StoreResult<()> {
        self.entries.invalidate(key).await;
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn supports_flush(&self) -> bool {
        self.bulk_flush
    }

    async fn flush(&self) -> StoreResult<()> {
        self.entries.invalidate_all();
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entry_count: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub invalidations: u64,
}
