//! Cache-backed clipboard.
//!
//! Wraps the direct clipboard and memoizes its two read paths (ability
//! lists and role lookups) in a [`CacheStore`]. Entries are stored forever
//! and invalidated explicitly: callers must `refresh`/`refresh_for` after
//! any mutation affecting an authority. Until then, stale reads persist.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use warden_cache::{CacheKind, CacheStore, CachedValue, authority_prefix, cache_key};
use warden_types::{Ability, Entity, RolesLookup, Scope, Target};

use crate::clipboard::{Clipboard, DirectClipboard};
use crate::Result;

/// Base cache tag, namespaced by the scope.
pub const CACHE_TAG: &str = "warden";

/// Clipboard memoizing resolution state per authority.
///
/// Every stored key is also recorded in a tracked-key set. Bulk `refresh`
/// uses the store's namespace flush when available and falls back to
/// evicting the tracked keys one by one; `refresh_for` always works through
/// the tracked set, evicting the keys whose prefix matches the authority.
pub struct CachedClipboard {
    inner: DirectClipboard,
    cache: Arc<dyn CacheStore>,
    tag: String,
    tracked: RwLock<HashSet<String>>,
}

impl CachedClipboard {
    pub fn new(inner: DirectClipboard, cache: Arc<dyn CacheStore>) -> Self {
        Self::scoped(inner, cache, &Scope::default())
    }

    pub fn scoped(inner: DirectClipboard, cache: Arc<dyn CacheStore>, scope: &Scope) -> Self {
        Self {
            inner,
            cache,
            tag: scope.tag(CACHE_TAG),
            tracked: RwLock::new(HashSet::new()),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Store a value forever and record its key for targeted invalidation.
    async fn remember_forever(&self, key: &str, value: &CachedValue) -> Result<()> {
        self.cache.forever(key, value.serialize()?).await?;
        self.tracked.write().await.insert(key.to_string());
        Ok(())
    }

    fn abilities_key(
        &self,
        authority: &Entity,
        allowed: bool,
        restriction: Option<&Entity>,
    ) -> String {
        match restriction {
            Some(entity) => cache_key(
                &self.tag,
                CacheKind::RestrictedAbilities,
                authority,
                allowed,
                Some(entity),
            ),
            None => cache_key(&self.tag, CacheKind::Abilities, authority, allowed, None),
        }
    }

    fn roles_key(&self, authority: &Entity, restriction: Option<&Entity>) -> String {
        match restriction {
            Some(entity) => {
                cache_key(&self.tag, CacheKind::RestrictedRoles, authority, true, Some(entity))
            }
            None => cache_key(&self.tag, CacheKind::Roles, authority, true, None),
        }
    }
}

#[async_trait]
impl Clipboard for CachedClipboard {
    #[instrument(skip(self, authority), fields(authority = %authority.kind))]
    async fn get_abilities(
        &self,
        authority: &Entity,
        allowed: bool,
        restriction: Option<&Entity>,
    ) -> Result<Vec<Ability>> {
        let key = self.abilities_key(authority, allowed, restriction);

        if let Some(value) = self.cache.get(&key).await? {
            debug!(%key, "ability cache hit");
            return Ok(CachedValue::deserialize(value)?.into_abilities()?);
        }

        let abilities = self.inner.get_abilities(authority, allowed, restriction).await?;
        self.remember_forever(&key, &CachedValue::Abilities(abilities.clone())).await?;
        debug!(%key, count = abilities.len(), "ability cache filled");

        Ok(abilities)
    }

    /// Compute-once-per-key lookup: a present entry is a hit even when it
    /// is empty, and only a true miss reaches the store.
    #[instrument(skip(self, authority), fields(authority = %authority.kind))]
    async fn get_roles_lookup(
        &self,
        authority: &Entity,
        restriction: Option<&Entity>,
    ) -> Result<RolesLookup> {
        let key = self.roles_key(authority, restriction);

        if let Some(value) = self.cache.get(&key).await? {
            return Ok(CachedValue::deserialize(value)?.into_roles()?);
        }

        let lookup = self.inner.get_roles_lookup(authority, restriction).await?;
        self.remember_forever(&key, &CachedValue::Roles(lookup.clone())).await?;

        Ok(lookup)
    }

    fn is_owned_by(&self, authority: &Entity, target: Option<&Target>) -> bool {
        self.inner.is_owned_by(authority, target)
    }

    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<()> {
        if self.cache.supports_flush() {
            self.cache.flush().await?;
            self.tracked.write().await.clear();
            debug!(tag = %self.tag, "cache flushed");
            return Ok(());
        }

        let keys: Vec<String> = self.tracked.read().await.iter().cloned().collect();
        for key in &keys {
            self.cache.forget(key).await?;
        }
        self.tracked.write().await.clear();
        debug!(tag = %self.tag, evicted = keys.len(), "tracked keys evicted");

        Ok(())
    }

    #[instrument(skip(self, authority), fields(authority = %authority.kind))]
    async fn refresh_for(&self, authority: &Entity) -> Result<()> {
        let mut prefixes = Vec::with_capacity(CacheKind::ALL.len() * 2);
        for kind in CacheKind::ALL {
            for allowed in [true, false] {
                prefixes.push(authority_prefix(&self.tag, kind, authority, allowed));
            }
        }

        let mut tracked = self.tracked.write().await;
        let matched: Vec<String> = tracked
            .iter()
            .filter(|key| prefixes.iter().any(|prefix| key.starts_with(prefix.as_str())))
            .cloned()
            .collect();

        for key in &matched {
            self.cache.forget(key).await?;
            tracked.remove(key);
        }
        debug!(evicted = matched.len(), "authority cache entries evicted");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_cache::MemoryCacheStore;
    use warden_store::{MemoryBackend, PermissionStore};
    use warden_types::Permission;

    fn user(id: u64) -> Entity {
        Entity::new("users", id)
    }

    async fn grant(store: &MemoryBackend, name: &str, grantee: &Entity) {
        let ability = store.find_or_create_ability(name, None, None, false).await.unwrap();
        store
            .insert_permission(Permission {
                ability_id: ability.id,
                grantee: Some(grantee.clone()),
                forbidden: false,
            })
            .await
            .unwrap();
    }

    fn cached(store: Arc<MemoryBackend>, cache: Arc<dyn CacheStore>) -> CachedClipboard {
        CachedClipboard::new(DirectClipboard::new(store), cache)
    }

    #[tokio::test]
    async fn test_second_read_is_served_from_cache() {
        let store = Arc::new(MemoryBackend::new());
        let alice = user(1);
        grant(&store, "ban-users", &alice).await;

        let clipboard = cached(store.clone(), Arc::new(MemoryCacheStore::new()));

        let first = clipboard.get_abilities(&alice, true, None).await.unwrap();
        store.reset_query_count();

        let second = clipboard.get_abilities(&alice, true, None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.query_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_roles_lookup_is_computed_once() {
        let store = Arc::new(MemoryBackend::new());
        let alice = user(1);

        let clipboard = cached(store.clone(), Arc::new(MemoryCacheStore::new()));

        let lookup = clipboard.get_roles_lookup(&alice, None).await.unwrap();
        assert!(lookup.is_empty());

        store.reset_query_count();
        let lookup = clipboard.get_roles_lookup(&alice, None).await.unwrap();
        assert!(lookup.is_empty());
        assert_eq!(store.query_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_for_only_touches_that_authority() {
        let store = Arc::new(MemoryBackend::new());
        let alice = user(1);
        let bob = user(2);
        grant(&store, "ban-users", &alice).await;
        grant(&store, "ban-users", &bob).await;

        let clipboard = cached(store.clone(), Arc::new(MemoryCacheStore::new()));

        clipboard.get_abilities(&alice, true, None).await.unwrap();
        clipboard.get_abilities(&bob, true, None).await.unwrap();

        clipboard.refresh_for(&alice).await.unwrap();
        store.reset_query_count();

        // Alice misses, Bob still hits.
        clipboard.get_abilities(&alice, true, None).await.unwrap();
        assert_eq!(store.query_count(), 1);

        store.reset_query_count();
        clipboard.get_abilities(&bob, true, None).await.unwrap();
        assert_eq!(store.query_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_without_bulk_flush_evicts_tracked_keys() {
        let store = Arc::new(MemoryBackend::new());
        let alice = user(1);
        grant(&store, "ban-users", &alice).await;

        let clipboard = cached(store.clone(), Arc::new(MemoryCacheStore::without_bulk_flush()));

        clipboard.get_abilities(&alice, true, None).await.unwrap();
        clipboard.get_roles_lookup(&alice, None).await.unwrap();

        clipboard.refresh().await.unwrap();
        store.reset_query_count();

        clipboard.get_abilities(&alice, true, None).await.unwrap();
        clipboard.get_roles_lookup(&alice, None).await.unwrap();
        assert_eq!(store.query_count(), 2);
    }

    #[tokio::test]
    async fn test_scope_namespaces_the_tag() {
        let store = Arc::new(MemoryBackend::new());
        let clipboard = CachedClipboard::scoped(
            DirectClipboard::new(store),
            Arc::new(MemoryCacheStore::new()),
            &Scope::named("tenant-a"),
        );

        assert_eq!(clipboard.tag(), "warden-tenant-a");
    }
}
