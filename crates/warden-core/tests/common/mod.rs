//! Helper utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use warden_cache::{CacheStore, MemoryCacheStore};
use warden_core::{
    AbilityGrant, AssignsRoles, CachedClipboard, Clipboard, DirectClipboard, GivesAbilities,
    Grantee, OwnershipFn, OwnershipResolver, RemovesAbilities, RemovesRoles,
};
use warden_store::MemoryBackend;
use warden_types::{Entity, RoleRef, Target};

pub fn user(id: u64) -> Entity {
    Entity::new("users", id)
}

pub fn account(id: u64) -> Entity {
    Entity::new("accounts", id)
}

/// Test fixture wiring a memory store, a cache store and a cached clipboard.
pub struct TestFixture {
    pub store: Arc<MemoryBackend>,
    pub clipboard: CachedClipboard,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::build(Arc::new(MemoryCacheStore::new()), None)
    }

    /// A fixture whose cache store cannot flush its namespace in bulk,
    /// forcing the tracked-key invalidation path.
    pub fn without_bulk_flush() -> Self {
        Self::build(Arc::new(MemoryCacheStore::without_bulk_flush()), None)
    }

    pub fn with_ownership(
        predicate: impl Fn(&Entity, &Entity) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::build(
            Arc::new(MemoryCacheStore::new()),
            Some(Arc::new(OwnershipFn::new(predicate))),
        )
    }

    fn build(
        cache: Arc<dyn CacheStore>,
        ownership: Option<Arc<dyn OwnershipResolver>>,
    ) -> Self {
        let store = Arc::new(MemoryBackend::new());
        let direct = match ownership {
            Some(ownership) => DirectClipboard::with_ownership(store.clone(), ownership),
            None => DirectClipboard::new(store.clone()),
        };

        Self { store, clipboard: CachedClipboard::new(direct, cache) }
    }

    pub async fn allow(&self, grantee: impl Into<Grantee>, abilities: &[&str]) {
        let grants = abilities.iter().map(|name| AbilityGrant::simple(*name)).collect();
        GivesAbilities::allowing(self.store.clone(), grants).to(grantee).await.unwrap();
    }

    pub async fn allow_targeted(&self, grantee: impl Into<Grantee>, name: &str, target: Target) {
        GivesAbilities::allowing(self.store.clone(), vec![AbilityGrant::for_target(name, target)])
            .to(grantee)
            .await
            .unwrap();
    }

    pub async fn allow_owned(&self, grantee: impl Into<Grantee>, name: &str, target: Target) {
        GivesAbilities::allowing(
            self.store.clone(),
            vec![AbilityGrant::for_target(name, target).to_own()],
        )
        .to(grantee)
        .await
        .unwrap();
    }

    pub async fn forbid(&self, grantee: impl Into<Grantee>, abilities: &[&str]) {
        let grants = abilities.iter().map(|name| AbilityGrant::simple(*name)).collect();
        GivesAbilities::forbidding(self.store.clone(), grants).to(grantee).await.unwrap();
    }

    pub async fn disallow(&self, grantee: impl Into<Grantee>, abilities: &[&str]) {
        let grants = abilities.iter().map(|name| AbilityGrant::simple(*name)).collect();
        RemovesAbilities::allowing(self.store.clone(), grants).from(grantee).await.unwrap();
    }

    pub async fn assign(&self, role: &str, authority: &Entity) {
        AssignsRoles::new(self.store.clone(), vec![RoleRef::from(role)])
            .to(std::slice::from_ref(authority), &[])
            .await
            .unwrap();
    }

    pub async fn assign_for(&self, role: &str, authority: &Entity, restriction: &Entity) {
        AssignsRoles::new(self.store.clone(), vec![RoleRef::from(role)])
            .to(std::slice::from_ref(authority), std::slice::from_ref(restriction))
            .await
            .unwrap();
    }

    pub async fn retract(&self, role: &str, authority: &Entity) {
        RemovesRoles::new(self.store.clone(), vec![RoleRef::from(role)])
            .from(std::slice::from_ref(authority), &[])
            .await
            .unwrap();
    }

    pub async fn retract_for(&self, role: &str, authority: &Entity, restrictions: &[Entity]) {
        RemovesRoles::new(self.store.clone(), vec![RoleRef::from(role)])
            .from(std::slice::from_ref(authority), restrictions)
            .await
            .unwrap();
    }

    /// Sorted names of the authority's allowed abilities, as the clipboard
    /// (and therefore the cache) sees them.
    pub async fn ability_names(&self, authority: &Entity) -> Vec<String> {
        let abilities = self.clipboard.get_abilities(authority, true, None).await.unwrap();
        let mut names: Vec<String> =
            abilities.iter().map(|ability| ability.name.clone()).collect();
        names.sort();
        names
    }

    pub async fn restricted_ability_names(
        &self,
        authority: &Entity,
        restriction: &Entity,
    ) -> Vec<String> {
        let abilities = self
            .clipboard
            .get_abilities(authority, true, Some(restriction))
            .await
            .unwrap();
        let mut names: Vec<String> =
            abilities.iter().map(|ability| ability.name.clone()).collect();
        names.sort();
        names
    }

    pub async fn assert_can(&self, authority: &Entity, ability: &str, target: Option<&Target>) {
        assert!(
            self.clipboard.check(authority, ability, target, None).await.unwrap(),
            "{:?} should be allowed {ability}",
            authority.id
        );
    }

    pub async fn assert_cannot(
        &self,
        authority: &Entity,
        ability: &str,
        target: Option<&Target>,
    ) {
        assert!(
            !self.clipboard.check(authority, ability, target, None).await.unwrap(),
            "{:?} should not be allowed {ability}",
            authority.id
        );
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
