//! Ability grant conductors.
//!
//! Grants and forbids are the same permission row with a flipped flag, so
//! one conductor handles both directions; removal mirrors it.

use std::sync::Arc;

use tracing::{debug, instrument};

use warden_store::PermissionStore;
use warden_types::{Entity, Permission, Role, RoleRef, Target};

use crate::Result;
use crate::conductors::partition_role_refs;

/// An ability to grant: a name, an optional target and the ownership flag.
#[derive(Debug, Clone)]
pub struct AbilityGrant {
    pub name: String,
    pub target: Option<Target>,
    pub only_owned: bool,
}

impl AbilityGrant {
    /// A simple ability, unscoped to any entity.
    pub fn simple(name: impl Into<String>) -> Self {
        Self { name: name.into(), target: None, only_owned: false }
    }

    /// An ability scoped to a target type, instance, or the `"*"` wildcard.
    pub fn for_target(name: impl Into<String>, target: Target) -> Self {
        Self { name: name.into(), target: Some(target), only_owned: false }
    }

    /// Restrict the grant to targets the authority owns.
    pub fn to_own(mut self) -> Self {
        self.only_owned = true;
        self
    }

    fn columns(&self) -> (Option<String>, Option<u64>) {
        match &self.target {
            None => (None, None),
            Some(Target::All) => (Some("*".to_string()), None),
            Some(Target::Entity(entity)) => (Some(entity.kind.clone()), entity.id),
        }
    }
}

impl From<&str> for AbilityGrant {
    fn from(name: &str) -> Self {
        AbilityGrant::simple(name)
    }
}

/// Who receives a grant: an authority directly, a role, or everyone.
#[derive(Debug, Clone)]
pub enum Grantee {
    Authority(Entity),
    Role(RoleRef),
    Everyone,
}

impl From<Entity> for Grantee {
    fn from(entity: Entity) -> Self {
        Grantee::Authority(entity)
    }
}

impl From<RoleRef> for Grantee {
    fn from(role: RoleRef) -> Self {
        Grantee::Role(role)
    }
}

/// Grants (or forbids) abilities to a grantee, idempotently.
pub struct GivesAbilities {
    store: Arc<dyn PermissionStore>,
    abilities: Vec<AbilityGrant>,
    forbidding: bool,
}

impl GivesAbilities {
    pub fn allowing(store: Arc<dyn PermissionStore>, abilities: Vec<AbilityGrant>) -> Self {
        Self { store, abilities, forbidding: false }
    }

    pub fn forbidding(store: Arc<dyn PermissionStore>, abilities: Vec<AbilityGrant>) -> Self {
        Self { store, abilities, forbidding: true }
    }

    /// Record the permission rows, creating missing ability rows and, for
    /// role grantees named by string, missing roles.
    #[instrument(skip_all, fields(forbidding = self.forbidding))]
    pub async fn to(&self, grantee: impl Into<Grantee>) -> Result<()> {
        let grantee = resolve_grantee(&*self.store, grantee.into(), true).await?;
        let Resolved::Known(grantee) = grantee else {
            return Ok(());
        };

        for grant in &self.abilities {
            let (entity_type, entity_id) = grant.columns();
            let ability = self
                .store
                .find_or_create_ability(
                    &grant.name,
                    entity_type.as_deref(),
                    entity_id,
                    grant.only_owned,
                )
                .await?;

            debug!(identifier = %ability.identifier(), "recording permission");
            self.store
                .insert_permission(Permission {
                    ability_id: ability.id,
                    grantee: grantee.clone(),
                    forbidden: self.forbidding,
                })
                .await?;
        }

        Ok(())
    }
}

/// Removes ability grants (or forbids) from a grantee.
pub struct RemovesAbilities {
    store: Arc<dyn PermissionStore>,
    abilities: Vec<AbilityGrant>,
    forbidding: bool,
}

impl RemovesAbilities {
    /// Remove allowing permissions (the `disallow` direction).
    pub fn allowing(store: Arc<dyn PermissionStore>, abilities: Vec<AbilityGrant>) -> Self {
        Self { store, abilities, forbidding: false }
    }

    /// Remove forbidding permissions (the `unforbid` direction).
    pub fn forbidding(store: Arc<dyn PermissionStore>, abilities: Vec<AbilityGrant>) -> Self {
        Self { store, abilities, forbidding: true }
    }

    /// Delete matching permission rows. Unknown roles and unknown abilities
    /// resolve to nothing.
    #[instrument(skip_all, fields(forbidding = self.forbidding))]
    pub async fn from(&self, grantee: impl Into<Grantee>) -> Result<()> {
        let grantee = resolve_grantee(&*self.store, grantee.into(), false).await?;
        let Resolved::Known(grantee) = grantee else {
            return Ok(());
        };

        for grant in &self.abilities {
            let (entity_type, entity_id) = grant.columns();
            let ability = self
                .store
                .find_ability(&grant.name, entity_type.as_deref(), entity_id, grant.only_owned)
                .await?;

            if let Some(ability) = ability {
                let removed = self
                    .store
                    .delete_permission(ability.id, grantee.as_ref(), self.forbidding)
                    .await?;
                debug!(identifier = %ability.identifier(), removed, "removed permission");
            }
        }

        Ok(())
    }
}

/// A resolved grantee column value, or nothing to act on.
enum Resolved {
    /// `None` inside means the everyone grantee.
    Known(Option<Entity>),
    Missing,
}

async fn resolve_grantee(
    store: &dyn PermissionStore,
    grantee: Grantee,
    create_roles: bool,
) -> Result<Resolved> {
    match grantee {
        Grantee::Everyone => Ok(Resolved::Known(None)),
        Grantee::Authority(entity) => Ok(Resolved::Known(Some(entity))),
        Grantee::Role(role) => {
            let (names, ids) = partition_role_refs(std::slice::from_ref(&role))?;

            if let Some(id) = ids.first() {
                return Ok(Resolved::Known(Some(Entity::new(Role::MORPH, *id))));
            }

            let roles = if create_roles {
                store.find_or_create_roles(&names).await?
            } else {
                store.find_roles_by_name(&names).await?
            };

            match roles.first() {
                Some(role) => Ok(Resolved::Known(Some(role.entity()))),
                None => Ok(Resolved::Missing),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::{Clipboard, DirectClipboard};
    use crate::conductors::AssignsRoles;
    use warden_store::MemoryBackend;

    fn user(id: u64) -> Entity {
        Entity::new("users", id)
    }

    #[tokio::test]
    async fn test_grants_to_an_authority() {
        let store = Arc::new(MemoryBackend::new());
        GivesAbilities::allowing(store.clone(), vec![AbilityGrant::simple("ban-users")])
            .to(user(1))
            .await
            .unwrap();

        let clipboard = DirectClipboard::new(store);
        assert!(clipboard.check(&user(1), "ban-users", None, None).await.unwrap());
        assert!(!clipboard.check(&user(2), "ban-users", None, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_grants_to_a_role_by_name() {
        let store = Arc::new(MemoryBackend::new());

        GivesAbilities::allowing(store.clone(), vec![AbilityGrant::simple("ban-users")])
            .to(Grantee::Role(RoleRef::from("admin")))
            .await
            .unwrap();
        AssignsRoles::new(store.clone(), vec![RoleRef::from("admin")])
            .to(&[user(1)], &[])
            .await
            .unwrap();

        let clipboard = DirectClipboard::new(store);
        assert!(clipboard.check(&user(1), "ban-users", None, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_grants_to_everyone() {
        let store = Arc::new(MemoryBackend::new());
        GivesAbilities::allowing(store.clone(), vec![AbilityGrant::simple("browse")])
            .to(Grantee::Everyone)
            .await
            .unwrap();

        let clipboard = DirectClipboard::new(store);
        assert!(clipboard.check(&user(1), "browse", None, None).await.unwrap());
        assert!(clipboard.check(&user(99), "browse", None, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_forbid_and_unforbid() {
        let store = Arc::new(MemoryBackend::new());
        let alice = user(1);

        GivesAbilities::allowing(store.clone(), vec![AbilityGrant::simple("ban-users")])
            .to(alice.clone())
            .await
            .unwrap();
        GivesAbilities::forbidding(store.clone(), vec![AbilityGrant::simple("ban-users")])
            .to(alice.clone())
            .await
            .unwrap();

        let clipboard = DirectClipboard::new(store.clone());
        assert!(!clipboard.check(&alice, "ban-users", None, None).await.unwrap());

        RemovesAbilities::forbidding(store.clone(), vec![AbilityGrant::simple("ban-users")])
            .from(alice.clone())
            .await
            .unwrap();
        assert!(clipboard.check(&alice, "ban-users", None, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_disallow_removes_the_grant() {
        let store = Arc::new(MemoryBackend::new());
        let alice = user(1);

        GivesAbilities::allowing(store.clone(), vec![AbilityGrant::simple("ban-users")])
            .to(alice.clone())
            .await
            .unwrap();
        RemovesAbilities::allowing(store.clone(), vec![AbilityGrant::simple("ban-users")])
            .from(alice.clone())
            .await
            .unwrap();

        let clipboard = DirectClipboard::new(store);
        assert!(!clipboard.check(&alice, "ban-users", None, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_removing_from_an_unknown_role_is_a_noop() {
        let store = Arc::new(MemoryBackend::new());

        RemovesAbilities::allowing(store.clone(), vec![AbilityGrant::simple("ban-users")])
            .from(Grantee::Role(RoleRef::from("ghost")))
            .await
            .unwrap();

        assert!(store.find_roles_by_name(&["ghost".to_string()]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_targeted_grant_is_scoped() {
        let store = Arc::new(MemoryBackend::new());
        let alice = user(1);
        let post = Entity::new("posts", 3);

        GivesAbilities::allowing(
            store.clone(),
            vec![AbilityGrant::for_target("edit", Target::Entity(post.clone()))],
        )
        .to(alice.clone())
        .await
        .unwrap();

        let clipboard = DirectClipboard::new(store);
        assert!(clipboard
            .check(&alice, "edit", Some(&Target::Entity(post)), None)
            .await
            .unwrap());
        assert!(!clipboard
            .check(&alice, "edit", Some(&Target::Entity(Entity::new("posts", 4))), None)
            .await
            .unwrap());
    }
}
