//! Capability traits for entity types.
//!
//! Any type that can name itself as an [`Entity`] (an id plus a type tag)
//! gets the authorization surface by composition. The clipboard is passed
//! explicitly at every call site; there is no ambient resolver.

use async_trait::async_trait;

use warden_types::{Entity, Role, RoleRef, Target};

use crate::Result;
use crate::clipboard::{Clipboard, RoleCheckOp};

/// Identity hook: how a type names itself for authorization purposes.
pub trait AsEntity {
    fn as_entity(&self) -> Entity;
}

impl AsEntity for Entity {
    fn as_entity(&self) -> Entity {
        self.clone()
    }
}

impl AsEntity for Role {
    fn as_entity(&self) -> Entity {
        self.entity()
    }
}

/// Ability checks for any entity type.
#[async_trait]
pub trait CanCheckAbility: AsEntity + Sync {
    async fn can(
        &self,
        clipboard: &dyn Clipboard,
        ability: &str,
        target: Option<&Target>,
    ) -> Result<bool> {
        clipboard.check(&self.as_entity(), ability, target, None).await
    }

    async fn cannot(
        &self,
        clipboard: &dyn Clipboard,
        ability: &str,
        target: Option<&Target>,
    ) -> Result<bool> {
        Ok(!self.can(clipboard, ability, target).await?)
    }

    /// Check within a restriction context.
    async fn can_for(
        &self,
        clipboard: &dyn Clipboard,
        ability: &str,
        restriction: &Entity,
        target: Option<&Target>,
    ) -> Result<bool> {
        clipboard.check(&self.as_entity(), ability, target, Some(restriction)).await
    }

    async fn cannot_for(
        &self,
        clipboard: &dyn Clipboard,
        ability: &str,
        restriction: &Entity,
        target: Option<&Target>,
    ) -> Result<bool> {
        Ok(!self.can_for(clipboard, ability, restriction, target).await?)
    }
}

impl<T: AsEntity + Sync> CanCheckAbility for T {}

/// Role checks for any entity type.
#[async_trait]
pub trait HasRoles: AsEntity + Sync {
    /// Whether this entity holds any of the given roles.
    async fn is_an(&self, clipboard: &dyn Clipboard, roles: &[RoleRef]) -> Result<bool> {
        clipboard.check_role(&self.as_entity(), roles, RoleCheckOp::Or, None).await
    }

    /// Whether this entity holds none of the given roles.
    async fn is_not_an(&self, clipboard: &dyn Clipboard, roles: &[RoleRef]) -> Result<bool> {
        clipboard.check_role(&self.as_entity(), roles, RoleCheckOp::Not, None).await
    }

    /// Whether this entity holds all of the given roles.
    async fn is_all(&self, clipboard: &dyn Clipboard, roles: &[RoleRef]) -> Result<bool> {
        clipboard.check_role(&self.as_entity(), roles, RoleCheckOp::And, None).await
    }

    async fn is_an_for(
        &self,
        clipboard: &dyn Clipboard,
        roles: &[RoleRef],
        restriction: &Entity,
    ) -> Result<bool> {
        clipboard
            .check_role(&self.as_entity(), roles, RoleCheckOp::Or, Some(restriction))
            .await
    }

    async fn is_not_an_for(
        &self,
        clipboard: &dyn Clipboard,
        roles: &[RoleRef],
        restriction: &Entity,
    ) -> Result<bool> {
        clipboard
            .check_role(&self.as_entity(), roles, RoleCheckOp::Not, Some(restriction))
            .await
    }

    async fn is_all_for(
        &self,
        clipboard: &dyn Clipboard,
        roles: &[RoleRef],
        restriction: &Entity,
    ) -> Result<bool> {
        clipboard
            .check_role(&self.as_entity(), roles, RoleCheckOp::And, Some(restriction))
            .await
    }

    /// This entity's role names for global assignments.
    async fn roles(&self, clipboard: &dyn Clipboard) -> Result<Vec<String>> {
        clipboard.get_roles(&self.as_entity()).await
    }

    /// This entity's role names for assignments scoped to the restriction.
    async fn roles_for(
        &self,
        clipboard: &dyn Clipboard,
        restriction: &Entity,
    ) -> Result<Vec<String>> {
        clipboard.get_roles_for_restriction(&self.as_entity(), restriction).await
    }
}

impl<T: AsEntity + Sync> HasRoles for T {}
