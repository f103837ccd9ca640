//! Role-check helper over a clipboard.

use warden_types::{Entity, RoleRef};

use crate::Result;
use crate::clipboard::{Clipboard, RoleCheckOp};

/// Fluent role checks for one authority: `is(user).an(&["admin"])`.
pub struct ChecksRoles<'a> {
    authority: Entity,
    clipboard: &'a dyn Clipboard,
}

impl<'a> ChecksRoles<'a> {
    pub fn new(authority: Entity, clipboard: &'a dyn Clipboard) -> Self {
        Self { authority, clipboard }
    }

    /// Whether the authority holds any of the given roles.
    pub async fn an(&self, roles: &[RoleRef]) -> Result<bool> {
        self.clipboard.check_role(&self.authority, roles, RoleCheckOp::Or, None).await
    }

    /// Alias for [`an`](Self::an).
    pub async fn a(&self, roles: &[RoleRef]) -> Result<bool> {
        self.an(roles).await
    }

    /// Whether the authority holds none of the given roles.
    pub async fn not_an(&self, roles: &[RoleRef]) -> Result<bool> {
        self.clipboard.check_role(&self.authority, roles, RoleCheckOp::Not, None).await
    }

    /// Whether the authority holds all of the given roles.
    pub async fn all(&self, roles: &[RoleRef]) -> Result<bool> {
        self.clipboard.check_role(&self.authority, roles, RoleCheckOp::And, None).await
    }

    /// Whether the authority holds any of the roles for the restriction.
    pub async fn an_for(&self, roles: &[RoleRef], restriction: &Entity) -> Result<bool> {
        self.clipboard
            .check_role(&self.authority, roles, RoleCheckOp::Or, Some(restriction))
            .await
    }

    /// Whether the authority holds none of the roles for the restriction.
    pub async fn not_an_for(&self, roles: &[RoleRef], restriction: &Entity) -> Result<bool> {
        self.clipboard
            .check_role(&self.authority, roles, RoleCheckOp::Not, Some(restriction))
            .await
    }

    /// Whether the authority holds all of the roles for the restriction.
    pub async fn all_for(&self, roles: &[RoleRef], restriction: &Entity) -> Result<bool> {
        self.clipboard
            .check_role(&self.authority, roles, RoleCheckOp::And, Some(restriction))
            .await
    }
}
