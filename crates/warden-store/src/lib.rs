//! # Warden Store - Storage Abstraction Layer
//!
//! Provides the abstract permission repository consumed by the resolution
//! engine, plus an in-memory backend for testing and development.

use async_trait::async_trait;
use warden_types::{
    Ability, Assignment, AssignmentKey, Entity, Permission, Role, StoreResult,
};

pub mod memory;

pub use memory::MemoryBackend;
pub use warden_types::StoreError;

type Result<T> = StoreResult<T>;

/// The abstract permission repository.
///
/// Ability queries union three grant paths (direct-to-authority, via an
/// assigned role, and granted-to-everyone) with OR semantics. Restriction
/// handling follows the check contract:
///
/// - a restriction narrows the query to the via-role path, filtered to
///   assignments matching that restriction;
/// - with no restriction, the allowed set draws on global role assignments
///   only, while the forbidden set draws on every assignment: a forbid
///   granted through a restricted role applies everywhere.
///
/// All operations may block on backend I/O; backend errors propagate
/// unchanged.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Abilities granted (or forbidden, for `allowed = false`) to the
    /// authority, optionally narrowed to a restriction context.
    async fn abilities_for(
        &self,
        authority: &Entity,
        allowed: bool,
        restriction: Option<&Entity>,
    ) -> Result<Vec<Ability>>;

    /// Roles assigned to the authority. `None` selects global assignments
    /// only; a restriction selects assignments scoped to it.
    async fn roles_of(
        &self,
        authority: &Entity,
        restriction: Option<&Entity>,
    ) -> Result<Vec<Role>>;

    /// Roles with the given names. Missing names are simply absent from the
    /// result, never an error.
    async fn find_roles_by_name(&self, names: &[String]) -> Result<Vec<Role>>;

    /// Roles with the given names, creating any that do not yet exist.
    async fn find_or_create_roles(&self, names: &[String]) -> Result<Vec<Role>>;

    /// Roles with the given ids; unknown ids are absent from the result.
    async fn roles_by_ids(&self, ids: &[u64]) -> Result<Vec<Role>>;

    /// Assignment rows matching any of the role ids, any of the authority
    /// ids of the given type, and the restriction set (inclusive-union
    /// semantics; empty = global rows only).
    async fn assignments_for(
        &self,
        role_ids: &[u64],
        entity_type: &str,
        entity_ids: &[u64],
        restrictions: &[Entity],
    ) -> Result<Vec<Assignment>>;

    async fn insert_assignments(&self, rows: Vec<Assignment>) -> Result<()>;

    /// Delete every assignment row whose composite key is in the given set.
    /// Returns the number of rows removed.
    async fn delete_assignments(&self, keys: &[AssignmentKey]) -> Result<usize>;

    /// The ability row with these exact attributes, if it exists.
    async fn find_ability(
        &self,
        name: &str,
        entity_type: Option<&str>,
        entity_id: Option<u64>,
        only_owned: bool,
    ) -> Result<Option<Ability>>;

    /// The ability row with these exact attributes, created if absent.
    async fn find_or_create_ability(
        &self,
        name: &str,
        entity_type: Option<&str>,
        entity_id: Option<u64>,
        only_owned: bool,
    ) -> Result<Ability>;

    /// Record a permission row; inserting an identical row twice is a no-op.
    async fn insert_permission(&self, permission: Permission) -> Result<()>;

    /// Delete permission rows for the ability/grantee/forbidden triple.
    /// Returns the number of rows removed.
    async fn delete_permission(
        &self,
        ability_id: u64,
        grantee: Option<&Entity>,
        forbidden: bool,
    ) -> Result<usize>;
}
