//! Role assignment conductor.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument};

use warden_store::PermissionStore;
use warden_types::{Assignment, AssignmentKey, Entity, Role, RoleRef, Scope, restriction};

use crate::Result;
use crate::conductors::lazy::LazyAssignment;
use crate::conductors::{group_authorities, partition_role_refs};

/// Assigns roles to authorities, optionally scoped to restriction entities.
///
/// Roles referenced by name are created when absent. Candidate rows are the
/// cross join of roles, authorities and restrictions; rows whose composite
/// key already exists are skipped, so re-assigning is a no-op without any
/// storage-level uniqueness constraint.
pub struct AssignsRoles {
    store: Arc<dyn PermissionStore>,
    scope: Scope,
    roles: Vec<RoleRef>,
}

impl AssignsRoles {
    pub fn new(store: Arc<dyn PermissionStore>, roles: Vec<RoleRef>) -> Self {
        Self::scoped(store, Scope::default(), roles)
    }

    pub fn scoped(store: Arc<dyn PermissionStore>, scope: Scope, roles: Vec<RoleRef>) -> Self {
        Self { store, scope, roles }
    }

    /// Assign to every authority, for every restriction (none = global).
    #[instrument(skip_all, fields(authorities = authorities.len()))]
    pub async fn to(&self, authorities: &[Entity], restrictions: &[Entity]) -> Result<()> {
        let roles = self.resolve_roles().await?;
        let role_ids: Vec<u64> = roles.iter().map(|role| role.id).collect();

        for (entity_type, entity_ids) in group_authorities(authorities) {
            self.assign(&role_ids, &entity_type, &entity_ids, restrictions).await?;
        }

        Ok(())
    }

    /// Begin a deferred assignment for a single authority. Nothing is
    /// written until [`LazyAssignment::apply`] runs.
    pub fn to_authority(self, authority: Entity) -> LazyAssignment {
        LazyAssignment::new(self, authority)
    }

    /// Resolve the role references, creating named roles that do not exist.
    async fn resolve_roles(&self) -> Result<Vec<Role>> {
        let (names, ids) = partition_role_refs(&self.roles)?;

        let mut roles = self.store.find_or_create_roles(&names).await?;
        if !ids.is_empty() {
            roles.extend(self.store.roles_by_ids(&ids).await?);
        }

        Ok(roles)
    }

    async fn assign(
        &self,
        role_ids: &[u64],
        entity_type: &str,
        entity_ids: &[u64],
        restrictions: &[Entity],
    ) -> Result<()> {
        let candidates = self.build_attach_rows(role_ids, entity_type, entity_ids, restrictions);

        let existing: HashSet<AssignmentKey> = self
            .store
            .assignments_for(role_ids, entity_type, entity_ids, restrictions)
            .await?
            .iter()
            .map(Assignment::key)
            .collect();

        let missing: Vec<Assignment> = candidates
            .into_iter()
            .filter(|row| !existing.contains(&row.key()))
            .collect();

        debug!(
            entity_type,
            candidates = role_ids.len() * entity_ids.len(),
            inserted = missing.len(),
            "assigning roles"
        );

        if !missing.is_empty() {
            self.store.insert_assignments(missing).await?;
        }

        Ok(())
    }

    /// One candidate row per restriction-role-authority combination, or per
    /// role-authority pair when unrestricted.
    fn build_attach_rows(
        &self,
        role_ids: &[u64],
        entity_type: &str,
        entity_ids: &[u64],
        restrictions: &[Entity],
    ) -> Vec<Assignment> {
        let mut rows = Vec::new();

        if restrictions.is_empty() {
            for &role_id in role_ids {
                for &entity_id in entity_ids {
                    rows.push(self.attach_row(role_id, entity_type, entity_id, None));
                }
            }
            return rows;
        }

        for entity in restrictions {
            for &role_id in role_ids {
                for &entity_id in entity_ids {
                    rows.push(self.attach_row(role_id, entity_type, entity_id, Some(entity)));
                }
            }
        }

        rows
    }

    fn attach_row(
        &self,
        role_id: u64,
        entity_type: &str,
        entity_id: u64,
        restriction_entity: Option<&Entity>,
    ) -> Assignment {
        let (restricted_to_type, restricted_to_id) =
            restriction::attach_attributes(restriction_entity);

        Assignment {
            role_id,
            entity_type: entity_type.to_string(),
            entity_id,
            restricted_to_type,
            restricted_to_id,
            scope: self.scope.attach(),
        }
    }
}
