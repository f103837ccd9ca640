//! Role retraction conductor.

use std::sync::Arc;

use tracing::{debug, instrument};

use warden_store::PermissionStore;
use warden_types::{AssignmentKey, Entity, RoleRef, Scope, restriction};

use crate::Result;
use crate::conductors::lazy::LazyRetraction;
use crate::conductors::{group_authorities, partition_role_refs};

/// Retracts roles from authorities.
///
/// Role models and ids contribute directly; names are looked up, and names
/// that do not exist resolve to nothing. Retracting an unknown role is a
/// no-op, never an error.
pub struct RemovesRoles {
    store: Arc<dyn PermissionStore>,
    scope: Scope,
    roles: Vec<RoleRef>,
}

impl RemovesRoles {
    pub fn new(store: Arc<dyn PermissionStore>, roles: Vec<RoleRef>) -> Self {
        Self::scoped(store, Scope::default(), roles)
    }

    pub fn scoped(store: Arc<dyn PermissionStore>, scope: Scope, roles: Vec<RoleRef>) -> Self {
        Self { store, scope, roles }
    }

    /// Retract from every authority, for every restriction (none = the
    /// global assignment).
    #[instrument(skip_all, fields(authorities = authorities.len()))]
    pub async fn from(&self, authorities: &[Entity], restrictions: &[Entity]) -> Result<()> {
        let role_ids = self.existing_role_ids().await?;
        if role_ids.is_empty() {
            return Ok(());
        }

        let mut keys = Vec::new();
        for (entity_type, entity_ids) in group_authorities(authorities) {
            for &role_id in &role_ids {
                for &entity_id in &entity_ids {
                    if restrictions.is_empty() {
                        keys.push(self.detach_key(role_id, &entity_type, entity_id, None));
                    } else {
                        for entity in restrictions {
                            keys.push(self.detach_key(
                                role_id,
                                &entity_type,
                                entity_id,
                                Some(entity),
                            ));
                        }
                    }
                }
            }
        }

        let removed = self.store.delete_assignments(&keys).await?;
        debug!(removed, "retracted role assignments");

        Ok(())
    }

    /// Begin a deferred retraction for a single authority. Nothing is
    /// deleted until [`LazyRetraction::apply`] runs.
    pub fn from_authority(self, authority: Entity) -> LazyRetraction {
        LazyRetraction::new(self, authority)
    }

    async fn existing_role_ids(&self) -> Result<Vec<u64>> {
        let (names, mut ids) = partition_role_refs(&self.roles)?;

        if !names.is_empty() {
            let found = self.store.find_roles_by_name(&names).await?;
            ids.extend(found.iter().map(|role| role.id));
        }

        Ok(ids)
    }

    fn detach_key(
        &self,
        role_id: u64,
        entity_type: &str,
        entity_id: u64,
        restriction_entity: Option<&Entity>,
    ) -> AssignmentKey {
        let (restricted_to_type, restricted_to_id) =
            restriction::attach_attributes(restriction_entity);

        AssignmentKey {
            role_id,
            entity_type: entity_type.to_string(),
            entity_id,
            restricted_to_type,
            restricted_to_id,
            scope: self.scope.attach(),
        }
    }
}
