//! In-memory permission store for testing and development.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use warden_types::restriction;
use warden_types::{
    Ability, Assignment, AssignmentKey, Entity, Permission, Role, Scope, StoreResult,
};

use crate::PermissionStore;

type Result<T> = StoreResult<T>;

/// Which role assignments feed an ability query.
#[derive(Clone, Copy)]
enum AssignmentFilter<'a> {
    /// Global (unrestricted) assignments only.
    Global,
    /// Every assignment, restricted or not.
    Any,
    /// Assignments scoped to one restriction.
    Restricted(&'a Entity),
}

struct MemoryStore {
    roles: Vec<Role>,
    abilities: Vec<Ability>,
    permissions: Vec<Permission>,
    assignments: Vec<Assignment>,
    next_role_id: u64,
    next_ability_id: u64,
}

/// In-memory [`PermissionStore`] implementation.
///
/// Rows live behind a single `RwLock`; read operations are counted so tests
/// can assert how many backend queries a cached code path performed.
pub struct MemoryBackend {
    data: Arc<RwLock<MemoryStore>>,
    scope: Scope,
    queries: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::scoped(Scope::default())
    }

    pub fn scoped(scope: Scope) -> Self {
        Self {
            data: Arc::new(RwLock::new(MemoryStore {
                roles: Vec::new(),
                abilities: Vec::new(),
                permissions: Vec::new(),
                assignments: Vec::new(),
                next_role_id: 1,
                next_ability_id: 1,
            })),
            scope,
            queries: AtomicU64::new(0),
        }
    }

    /// Number of read queries served since construction or the last reset.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn reset_query_count(&self) {
        self.queries.store(0, Ordering::Relaxed);
    }

    fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    fn assigned_role_ids(
        &self,
        authority: &Entity,
        filter: AssignmentFilter<'_>,
        scope: &Option<String>,
    ) -> Vec<u64> {
        let Some(authority_id) = authority.id else {
            return Vec::new();
        };

        self.assignments
            .iter()
            .filter(|row| row.entity_type == authority.kind && row.entity_id == authority_id)
            .filter(|row| row.scope == *scope)
            .filter(|row| match filter {
                AssignmentFilter::Any => true,
                AssignmentFilter::Global => restriction::matches(row, None),
                AssignmentFilter::Restricted(entity) => restriction::matches(row, Some(entity)),
            })
            .map(|row| row.role_id)
            .collect()
    }

    fn granted_ability_ids(&self, grantee: Option<&Entity>, forbidden: bool) -> Vec<u64> {
        self.permissions
            .iter()
            .filter(|permission| permission.forbidden == forbidden)
            .filter(|permission| permission.grantee.as_ref() == grantee)
            .map(|permission| permission.ability_id)
            .collect()
    }

    fn role_by_name(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|role| role.name == name)
    }
}

#[async_trait]
impl PermissionStore for MemoryBackend {
    async fn abilities_for(
        &self,
        authority: &Entity,
        allowed: bool,
        restriction: Option<&Entity>,
    ) -> Result<Vec<Ability>> {
        self.record_query();
        let store = self.data.read().await;

        let forbidden = !allowed;
        let mut ability_ids: HashSet<u64> = HashSet::new();

        match restriction {
            Some(entity) => {
                // Restricted queries draw on the via-role path alone.
                for role_id in
                    store.assigned_role_ids(
                        authority,
                        AssignmentFilter::Restricted(entity),
                        &self.scope.attach(),
                    )
                {
                    let role_entity = Entity::new(Role::MORPH, role_id);
                    ability_ids
                        .extend(store.granted_ability_ids(Some(&role_entity), forbidden));
                }
            }
            None => {
                ability_ids.extend(store.granted_ability_ids(Some(authority), forbidden));
                ability_ids.extend(store.granted_ability_ids(None, forbidden));

                // The allowed set sees global role assignments only; forbids
                // apply through every assignment, restricted or not.
                let filter = if allowed {
                    AssignmentFilter::Global
                } else {
                    AssignmentFilter::Any
                };
                for role_id in store.assigned_role_ids(authority, filter, &self.scope.attach()) {
                    let role_entity = Entity::new(Role::MORPH, role_id);
                    ability_ids
                        .extend(store.granted_ability_ids(Some(&role_entity), forbidden));
                }
            }
        }

        let abilities: Vec<Ability> = store
            .abilities
            .iter()
            .filter(|ability| ability_ids.contains(&ability.id))
            .cloned()
            .collect();

        debug!(
            authority = %authority.kind,
            allowed,
            count = abilities.len(),
            "resolved ability rows"
        );

        Ok(abilities)
    }

    async fn roles_of(
        &self,
        authority: &Entity,
        restriction: Option<&Entity>,
    ) -> Result<Vec<Role>> {
        self.record_query();
        let store = self.data.read().await;

        let filter = match restriction {
            Some(entity) => AssignmentFilter::Restricted(entity),
            None => AssignmentFilter::Global,
        };

        let role_ids: HashSet<u64> =
            store
                .assigned_role_ids(authority, filter, &self.scope.attach())
                .into_iter()
                .collect();

        Ok(store
            .roles
            .iter()
            .filter(|role| role_ids.contains(&role.id))
            .cloned()
            .collect())
    }

    async fn find_roles_by_name(&self, names: &[String]) -> Result<Vec<Role>> {
        self.record_query();
        let store = self.data.read().await;

        Ok(names
            .iter()
            .filter_map(|name| store.role_by_name(name).cloned())
            .collect())
    }

    async fn find_or_create_roles(&self, names: &[String]) -> Result<Vec<Role>> {
        let mut store = self.data.write().await;

        let mut roles = Vec::with_capacity(names.len());
        for name in names {
            if let Some(role) = store.role_by_name(name) {
                roles.push(role.clone());
                continue;
            }

            let role = Role::new(store.next_role_id, name.clone());
            store.next_role_id += 1;
            store.roles.push(role.clone());
            debug!(role = %role.name, id = role.id, "created role");
            roles.push(role);
        }

        Ok(roles)
    }

    async fn roles_by_ids(&self, ids: &[u64]) -> Result<Vec<Role>> {
        self.record_query();
        let store = self.data.read().await;

        Ok(store
            .roles
            .iter()
            .filter(|role| ids.contains(&role.id))
            .cloned()
            .collect())
    }

    async fn assignments_for(
        &self,
        role_ids: &[u64],
        entity_type: &str,
        entity_ids: &[u64],
        restrictions: &[Entity],
    ) -> Result<Vec<Assignment>> {
        self.record_query();
        let store = self.data.read().await;

        Ok(store
            .assignments
            .iter()
            .filter(|row| role_ids.contains(&row.role_id))
            .filter(|row| row.entity_type == entity_type && entity_ids.contains(&row.entity_id))
            .filter(|row| row.scope == self.scope.attach())
            .filter(|row| restriction::matches_any(row, restrictions))
            .cloned()
            .collect())
    }

    async fn insert_assignments(&self, rows: Vec<Assignment>) -> Result<()> {
        let mut store = self.data.write().await;
        debug!(count = rows.len(), "inserting assignment rows");
        store.assignments.extend(rows);
        Ok(())
    }

    async fn delete_assignments(&self, keys: &[AssignmentKey]) -> Result<usize> {
        let mut store = self.data.write().await;

        let keys: HashSet<&AssignmentKey> = keys.iter().collect();
        let before = store.assignments.len();
        store.assignments.retain(|row| !keys.contains(&row.key()));

        Ok(before - store.assignments.len())
    }

    async fn find_ability(
        &self,
        name: &str,
        entity_type: Option<&str>,
        entity_id: Option<u64>,
        only_owned: bool,
    ) -> Result<Option<Ability>> {
        self.record_query();
        let store = self.data.read().await;

        Ok(store
            .abilities
            .iter()
            .find(|ability| {
                ability.name == name
                    && ability.entity_type.as_deref() == entity_type
                    && ability.entity_id == entity_id
                    && ability.only_owned == only_owned
            })
            .cloned())
    }

    async fn find_or_create_ability(
        &self,
        name: &str,
        entity_type: Option<&str>,
        entity_id: Option<u64>,
        only_owned: bool,
    ) -> Result<Ability> {
        let mut store = self.data.write().await;

        let existing = store.abilities.iter().find(|ability| {
            ability.name == name
                && ability.entity_type.as_deref() == entity_type
                && ability.entity_id == entity_id
                && ability.only_owned == only_owned
        });
        if let Some(ability) = existing {
            return Ok(ability.clone());
        }

        let ability = Ability {
            id: store.next_ability_id,
            name: name.to_string(),
            entity_type: entity_type.map(String::from),
            entity_id,
            only_owned,
        };
        store.next_ability_id += 1;
        store.abilities.push(ability.clone());
        debug!(identifier = %ability.identifier(), id = ability.id, "created ability");

        Ok(ability)
    }

    async fn insert_permission(&self, permission: Permission) -> Result<()> {
        let mut store = self.data.write().await;

        if !store.permissions.contains(&permission) {
            store.permissions.push(permission);
        }

        Ok(())
    }

    async fn delete_permission(
        &self,
        ability_id: u64,
        grantee: Option<&Entity>,
        forbidden: bool,
    ) -> Result<usize> {
        let mut store = self.data.write().await;

        let before = store.permissions.len();
        store.permissions.retain(|permission| {
            !(permission.ability_id == ability_id
                && permission.grantee.as_ref() == grantee
                && permission.forbidden == forbidden)
        });

        Ok(before - store.permissions.len())
    }
}
