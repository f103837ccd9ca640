//! # Warden Types
//!
//! Shared type definitions for the Warden authorization engine.
//!
//! This crate provides all core types used across the Warden workspace,
//! ensuring a single source of truth and preventing circular dependencies.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod restriction;

// ============================================================================
// Core Domain Types
// ============================================================================

/// A polymorphic entity identity: a morph type tag plus an optional key.
///
/// An entity with `id: None` stands for a non-persisted instance and doubles
/// as the "any instance of this type" placeholder in restriction contexts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub kind: String,
    pub id: Option<u64>,
}

impl Entity {
    pub fn new(kind: impl Into<String>, id: u64) -> Self {
        Self { kind: kind.into(), id: Some(id) }
    }

    /// An unsaved instance / bare type placeholder.
    pub fn unsaved(kind: impl Into<String>) -> Self {
        Self { kind: kind.into(), id: None }
    }

    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }
}

/// The object of an ability check.
///
/// `All` is the `"*"` wildcard marker: the ability applies to entities of
/// every type. A concrete target carries the entity's type and, when
/// persisted, its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    All,
    Entity(Entity),
}

impl From<Entity> for Target {
    fn from(entity: Entity) -> Self {
        Target::Entity(entity)
    }
}

/// A named bundle of abilities assignable to authorities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: u64,
    pub name: String,
}

impl Role {
    /// The morph type under which roles appear as permission grantees.
    pub const MORPH: &'static str = "roles";

    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }

    pub fn entity(&self) -> Entity {
        Entity::new(Self::MORPH, self.id)
    }
}

/// A capability, optionally scoped to an entity type or a specific instance.
///
/// `name` alone is a simple/global ability; adding `entity_type` applies it
/// to all instances of that type; adding `entity_id` narrows it to one
/// instance. Both `name` and `entity_type` accept the `"*"` wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub id: u64,
    pub name: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<u64>,
    /// Restricts the grant to targets owned by the authority.
    pub only_owned: bool,
}

impl Ability {
    pub fn simple(id: u64, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), entity_type: None, entity_id: None, only_owned: false }
    }

    pub fn for_type(id: u64, name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            entity_type: Some(entity_type.into()),
            entity_id: None,
            only_owned: false,
        }
    }

    pub fn for_entity(id: u64, name: impl Into<String>, entity: &Entity) -> Self {
        Self {
            id,
            name: name.into(),
            entity_type: Some(entity.kind.clone()),
            entity_id: entity.id,
            only_owned: false,
        }
    }

    pub fn owned_only(mut self) -> Self {
        self.only_owned = true;
        self
    }

    /// The lowercase identifier this ability is matched under:
    /// `name[-entity_type[-entity_id]][-owned]`.
    pub fn identifier(&self) -> String {
        let mut identifier = self.name.clone();

        if let Some(entity_type) = &self.entity_type {
            identifier.push('-');
            identifier.push_str(entity_type);

            if let Some(entity_id) = self.entity_id {
                identifier.push('-');
                identifier.push_str(&entity_id.to_string());
            }
        }

        if self.only_owned {
            identifier.push_str("-owned");
        }

        identifier.to_lowercase()
    }
}

/// A grant or forbid of one ability to one grantee.
///
/// `grantee: None` means the permission applies to everyone. Role grantees
/// are entities under the [`Role::MORPH`] type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub ability_id: u64,
    pub grantee: Option<Entity>,
    pub forbidden: bool,
}

/// A role-to-authority assignment row, optionally scoped by a restriction.
///
/// Both restriction columns null = global assignment; type set with a null
/// id = the role applies for any instance of that type; both set = the role
/// applies only for that one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub role_id: u64,
    pub entity_type: String,
    pub entity_id: u64,
    pub restricted_to_type: Option<String>,
    pub restricted_to_id: Option<u64>,
    pub scope: Option<String>,
}

impl Assignment {
    /// The composite identity of this row, used for duplicate detection and
    /// targeted deletion.
    pub fn key(&self) -> AssignmentKey {
        AssignmentKey {
            role_id: self.role_id,
            entity_type: self.entity_type.clone(),
            entity_id: self.entity_id,
            restricted_to_type: self.restricted_to_type.clone(),
            restricted_to_id: self.restricted_to_id,
            scope: self.scope.clone(),
        }
    }
}

/// Structured composite key identifying an [`Assignment`] row.
///
/// Field-wise equality, not string concatenation, so adjacent numeric ids
/// cannot collide (`1` + `23` vs `12` + `3`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentKey {
    pub role_id: u64,
    pub entity_type: String,
    pub entity_id: u64,
    pub restricted_to_type: Option<String>,
    pub restricted_to_id: Option<u64>,
    pub scope: Option<String>,
}

/// A role referenced by name, numeric id, or model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRef {
    Name(String),
    Id(u64),
    Model(Role),
}

impl From<&str> for RoleRef {
    fn from(name: &str) -> Self {
        RoleRef::Name(name.to_string())
    }
}

impl From<String> for RoleRef {
    fn from(name: String) -> Self {
        RoleRef::Name(name)
    }
}

impl From<u64> for RoleRef {
    fn from(id: u64) -> Self {
        RoleRef::Id(id)
    }
}

impl From<Role> for RoleRef {
    fn from(role: Role) -> Self {
        RoleRef::Model(role)
    }
}

/// Bidirectional id/name mapping over an authority's roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolesLookup {
    by_id: HashMap<u64, String>,
    by_name: HashMap<String, u64>,
}

impl RolesLookup {
    pub fn from_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        let mut lookup = Self::default();
        for role in roles {
            lookup.insert(role);
        }
        lookup
    }

    pub fn insert(&mut self, role: Role) {
        self.by_id.insert(role.id, role.name.clone());
        self.by_name.insert(role.name, role.id);
    }

    pub fn contains_id(&self, id: u64) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Role names, sorted for deterministic listings.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.by_name.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

// ============================================================================
// Scope
// ============================================================================

/// A namespace isolating cache and assignment data per tenant or environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    name: Option<String>,
}

impl Scope {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()) }
    }

    /// Append the scope to a base cache tag.
    pub fn tag(&self, base: &str) -> String {
        match &self.name {
            Some(name) => format!("{base}-{name}"),
            None => base.to_string(),
        }
    }

    /// The value stamped on new assignment rows.
    pub fn attach(&self) -> Option<String> {
        self.name.clone()
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend I/O failure. Propagated unchanged to the caller; a backend
    /// outage must never read as "access denied".
    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
