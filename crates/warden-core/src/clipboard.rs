//! The clipboard: ability and role checks against the permission store.
//!
//! The matching algorithm lives in the [`Clipboard`] trait's provided
//! methods, so the cached implementation reuses it unchanged; only the
//! fetchers (`get_abilities`, `get_roles_lookup`) differ between the
//! direct and cached clipboards.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use warden_store::PermissionStore;
use warden_types::{Ability, Entity, RoleRef, RolesLookup, Target};

use crate::identifier::compile_identifiers;
use crate::{CheckError, Result};

/// The result of an ability check.
///
/// `Forbidden` and `NoMatch` both coerce to a failed boolean check; they
/// are distinct because an explicit forbid short-circuits before any allow
/// lookup happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Allowed(u64),
    Forbidden,
    NoMatch,
}

impl CheckOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CheckOutcome::Allowed(_))
    }

    pub fn ability_id(&self) -> Option<u64> {
        match self {
            CheckOutcome::Allowed(id) => Some(*id),
            _ => None,
        }
    }
}

/// Boolean operator for multi-role checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleCheckOp {
    /// At least one of the requested roles.
    Or,
    /// All of the requested roles.
    And,
    /// None of the requested roles.
    Not,
}

/// Externally supplied ownership predicate: does the authority own the
/// target instance?
pub trait OwnershipResolver: Send + Sync {
    fn owns(&self, authority: &Entity, target: &Entity) -> bool;
}

/// Default ownership resolver: nothing is owned.
pub struct NoOwnership;

impl OwnershipResolver for NoOwnership {
    fn owns(&self, _authority: &Entity, _target: &Entity) -> bool {
        false
    }
}

/// Adapter turning a closure into an [`OwnershipResolver`].
pub struct OwnershipFn(Box<dyn Fn(&Entity, &Entity) -> bool + Send + Sync>);

impl OwnershipFn {
    pub fn new(predicate: impl Fn(&Entity, &Entity) -> bool + Send + Sync + 'static) -> Self {
        Self(Box::new(predicate))
    }
}

impl OwnershipResolver for OwnershipFn {
    fn owns(&self, authority: &Entity, target: &Entity) -> bool {
        (self.0)(authority, target)
    }
}

/// The id of the first ability whose identifier is among the applicable
/// candidates, retrying with the `-owned` suffix when the authority owns
/// the target.
fn find_matching_ability(
    abilities: &[Ability],
    applicable: &[String],
    owned: bool,
) -> Option<u64> {
    let candidates: HashSet<&str> = applicable.iter().map(String::as_str).collect();

    let matched = abilities
        .iter()
        .find(|ability| candidates.contains(ability.identifier().as_str()));
    if let Some(ability) = matched {
        return Some(ability.id);
    }

    if owned {
        let owned_candidates: HashSet<String> =
            applicable.iter().map(|identifier| format!("{identifier}-owned")).collect();

        return abilities
            .iter()
            .find(|ability| owned_candidates.contains(&ability.identifier()))
            .map(|ability| ability.id);
    }

    None
}

/// Ability and role checks for an authority.
///
/// `check` never errors for "no access": only malformed role references and
/// backend failures surface as errors.
#[async_trait]
pub trait Clipboard: Send + Sync {
    /// The authority's ability rows. With a restriction, only abilities
    /// granted through role assignments scoped to it.
    async fn get_abilities(
        &self,
        authority: &Entity,
        allowed: bool,
        restriction: Option<&Entity>,
    ) -> Result<Vec<Ability>>;

    /// The authority's role id/name lookup, optionally restricted.
    async fn get_roles_lookup(
        &self,
        authority: &Entity,
        restriction: Option<&Entity>,
    ) -> Result<RolesLookup>;

    /// Whether the authority owns the target instance. Only persisted
    /// entity targets can be owned.
    fn is_owned_by(&self, authority: &Entity, target: Option<&Target>) -> bool;

    /// Drop all memoized state. A no-op for uncached clipboards.
    async fn refresh(&self) -> Result<()> {
        Ok(())
    }

    /// Drop memoized state for one authority only.
    async fn refresh_for(&self, _authority: &Entity) -> Result<()> {
        Ok(())
    }

    /// Resolve an ability check to the matched ability id.
    ///
    /// Forbids are checked first against the full (never restriction-
    /// filtered) forbidden set and short-circuit the allow lookup.
    async fn check_get_id(
        &self,
        authority: &Entity,
        ability: &str,
        target: Option<&Target>,
        restriction: Option<&Entity>,
    ) -> Result<CheckOutcome> {
        let applicable = compile_identifiers(ability, target);
        let owned = self.is_owned_by(authority, target);

        let forbidden = self.get_abilities(authority, false, None).await?;
        if find_matching_ability(&forbidden, &applicable, owned).is_some() {
            debug!(ability, authority = %authority.kind, "check forbidden");
            return Ok(CheckOutcome::Forbidden);
        }

        let allowed = self.get_abilities(authority, true, restriction).await?;
        let outcome = match find_matching_ability(&allowed, &applicable, owned) {
            Some(id) => CheckOutcome::Allowed(id),
            None => CheckOutcome::NoMatch,
        };

        debug!(ability, authority = %authority.kind, ?outcome, "check resolved");
        Ok(outcome)
    }

    /// Boolean form of [`check_get_id`](Clipboard::check_get_id).
    async fn check(
        &self,
        authority: &Entity,
        ability: &str,
        target: Option<&Target>,
        restriction: Option<&Entity>,
    ) -> Result<bool> {
        Ok(self.check_get_id(authority, ability, target, restriction).await?.is_allowed())
    }

    /// Count the requested roles held by the authority and apply the
    /// boolean operator.
    async fn check_role(
        &self,
        authority: &Entity,
        roles: &[RoleRef],
        op: RoleCheckOp,
        restriction: Option<&Entity>,
    ) -> Result<bool> {
        let lookup = self.get_roles_lookup(authority, restriction).await?;

        let mut count = 0;
        for role in roles {
            let held = match role {
                RoleRef::Name(name) => {
                    if name.trim().is_empty() {
                        return Err(CheckError::InvalidIdentifier(
                            "role name must not be blank".to_string(),
                        ));
                    }
                    lookup.contains_name(name)
                }
                RoleRef::Id(id) => lookup.contains_id(*id),
                RoleRef::Model(role) => lookup.contains_id(role.id),
            };
            if held {
                count += 1;
            }
        }

        Ok(match op {
            RoleCheckOp::Or => count > 0,
            RoleCheckOp::Not => count == 0,
            RoleCheckOp::And => count == roles.len(),
        })
    }

    async fn get_forbidden_abilities(
        &self,
        authority: &Entity,
        restriction: Option<&Entity>,
    ) -> Result<Vec<Ability>> {
        self.get_abilities(authority, false, restriction).await
    }

    /// The authority's role names for global assignments.
    async fn get_roles(&self, authority: &Entity) -> Result<Vec<String>> {
        Ok(self.get_roles_lookup(authority, None).await?.names())
    }

    /// The authority's role names for assignments scoped to the restriction.
    async fn get_roles_for_restriction(
        &self,
        authority: &Entity,
        restriction: &Entity,
    ) -> Result<Vec<String>> {
        Ok(self.get_roles_lookup(authority, Some(restriction)).await?.names())
    }
}

/// Uncached clipboard resolving every call against the permission store.
pub struct DirectClipboard {
    store: Arc<dyn PermissionStore>,
    ownership: Arc<dyn OwnershipResolver>,
}

impl DirectClipboard {
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self::with_ownership(store, Arc::new(NoOwnership))
    }

    pub fn with_ownership(
        store: Arc<dyn PermissionStore>,
        ownership: Arc<dyn OwnershipResolver>,
    ) -> Self {
        Self { store, ownership }
    }

    pub fn store(&self) -> Arc<dyn PermissionStore> {
        Arc::clone(&self.store)
    }
}

#[async_trait]
impl Clipboard for DirectClipboard {
    async fn get_abilities(
        &self,
        authority: &Entity,
        allowed: bool,
        restriction: Option<&Entity>,
    ) -> Result<Vec<Ability>> {
        Ok(self.store.abilities_for(authority, allowed, restriction).await?)
    }

    async fn get_roles_lookup(
        &self,
        authority: &Entity,
        restriction: Option<&Entity>,
    ) -> Result<RolesLookup> {
        let roles = self.store.roles_of(authority, restriction).await?;
        Ok(RolesLookup::from_roles(roles))
    }

    fn is_owned_by(&self, authority: &Entity, target: Option<&Target>) -> bool {
        match target {
            Some(Target::Entity(entity)) if entity.is_saved() => {
                self.ownership.owns(authority, entity)
            }
            _ => false,
        }
    }
}
