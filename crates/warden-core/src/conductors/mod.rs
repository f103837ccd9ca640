//! Conductors mutating the role/ability relations.
//!
//! Each conductor is idempotent against existing rows and restriction-
//! aware. Deferred application is an explicit two-phase builder with a
//! terminal `apply()`; nothing commits implicitly.

mod abilities;
mod assigns_roles;
mod checks_roles;
mod lazy;
mod removes_roles;

pub use abilities::{AbilityGrant, GivesAbilities, Grantee, RemovesAbilities};
pub use assigns_roles::AssignsRoles;
pub use checks_roles::ChecksRoles;
pub use lazy::{LazyAssignment, LazyRetraction};
pub use removes_roles::RemovesRoles;

use warden_types::{Entity, RoleRef};

use crate::{CheckError, Result};

/// Split role references into names (to look up or create) and known ids.
/// Blank names fail fast.
fn partition_role_refs(roles: &[RoleRef]) -> Result<(Vec<String>, Vec<u64>)> {
    let mut names = Vec::new();
    let mut ids = Vec::new();

    for role in roles {
        match role {
            RoleRef::Name(name) => {
                if name.trim().is_empty() {
                    return Err(CheckError::InvalidIdentifier(
                        "role name must not be blank".to_string(),
                    ));
                }
                names.push(name.clone());
            }
            RoleRef::Id(id) => ids.push(*id),
            RoleRef::Model(role) => ids.push(role.id),
        }
    }

    Ok((names, ids))
}

/// Group persisted authorities by morph type, preserving encounter order.
fn group_authorities(authorities: &[Entity]) -> Vec<(String, Vec<u64>)> {
    let mut groups: Vec<(String, Vec<u64>)> = Vec::new();

    for authority in authorities {
        let Some(id) = authority.id else {
            continue;
        };

        match groups.iter_mut().find(|(kind, _)| *kind == authority.kind) {
            Some((_, ids)) => ids.push(id),
            None => groups.push((authority.kind.clone(), vec![id])),
        }
    }

    groups
}
