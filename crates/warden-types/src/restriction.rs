//! Restriction matching predicates.
//!
//! A restriction narrows a role assignment to a context entity: both
//! restriction columns null = global assignment, type set with a null id =
//! applies for any instance of that type, both set = applies for one
//! instance. Matching is exclusive: a global assignment never satisfies a
//! restricted check, and vice versa.

use crate::{Assignment, Entity};

/// Whether an assignment row satisfies a single restriction.
///
/// `None` selects global rows only. A restriction entity selects rows of the
/// same restriction type whose id column equals the entity's key, or is
/// null when the entity is a bare type placeholder.
pub fn matches(assignment: &Assignment, restriction: Option<&Entity>) -> bool {
    match restriction {
        None => {
            assignment.restricted_to_type.is_none() && assignment.restricted_to_id.is_none()
        }
        Some(entity) => {
            assignment.restricted_to_type.as_deref() == Some(entity.kind.as_str())
                && assignment.restricted_to_id == entity.id
        }
    }
}

/// Whether an assignment row satisfies any of several restrictions.
///
/// The multi-restriction form is an inclusive union, broader than
/// [`matches`]: the row's restriction type must be among the requested
/// types, and its id column must be null or among the requested ids. An
/// empty restriction list selects global rows only.
pub fn matches_any(assignment: &Assignment, restrictions: &[Entity]) -> bool {
    if restrictions.is_empty() {
        return assignment.restricted_to_type.is_none() && assignment.restricted_to_id.is_none();
    }

    let Some(row_type) = assignment.restricted_to_type.as_deref() else {
        return false;
    };

    let type_matches = restrictions.iter().any(|entity| entity.kind == row_type);
    let id_matches = match assignment.restricted_to_id {
        None => true,
        Some(id) => restrictions.iter().any(|entity| entity.id == Some(id)),
    };

    type_matches && id_matches
}

/// The restriction column values to persist on a new assignment row.
pub fn attach_attributes(restriction: Option<&Entity>) -> (Option<String>, Option<u64>) {
    match restriction {
        None => (None, None),
        Some(entity) => (Some(entity.kind.clone()), entity.id),
    }
}
