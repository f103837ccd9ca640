//! # Warden Core - Permission Resolution Engine
//!
//! Decides whether an authority may perform a named ability against an
//! optional target entity, optionally restricted to another entity.
//! Permissions may be granted to an authority directly, to a role, or to
//! everyone, and may be explicitly forbidden; a forbid always wins.
//!
//! The engine resolves a check by compiling the `(ability, target)` pair
//! into a ranked set of candidate identifiers, fetching the authority's
//! forbidden and allowed ability sets from the permission store, and
//! matching by set membership. [`CachedClipboard`] memoizes the fetched
//! sets per authority with explicit invalidation.

use thiserror::Error;

pub mod cached;
pub mod clipboard;
pub mod concerns;
pub mod conductors;
pub mod identifier;

pub use cached::CachedClipboard;
pub use clipboard::{
    CheckOutcome, Clipboard, DirectClipboard, NoOwnership, OwnershipFn, OwnershipResolver,
    RoleCheckOp,
};
pub use concerns::{AsEntity, CanCheckAbility, HasRoles};
pub use conductors::{
    AbilityGrant, AssignsRoles, ChecksRoles, GivesAbilities, Grantee, LazyAssignment,
    LazyRetraction, RemovesAbilities, RemovesRoles,
};
pub use identifier::compile_identifiers;

#[derive(Debug, Error)]
pub enum CheckError {
    /// A role reference is malformed (blank name). Fails fast, not retried.
    #[error("invalid role identifier: {0}")]
    InvalidIdentifier(String),

    /// Backend failure from the permission store or cache store, propagated
    /// unchanged. Never interpreted as "access denied".
    #[error("store error: {0}")]
    Store(#[from] warden_types::StoreError),
}

pub type Result<T> = std::result::Result<T, CheckError>;
