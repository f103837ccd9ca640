//! Deferred conductors.
//!
//! A conductor invoked with a single authority and no restriction yet can
//! defer: the builder captures later `for_restriction` calls and applies
//! the mutation only at the terminal `apply()`. Dropping a builder without
//! applying it performs nothing; there is no implicit commit.

use tracing::warn;

use warden_types::Entity;

use crate::Result;
use crate::conductors::{AssignsRoles, RemovesRoles};

/// A pending role assignment awaiting restrictions and `apply()`.
#[must_use = "a lazy assignment does nothing until `apply` is called"]
pub struct LazyAssignment {
    conductor: AssignsRoles,
    authority: Entity,
    restrictions: Vec<Entity>,
    applied: bool,
}

impl LazyAssignment {
    pub(crate) fn new(conductor: AssignsRoles, authority: Entity) -> Self {
        Self { conductor, authority, restrictions: Vec::new(), applied: false }
    }

    /// Scope the pending assignment to a restriction entity. May be called
    /// repeatedly to accumulate restrictions.
    pub fn for_restriction(mut self, restriction: impl Into<Entity>) -> Self {
        self.restrictions.push(restriction.into());
        self
    }

    /// Perform the assignment.
    pub async fn apply(mut self) -> Result<()> {
        self.applied = true;
        self.conductor.to(&[self.authority.clone()], &self.restrictions).await
    }
}

impl Drop for LazyAssignment {
    fn drop(&mut self) {
        if !self.applied {
            warn!(authority = %self.authority.kind, "lazy assignment dropped without apply");
        }
    }
}

/// A pending role retraction awaiting restrictions and `apply()`.
#[must_use = "a lazy retraction does nothing until `apply` is called"]
pub struct LazyRetraction {
    conductor: RemovesRoles,
    authority: Entity,
    restrictions: Vec<Entity>,
    applied: bool,
}

impl LazyRetraction {
    pub(crate) fn new(conductor: RemovesRoles, authority: Entity) -> Self {
        Self { conductor, authority, restrictions: Vec::new(), applied: false }
    }

    pub fn for_restriction(mut self, restriction: impl Into<Entity>) -> Self {
        self.restrictions.push(restriction.into());
        self
    }

    /// Perform the retraction.
    pub async fn apply(mut self) -> Result<()> {
        self.applied = true;
        self.conductor.from(&[self.authority.clone()], &self.restrictions).await
    }
}

impl Drop for LazyRetraction {
    fn drop(&mut self) {
        if !self.applied {
            warn!(authority = %self.authority.kind, "lazy retraction dropped without apply");
        }
    }
}
