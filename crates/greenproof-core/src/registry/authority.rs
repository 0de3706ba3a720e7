//! Authorization source abstraction.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use thiserror::Error;

use super::{Identity, RoleId};

/// Failure reported by an authorization source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthorityError {
    /// The source could not be reached or answered with garbage.
    #[error("authorization source unavailable: {reason}")]
    Unavailable {
        /// Human-readable cause.
        reason: String,
    },
}

/// External check of whether an identity holds a role.
///
/// Implementations are called synchronously from registry operations.
/// `Ok(false)` and `Err(_)` are both treated as "not authorized".
pub trait CapabilityCheck: fmt::Debug + Send + Sync {
    /// Returns whether `identity` holds `role` at `version`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError`] if the source cannot answer.
    fn has_capability(
        &self,
        identity: &Identity,
        role: &RoleId,
        version: u32,
    ) -> Result<bool, AuthorityError>;
}

/// In-memory authorization source.
///
/// Grants are keyed by `(identity, role, version)` and can be changed while
/// the source is shared with a registry. A poisoned lock is recovered: each
/// write is a single set insert or removal, so the table is never left
/// half-updated.
#[derive(Debug, Default)]
pub struct StaticCapabilities {
    grants: RwLock<BTreeSet<(Identity, RoleId, u32)>>,
}

impl StaticCapabilities {
    /// Creates a source with no grants.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants `role` at `version` to `identity`.
    pub fn grant(&self, identity: &Identity, role: &RoleId, version: u32) {
        self.grants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((identity.clone(), role.clone(), version));
    }

    /// Revokes `role` at `version` from `identity`.
    pub fn revoke(&self, identity: &Identity, role: &RoleId, version: u32) {
        self.grants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(identity.clone(), role.clone(), version));
    }
}

impl CapabilityCheck for StaticCapabilities {
    fn has_capability(
        &self,
        identity: &Identity,
        role: &RoleId,
        version: u32,
    ) -> Result<bool, AuthorityError> {
        let grants = self.grants.read().unwrap_or_else(PoisonError::into_inner);
        Ok(grants.contains(&(identity.clone(), role.clone(), version)))
    }
}
