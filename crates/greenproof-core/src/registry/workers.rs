//! The authorized worker set.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::{CapabilityCheck, Identity, RoleId};

/// Registry errors. Each aborts the call with no state change.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    /// The identity does not hold the worker role.
    #[error("access denied: {identity} is not enrolled as worker")]
    NotAuthorized {
        /// The rejected identity.
        identity: Identity,
    },

    /// The identity is already a member.
    #[error("worker already added: {identity}")]
    AlreadyRegistered {
        /// The duplicate identity.
        identity: Identity,
    },

    /// The identity is not a member.
    #[error("worker was not added: {identity}")]
    NotRegistered {
        /// The unknown identity.
        identity: Identity,
    },

    /// The identity still holds the worker role and cannot be removed.
    #[error("not allowed: {identity} is still enrolled as worker")]
    StillAuthorized {
        /// The identity that must be revoked first.
        identity: Identity,
    },
}

/// A change to the worker set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "worker", rename_all = "snake_case")]
pub enum MembershipChange {
    /// A worker joined.
    Added(Identity),
    /// A worker left.
    Removed(Identity),
}

/// The set of identities allowed to vote.
#[derive(Debug, Clone)]
pub struct WorkerRegistry {
    workers: BTreeSet<Identity>,
    authority: Arc<dyn CapabilityCheck>,
    role: RoleId,
    role_version: u32,
}

impl WorkerRegistry {
    /// Creates an empty registry backed by `authority`.
    #[must_use]
    pub fn new(authority: Arc<dyn CapabilityCheck>, role: RoleId, role_version: u32) -> Self {
        Self {
            workers: BTreeSet::new(),
            authority,
            role,
            role_version,
        }
    }

    /// Creates a registry with an existing member set, e.g. from a snapshot.
    #[must_use]
    pub fn with_workers(
        authority: Arc<dyn CapabilityCheck>,
        role: RoleId,
        role_version: u32,
        workers: impl IntoIterator<Item = Identity>,
    ) -> Self {
        Self {
            workers: workers.into_iter().collect(),
            ..Self::new(authority, role, role_version)
        }
    }

    /// Adds `identity` to the worker set.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotAuthorized`] if the authorization source does not
    ///   confirm the worker role
    /// - [`RegistryError::AlreadyRegistered`] if `identity` is a member
    pub fn add_worker(&mut self, identity: Identity) -> Result<MembershipChange, RegistryError> {
        if !self.is_authorized(&identity) {
            return Err(RegistryError::NotAuthorized { identity });
        }
        if self.workers.contains(&identity) {
            return Err(RegistryError::AlreadyRegistered { identity });
        }

        self.workers.insert(identity.clone());
        info!(worker = %identity, workers = self.workers.len(), "worker added");
        Ok(MembershipChange::Added(identity))
    }

    /// Removes `identity` from the worker set.
    ///
    /// Votes it already cast stay counted in their rounds.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotRegistered`] if `identity` is not a member
    /// - [`RegistryError::StillAuthorized`] if the authorization source still
    ///   grants the worker role
    pub fn remove_worker(&mut self, identity: &Identity) -> Result<MembershipChange, RegistryError> {
        if !self.workers.contains(identity) {
            return Err(RegistryError::NotRegistered {
                identity: identity.clone(),
            });
        }
        if self.is_authorized(identity) {
            return Err(RegistryError::StillAuthorized {
                identity: identity.clone(),
            });
        }

        self.workers.remove(identity);
        info!(worker = %identity, workers = self.workers.len(), "worker removed");
        Ok(MembershipChange::Removed(identity.clone()))
    }

    /// Returns `true` if `identity` is a member.
    #[must_use]
    pub fn is_worker(&self, identity: &Identity) -> bool {
        self.workers.contains(identity)
    }

    /// Members in identity order.
    pub fn workers(&self) -> impl Iterator<Item = &Identity> {
        self.workers.iter()
    }

    /// Number of members.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    fn is_authorized(&self, identity: &Identity) -> bool {
        match self
            .authority
            .has_capability(identity, &self.role, self.role_version)
        {
            Ok(granted) => granted,
            Err(e) => {
                warn!(worker = %identity, error = %e, "authorization check failed");
                false
            },
        }
    }
}
