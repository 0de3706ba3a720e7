//! Worker registry and the external authorization seam.
//!
//! Membership in the worker set gates who may vote. The registry never
//! decides authorization itself; it asks a [`CapabilityCheck`] whether an
//! identity currently holds the worker role and trusts the answer:
//!
//! - `add_worker` requires the role and rejects existing members
//! - `remove_worker` requires the identity to have *lost* the role first, so
//!   a still-credentialed worker cannot be dropped and re-added
//!
//! Any caller may add or remove; the guards above are the only policy.
//! Any error from the authorization source is treated as "not authorized".

mod authority;
mod workers;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use authority::{AuthorityError, CapabilityCheck, StaticCapabilities};
pub use workers::{MembershipChange, RegistryError, WorkerRegistry};

/// An account identity (worker, owner or any caller).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wraps an identity string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identity string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A role identifier at the authorization source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(String);

impl RoleId {
    /// Wraps a role name.
    #[must_use]
    pub fn new(role: impl Into<String>) -> Self {
        Self(role.into())
    }

    /// Returns the role name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
