//! Timeframe-scoped majority voting.
//!
//! Each input key (typically a timeframe identifier) has at most one open
//! [`VotingRound`]. Workers vote with the aggregate root they computed for
//! that input; the round finalizes once one value leads strictly and the
//! configured share of the current worker set is reached. The share is
//! measured on the leader's votes or on total turnout, per [`MajorityRule`].
//!
//! # State machine
//!
//! ```text
//!            first vote                majority
//! NoRound ─────────────▶ Open ─────────────────────▶ Finalized (terminal)
//!    ▲                    │
//!    │   next vote        │ age >= time limit, observed by
//!    └──── Expired ◀──────┘ the next vote or cancel_expired_votings
//! ```
//!
//! Expiry is lazy: it is only detected at the start of a vote on the same key
//! or an owner's [`ConsensusEngine::cancel_expired_votings`] call. A vote that
//! finds its round expired first closes it, then opens a fresh round and is
//! recorded there.
//!
//! # Transactions
//!
//! Every public operation either fails without mutating anything or runs to
//! completion and returns the [`VotingEvent`]s it caused. Reward shortfalls
//! are deferred, never surfaced as errors during finalization.

mod clock;
mod engine;
mod events;
mod round;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{ConsensusEngine, MatchOutcome};
pub use events::VotingEvent;
pub use round::{Decision, MajorityRule, RoundStatus, Vote, VotingRound};

use crate::economics::RewardError;
use crate::registry::{Identity, RegistryError};

/// Identifier of the subject under vote.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputKey(String);

impl InputKey {
    /// Wraps a key string.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InputKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// Engine errors. Each aborts only the triggering call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VotingError {
    /// The voter is not in the worker set.
    #[error("not whitelisted: {voter}")]
    NotWhitelisted {
        /// The rejected voter.
        voter: Identity,
    },

    /// The round for this input already finalized.
    #[error("voting already ended for {input_key}")]
    VotingAlreadyEnded {
        /// The finalized input.
        input_key: InputKey,
    },

    /// The caller is not the engine owner.
    #[error("only owner allowed, caller was {caller}")]
    NotAuthorized {
        /// The rejected caller.
        caller: Identity,
    },

    /// A worker registry operation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A reward pool operation failed.
    #[error(transparent)]
    Reward(#[from] RewardError),
}
