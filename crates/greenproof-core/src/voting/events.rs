//! Signals emitted by engine operations.

use serde::{Deserialize, Serialize};

use super::InputKey;
use crate::crypto::{Hash, serde_hex};
use crate::economics::PayoutEvent;
use crate::registry::{Identity, MembershipChange};

/// An observable effect of a successful engine call.
///
/// Operations return the events they caused in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingEvent {
    /// The worker set changed.
    Membership(MembershipChange),

    /// A new round opened for `input_key`.
    RoundStarted {
        /// Input under vote.
        input_key: InputKey,
        /// Round sequence number.
        round: u64,
    },

    /// A vote was recorded or overwritten.
    VoteRecorded {
        /// Input under vote.
        input_key: InputKey,
        /// The voter.
        voter: Identity,
        /// The voted value.
        #[serde(with = "serde_hex")]
        output: Hash,
    },

    /// The round reached majority.
    WinningMatch {
        /// Input under vote.
        input_key: InputKey,
        /// The finalized match output.
        #[serde(with = "serde_hex")]
        output: Hash,
        /// Votes for the winning value.
        votes: u32,
    },

    /// Every current worker has voted and no value qualifies.
    NoConsensusReached {
        /// Input under vote.
        input_key: InputKey,
    },

    /// An open round timed out.
    VotingExpired {
        /// Input whose round expired.
        input_key: InputKey,
    },

    /// A reward was paid, deferred or settled.
    Payout(PayoutEvent),
}
