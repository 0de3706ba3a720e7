//! Per-input voting round and tally.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::InputKey;
use crate::crypto::{Hash, serde_hex};
use crate::registry::Identity;

/// Lifecycle state of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// Accepting votes.
    Open,
    /// A value reached majority. Terminal.
    Finalized,
    /// Timed out before reaching majority. The next vote opens a new round.
    Expired,
}

/// A worker's current choice in a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// The voter.
    pub voter: Identity,
    /// The voted aggregate root.
    #[serde(with = "serde_hex")]
    pub output: Hash,
    /// When the vote was (last) cast, in seconds since UNIX epoch.
    pub cast_at: u64,
}

/// Which count the majority percentage is applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MajorityRule {
    /// The leading value's own votes must reach the threshold.
    #[default]
    Leader,
    /// The number of votes cast must reach the threshold; the strict leader
    /// among them then wins. With 100% this waits for every worker and lets a
    /// plurality decide.
    Participation,
}

/// Result of evaluating the majority rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// `output` leads strictly and meets the threshold.
    Winner {
        /// The winning value.
        output: Hash,
        /// Votes for it.
        votes: u32,
    },
    /// No value qualifies yet.
    Undecided,
}

/// Voting state for one input key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingRound {
    input_key: InputKey,
    round: u64,
    started_at: u64,
    status: RoundStatus,
    /// In first-vote order; a re-vote updates its entry in place.
    votes: Vec<Vote>,
}

impl VotingRound {
    pub(crate) const fn open(input_key: InputKey, round: u64, started_at: u64) -> Self {
        Self {
            input_key,
            round,
            started_at,
            status: RoundStatus::Open,
            votes: Vec::new(),
        }
    }

    /// The input key under vote.
    #[must_use]
    pub const fn input_key(&self) -> &InputKey {
        &self.input_key
    }

    /// Sequence number of this round for its input key, starting at 1.
    #[must_use]
    pub const fn round(&self) -> u64 {
        self.round
    }

    /// When the round opened.
    #[must_use]
    pub const fn started_at(&self) -> u64 {
        self.started_at
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> RoundStatus {
        self.status
    }

    /// Votes in first-vote order.
    #[must_use]
    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    /// Current vote of `voter`, if any.
    #[must_use]
    pub fn vote_of(&self, voter: &Identity) -> Option<Hash> {
        self.votes
            .iter()
            .find(|v| v.voter == *voter)
            .map(|v| v.output)
    }

    /// Number of distinct voters.
    #[must_use]
    pub fn total_votes(&self) -> usize {
        self.votes.len()
    }

    /// Votes per output value.
    #[must_use]
    pub fn tally(&self) -> BTreeMap<Hash, u32> {
        let mut tally = BTreeMap::new();
        for vote in &self.votes {
            *tally.entry(vote.output).or_insert(0) += 1;
        }
        tally
    }

    /// Whether an open round has outlived `time_limit` at `now`.
    #[must_use]
    pub const fn is_expired_at(&self, now: u64, time_limit: u64) -> bool {
        matches!(self.status, RoundStatus::Open) && now.saturating_sub(self.started_at) >= time_limit
    }

    /// Records or overwrites `voter`'s choice. Returns the previous choice.
    pub(crate) fn record(&mut self, voter: &Identity, output: Hash, now: u64) -> Option<Hash> {
        if let Some(existing) = self.votes.iter_mut().find(|v| v.voter == *voter) {
            let previous = existing.output;
            existing.output = output;
            existing.cast_at = now;
            return Some(previous);
        }
        self.votes.push(Vote {
            voter: voter.clone(),
            output,
            cast_at: now,
        });
        None
    }

    /// Applies the majority rule against the current worker count.
    ///
    /// The leader must strictly exceed the runner-up. Under
    /// [`MajorityRule::Leader`] its own count must satisfy
    /// `count * 100 >= worker_count * majority_percentage`; under
    /// [`MajorityRule::Participation`] the total number of votes must.
    #[must_use]
    pub fn decide(
        &self,
        worker_count: usize,
        majority_percentage: u8,
        rule: MajorityRule,
    ) -> Decision {
        let mut leader: Option<(Hash, u32)> = None;
        let mut runner_up = 0u32;
        for (output, count) in self.tally() {
            match leader {
                Some((_, best)) if count <= best => runner_up = runner_up.max(count),
                Some((_, best)) => {
                    runner_up = best;
                    leader = Some((output, count));
                },
                None => leader = Some((output, count)),
            }
        }

        let Some((output, votes)) = leader else {
            return Decision::Undecided;
        };
        let counted = match rule {
            MajorityRule::Leader => u64::from(votes),
            MajorityRule::Participation => u64::try_from(self.votes.len()).unwrap_or(u64::MAX),
        };
        let workers = u64::try_from(worker_count).unwrap_or(u64::MAX);
        let meets_threshold =
            counted.saturating_mul(100) >= workers.saturating_mul(u64::from(majority_percentage));

        if votes > runner_up && meets_threshold {
            Decision::Winner { output, votes }
        } else {
            Decision::Undecided
        }
    }

    /// Voters whose current choice is `output`, in first-vote order.
    #[must_use]
    pub fn voters_for(&self, output: &Hash) -> Vec<Identity> {
        self.votes
            .iter()
            .filter(|v| v.output == *output)
            .map(|v| v.voter.clone())
            .collect()
    }

    pub(crate) fn finalize(&mut self) {
        self.status = RoundStatus::Finalized;
    }

    /// Marks an open round expired. Returns `false` if it was not open.
    pub(crate) fn expire(&mut self) -> bool {
        if self.status != RoundStatus::Open {
            return false;
        }
        self.status = RoundStatus::Expired;
        true
    }
}
