//! The consensus engine.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::events::VotingEvent;
use super::round::{Decision, RoundStatus, VotingRound};
use super::{InputKey, VotingError};
use crate::config::{ConfigError, EngineConfig};
use crate::crypto::{Hash, hex_encode, serde_hex};
use crate::economics::IncentiveDistributor;
use crate::registry::{CapabilityCheck, Identity, WorkerRegistry};
use crate::snapshot::{EngineSnapshot, SNAPSHOT_VERSION};

/// The finalized result for an input key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// The winning aggregate root.
    #[serde(with = "serde_hex")]
    pub output: Hash,
    /// Votes for the winning value at finalization.
    pub votes: u32,
    /// Workers that voted for the winning value, in first-vote order.
    pub winners: Vec<Identity>,
    /// Round sequence number that finalized.
    pub round: u64,
    /// Finalization time in seconds since UNIX epoch.
    pub finalized_at: u64,
}

/// Voting state machine over all input keys.
///
/// Owns the voting rounds, the worker registry and the reward pool. All
/// mutation goes through `&mut self`, so each call is applied atomically
/// with respect to every other call.
#[derive(Debug)]
pub struct ConsensusEngine {
    config: EngineConfig,
    owner: Identity,
    clock: Arc<dyn Clock>,
    registry: WorkerRegistry,
    rewards: IncentiveDistributor,
    /// Latest round per input key.
    rounds: BTreeMap<InputKey, VotingRound>,
    matches: BTreeMap<InputKey, MatchOutcome>,
}

impl ConsensusEngine {
    /// Creates an engine with an empty worker set and reward pool.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `config` is out of range.
    pub fn new(
        config: EngineConfig,
        owner: Identity,
        authority: Arc<dyn CapabilityCheck>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = WorkerRegistry::new(
            authority,
            config.worker_role.clone(),
            config.role_version,
        );
        let rewards = IncentiveDistributor::new(config.settlement);
        Ok(Self {
            config,
            owner,
            clock,
            registry,
            rewards,
            rounds: BTreeMap::new(),
            matches: BTreeMap::new(),
        })
    }

    // ────────── Worker set ──────────

    /// Adds a worker. Any caller may do this.
    ///
    /// # Errors
    ///
    /// Returns [`VotingError::Registry`] wrapping `NotAuthorized` or
    /// `AlreadyRegistered`.
    pub fn add_worker(&mut self, identity: Identity) -> Result<Vec<VotingEvent>, VotingError> {
        let change = self.registry.add_worker(identity)?;
        Ok(vec![VotingEvent::Membership(change)])
    }

    /// Removes a worker whose role was revoked. Any caller may do this.
    ///
    /// # Errors
    ///
    /// Returns [`VotingError::Registry`] wrapping `NotRegistered` or
    /// `StillAuthorized`.
    pub fn remove_worker(&mut self, identity: &Identity) -> Result<Vec<VotingEvent>, VotingError> {
        let change = self.registry.remove_worker(identity)?;
        Ok(vec![VotingEvent::Membership(change)])
    }

    /// Returns `true` if `identity` may vote.
    #[must_use]
    pub fn is_worker(&self, identity: &Identity) -> bool {
        self.registry.is_worker(identity)
    }

    // ────────── Voting ──────────

    /// Casts or overwrites `voter`'s vote for `input_key`.
    ///
    /// An expired open round is closed first and a new round is opened for
    /// this vote. After recording, the majority rule is applied; on success
    /// the round finalizes and winners are paid.
    ///
    /// # Errors
    ///
    /// - [`VotingError::NotWhitelisted`] if `voter` is not a worker
    /// - [`VotingError::VotingAlreadyEnded`] if `input_key` already finalized
    pub fn vote(
        &mut self,
        voter: &Identity,
        input_key: &InputKey,
        output: Hash,
    ) -> Result<Vec<VotingEvent>, VotingError> {
        if !self.registry.is_worker(voter) {
            return Err(VotingError::NotWhitelisted {
                voter: voter.clone(),
            });
        }
        if self.matches.contains_key(input_key) {
            return Err(VotingError::VotingAlreadyEnded {
                input_key: input_key.clone(),
            });
        }

        let now = self.clock.now_secs();
        let time_limit = self.config.time_limit_secs;
        let mut events = Vec::new();

        let next_round = match self.rounds.get_mut(input_key) {
            Some(round) if round.is_expired_at(now, time_limit) => {
                round.expire();
                warn!(input_key = %input_key, round = round.round(), "voting expired");
                events.push(VotingEvent::VotingExpired {
                    input_key: input_key.clone(),
                });
                Some(round.round() + 1)
            },
            Some(round) if round.status() == RoundStatus::Open => None,
            Some(round) => Some(round.round() + 1),
            None => Some(1),
        };

        if let Some(number) = next_round {
            self.rounds.insert(
                input_key.clone(),
                VotingRound::open(input_key.clone(), number, now),
            );
            debug!(input_key = %input_key, round = number, "voting round started");
            events.push(VotingEvent::RoundStarted {
                input_key: input_key.clone(),
                round: number,
            });
        }

        let Some(round) = self.rounds.get_mut(input_key) else {
            return Ok(events);
        };
        let previous = round.record(voter, output, now);
        debug!(
            input_key = %input_key,
            voter = %voter,
            output = %hex_encode(&output),
            revote = previous.is_some(),
            "vote recorded"
        );
        events.push(VotingEvent::VoteRecorded {
            input_key: input_key.clone(),
            voter: voter.clone(),
            output,
        });

        let decision = round.decide(
            self.registry.worker_count(),
            self.config.majority_percentage,
            self.config.majority_rule,
        );
        match decision {
            Decision::Winner { output, votes } => {
                let outcome = MatchOutcome {
                    output,
                    votes,
                    winners: round.voters_for(&output),
                    round: round.round(),
                    finalized_at: now,
                };
                round.finalize();
                events.extend(self.finalize(input_key, outcome));
            },
            Decision::Undecided => {
                let all_voted = self
                    .registry
                    .workers()
                    .all(|worker| round.vote_of(worker).is_some());
                if all_voted {
                    info!(input_key = %input_key, "no consensus reached");
                    events.push(VotingEvent::NoConsensusReached {
                        input_key: input_key.clone(),
                    });
                }
            },
        }

        Ok(events)
    }

    /// Expires every open round older than the time limit.
    ///
    /// Expiring an already expired round is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`VotingError::NotAuthorized`] if `caller` is not the owner.
    pub fn cancel_expired_votings(
        &mut self,
        caller: &Identity,
    ) -> Result<Vec<VotingEvent>, VotingError> {
        if *caller != self.owner {
            return Err(VotingError::NotAuthorized {
                caller: caller.clone(),
            });
        }

        let now = self.clock.now_secs();
        let time_limit = self.config.time_limit_secs;
        let mut events = Vec::new();
        for (input_key, round) in &mut self.rounds {
            if round.is_expired_at(now, time_limit) && round.expire() {
                warn!(input_key = %input_key, round = round.round(), "voting cancelled after time limit");
                events.push(VotingEvent::VotingExpired {
                    input_key: input_key.clone(),
                });
            }
        }
        Ok(events)
    }

    fn finalize(&mut self, input_key: &InputKey, outcome: MatchOutcome) -> Vec<VotingEvent> {
        info!(
            input_key = %input_key,
            output = %hex_encode(&outcome.output),
            votes = outcome.votes,
            winners = outcome.winners.len(),
            "winning match"
        );
        let mut events = vec![VotingEvent::WinningMatch {
            input_key: input_key.clone(),
            output: outcome.output,
            votes: outcome.votes,
        }];

        let payouts = self
            .rewards
            .pay_winners(&outcome.winners, u128::from(self.config.reward_amount));
        events.extend(payouts.into_iter().map(VotingEvent::Payout));

        self.matches.insert(input_key.clone(), outcome);
        events
    }

    // ────────── Reward pool ──────────

    /// Funds the reward pool. Any caller may do this.
    ///
    /// # Errors
    ///
    /// Returns [`VotingError::Reward`] for a zero or overflowing deposit.
    pub fn deposit(&mut self, amount: u128) -> Result<Vec<VotingEvent>, VotingError> {
        let payouts = self.rewards.deposit(amount)?;
        Ok(payouts.into_iter().map(VotingEvent::Payout).collect())
    }

    /// Pays pending rewards in FIFO order while the pool covers them.
    pub fn settle_pending(&mut self) -> Vec<VotingEvent> {
        self.rewards
            .settle_pending()
            .into_iter()
            .map(VotingEvent::Payout)
            .collect()
    }

    /// Pays everything owed to `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`VotingError::Reward`] wrapping `NothingPending` or
    /// `InsufficientFunds`.
    pub fn claim_reward(&mut self, identity: &Identity) -> Result<Vec<VotingEvent>, VotingError> {
        let payout = self.rewards.claim(identity)?;
        Ok(vec![VotingEvent::Payout(payout)])
    }

    // ────────── Queries ──────────

    /// The finalized match output for `input_key`.
    #[must_use]
    pub fn get_match(&self, input_key: &InputKey) -> Option<Hash> {
        self.matches.get(input_key).map(|outcome| outcome.output)
    }

    /// `identity`'s vote in the open or finalized round for `input_key`.
    #[must_use]
    pub fn get_worker_vote(&self, input_key: &InputKey, identity: &Identity) -> Option<Hash> {
        self.rounds
            .get(input_key)
            .filter(|round| round.status() != RoundStatus::Expired)
            .and_then(|round| round.vote_of(identity))
    }

    /// Number of input keys with a finalized match.
    #[must_use]
    pub fn number_of_match_inputs(&self) -> usize {
        self.matches.len()
    }

    /// Full finalized outcome for `input_key`.
    #[must_use]
    pub fn outcome(&self, input_key: &InputKey) -> Option<&MatchOutcome> {
        self.matches.get(input_key)
    }

    /// Workers paid (or owed) for `input_key`.
    #[must_use]
    pub fn winners(&self, input_key: &InputKey) -> Option<&[Identity]> {
        self.matches
            .get(input_key)
            .map(|outcome| outcome.winners.as_slice())
    }

    /// Status of the latest round for `input_key`.
    #[must_use]
    pub fn round_status(&self, input_key: &InputKey) -> Option<RoundStatus> {
        self.rounds.get(input_key).map(VotingRound::status)
    }

    /// Latest round for `input_key`.
    #[must_use]
    pub fn round(&self, input_key: &InputKey) -> Option<&VotingRound> {
        self.rounds.get(input_key)
    }

    /// The engine owner.
    #[must_use]
    pub const fn owner(&self) -> &Identity {
        &self.owner
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The worker registry.
    #[must_use]
    pub const fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    /// The reward pool.
    #[must_use]
    pub const fn rewards(&self) -> &IncentiveDistributor {
        &self.rewards
    }

    // ────────── Persistence ──────────

    /// Captures the persisted state.
    #[must_use]
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            version: SNAPSHOT_VERSION,
            config: self.config.clone(),
            owner: self.owner.clone(),
            workers: self.registry.workers().cloned().collect(),
            rounds: self.rounds.values().cloned().collect(),
            matches: self.matches.clone(),
            rewards: self.rewards.clone(),
        }
    }

    /// Rebuilds an engine from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the snapshot's configuration is
    /// out of range.
    pub fn from_snapshot(
        snapshot: EngineSnapshot,
        authority: Arc<dyn CapabilityCheck>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let EngineSnapshot {
            config,
            owner,
            workers,
            rounds,
            matches,
            mut rewards,
            ..
        } = snapshot;
        config.validate()?;

        let registry = WorkerRegistry::with_workers(
            authority,
            config.worker_role.clone(),
            config.role_version,
            workers,
        );
        rewards.set_settlement(config.settlement);
        let rounds = rounds
            .into_iter()
            .map(|round| (round.input_key().clone(), round))
            .collect();

        Ok(Self {
            config,
            owner,
            clock,
            registry,
            rewards,
            rounds,
            matches,
        })
    }
}
