//! Reward pool accounting.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::registry::Identity;

/// When pending rewards are settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementPolicy {
    /// Pending rewards are paid only by `settle_pending` or `claim`.
    Explicit,
    /// Every deposit sweeps the pending queue.
    #[default]
    OnDeposit,
}

/// Reward pool errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RewardError {
    /// The pool cannot cover the requested payout.
    #[error("insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds {
        /// Current pool balance.
        balance: u128,
        /// Amount needed.
        required: u128,
    },

    /// A deposit of zero was attempted.
    #[error("deposit amount must be greater than zero")]
    ZeroDeposit,

    /// The deposit would overflow the pool balance.
    #[error("deposit of {amount} overflows pool balance {balance}")]
    BalanceOverflow {
        /// Current pool balance.
        balance: u128,
        /// Deposit amount.
        amount: u128,
    },

    /// The identity has no pending reward.
    #[error("no pending reward for {identity}")]
    NothingPending {
        /// The claimant.
        identity: Identity,
    },
}

/// Outcome of a payout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutEvent {
    /// A reward was paid immediately.
    Paid {
        /// Recipient.
        worker: Identity,
        /// Amount paid.
        amount: u128,
    },
    /// A reward was recorded as a pending liability.
    Deferred {
        /// Recipient.
        worker: Identity,
        /// Amount owed.
        amount: u128,
    },
    /// A previously deferred reward was paid.
    Settled {
        /// Recipient.
        worker: Identity,
        /// Amount paid.
        amount: u128,
    },
}

/// A reward owed but not yet paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReward {
    /// Recipient.
    pub worker: Identity,
    /// Amount owed.
    pub amount: u128,
}

/// Reward pool with a pending-liability queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncentiveDistributor {
    balance: u128,
    paid: BTreeMap<Identity, u128>,
    pending: VecDeque<PendingReward>,
    #[serde(default)]
    settlement: SettlementPolicy,
}

impl IncentiveDistributor {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(settlement: SettlementPolicy) -> Self {
        Self {
            settlement,
            ..Self::default()
        }
    }

    /// Adds funds to the pool.
    ///
    /// Under [`SettlementPolicy::OnDeposit`] the pending queue is swept
    /// afterwards and the resulting settlements are returned.
    ///
    /// # Errors
    ///
    /// Returns [`RewardError::ZeroDeposit`] for a zero amount and
    /// [`RewardError::BalanceOverflow`] if the balance would overflow.
    pub fn deposit(&mut self, amount: u128) -> Result<Vec<PayoutEvent>, RewardError> {
        if amount == 0 {
            return Err(RewardError::ZeroDeposit);
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(RewardError::BalanceOverflow {
                balance: self.balance,
                amount,
            })?;
        debug!(amount, balance = self.balance, "reward pool funded");

        Ok(match self.settlement {
            SettlementPolicy::OnDeposit => self.settle_pending(),
            SettlementPolicy::Explicit => Vec::new(),
        })
    }

    /// Pays `amount` to each winner in order while the pool covers it and
    /// defers the rest.
    ///
    /// While older rewards are still pending, new winners join the back of
    /// the queue instead of being paid ahead of them.
    pub fn pay_winners(&mut self, winners: &[Identity], amount: u128) -> Vec<PayoutEvent> {
        let mut events = Vec::with_capacity(winners.len());
        for worker in winners {
            if self.pending.is_empty() && self.balance >= amount {
                self.credit(worker, amount);
                info!(worker = %worker, amount, "reward paid");
                events.push(PayoutEvent::Paid {
                    worker: worker.clone(),
                    amount,
                });
            } else {
                self.pending.push_back(PendingReward {
                    worker: worker.clone(),
                    amount,
                });
                warn!(worker = %worker, amount, balance = self.balance, "reward deferred");
                events.push(PayoutEvent::Deferred {
                    worker: worker.clone(),
                    amount,
                });
            }
        }
        events
    }

    /// Pays pending rewards in FIFO order until one cannot be covered.
    pub fn settle_pending(&mut self) -> Vec<PayoutEvent> {
        let mut events = Vec::new();
        while let Some(front) = self.pending.front() {
            if front.amount > self.balance {
                break;
            }
            let Some(entry) = self.pending.pop_front() else {
                break;
            };
            self.credit(&entry.worker, entry.amount);
            info!(worker = %entry.worker, amount = entry.amount, "deferred reward settled");
            events.push(PayoutEvent::Settled {
                worker: entry.worker,
                amount: entry.amount,
            });
        }
        events
    }

    /// Pays everything pending for `identity` at once.
    ///
    /// # Errors
    ///
    /// - [`RewardError::NothingPending`] if nothing is owed to `identity`
    /// - [`RewardError::InsufficientFunds`] if the pool cannot cover the full
    ///   amount owed
    pub fn claim(&mut self, identity: &Identity) -> Result<PayoutEvent, RewardError> {
        let owed = self.pending_for(identity);
        if owed == 0 {
            return Err(RewardError::NothingPending {
                identity: identity.clone(),
            });
        }
        if owed > self.balance {
            return Err(RewardError::InsufficientFunds {
                balance: self.balance,
                required: owed,
            });
        }

        self.pending.retain(|entry| entry.worker != *identity);
        self.credit(identity, owed);
        info!(worker = %identity, amount = owed, "deferred reward claimed");
        Ok(PayoutEvent::Settled {
            worker: identity.clone(),
            amount: owed,
        })
    }

    /// Current pool balance.
    #[must_use]
    pub const fn balance(&self) -> u128 {
        self.balance
    }

    /// Total paid to `identity` so far.
    #[must_use]
    pub fn paid_to(&self, identity: &Identity) -> u128 {
        self.paid.get(identity).copied().unwrap_or(0)
    }

    /// Total owed to `identity`.
    #[must_use]
    pub fn pending_for(&self, identity: &Identity) -> u128 {
        self.pending
            .iter()
            .filter(|entry| entry.worker == *identity)
            .map(|entry| entry.amount)
            .sum()
    }

    /// Total owed to everyone.
    #[must_use]
    pub fn total_pending(&self) -> u128 {
        self.pending.iter().map(|entry| entry.amount).sum()
    }

    /// Pending entries in settlement order.
    pub fn pending(&self) -> impl Iterator<Item = &PendingReward> {
        self.pending.iter()
    }

    /// The active settlement policy.
    #[must_use]
    pub const fn settlement(&self) -> SettlementPolicy {
        self.settlement
    }

    /// Replaces the settlement policy, e.g. after restoring a snapshot.
    pub fn set_settlement(&mut self, settlement: SettlementPolicy) {
        self.settlement = settlement;
    }

    fn credit(&mut self, worker: &Identity, amount: u128) {
        self.balance -= amount;
        let total = self.paid.entry(worker.clone()).or_insert(0);
        *total = total.saturating_add(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<Identity> {
        names.iter().copied().map(Identity::new).collect()
    }

    #[test]
    fn pays_all_when_funded() {
        let mut pool = IncentiveDistributor::new(SettlementPolicy::OnDeposit);
        pool.deposit(40).unwrap();

        let events = pool.pay_winners(&ids(&["a", "b"]), 10);
        assert!(events.iter().all(|e| matches!(e, PayoutEvent::Paid { .. })));
        assert_eq!(pool.balance(), 20);
        assert_eq!(pool.paid_to(&Identity::new("a")), 10);
        assert_eq!(pool.total_pending(), 0);
    }

    #[test]
    fn shortfall_defers_remaining_winners() {
        let mut pool = IncentiveDistributor::new(SettlementPolicy::Explicit);
        pool.deposit(15).unwrap();

        let events = pool.pay_winners(&ids(&["a", "b", "c"]), 10);
        assert_eq!(
            events,
            vec![
                PayoutEvent::Paid {
                    worker: Identity::new("a"),
                    amount: 10
                },
                PayoutEvent::Deferred {
                    worker: Identity::new("b"),
                    amount: 10
                },
                PayoutEvent::Deferred {
                    worker: Identity::new("c"),
                    amount: 10
                },
            ]
        );
        assert_eq!(pool.balance(), 5);
        assert_eq!(pool.total_pending(), 20);
    }

    #[test]
    fn deposit_settles_pending_in_fifo_order() {
        let mut pool = IncentiveDistributor::new(SettlementPolicy::OnDeposit);
        pool.pay_winners(&ids(&["a", "b"]), 10);
        assert_eq!(pool.total_pending(), 20);

        let events = pool.deposit(15).unwrap();
        assert_eq!(
            events,
            vec![PayoutEvent::Settled {
                worker: Identity::new("a"),
                amount: 10
            }]
        );
        assert_eq!(pool.pending_for(&Identity::new("b")), 10);

        let events = pool.deposit(5).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(pool.balance(), 0);
        assert_eq!(pool.total_pending(), 0);
    }

    #[test]
    fn explicit_policy_waits_for_settle() {
        let mut pool = IncentiveDistributor::new(SettlementPolicy::Explicit);
        pool.pay_winners(&ids(&["a"]), 10);

        assert!(pool.deposit(30).unwrap().is_empty());
        assert_eq!(pool.pending_for(&Identity::new("a")), 10);

        assert_eq!(pool.settle_pending().len(), 1);
        assert_eq!(pool.paid_to(&Identity::new("a")), 10);
        assert_eq!(pool.balance(), 20);
    }

    #[test]
    fn new_winners_queue_behind_pending_rewards() {
        let mut pool = IncentiveDistributor::new(SettlementPolicy::Explicit);
        pool.pay_winners(&ids(&["a"]), 10);
        pool.deposit(10).unwrap();

        let events = pool.pay_winners(&ids(&["b"]), 10);
        assert_eq!(
            events,
            vec![PayoutEvent::Deferred {
                worker: Identity::new("b"),
                amount: 10
            }]
        );
        assert_eq!(pool.balance(), 10);

        assert_eq!(
            pool.settle_pending(),
            vec![PayoutEvent::Settled {
                worker: Identity::new("a"),
                amount: 10
            }]
        );
        assert_eq!(pool.pending_for(&Identity::new("b")), 10);
    }

    #[test]
    fn claim_pays_all_entries_for_identity() {
        let mut pool = IncentiveDistributor::new(SettlementPolicy::Explicit);
        pool.pay_winners(&ids(&["a", "b", "a"]), 10);
        pool.deposit(25).unwrap();

        let a = Identity::new("a");
        assert_eq!(
            pool.claim(&a),
            Ok(PayoutEvent::Settled {
                worker: a.clone(),
                amount: 20
            })
        );
        assert_eq!(pool.pending_for(&a), 0);
        assert_eq!(pool.pending_for(&Identity::new("b")), 10);
        assert_eq!(pool.balance(), 5);
    }

    #[test]
    fn claim_with_insufficient_funds_changes_nothing() {
        let mut pool = IncentiveDistributor::new(SettlementPolicy::Explicit);
        pool.pay_winners(&ids(&["a"]), 10);
        pool.deposit(5).unwrap();

        let a = Identity::new("a");
        assert_eq!(
            pool.claim(&a),
            Err(RewardError::InsufficientFunds {
                balance: 5,
                required: 10
            })
        );
        assert_eq!(pool.pending_for(&a), 10);
        assert_eq!(pool.balance(), 5);
    }

    #[test]
    fn claim_without_pending_fails() {
        let mut pool = IncentiveDistributor::new(SettlementPolicy::Explicit);
        assert!(matches!(
            pool.claim(&Identity::new("a")),
            Err(RewardError::NothingPending { .. })
        ));
    }

    #[test]
    fn zero_and_overflowing_deposits_are_rejected() {
        let mut pool = IncentiveDistributor::new(SettlementPolicy::OnDeposit);
        assert_eq!(pool.deposit(0), Err(RewardError::ZeroDeposit));
        pool.deposit(u128::MAX).unwrap();
        assert!(matches!(
            pool.deposit(1),
            Err(RewardError::BalanceOverflow { .. })
        ));
        assert_eq!(pool.balance(), u128::MAX);
    }
}
