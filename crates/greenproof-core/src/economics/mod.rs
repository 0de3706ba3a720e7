//! Reward pool and winner payouts.
//!
//! When a round finalizes, every worker whose vote matched the winning value
//! is owed a fixed reward. The [`IncentiveDistributor`] pays from its pool
//! while funds last and records the remainder as pending liabilities.
//! A funding shortfall never blocks finalization.
//!
//! Deferred rewards are settled according to [`SettlementPolicy`]:
//!
//! - `OnDeposit`: every deposit sweeps the pending queue in FIFO order
//! - `Explicit`: the host calls `settle_pending` or `claim`

mod rewards;

pub use rewards::{IncentiveDistributor, PayoutEvent, PendingReward, RewardError, SettlementPolicy};
