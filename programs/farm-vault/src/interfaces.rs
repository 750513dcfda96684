//! Capabilities the vault consumes from the outside world.
//!
//! The engine only talks to swap routers, staking venues and token custody
//! through these traits, so hosts plug in chain adapters and tests plug in the
//! deterministic implementations from [`crate::sim`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::HolderId;

/// Token identifier (symbol or mint address)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub String);

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        AssetId(value.to_string())
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Venue-side handle of a stake
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StakeRef(pub u64);

/// Swap/liquidity source used to turn rewards and deposits into the base asset.
pub trait AssetConverter {
    /// Expected output of converting `amount_in`, without executing anything
    fn quote(&self, amount_in: u64, from: &AssetId, to: &AssetId) -> anyhow::Result<u64>;

    /// Convert `amount_in` of `from` into `to`, failing if the output is below
    /// `min_out` or `deadline` has passed.
    fn convert(
        &mut self,
        amount_in: u64,
        from: &AssetId,
        to: &AssetId,
        min_out: u64,
        deadline: i64,
    ) -> anyhow::Result<u64>;
}

/// External venue holding the time-locked stakes.
pub trait StakingVenue {
    fn stake(&mut self, amount: u64, lock_duration_secs: u64) -> anyhow::Result<StakeRef>;

    /// Add principal to an existing stake without extending its lock
    fn add_to_stake(&mut self, stake: StakeRef, amount: u64) -> anyhow::Result<()>;

    /// Collect reward earned since the previous claim
    fn claim_reward(&mut self, stake: StakeRef) -> anyhow::Result<u64>;

    fn unstake(&mut self, stake: StakeRef, amount: u64, early: bool) -> anyhow::Result<()>;
}

/// Token custody moving assets between holders and the vault.
pub trait Custody {
    fn transfer_in(&mut self, from: &HolderId, asset: &AssetId, amount: u64) -> anyhow::Result<()>;

    fn transfer_out(&mut self, to: &HolderId, asset: &AssetId, amount: u64) -> anyhow::Result<()>;
}
