//! Deterministic in-memory collaborators.
//!
//! Used by the test suites and by hosts that want to drive a vault without a
//! chain. Failures are reported as [`CollaboratorError`] values wrapped in
//! `anyhow`, the same way a real adapter would report them.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{anyhow, bail, Context as _};
use tracing::debug;

use crate::error::CollaboratorError;
use crate::interfaces::{AssetConverter, AssetId, Custody, StakeRef, StakingVenue};
use crate::state::HolderId;

/// Converter quoting fixed exchange rates between asset pairs
#[derive(Clone, Debug, Default)]
pub struct FixedRateConverter {
    /// (from, to) -> (numerator, denominator)
    rates: BTreeMap<(AssetId, AssetId), (u64, u64)>,
    halted: bool,
    clock: Option<i64>,
}

impl FixedRateConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quote `from -> to` at `numerator / denominator`
    pub fn with_rate(mut self, from: &str, to: &str, numerator: u64, denominator: u64) -> Self {
        self.set_rate(from, to, numerator, denominator);
        self
    }

    pub fn set_rate(&mut self, from: &str, to: &str, numerator: u64, denominator: u64) {
        self.rates
            .insert((from.into(), to.into()), (numerator, denominator));
    }

    /// Fail every conversion with `Unavailable` until resumed
    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn resume(&mut self) {
        self.halted = false;
    }

    /// Time used to check conversion deadlines; none means they never expire
    pub fn set_clock(&mut self, now: i64) {
        self.clock = Some(now);
    }
}

impl AssetConverter for FixedRateConverter {
    fn quote(&self, amount_in: u64, from: &AssetId, to: &AssetId) -> anyhow::Result<u64> {
        if self.halted {
            return Err(CollaboratorError::Unavailable.into());
        }
        if from == to {
            return Ok(amount_in);
        }
        let (numerator, denominator) = self
            .rates
            .get(&(from.clone(), to.clone()))
            .copied()
            .with_context(|| format!("no route from {from} to {to}"))?;
        if denominator == 0 {
            bail!("zero denominator for {from} -> {to}");
        }

        let out = u128::from(amount_in) * u128::from(numerator) / u128::from(denominator);
        u64::try_from(out).map_err(|_| anyhow!("conversion output overflows u64"))
    }

    fn convert(
        &mut self,
        amount_in: u64,
        from: &AssetId,
        to: &AssetId,
        min_out: u64,
        deadline: i64,
    ) -> anyhow::Result<u64> {
        if self.halted {
            return Err(CollaboratorError::Unavailable.into());
        }
        if let Some(now) = self.clock {
            if now > deadline {
                return Err(CollaboratorError::Expired { deadline }.into());
            }
        }

        let amount_out = self.quote(amount_in, from, to)?;
        if amount_out < min_out {
            return Err(CollaboratorError::SlippageExceeded {
                min_out,
                amount_out,
            }
            .into());
        }

        debug!(%from, %to, amount_in, amount_out, "Converted");
        Ok(amount_out)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VenueStake {
    pub principal: u64,
    pub lock_end: Option<i64>,
    pub pending_reward: u64,
}

/// Staking venue keeping stakes and rewards in memory
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InMemoryVenue {
    stakes: BTreeMap<u64, VenueStake>,
    next_ref: u64,
    failing_claims: BTreeSet<u64>,
    rejecting_stakes: bool,
    clock: Option<i64>,
}

impl InMemoryVenue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time used to enforce locks; none means the venue trusts the `early` flag
    pub fn set_clock(&mut self, now: i64) {
        self.clock = Some(now);
    }

    /// Credit reward to one stake
    pub fn accrue(&mut self, stake: StakeRef, amount: u64) {
        if let Some(entry) = self.stakes.get_mut(&stake.0) {
            entry.pending_reward = entry.pending_reward.saturating_add(amount);
        }
    }

    /// Split `total` reward across stakes pro rata to principal.
    ///
    /// The rounding remainder goes to the oldest stake with principal.
    pub fn distribute_reward(&mut self, total: u64) {
        let staked: u128 = self.stakes.values().map(|s| u128::from(s.principal)).sum();
        if staked == 0 {
            return;
        }

        let mut paid = 0u64;
        for entry in self.stakes.values_mut() {
            let share = u128::from(total) * u128::from(entry.principal) / staked;
            // share <= total
            let share = share as u64;
            entry.pending_reward = entry.pending_reward.saturating_add(share);
            paid += share;
        }
        if let Some(first) = self.stakes.values_mut().find(|s| s.principal > 0) {
            first.pending_reward = first.pending_reward.saturating_add(total - paid);
        }
    }

    /// Make claims on `stake` fail until cleared
    pub fn fail_claims_for(&mut self, stake: StakeRef) {
        self.failing_claims.insert(stake.0);
    }

    pub fn clear_failures(&mut self) {
        self.failing_claims.clear();
        self.rejecting_stakes = false;
    }

    /// Reject new stakes and top-ups with `Unavailable`
    pub fn reject_stakes(&mut self) {
        self.rejecting_stakes = true;
    }

    pub fn stake_of(&self, stake: StakeRef) -> Option<&VenueStake> {
        self.stakes.get(&stake.0)
    }

    pub fn principal_of(&self, stake: StakeRef) -> u64 {
        self.stake_of(stake).map_or(0, |s| s.principal)
    }

    pub fn total_principal(&self) -> u64 {
        self.stakes.values().map(|s| s.principal).sum()
    }

    fn entry_mut(&mut self, stake: StakeRef) -> anyhow::Result<&mut VenueStake> {
        self.stakes
            .get_mut(&stake.0)
            .ok_or_else(|| anyhow!("unknown stake {}", stake.0))
    }
}

impl StakingVenue for InMemoryVenue {
    fn stake(&mut self, amount: u64, lock_duration_secs: u64) -> anyhow::Result<StakeRef> {
        if self.rejecting_stakes {
            return Err(CollaboratorError::Unavailable.into());
        }

        let lock_end = match self.clock {
            Some(now) => {
                let duration = i64::try_from(lock_duration_secs)?;
                Some(now.checked_add(duration).context("lock end overflows")?)
            }
            None => None,
        };

        let stake = StakeRef(self.next_ref);
        self.next_ref += 1;
        self.stakes.insert(
            stake.0,
            VenueStake {
                principal: amount,
                lock_end,
                pending_reward: 0,
            },
        );
        Ok(stake)
    }

    fn add_to_stake(&mut self, stake: StakeRef, amount: u64) -> anyhow::Result<()> {
        if self.rejecting_stakes {
            return Err(CollaboratorError::Unavailable.into());
        }
        let entry = self.entry_mut(stake)?;
        entry.principal = entry
            .principal
            .checked_add(amount)
            .context("stake principal overflows")?;
        Ok(())
    }

    fn claim_reward(&mut self, stake: StakeRef) -> anyhow::Result<u64> {
        if self.failing_claims.contains(&stake.0) {
            return Err(CollaboratorError::Unavailable.into());
        }
        let entry = self.entry_mut(stake)?;
        Ok(std::mem::take(&mut entry.pending_reward))
    }

    fn unstake(&mut self, stake: StakeRef, amount: u64, early: bool) -> anyhow::Result<()> {
        let now = self.clock;
        let entry = self.entry_mut(stake)?;
        if let (Some(now), Some(lock_end), false) = (now, entry.lock_end, early) {
            if now < lock_end {
                return Err(CollaboratorError::StillLocked.into());
            }
        }
        if amount > entry.principal {
            bail!(
                "unstake of {amount} exceeds principal {} of stake {}",
                entry.principal,
                stake.0
            );
        }
        entry.principal -= amount;
        Ok(())
    }
}

/// Custody keeping holder balances per asset
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerCustody {
    balances: BTreeMap<(HolderId, AssetId), u64>,
    /// Assets held on behalf of the vault
    vault: BTreeMap<AssetId, u64>,
    rejecting_payouts: bool,
}

impl LedgerCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `holder` an external balance of `asset`
    pub fn fund(&mut self, holder: &HolderId, asset: &str, amount: u64) {
        let balance = self
            .balances
            .entry((holder.clone(), asset.into()))
            .or_default();
        *balance = balance.saturating_add(amount);
    }

    pub fn balance(&self, holder: &HolderId, asset: &str) -> u64 {
        self.balances
            .get(&(holder.clone(), asset.into()))
            .copied()
            .unwrap_or(0)
    }

    /// Fail every `transfer_out` with `Unavailable` until accepted again
    pub fn reject_payouts(&mut self) {
        self.rejecting_payouts = true;
    }

    pub fn accept_payouts(&mut self) {
        self.rejecting_payouts = false;
    }

    /// Total received into the vault in `asset`, net of payouts in it
    pub fn vault_balance(&self, asset: &str) -> u64 {
        self.vault.get(&AssetId::from(asset)).copied().unwrap_or(0)
    }
}

impl Custody for LedgerCustody {
    fn transfer_in(&mut self, from: &HolderId, asset: &AssetId, amount: u64) -> anyhow::Result<()> {
        let balance = self
            .balances
            .get_mut(&(from.clone(), asset.clone()))
            .filter(|balance| **balance >= amount)
            .with_context(|| format!("{from} cannot cover {amount} {asset}"))?;
        *balance -= amount;

        let held = self.vault.entry(asset.clone()).or_default();
        *held = held.saturating_add(amount);
        Ok(())
    }

    fn transfer_out(&mut self, to: &HolderId, asset: &AssetId, amount: u64) -> anyhow::Result<()> {
        if self.rejecting_payouts {
            return Err(CollaboratorError::Unavailable.into());
        }
        // Payouts may be in an asset the vault received by conversion
        let held = self.vault.entry(asset.clone()).or_default();
        *held = held.saturating_sub(amount);

        let balance = self.balances.entry((to.clone(), asset.clone())).or_default();
        *balance = balance
            .checked_add(amount)
            .context("receiver balance overflows")?;
        Ok(())
    }
}
