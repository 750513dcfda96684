use serde::{Deserialize, Serialize};

use crate::constants::PRICE_PRECISION;
use crate::error::{Result, VaultError};
use crate::math::{mul_div, Rounding};
use crate::state::{HolderId, PositionLedger, ShareLedger};

/// The vault's complete mutable state.
///
/// Operations run against a clone and the clone replaces this value only when
/// the operation succeeds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultState {
    /// Vault admin who can pause/unpause and transfer authority
    pub authority: HolderId,
    pub positions: PositionLedger,
    pub shares: ShareLedger,
    /// Base-asset value held by the vault but not staked
    pub idle_balance: u64,
    /// Emergency pause flag
    pub paused: bool,
    /// Timestamp of the last harvest that ran
    pub last_harvest_ts: Option<i64>,
    /// Cumulative value compounded by harvests
    pub total_harvested: u64,
}

impl VaultState {
    pub fn new(namespace: &str, authority: HolderId) -> Self {
        Self {
            authority,
            positions: PositionLedger::new(namespace),
            shares: ShareLedger::default(),
            idle_balance: 0,
            paused: false,
            last_harvest_ts: None,
            total_harvested: 0,
        }
    }

    /// Live staked principal plus idle balance
    pub fn total_assets(&self) -> Result<u64> {
        self.positions
            .total_principal()?
            .checked_add(self.idle_balance)
            .ok_or(VaultError::MathOverflow)
    }

    /// Liquidity that can leave without breaking a lock at `now`
    pub fn unlocked_liquidity(&self, now: i64) -> Result<u64> {
        self.positions
            .unlocked_principal(now)?
            .checked_add(self.idle_balance)
            .ok_or(VaultError::MathOverflow)
    }

    pub fn total_shares(&self) -> u64 {
        self.shares.total_shares()
    }

    /// Assets per share scaled by `PRICE_PRECISION`; 1:1 for an empty vault
    pub fn price_per_share(&self) -> Result<u64> {
        let total_shares = self.total_shares();
        if total_shares == 0 {
            return Ok(PRICE_PRECISION);
        }
        mul_div(self.total_assets()?, PRICE_PRECISION, total_shares, Rounding::Floor)
    }

    pub(crate) fn add_idle(&mut self, amount: u64) -> Result<()> {
        self.idle_balance = self
            .idle_balance
            .checked_add(amount)
            .ok_or(VaultError::MathOverflow)?;
        Ok(())
    }

    pub(crate) fn take_idle(&mut self, amount: u64) -> Result<()> {
        self.idle_balance = self
            .idle_balance
            .checked_sub(amount)
            .ok_or(VaultError::InsufficientLiquidity {
                requested: amount,
                available: self.idle_balance,
            })?;
        Ok(())
    }
}
