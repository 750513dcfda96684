use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::POSITION_ID_DOMAIN;
use crate::error::{require, Result, VaultError};
use crate::interfaces::StakeRef;

/// Content-derived identifier of a locked position
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(pub [u8; 32]);

impl PositionId {
    /// Hash of the ledger namespace, opening timestamp and a per-ledger nonce.
    pub fn derive(namespace: &str, opened_at: i64, nonce: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(POSITION_ID_DOMAIN);
        hasher.update(namespace.as_bytes());
        hasher.update(&opened_at.to_le_bytes());
        hasher.update(&nonce.to_le_bytes());
        PositionId(*hasher.finalize().as_bytes())
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = blake3::Hash::from(self.0).to_hex();
        f.write_str(&hex[..16])
    }
}

impl fmt::Debug for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PositionId({self})")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Active,
    PartiallyWithdrawn,
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedPosition {
    pub id: PositionId,
    /// Handle of the stake at the staking venue
    pub stake_ref: StakeRef,
    /// Underlying value committed to the lock
    pub principal: u64,
    pub lock_start: i64,
    pub lock_end: i64,
    /// Reward claimed from the venue but not yet compounded
    pub reward_accrued: u64,
    pub status: PositionStatus,
}

impl LockedPosition {
    pub fn is_live(&self) -> bool {
        self.status != PositionStatus::Closed
    }

    pub fn is_unlocked(&self, now: i64) -> bool {
        now >= self.lock_end
    }
}

/// Insertion-ordered collection of the vault's locked positions.
///
/// Closed positions stay in the list so their ids keep resolving.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionLedger {
    namespace: String,
    nonce: u64,
    positions: Vec<LockedPosition>,
}

impl PositionLedger {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            nonce: 0,
            positions: Vec::new(),
        }
    }

    /// Open a new Active position locked for `lock_duration_secs` from `now`.
    pub fn open(
        &mut self,
        principal: u64,
        lock_duration_secs: u64,
        now: i64,
        stake_ref: StakeRef,
    ) -> Result<PositionId> {
        require!(principal > 0, VaultError::InvalidAmount { amount: principal });

        let duration = i64::try_from(lock_duration_secs).map_err(|_| VaultError::MathOverflow)?;
        let lock_end = now.checked_add(duration).ok_or(VaultError::MathOverflow)?;

        let id = PositionId::derive(&self.namespace, now, self.nonce);
        self.nonce = self.nonce.checked_add(1).ok_or(VaultError::MathOverflow)?;

        self.positions.push(LockedPosition {
            id,
            stake_ref,
            principal,
            lock_start: now,
            lock_end,
            reward_accrued: 0,
            status: PositionStatus::Active,
        });

        debug!(position = %id, principal, lock_end, "Position opened");
        Ok(id)
    }

    /// Add principal to a live position without touching its lock.
    pub fn top_up(&mut self, id: &PositionId, amount: u64) -> Result<()> {
        require!(amount > 0, VaultError::InvalidAmount { amount });
        let position = self.get_mut(id)?;
        require!(position.is_live(), VaultError::UnknownPosition(*id));

        position.principal = position
            .principal
            .checked_add(amount)
            .ok_or(VaultError::MathOverflow)?;
        Ok(())
    }

    pub fn accrue_reward(&mut self, id: &PositionId, amount: u64) -> Result<()> {
        let position = self.get_mut(id)?;
        position.reward_accrued = position
            .reward_accrued
            .checked_add(amount)
            .ok_or(VaultError::MathOverflow)?;
        Ok(())
    }

    /// Take the accrued reward, leaving zero behind. Closed positions yield 0.
    pub fn claim(&mut self, id: &PositionId) -> Result<u64> {
        let position = self.get_mut(id)?;
        if !position.is_live() {
            return Ok(0);
        }
        Ok(std::mem::take(&mut position.reward_accrued))
    }

    /// Remove up to `amount` of principal and return what was actually removed.
    ///
    /// Breaking a lock before `lock_end` requires `allow_early`.
    pub fn reduce(
        &mut self,
        id: &PositionId,
        amount: u64,
        now: i64,
        allow_early: bool,
    ) -> Result<u64> {
        let position = self.get_mut(id)?;
        if !position.is_live() {
            return Ok(0);
        }
        require!(
            allow_early || position.is_unlocked(now),
            VaultError::PositionLocked {
                id: *id,
                unlocks_at: position.lock_end,
            }
        );

        let removed = amount.min(position.principal);
        if removed == 0 {
            return Ok(0);
        }
        position.principal -= removed;
        position.status = if position.principal == 0 {
            PositionStatus::Closed
        } else {
            PositionStatus::PartiallyWithdrawn
        };

        debug!(position = %id, removed, remaining = position.principal, "Position reduced");
        Ok(removed)
    }

    /// Sum of principal across live positions
    pub fn total_principal(&self) -> Result<u64> {
        self.live().try_fold(0u64, |acc, p| {
            acc.checked_add(p.principal).ok_or(VaultError::MathOverflow)
        })
    }

    /// Sum of principal across live positions whose lock has expired at `now`
    pub fn unlocked_principal(&self, now: i64) -> Result<u64> {
        self.live()
            .filter(|p| p.is_unlocked(now))
            .try_fold(0u64, |acc, p| {
                acc.checked_add(p.principal).ok_or(VaultError::MathOverflow)
            })
    }

    pub fn get(&self, id: &PositionId) -> Result<&LockedPosition> {
        self.positions
            .iter()
            .find(|p| p.id == *id)
            .ok_or(VaultError::UnknownPosition(*id))
    }

    fn get_mut(&mut self, id: &PositionId) -> Result<&mut LockedPosition> {
        self.positions
            .iter_mut()
            .find(|p| p.id == *id)
            .ok_or(VaultError::UnknownPosition(*id))
    }

    /// All positions, closed ones included, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &LockedPosition> {
        self.positions.iter()
    }

    /// Live positions in insertion order
    pub fn live(&self) -> impl Iterator<Item = &LockedPosition> {
        self.positions.iter().filter(|p| p.is_live())
    }

    /// Most recently opened position that is still live
    pub fn newest_live(&self) -> Option<&LockedPosition> {
        self.positions.iter().rev().find(|p| p.is_live())
    }
}
