use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{require, Result, VaultError};

/// Identity of a share holder (wallet address or account name)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HolderId(pub String);

impl From<&str> for HolderId {
    fn from(value: &str) -> Self {
        HolderId(value.to_string())
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderAccount {
    pub shares: u64,
}

/// Per-holder share balances and the outstanding supply.
///
/// Accounts are created on first mint and never removed, even at zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLedger {
    total_shares: u64,
    holders: BTreeMap<HolderId, HolderAccount>,
}

impl ShareLedger {
    pub fn total_shares(&self) -> u64 {
        self.total_shares
    }

    pub fn balance_of(&self, owner: &HolderId) -> u64 {
        self.holders.get(owner).map_or(0, |h| h.shares)
    }

    pub fn holder(&self, owner: &HolderId) -> Option<&HolderAccount> {
        self.holders.get(owner)
    }

    pub fn holders(&self) -> impl Iterator<Item = (&HolderId, &HolderAccount)> {
        self.holders.iter()
    }

    pub fn mint(&mut self, owner: &HolderId, shares: u64) -> Result<()> {
        require!(shares > 0, VaultError::InvalidAmount { amount: shares });

        let total_shares = self
            .total_shares
            .checked_add(shares)
            .ok_or(VaultError::MathOverflow)?;
        let account = self.holders.entry(owner.clone()).or_default();
        account.shares = account
            .shares
            .checked_add(shares)
            .ok_or(VaultError::MathOverflow)?;
        self.total_shares = total_shares;
        Ok(())
    }

    pub fn burn(&mut self, owner: &HolderId, shares: u64) -> Result<()> {
        let available = self.balance_of(owner);
        require!(
            shares <= available,
            VaultError::InsufficientShares {
                owner: owner.clone(),
                requested: shares,
                available,
            }
        );
        if shares == 0 {
            return Ok(());
        }

        if let Some(account) = self.holders.get_mut(owner) {
            account.shares -= shares;
        }
        self.total_shares = self
            .total_shares
            .checked_sub(shares)
            .ok_or(VaultError::MathOverflow)?;
        Ok(())
    }

    /// Whether holder balances sum to the outstanding supply
    pub fn is_balanced(&self) -> bool {
        let sum = self
            .holders
            .values()
            .try_fold(0u64, |acc, h| acc.checked_add(h.shares));
        sum == Some(self.total_shares)
    }
}
