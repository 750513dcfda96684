use serde::{Deserialize, Serialize};

use crate::constants::{
    BPS_DENOMINATOR, DEFAULT_CONVERSION_DEADLINE_SECS, DEFAULT_HARVEST_LOCK_DURATION_SECS,
    DEFAULT_LOCK_DURATION_SECS, MIN_DEPOSIT_AMOUNT, MIN_STAKE_AMOUNT,
};
use crate::error::{require, Result, VaultError};
use crate::interfaces::AssetId;
use crate::state::HolderId;

/// Where harvested value goes once converted into the base asset
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HarvestPolicy {
    /// Top up the position that produced the reward
    Compound,
    /// Stake the harvest as a fresh short lock
    NewPosition { lock_duration_secs: u64 },
}

/// Configuration for a vault instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub name: String,
    pub symbol: String,
    /// Initial vault authority
    pub authority: HolderId,
    /// Asset that principal and share prices are denominated in
    pub base_asset: AssetId,
    /// Asset the staking venue pays rewards in
    pub reward_asset: AssetId,
    pub lock_duration_secs: u64,
    pub min_deposit_amount: u64,
    /// Idle balance needed before it gets staked
    pub min_stake_amount: u64,
    pub harvest_policy: HarvestPolicy,
    /// Penalty on value taken from a still-locked position
    pub early_exit_penalty_bps: u16,
    /// Deadline passed to conversions, relative to the operation time
    pub conversion_deadline_secs: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            name: "ETH FARM".to_string(),
            symbol: "PETH".to_string(),
            authority: HolderId::from("admin"),
            base_asset: AssetId::from("ETH"),
            reward_asset: AssetId::from("ETH"),
            lock_duration_secs: DEFAULT_LOCK_DURATION_SECS,
            min_deposit_amount: MIN_DEPOSIT_AMOUNT,
            min_stake_amount: MIN_STAKE_AMOUNT,
            harvest_policy: HarvestPolicy::Compound,
            early_exit_penalty_bps: 0,
            conversion_deadline_secs: DEFAULT_CONVERSION_DEADLINE_SECS,
        }
    }
}

impl VaultConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let name = std::env::var("FARM_VAULT_NAME").unwrap_or(defaults.name);
        let symbol = std::env::var("FARM_VAULT_SYMBOL").unwrap_or(defaults.symbol);

        let authority = std::env::var("FARM_VAULT_AUTHORITY")
            .map(HolderId)
            .unwrap_or(defaults.authority);

        let base_asset = std::env::var("FARM_VAULT_BASE_ASSET")
            .map(AssetId)
            .unwrap_or(defaults.base_asset);

        let reward_asset = std::env::var("FARM_VAULT_REWARD_ASSET")
            .map(AssetId)
            .unwrap_or(defaults.reward_asset);

        let lock_duration_secs = parse_env("FARM_VAULT_LOCK_DURATION_SECS")
            .unwrap_or(defaults.lock_duration_secs);

        let min_deposit_amount = parse_env("FARM_VAULT_MIN_DEPOSIT")
            .unwrap_or(defaults.min_deposit_amount);

        let min_stake_amount = parse_env("FARM_VAULT_MIN_STAKE")
            .unwrap_or(defaults.min_stake_amount);

        let harvest_policy = match std::env::var("FARM_VAULT_HARVEST_POLICY").as_deref() {
            Ok("new_position") => HarvestPolicy::NewPosition {
                lock_duration_secs: parse_env("FARM_VAULT_HARVEST_LOCK_SECS")
                    .unwrap_or(DEFAULT_HARVEST_LOCK_DURATION_SECS),
            },
            Ok("compound") => HarvestPolicy::Compound,
            _ => defaults.harvest_policy,
        };

        let early_exit_penalty_bps = parse_env("FARM_VAULT_EARLY_EXIT_PENALTY_BPS")
            .unwrap_or(defaults.early_exit_penalty_bps);

        let conversion_deadline_secs = parse_env("FARM_VAULT_CONVERSION_DEADLINE_SECS")
            .unwrap_or(defaults.conversion_deadline_secs);

        Self {
            name,
            symbol,
            authority,
            base_asset,
            reward_asset,
            lock_duration_secs,
            min_deposit_amount,
            min_stake_amount,
            harvest_policy,
            early_exit_penalty_bps,
            conversion_deadline_secs,
        }
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| VaultError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        require!(
            u64::from(self.early_exit_penalty_bps) <= BPS_DENOMINATOR,
            VaultError::InvalidConfig(format!(
                "early_exit_penalty_bps {} exceeds {BPS_DENOMINATOR}",
                self.early_exit_penalty_bps
            ))
        );
        require!(
            !self.base_asset.0.is_empty() && !self.reward_asset.0.is_empty(),
            VaultError::InvalidConfig("asset identifiers must not be empty".to_string())
        );
        Ok(())
    }

    pub(crate) fn deadline(&self, now: i64) -> i64 {
        let window = i64::try_from(self.conversion_deadline_secs).unwrap_or(i64::MAX);
        now.saturating_add(window)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
