use crate::config::VaultConfig;
use crate::error::Result;
use crate::instructions::{deposit::deposit_shares, withdraw::withdraw_shares};
use crate::math::{convert_to_assets, convert_to_shares, Rounding};
use crate::selection::{plan_explicit, plan_withdrawal, WithdrawalPlan};
use crate::state::{HolderId, PositionId, VaultState};

/// Preview how many shares would be minted for given assets (floor rounding)
pub fn preview_deposit(state: &VaultState, assets: u64) -> Result<u64> {
    deposit_shares(state, assets)
}

/// Preview how many assets are required to mint exact shares (ceiling rounding)
pub fn preview_mint(state: &VaultState, shares: u64) -> Result<u64> {
    convert_to_assets(
        shares,
        state.total_assets()?,
        state.total_shares(),
        Rounding::Ceiling,
    )
}

/// Preview how many shares must be burned to withdraw exact assets (ceiling rounding)
pub fn preview_withdraw_shares(state: &VaultState, assets: u64) -> Result<u64> {
    withdraw_shares(state, assets)
}

/// Preview how many assets would be received for redeeming shares (floor rounding)
pub fn preview_redeem(state: &VaultState, shares: u64) -> Result<u64> {
    convert_to_assets(
        shares,
        state.total_assets()?,
        state.total_shares(),
        Rounding::Floor,
    )
}

/// The plan a withdrawal of `assets` would execute at `now`
pub fn preview_withdraw(
    state: &VaultState,
    config: &VaultConfig,
    assets: u64,
    now: i64,
    allow_early_exit: bool,
) -> Result<WithdrawalPlan> {
    plan_withdrawal(
        state,
        assets,
        now,
        allow_early_exit,
        config.early_exit_penalty_bps,
    )
}

/// The plan a withdrawal from explicit positions would execute at `now`
pub fn preview_withdraw_with_id(
    state: &VaultState,
    config: &VaultConfig,
    assets: u64,
    position_ids: &[PositionId],
    now: i64,
    allow_early_exit: bool,
) -> Result<WithdrawalPlan> {
    plan_explicit(
        state,
        assets,
        position_ids,
        now,
        allow_early_exit,
        config.early_exit_penalty_bps,
    )
}

/// Convert assets to shares using floor rounding
pub fn convert_to_shares_view(state: &VaultState, assets: u64) -> Result<u64> {
    convert_to_shares(
        assets,
        state.total_assets()?,
        state.total_shares(),
        Rounding::Floor,
    )
}

/// Convert shares to assets using floor rounding
pub fn convert_to_assets_view(state: &VaultState, shares: u64) -> Result<u64> {
    preview_redeem(state, shares)
}

/// Maximum assets that can be deposited (u64::MAX if not paused, 0 if paused)
pub fn max_deposit(state: &VaultState) -> u64 {
    if state.paused {
        0
    } else {
        u64::MAX
    }
}

/// Maximum shares that can be minted (u64::MAX if not paused, 0 if paused)
pub fn max_mint(state: &VaultState) -> u64 {
    max_deposit(state)
}

/// Maximum assets that owner can withdraw at `now` without breaking a lock
pub fn max_withdraw(state: &VaultState, owner: &HolderId, now: i64) -> Result<u64> {
    if state.paused {
        return Ok(0);
    }

    let owner_assets = preview_redeem(state, state.shares.balance_of(owner))?;

    // Cap at liquidity available without breaking a lock
    Ok(owner_assets.min(state.unlocked_liquidity(now)?))
}

/// Maximum shares that owner can redeem (their share balance)
pub fn max_redeem(state: &VaultState, owner: &HolderId) -> u64 {
    if state.paused {
        0
    } else {
        state.shares.balance_of(owner)
    }
}
