use crate::error::{require, Result, VaultError};
use crate::instructions::withdraw::{check_balance, settle, WithdrawOptions};
use crate::instructions::Context;
use crate::math::{convert_to_assets, Rounding};
use crate::selection::plan_withdrawal;
use crate::state::HolderId;

/// Redeem shares for assets (floor rounding - protects vault)
///
/// Burns exactly `shares`; the asset amount is derived once and reused for
/// planning so preview and execution cannot drift apart.
pub fn handler(
    ctx: &mut Context<'_>,
    owner: &HolderId,
    shares: u64,
    receiver: &HolderId,
    options: &WithdrawOptions,
) -> Result<u64> {
    require!(!ctx.state.paused, VaultError::VaultPaused);
    if shares == 0 {
        return Ok(0);
    }

    // Check owner has enough shares
    check_balance(ctx.state, owner, shares)?;

    // Calculate assets to receive (floor rounding - user gets less)
    let assets = convert_to_assets(
        shares,
        ctx.state.total_assets()?,
        ctx.state.total_shares(),
        Rounding::Floor,
    )?;
    require!(assets > 0, VaultError::InvalidAmount { amount: assets });

    let plan = plan_withdrawal(
        ctx.state,
        assets,
        ctx.now,
        options.allow_early_exit,
        ctx.config.early_exit_penalty_bps,
    )?;
    settle(ctx, owner, receiver, shares, &plan, options)
}
