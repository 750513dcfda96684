use crate::error::{require, Result, VaultError};
use crate::instructions::withdraw::{check_balance, settle, withdraw_shares, WithdrawOptions};
use crate::instructions::Context;
use crate::selection::plan_explicit;
use crate::state::{HolderId, PositionId};

/// Withdraw exact assets from caller-chosen positions, in the caller's order.
///
/// Skips the selection policy entirely; locked positions still need
/// `allow_early_exit`.
pub fn handler(
    ctx: &mut Context<'_>,
    owner: &HolderId,
    assets: u64,
    receiver: &HolderId,
    position_ids: &[PositionId],
    options: &WithdrawOptions,
) -> Result<u64> {
    require!(!ctx.state.paused, VaultError::VaultPaused);
    if assets == 0 {
        return Ok(0);
    }

    let shares = withdraw_shares(ctx.state, assets)?;
    check_balance(ctx.state, owner, shares)?;

    let plan = plan_explicit(
        ctx.state,
        assets,
        position_ids,
        ctx.now,
        options.allow_early_exit,
        ctx.config.early_exit_penalty_bps,
    )?;
    settle(ctx, owner, receiver, shares, &plan, options)
}
