use tracing::{error, info};

use crate::error::{require, Collaborator, Result, VaultError};
use crate::events::VaultEvent;
use crate::instructions::{stake::stake_idle, Context};
use crate::interfaces::AssetId;
use crate::math::{convert_to_shares, Rounding};
use crate::state::{HolderId, VaultState};

/// Deposit base assets and mint shares to `receiver` (floor rounding - favors vault)
pub fn handler(
    ctx: &mut Context<'_>,
    caller: &HolderId,
    assets: u64,
    receiver: &HolderId,
    min_shares_out: u64,
) -> Result<u64> {
    require!(!ctx.state.paused, VaultError::VaultPaused);
    require!(assets > 0, VaultError::InvalidAmount { amount: assets });

    let shares = shares_for_deposit(ctx, assets, min_shares_out)?;

    // Transfer assets from caller to vault
    let config = ctx.config;
    ctx.custody
        .transfer_in(caller, &config.base_asset, assets)
        .map_err(VaultError::collaborator(Collaborator::Custody))?;

    let credited = credit(ctx, caller, receiver, assets, shares);
    if credited.is_err() {
        refund(ctx, caller, &[(config.base_asset.clone(), assets)]);
    }
    credited
}

/// Price a deposit of `assets` and check it against minimum size and slippage.
pub(crate) fn shares_for_deposit(
    ctx: &Context<'_>,
    assets: u64,
    min_shares_out: u64,
) -> Result<u64> {
    let minimum = ctx.config.min_deposit_amount;
    require!(assets >= minimum, VaultError::DepositTooSmall { minimum });

    let shares = deposit_shares(ctx.state, assets)?;
    require!(shares > 0, VaultError::InvalidAmount { amount: shares });

    // Slippage check
    require!(
        shares >= min_shares_out,
        VaultError::SlippageExceeded {
            limit: min_shares_out,
            actual: shares,
        }
    );
    Ok(shares)
}

pub(crate) fn deposit_shares(state: &VaultState, assets: u64) -> Result<u64> {
    convert_to_shares(
        assets,
        state.total_assets()?,
        state.total_shares(),
        Rounding::Floor,
    )
}

/// Book assets already received: mint shares, add to idle and stake if due
pub(crate) fn credit(
    ctx: &mut Context<'_>,
    caller: &HolderId,
    receiver: &HolderId,
    assets: u64,
    shares: u64,
) -> Result<u64> {
    ctx.state.shares.mint(receiver, shares)?;
    ctx.state.add_idle(assets)?;
    stake_idle(ctx)?;

    info!(caller = %caller, owner = %receiver, assets, shares, "Deposit");
    ctx.events.push(VaultEvent::Deposit {
        caller: caller.clone(),
        owner: receiver.clone(),
        assets,
        shares,
        timestamp: ctx.now,
    });
    Ok(shares)
}

/// Send back what was pulled from `caller` for an operation that failed later
pub(crate) fn refund(ctx: &mut Context<'_>, caller: &HolderId, received: &[(AssetId, u64)]) {
    for (asset, amount) in received {
        if let Err(err) = ctx.custody.transfer_out(caller, asset, *amount) {
            error!(caller = %caller, asset = %asset, amount, error = %err, "Failed to refund deposit");
        }
    }
}
