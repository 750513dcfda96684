use crate::error::{require, Collaborator, Result, VaultError};
use crate::instructions::{deposit, Context};
use crate::math::{convert_to_assets, Rounding};
use crate::state::HolderId;

/// Mint exact shares, paying required assets (ceiling rounding - protects vault)
pub fn handler(
    ctx: &mut Context<'_>,
    caller: &HolderId,
    shares: u64,
    receiver: &HolderId,
    max_assets_in: u64,
) -> Result<u64> {
    require!(!ctx.state.paused, VaultError::VaultPaused);
    require!(shares > 0, VaultError::InvalidAmount { amount: shares });

    // Calculate required assets (ceiling rounding - user pays more)
    let assets = convert_to_assets(
        shares,
        ctx.state.total_assets()?,
        ctx.state.total_shares(),
        Rounding::Ceiling,
    )?;
    require!(assets > 0, VaultError::InvalidAmount { amount: assets });

    // Slippage check
    require!(
        assets <= max_assets_in,
        VaultError::SlippageExceeded {
            limit: max_assets_in,
            actual: assets,
        }
    );

    let config = ctx.config;
    ctx.custody
        .transfer_in(caller, &config.base_asset, assets)
        .map_err(VaultError::collaborator(Collaborator::Custody))?;

    if let Err(err) = deposit::credit(ctx, caller, receiver, assets, shares) {
        deposit::refund(ctx, caller, &[(config.base_asset.clone(), assets)]);
        return Err(err);
    }
    Ok(assets)
}
