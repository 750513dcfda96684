use tracing::debug;

use crate::error::{require, Collaborator, Result, VaultError};
use crate::instructions::{deposit, Context};
use crate::interfaces::AssetId;
use crate::state::HolderId;

/// Deposit several assets at once, converting each non-base leg into the
/// base asset before pricing the shares.
///
/// Every leg is quoted before anything is pulled from `caller`. If a later
/// leg, the pricing or the staking still fails, what was pulled is refunded;
/// legs already converted come back in the base asset.
pub fn handler(
    ctx: &mut Context<'_>,
    caller: &HolderId,
    amounts: &[(AssetId, u64)],
    receiver: &HolderId,
    min_shares_out: u64,
) -> Result<u64> {
    require!(!ctx.state.paused, VaultError::VaultPaused);

    // Held on the caller's behalf, in the asset the vault now holds it in
    let mut received: Vec<(AssetId, u64)> = Vec::with_capacity(amounts.len());
    let result = receive(ctx, caller, amounts, &mut received).and_then(|assets| {
        require!(assets > 0, VaultError::InvalidAmount { amount: assets });
        let shares = deposit::shares_for_deposit(ctx, assets, min_shares_out)?;
        deposit::credit(ctx, caller, receiver, assets, shares)
    });

    if result.is_err() {
        deposit::refund(ctx, caller, &received);
    }
    result
}

/// Pull every non-zero leg and convert it into the base asset
fn receive(
    ctx: &mut Context<'_>,
    caller: &HolderId,
    amounts: &[(AssetId, u64)],
    received: &mut Vec<(AssetId, u64)>,
) -> Result<u64> {
    let config = ctx.config;
    let deadline = config.deadline(ctx.now);
    let legs: Vec<_> = amounts.iter().filter(|(_, amount)| *amount > 0).collect();

    for (asset, amount) in legs.iter().filter(|(asset, _)| *asset != config.base_asset) {
        ctx.converter
            .quote(*amount, asset, &config.base_asset)
            .map_err(VaultError::collaborator(Collaborator::AssetConverter))?;
    }

    let mut assets = 0u64;
    for (asset, amount) in legs {
        ctx.custody
            .transfer_in(caller, asset, *amount)
            .map_err(VaultError::collaborator(Collaborator::Custody))?;

        let value = if *asset == config.base_asset {
            *amount
        } else {
            received.push((asset.clone(), *amount));
            let value = ctx
                .converter
                .convert(*amount, asset, &config.base_asset, 0, deadline)
                .map_err(VaultError::collaborator(Collaborator::AssetConverter))?;
            received.pop();
            value
        };
        received.push((config.base_asset.clone(), value));
        debug!(asset = %asset, amount, value, "Basket leg received");

        assets = assets.checked_add(value).ok_or(VaultError::MathOverflow)?;
    }
    Ok(assets)
}
