use tracing::{error, info};

use crate::error::{require, Collaborator, Result, VaultError};
use crate::events::VaultEvent;
use crate::instructions::Context;
use crate::interfaces::{AssetId, StakeRef};
use crate::math::{convert_to_shares, Rounding};
use crate::selection::{plan_withdrawal, LegSource, WithdrawalPlan};
use crate::state::{HolderId, VaultState};

/// Caller tolerances for withdraw, redeem and withdraw-with-id
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WithdrawOptions {
    /// Floor on the amount delivered to the receiver, in the payout asset
    pub min_assets_out: Option<u64>,
    /// Permit breaking locks (and paying the early-exit penalty)
    pub allow_early_exit: bool,
    /// Deliver in this asset instead of the base asset
    pub payout_asset: Option<AssetId>,
}

impl WithdrawOptions {
    pub fn early_exit() -> Self {
        Self {
            allow_early_exit: true,
            ..Self::default()
        }
    }

    pub fn with_min_out(mut self, min_assets_out: u64) -> Self {
        self.min_assets_out = Some(min_assets_out);
        self
    }

    pub fn with_payout(mut self, asset: AssetId) -> Self {
        self.payout_asset = Some(asset);
        self
    }
}

/// Withdraw exact assets by burning required shares (ceiling rounding - favors vault)
pub fn handler(
    ctx: &mut Context<'_>,
    owner: &HolderId,
    assets: u64,
    receiver: &HolderId,
    options: &WithdrawOptions,
) -> Result<u64> {
    require!(!ctx.state.paused, VaultError::VaultPaused);
    if assets == 0 {
        return Ok(0);
    }

    let shares = withdraw_shares(ctx.state, assets)?;
    check_balance(ctx.state, owner, shares)?;

    let plan = plan_withdrawal(
        ctx.state,
        assets,
        ctx.now,
        options.allow_early_exit,
        ctx.config.early_exit_penalty_bps,
    )?;
    settle(ctx, owner, receiver, shares, &plan, options)
}

pub(crate) fn withdraw_shares(state: &VaultState, assets: u64) -> Result<u64> {
    convert_to_shares(
        assets,
        state.total_assets()?,
        state.total_shares(),
        Rounding::Ceiling,
    )
}

pub(crate) fn check_balance(state: &VaultState, owner: &HolderId, shares: u64) -> Result<()> {
    let available = state.shares.balance_of(owner);
    require!(
        shares <= available,
        VaultError::InsufficientShares {
            owner: owner.clone(),
            requested: shares,
            available,
        }
    );
    Ok(())
}

/// Execute a plan: unwind its legs, burn `shares` from `owner` and pay `receiver`.
///
/// Ledger effects are applied to the working state first and the slippage
/// floor is checked against a quote before any collaborator is called. If a
/// later collaborator step fails, unstaked principal is put back into its
/// stake so the venue keeps matching the rolled-back ledger.
pub(crate) fn settle(
    ctx: &mut Context<'_>,
    owner: &HolderId,
    receiver: &HolderId,
    shares: u64,
    plan: &WithdrawalPlan,
    options: &WithdrawOptions,
) -> Result<u64> {
    let config = ctx.config;
    let mut unstakes: Vec<(StakeRef, u64, bool)> = Vec::with_capacity(plan.legs.len());

    for leg in &plan.legs {
        match leg.source {
            LegSource::Idle => ctx.state.take_idle(leg.amount)?,
            LegSource::Position(id) => {
                let removed = ctx
                    .state
                    .positions
                    .reduce(&id, leg.amount, ctx.now, leg.early_exit)?;
                require!(
                    removed == leg.amount,
                    VaultError::InsufficientLiquidity {
                        requested: leg.amount,
                        available: removed,
                    }
                );

                let position = ctx.state.positions.get(&id)?;
                unstakes.push((position.stake_ref, removed, leg.early_exit));
                ctx.events.push(VaultEvent::PositionReduced {
                    position: id,
                    amount: removed,
                    early_exit: leg.early_exit,
                    closed: !position.is_live(),
                });
            }
        }
    }

    // Burn shares from owner
    ctx.state.shares.burn(owner, shares)?;

    // Early-exit penalty stays with the vault
    ctx.state.add_idle(plan.penalty)?;
    let assets_out = plan.assets_out();

    let base_asset = &config.base_asset;
    let payout_asset = options.payout_asset.as_ref().unwrap_or(base_asset);
    let min_out = options.min_assets_out.unwrap_or(0);
    let converts = payout_asset != base_asset && assets_out > 0;

    // Slippage check against the quote, before any collaborator moves funds
    let expected = if converts {
        ctx.converter
            .quote(assets_out, base_asset, payout_asset)
            .map_err(VaultError::collaborator(Collaborator::AssetConverter))?
    } else {
        assets_out
    };
    require!(
        expected >= min_out,
        VaultError::SlippageExceeded {
            limit: min_out,
            actual: expected,
        }
    );

    let mut unstaked: Vec<(StakeRef, u64)> = Vec::with_capacity(unstakes.len());
    for (stake_ref, amount, early) in unstakes {
        if let Err(err) = ctx.venue.unstake(stake_ref, amount, early) {
            restake(ctx, &unstaked);
            return Err(VaultError::collaborator(Collaborator::StakingVenue)(err));
        }
        unstaked.push((stake_ref, amount));
    }

    let payout = if converts {
        let converted = ctx.converter.convert(
            assets_out,
            base_asset,
            payout_asset,
            min_out,
            config.deadline(ctx.now),
        );
        match converted {
            Ok(out) if out >= min_out => out,
            Ok(out) => {
                reverse_conversion(ctx, payout_asset, out);
                restake(ctx, &unstaked);
                return Err(VaultError::SlippageExceeded {
                    limit: min_out,
                    actual: out,
                });
            }
            Err(err) => {
                restake(ctx, &unstaked);
                return Err(VaultError::collaborator(Collaborator::AssetConverter)(err));
            }
        }
    } else {
        assets_out
    };

    if payout > 0 {
        if let Err(err) = ctx.custody.transfer_out(receiver, payout_asset, payout) {
            if converts {
                reverse_conversion(ctx, payout_asset, payout);
            }
            restake(ctx, &unstaked);
            return Err(VaultError::collaborator(Collaborator::Custody)(err));
        }
    }

    info!(
        owner = %owner,
        receiver = %receiver,
        assets = plan.requested,
        shares,
        penalty = plan.penalty,
        payout_asset = %payout_asset,
        payout,
        "Withdraw"
    );
    ctx.events.push(VaultEvent::Withdraw {
        receiver: receiver.clone(),
        owner: owner.clone(),
        assets: plan.requested,
        shares,
        penalty: plan.penalty,
        payout_asset: payout_asset.clone(),
        payout,
        timestamp: ctx.now,
    });

    Ok(payout)
}

/// Add unstaked principal back to its stakes after a failed payout
fn restake(ctx: &mut Context<'_>, unstaked: &[(StakeRef, u64)]) {
    for &(stake_ref, amount) in unstaked {
        if let Err(err) = ctx.venue.add_to_stake(stake_ref, amount) {
            error!(stake = stake_ref.0, amount, error = %err, "Failed to restore stake");
        }
    }
}

/// Best effort: turn an undelivered payout back into the base asset
fn reverse_conversion(ctx: &mut Context<'_>, payout_asset: &AssetId, amount: u64) {
    let config = ctx.config;
    let reversed = ctx.converter.convert(
        amount,
        payout_asset,
        &config.base_asset,
        0,
        config.deadline(ctx.now),
    );
    if let Err(err) = reversed {
        error!(asset = %payout_asset, amount, error = %err, "Failed to convert payout back");
    }
}
