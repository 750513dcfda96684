use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::HarvestPolicy;
use crate::error::{require, Result, VaultError};
use crate::events::VaultEvent;
use crate::instructions::{stake::stake, Context};
use crate::state::PositionId;

/// Outcome of a harvest
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HarvestReport {
    /// Base-asset value added to the vault
    pub harvested: u64,
    /// Positions whose reward could not be claimed or converted this time
    pub skipped: Vec<PositionId>,
}

/// Claim, convert and re-stake rewards from every live position.
///
/// Shares are not minted, so the whole harvest accrues to existing holders.
/// A position whose claim or conversion fails is skipped and keeps its reward
/// for the next harvest; the others still go through.
pub fn handler(ctx: &mut Context<'_>) -> Result<HarvestReport> {
    require!(!ctx.state.paused, VaultError::VaultPaused);

    if ctx.state.last_harvest_ts == Some(ctx.now) {
        debug!(timestamp = ctx.now, "Already harvested at this instant");
        return Ok(HarvestReport::default());
    }
    ctx.state.last_harvest_ts = Some(ctx.now);

    let config = ctx.config;
    let price_before = ctx.state.price_per_share()?;
    let targets: Vec<_> = ctx
        .state
        .positions
        .live()
        .map(|p| (p.id, p.stake_ref))
        .collect();

    let mut report = HarvestReport::default();
    let mut unstaked = 0u64;

    for (id, stake_ref) in targets {
        match ctx.venue.claim_reward(stake_ref) {
            Ok(0) => {}
            Ok(reward) => ctx.state.positions.accrue_reward(&id, reward)?,
            Err(err) => {
                warn!(position = %id, error = %err, "Reward claim failed, skipping position");
                report.skipped.push(id);
                continue;
            }
        }

        let reward = ctx.state.positions.claim(&id)?;
        if reward == 0 {
            continue;
        }

        let value = match convert_reward(ctx, reward) {
            Ok(value) => value,
            Err(err) => {
                // Keep the reward for a later attempt
                ctx.state.positions.accrue_reward(&id, reward)?;
                warn!(position = %id, reward, error = %err, "Reward conversion failed, skipping position");
                report.skipped.push(id);
                continue;
            }
        };
        if value == 0 {
            continue;
        }

        match config.harvest_policy {
            HarvestPolicy::Compound => match ctx.venue.add_to_stake(stake_ref, value) {
                Ok(()) => {
                    ctx.state.positions.top_up(&id, value)?;
                    ctx.events.push(VaultEvent::PositionToppedUp {
                        position: id,
                        amount: value,
                    });
                }
                Err(err) => {
                    warn!(position = %id, value, error = %err, "Restake failed, holding harvest idle");
                    ctx.state.add_idle(value)?;
                }
            },
            HarvestPolicy::NewPosition { .. } => {
                unstaked = unstaked.checked_add(value).ok_or(VaultError::MathOverflow)?;
            }
        }

        debug!(position = %id, reward, value, "Position harvested");
        report.harvested = report.harvested.saturating_add(value);
    }

    if let HarvestPolicy::NewPosition { lock_duration_secs } = config.harvest_policy {
        if unstaked > 0 {
            if let Err(err) = stake(ctx, unstaked, lock_duration_secs) {
                warn!(value = unstaked, error = %err, "Staking harvest failed, holding it idle");
                ctx.state.add_idle(unstaked)?;
            }
        }
    }

    // Statistics only; claimed rewards must not be lost to a counter overflow
    ctx.state.total_harvested = ctx.state.total_harvested.saturating_add(report.harvested);

    let price_per_share = ctx.state.price_per_share()?;
    info!(
        harvested = report.harvested,
        skipped = report.skipped.len(),
        price_before,
        price_per_share,
        "Harvest"
    );
    ctx.events.push(VaultEvent::Harvest {
        harvested: report.harvested,
        skipped: report.skipped.len(),
        price_per_share,
        timestamp: ctx.now,
    });

    Ok(report)
}

fn convert_reward(ctx: &mut Context<'_>, reward: u64) -> anyhow::Result<u64> {
    let config = ctx.config;
    if config.reward_asset == config.base_asset {
        return Ok(reward);
    }
    ctx.converter.convert(
        reward,
        &config.reward_asset,
        &config.base_asset,
        0,
        config.deadline(ctx.now),
    )
}
