use tracing::debug;

use crate::error::{Collaborator, Result, VaultError};
use crate::events::VaultEvent;
use crate::instructions::Context;
use crate::state::PositionId;

/// Stake the idle balance once it reaches the configured threshold
pub(crate) fn stake_idle(ctx: &mut Context<'_>) -> Result<Option<PositionId>> {
    let amount = ctx.state.idle_balance;
    if amount == 0 || amount < ctx.config.min_stake_amount {
        return Ok(None);
    }

    let lock_duration_secs = ctx.config.lock_duration_secs;
    let id = stake(ctx, amount, lock_duration_secs)?;
    ctx.state.take_idle(amount)?;
    Ok(Some(id))
}

/// Commit `amount` to the venue under a new lock.
///
/// A live position opened at this same instant with the same lock length is
/// topped up instead, so one block of deposits shares one stake.
pub(crate) fn stake(ctx: &mut Context<'_>, amount: u64, lock_duration_secs: u64) -> Result<PositionId> {
    let now = ctx.now;
    let duration = i64::try_from(lock_duration_secs).map_err(|_| VaultError::MathOverflow)?;

    let same_instant = ctx
        .state
        .positions
        .newest_live()
        .filter(|p| p.lock_start == now && p.lock_end - p.lock_start == duration)
        .map(|p| (p.id, p.stake_ref));

    if let Some((id, stake_ref)) = same_instant {
        ctx.venue
            .add_to_stake(stake_ref, amount)
            .map_err(VaultError::collaborator(Collaborator::StakingVenue))?;
        ctx.state.positions.top_up(&id, amount)?;

        debug!(position = %id, amount, "Topped up same-instant position");
        ctx.events.push(VaultEvent::PositionToppedUp { position: id, amount });
        return Ok(id);
    }

    let stake_ref = ctx
        .venue
        .stake(amount, lock_duration_secs)
        .map_err(VaultError::collaborator(Collaborator::StakingVenue))?;
    let id = ctx
        .state
        .positions
        .open(amount, lock_duration_secs, now, stake_ref)?;
    let lock_end = ctx.state.positions.get(&id)?.lock_end;

    ctx.events.push(VaultEvent::PositionOpened {
        position: id,
        principal: amount,
        lock_end,
    });
    Ok(id)
}
