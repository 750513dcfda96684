use tracing::info;

use crate::error::{require, Result, VaultError};
use crate::events::VaultEvent;
use crate::instructions::Context;
use crate::state::HolderId;

fn authorize(ctx: &Context<'_>, caller: &HolderId) -> Result<()> {
    require!(*caller == ctx.state.authority, VaultError::Unauthorized);
    Ok(())
}

/// Pause all vault operations (emergency circuit breaker)
pub fn pause(ctx: &mut Context<'_>, caller: &HolderId) -> Result<()> {
    authorize(ctx, caller)?;
    require!(!ctx.state.paused, VaultError::VaultPaused);

    ctx.state.paused = true;

    info!(caller = %caller, "Vault paused");
    ctx.events.push(VaultEvent::VaultStatusChanged { paused: true });
    Ok(())
}

/// Unpause vault operations
pub fn unpause(ctx: &mut Context<'_>, caller: &HolderId) -> Result<()> {
    authorize(ctx, caller)?;
    require!(ctx.state.paused, VaultError::VaultPaused);

    ctx.state.paused = false;

    info!(caller = %caller, "Vault unpaused");
    ctx.events.push(VaultEvent::VaultStatusChanged { paused: false });
    Ok(())
}

/// Transfer vault authority to new holder
pub fn transfer_authority(
    ctx: &mut Context<'_>,
    caller: &HolderId,
    new_authority: &HolderId,
) -> Result<()> {
    authorize(ctx, caller)?;

    let previous_authority = std::mem::replace(&mut ctx.state.authority, new_authority.clone());

    info!(previous = %previous_authority, new = %new_authority, "Authority transferred");
    ctx.events.push(VaultEvent::AuthorityTransferred {
        previous_authority,
        new_authority: new_authority.clone(),
    });
    Ok(())
}
