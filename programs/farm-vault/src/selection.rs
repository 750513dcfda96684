use serde::{Deserialize, Serialize};

use crate::error::{require, Result, VaultError};
use crate::math::{bps_of, Rounding};
use crate::state::{LockedPosition, PositionId, VaultState};

/// Where a leg of a withdrawal is sourced from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegSource {
    /// Unstaked balance held by the vault
    Idle,
    Position(PositionId),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLeg {
    pub source: LegSource,
    pub amount: u64,
    /// Leg breaks a lock before its expiry
    pub early_exit: bool,
}

/// Ordered list of sources that together cover a withdrawal request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalPlan {
    pub requested: u64,
    pub legs: Vec<PlanLeg>,
    /// Early-exit penalty retained by the vault
    pub penalty: u64,
}

impl WithdrawalPlan {
    /// Value that leaves the vault once the penalty is retained
    pub fn assets_out(&self) -> u64 {
        self.requested.saturating_sub(self.penalty)
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// Positions touched by the plan, in execution order
    pub fn positions(&self) -> impl Iterator<Item = &PositionId> {
        self.legs.iter().filter_map(|leg| match &leg.source {
            LegSource::Position(id) => Some(id),
            LegSource::Idle => None,
        })
    }
}

/// Accumulates legs until the requested amount is covered.
struct PlanBuilder {
    requested: u64,
    remaining: u64,
    legs: Vec<PlanLeg>,
}

impl PlanBuilder {
    fn new(requested: u64) -> Self {
        Self {
            requested,
            remaining: requested,
            legs: Vec::new(),
        }
    }

    fn is_filled(&self) -> bool {
        self.remaining == 0
    }

    fn take(&mut self, source: LegSource, available: u64, early_exit: bool) {
        let amount = self.remaining.min(available);
        if amount == 0 {
            return;
        }
        self.remaining -= amount;
        self.legs.push(PlanLeg {
            source,
            amount,
            early_exit,
        });
    }

    fn sourced(&self) -> u64 {
        self.requested - self.remaining
    }

    fn finish(self, penalty_bps: u16) -> Result<WithdrawalPlan> {
        require!(
            self.is_filled(),
            VaultError::InsufficientLiquidity {
                requested: self.requested,
                available: self.sourced(),
            }
        );

        let penalty = self
            .legs
            .iter()
            .filter(|leg| leg.early_exit)
            .try_fold(0u64, |acc, leg| {
                let leg_penalty = bps_of(leg.amount, penalty_bps, Rounding::Ceiling)?;
                acc.checked_add(leg_penalty).ok_or(VaultError::MathOverflow)
            })?;

        Ok(WithdrawalPlan {
            requested: self.requested,
            legs: self.legs,
            penalty,
        })
    }
}

/// Choose the sources for withdrawing `amount` at `now`.
///
/// Order: idle balance, then unlocked positions smallest principal first,
/// then (only with `allow_early_exit`) locked positions soonest expiry first.
/// Ties fall back to insertion order, so identical state yields identical plans.
pub fn plan_withdrawal(
    state: &VaultState,
    amount: u64,
    now: i64,
    allow_early_exit: bool,
    penalty_bps: u16,
) -> Result<WithdrawalPlan> {
    if amount == 0 {
        return Ok(WithdrawalPlan::default());
    }

    let total = state.total_assets()?;
    require!(
        amount <= total,
        VaultError::InsufficientLiquidity {
            requested: amount,
            available: total,
        }
    );

    let live: Vec<(usize, &LockedPosition)> = state
        .positions
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_live() && p.principal > 0)
        .collect();

    let (mut unlocked, mut locked): (Vec<_>, Vec<_>) =
        live.into_iter().partition(|(_, p)| p.is_unlocked(now));
    unlocked.sort_by_key(|(index, p)| (p.principal, *index));
    locked.sort_by_key(|(index, p)| (p.lock_end, *index));

    let mut plan = PlanBuilder::new(amount);
    plan.take(LegSource::Idle, state.idle_balance, false);

    for (_, position) in &unlocked {
        if plan.is_filled() {
            break;
        }
        plan.take(LegSource::Position(position.id), position.principal, false);
    }

    if !plan.is_filled() && allow_early_exit {
        for (_, position) in &locked {
            if plan.is_filled() {
                break;
            }
            plan.take(LegSource::Position(position.id), position.principal, true);
        }
    }

    plan.finish(penalty_bps)
}

/// Build a plan strictly from `ids`, in the given order.
///
/// Duplicate ids are only drawn from once. Closed positions contribute nothing.
pub fn plan_explicit(
    state: &VaultState,
    amount: u64,
    ids: &[PositionId],
    now: i64,
    allow_early_exit: bool,
    penalty_bps: u16,
) -> Result<WithdrawalPlan> {
    if amount == 0 {
        return Ok(WithdrawalPlan::default());
    }

    let mut plan = PlanBuilder::new(amount);
    let mut seen: Vec<&PositionId> = Vec::with_capacity(ids.len());

    for id in ids {
        if plan.is_filled() {
            break;
        }
        let position = state.positions.get(id)?;
        if seen.contains(&id) || !position.is_live() {
            continue;
        }
        seen.push(id);

        let early_exit = !position.is_unlocked(now);
        require!(
            allow_early_exit || !early_exit,
            VaultError::PositionLocked {
                id: *id,
                unlocks_at: position.lock_end,
            }
        );
        plan.take(LegSource::Position(*id), position.principal, early_exit);
    }

    plan.finish(penalty_bps)
}
