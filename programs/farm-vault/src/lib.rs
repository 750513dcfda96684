//! Locked-position yield vault.
//!
//! Depositors receive shares of a pool whose value is staked into time-locked
//! positions at an external venue. Harvests compound rewards without minting
//! shares, and withdrawals pick which positions to unwind.
//!
//! Every mutating call on [`FarmVault`] is atomic: it runs against a copy of
//! [`VaultState`] that replaces the live state only when the call succeeds.

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod instructions;
pub mod interfaces;
pub mod math;
pub mod selection;
pub mod sim;
pub mod state;

pub use config::{HarvestPolicy, VaultConfig};
pub use error::{Collaborator, CollaboratorError, Result, VaultError};
pub use events::VaultEvent;
pub use instructions::{HarvestReport, WithdrawOptions};
pub use interfaces::{AssetConverter, AssetId, Custody, StakeRef, StakingVenue};
pub use selection::{LegSource, PlanLeg, WithdrawalPlan};
pub use state::{
    HolderAccount, HolderId, LockedPosition, PositionId, PositionStatus, VaultState,
};

use tracing::debug;

use instructions::{view, Context};

/// A vault instance wired to its collaborators
pub struct FarmVault<C, V, K> {
    config: VaultConfig,
    state: VaultState,
    converter: C,
    venue: V,
    custody: K,
    events: Vec<VaultEvent>,
}

impl<C, V, K> FarmVault<C, V, K>
where
    C: AssetConverter,
    V: StakingVenue,
    K: Custody,
{
    /// Create an empty vault
    pub fn new(config: VaultConfig, converter: C, venue: V, custody: K) -> Result<Self> {
        config.validate()?;
        let state = VaultState::new(&config.symbol, config.authority.clone());

        debug!(name = %config.name, symbol = %config.symbol, base_asset = %config.base_asset, "Vault initialized");
        Ok(Self {
            config,
            state,
            converter,
            venue,
            custody,
            events: Vec::new(),
        })
    }

    /// Run `op` against a working copy and commit it only on success
    fn transact<T>(
        &mut self,
        now: i64,
        op: impl FnOnce(&mut Context<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut working = self.state.clone();
        let mut pending = Vec::new();

        let result = {
            let mut ctx = Context {
                state: &mut working,
                config: &self.config,
                converter: &mut self.converter,
                venue: &mut self.venue,
                custody: &mut self.custody,
                events: &mut pending,
                now,
            };
            op(&mut ctx)
        };

        match result {
            Ok(value) => {
                debug_assert!(working.shares.is_balanced());
                self.state = working;
                for event in &pending {
                    event.emit();
                }
                self.events.append(&mut pending);
                Ok(value)
            }
            Err(err) => {
                debug!(error = %err, "Operation rolled back");
                Err(err)
            }
        }
    }

    // ============ Operations ============

    /// Deposit base assets and receive shares.
    /// Returns shares minted (floor rounding - favors vault)
    pub fn deposit(
        &mut self,
        caller: &HolderId,
        assets: u64,
        receiver: &HolderId,
        min_shares_out: u64,
        now: i64,
    ) -> Result<u64> {
        self.transact(now, |ctx| {
            instructions::deposit::handler(ctx, caller, assets, receiver, min_shares_out)
        })
    }

    /// Deposit a basket of assets, converting each into the base asset
    pub fn deposit_basket(
        &mut self,
        caller: &HolderId,
        amounts: &[(AssetId, u64)],
        receiver: &HolderId,
        min_shares_out: u64,
        now: i64,
    ) -> Result<u64> {
        self.transact(now, |ctx| {
            instructions::deposit_basket::handler(ctx, caller, amounts, receiver, min_shares_out)
        })
    }

    /// Mint exact shares by depositing required assets.
    /// Returns assets paid (ceiling rounding - favors vault)
    pub fn mint(
        &mut self,
        caller: &HolderId,
        shares: u64,
        receiver: &HolderId,
        max_assets_in: u64,
        now: i64,
    ) -> Result<u64> {
        self.transact(now, |ctx| {
            instructions::mint::handler(ctx, caller, shares, receiver, max_assets_in)
        })
    }

    /// Claim and compound rewards from every live position
    pub fn harvest(&mut self, now: i64) -> Result<HarvestReport> {
        self.transact(now, instructions::harvest::handler)
    }

    /// Withdraw exact assets by burning required shares.
    /// Returns the amount delivered to `receiver`
    pub fn withdraw(
        &mut self,
        owner: &HolderId,
        assets: u64,
        receiver: &HolderId,
        options: &WithdrawOptions,
        now: i64,
    ) -> Result<u64> {
        self.transact(now, |ctx| {
            instructions::withdraw::handler(ctx, owner, assets, receiver, options)
        })
    }

    /// Redeem shares for assets (floor rounding - favors vault)
    pub fn redeem(
        &mut self,
        owner: &HolderId,
        shares: u64,
        receiver: &HolderId,
        options: &WithdrawOptions,
        now: i64,
    ) -> Result<u64> {
        self.transact(now, |ctx| {
            instructions::redeem::handler(ctx, owner, shares, receiver, options)
        })
    }

    /// Withdraw exact assets from caller-chosen positions, in the given order
    pub fn withdraw_with_id(
        &mut self,
        owner: &HolderId,
        assets: u64,
        receiver: &HolderId,
        position_ids: &[PositionId],
        options: &WithdrawOptions,
        now: i64,
    ) -> Result<u64> {
        self.transact(now, |ctx| {
            instructions::withdraw_with_id::handler(
                ctx,
                owner,
                assets,
                receiver,
                position_ids,
                options,
            )
        })
    }

    /// Pause all vault operations (emergency)
    pub fn pause(&mut self, caller: &HolderId, now: i64) -> Result<()> {
        self.transact(now, |ctx| instructions::admin::pause(ctx, caller))
    }

    /// Unpause vault operations
    pub fn unpause(&mut self, caller: &HolderId, now: i64) -> Result<()> {
        self.transact(now, |ctx| instructions::admin::unpause(ctx, caller))
    }

    /// Transfer vault authority
    pub fn transfer_authority(
        &mut self,
        caller: &HolderId,
        new_authority: HolderId,
        now: i64,
    ) -> Result<()> {
        self.transact(now, |ctx| {
            instructions::admin::transfer_authority(ctx, caller, &new_authority)
        })
    }

    // ============ View Functions ============

    /// Preview shares for deposit (floor rounding)
    pub fn preview_deposit(&self, assets: u64) -> Result<u64> {
        view::preview_deposit(&self.state, assets)
    }

    /// Preview assets required for mint (ceiling rounding)
    pub fn preview_mint(&self, shares: u64) -> Result<u64> {
        view::preview_mint(&self.state, shares)
    }

    /// Preview shares burned by a withdraw of `assets` (ceiling rounding)
    pub fn preview_withdraw_shares(&self, assets: u64) -> Result<u64> {
        view::preview_withdraw_shares(&self.state, assets)
    }

    /// Preview assets for redeem (floor rounding)
    pub fn preview_redeem(&self, shares: u64) -> Result<u64> {
        view::preview_redeem(&self.state, shares)
    }

    /// The positions a withdrawal of `assets` at `now` would draw from
    pub fn preview_withdraw(
        &self,
        assets: u64,
        now: i64,
        allow_early_exit: bool,
    ) -> Result<WithdrawalPlan> {
        view::preview_withdraw(&self.state, &self.config, assets, now, allow_early_exit)
    }

    /// Same as [`Self::preview_withdraw`] without breaking locks
    pub fn get_best_withdrawal(&self, assets: u64, now: i64) -> Result<WithdrawalPlan> {
        self.preview_withdraw(assets, now, false)
    }

    /// The plan a [`Self::withdraw_with_id`] call would execute
    pub fn preview_withdraw_with_id(
        &self,
        assets: u64,
        position_ids: &[PositionId],
        now: i64,
        allow_early_exit: bool,
    ) -> Result<WithdrawalPlan> {
        view::preview_withdraw_with_id(
            &self.state,
            &self.config,
            assets,
            position_ids,
            now,
            allow_early_exit,
        )
    }

    /// Shares `assets` is worth at the current price, rounded down
    pub fn convert_to_shares(&self, assets: u64) -> Result<u64> {
        view::convert_to_shares_view(&self.state, assets)
    }

    /// Assets `shares` is worth at the current price, rounded down
    pub fn convert_to_assets(&self, shares: u64) -> Result<u64> {
        view::convert_to_assets_view(&self.state, shares)
    }

    /// Live principal plus idle balance
    pub fn total_assets(&self) -> Result<u64> {
        self.state.total_assets()
    }

    /// Shares outstanding across all holders
    pub fn total_supply(&self) -> u64 {
        self.state.total_shares()
    }

    /// Shares held by `owner`
    pub fn balance_of(&self, owner: &HolderId) -> u64 {
        self.state.shares.balance_of(owner)
    }

    pub fn max_deposit(&self) -> u64 {
        view::max_deposit(&self.state)
    }

    pub fn max_mint(&self) -> u64 {
        view::max_mint(&self.state)
    }

    pub fn max_withdraw(&self, owner: &HolderId, now: i64) -> Result<u64> {
        view::max_withdraw(&self.state, owner, now)
    }

    pub fn max_redeem(&self, owner: &HolderId) -> u64 {
        view::max_redeem(&self.state, owner)
    }

    /// Assets per share scaled by 10^9
    pub fn price_per_share(&self) -> Result<u64> {
        self.state.price_per_share()
    }

    /// All positions ever opened, in insertion order
    pub fn positions(&self) -> impl Iterator<Item = &LockedPosition> {
        self.state.positions.iter()
    }

    pub fn holder(&self, owner: &HolderId) -> Option<&HolderAccount> {
        self.state.shares.holder(owner)
    }

    pub fn state(&self) -> &VaultState {
        &self.state
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Events of committed operations, oldest first
    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    pub fn converter_mut(&mut self) -> &mut C {
        &mut self.converter
    }

    pub fn venue(&self) -> &V {
        &self.venue
    }

    pub fn venue_mut(&mut self) -> &mut V {
        &mut self.venue
    }

    pub fn custody(&self) -> &K {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut K {
        &mut self.custody
    }
}
