pub mod admin;
pub mod deposit;
pub mod deposit_basket;
pub mod harvest;
pub mod mint;
pub mod redeem;
pub mod stake;
pub mod view;
pub mod withdraw;
pub mod withdraw_with_id;

pub use harvest::HarvestReport;
pub use withdraw::WithdrawOptions;

use crate::config::VaultConfig;
use crate::events::VaultEvent;
use crate::interfaces::{AssetConverter, Custody, StakingVenue};
use crate::state::VaultState;

/// Everything an operation may touch while it runs.
///
/// `state` is a working copy owned by the facade; it is committed only when
/// the handler returns `Ok`.
pub struct Context<'a> {
    pub state: &'a mut VaultState,
    pub config: &'a VaultConfig,
    pub converter: &'a mut dyn AssetConverter,
    pub venue: &'a mut dyn StakingVenue,
    pub custody: &'a mut dyn Custody,
    /// Events to emit once the operation commits
    pub events: &'a mut Vec<VaultEvent>,
    pub now: i64,
}
