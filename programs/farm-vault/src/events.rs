use serde::Serialize;
use tracing::info;

use crate::interfaces::AssetId;
use crate::state::{HolderId, PositionId};

/// Records of committed vault operations.
///
/// Events raised by an operation are buffered and only emitted once the
/// operation commits, so a rolled-back call leaves no trace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum VaultEvent {
    Deposit {
        caller: HolderId,
        owner: HolderId,
        assets: u64,
        shares: u64,
        timestamp: i64,
    },
    Withdraw {
        receiver: HolderId,
        owner: HolderId,
        /// Base-asset value sourced from the ledger
        assets: u64,
        shares: u64,
        penalty: u64,
        payout_asset: AssetId,
        /// Amount delivered to the receiver in `payout_asset`
        payout: u64,
        timestamp: i64,
    },
    PositionOpened {
        position: PositionId,
        principal: u64,
        lock_end: i64,
    },
    PositionToppedUp {
        position: PositionId,
        amount: u64,
    },
    PositionReduced {
        position: PositionId,
        amount: u64,
        early_exit: bool,
        closed: bool,
    },
    Harvest {
        harvested: u64,
        skipped: usize,
        price_per_share: u64,
        timestamp: i64,
    },
    VaultStatusChanged {
        paused: bool,
    },
    AuthorityTransferred {
        previous_authority: HolderId,
        new_authority: HolderId,
    },
}

impl VaultEvent {
    pub(crate) fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(json) => info!(target: "farm_vault::events", "{json}"),
            Err(err) => info!(target: "farm_vault::events", error = %err, event = ?self, "unserializable event"),
        }
    }
}
