#![allow(dead_code)]

use farm_vault::sim::{FixedRateConverter, InMemoryVenue, LedgerCustody};
use farm_vault::{FarmVault, HolderId, VaultConfig, WithdrawOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub type SimVault = FarmVault<FixedRateConverter, InMemoryVenue, LedgerCustody>;

pub const DAY: i64 = 86_400;
pub const WEEK: i64 = 7 * DAY;

/// Install a subscriber once per test binary; `RUST_LOG` controls verbosity
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "farm_vault=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

pub fn holder(name: &str) -> HolderId {
    HolderId::from(name)
}

pub fn vault_with(config: VaultConfig, converter: FixedRateConverter) -> SimVault {
    init_tracing();
    FarmVault::new(config, converter, InMemoryVenue::new(), LedgerCustody::new())
        .expect("valid config")
}

pub fn eth_vault() -> SimVault {
    vault_with(VaultConfig::default(), FixedRateConverter::new())
}

/// Fund `name` with `amount` of the base asset and deposit it all
pub fn fund_and_deposit(vault: &mut SimVault, name: &str, amount: u64, now: i64) -> u64 {
    let who = holder(name);
    let base = vault.config().base_asset.0.clone();
    vault.custody_mut().fund(&who, &base, amount);
    vault
        .deposit(&who, amount, &who, 0, now)
        .expect("deposit succeeds")
}

pub fn redeem_all(vault: &mut SimVault, name: &str, now: i64) -> u64 {
    let who = holder(name);
    let shares = vault.balance_of(&who);
    vault
        .redeem(&who, shares, &who, &WithdrawOptions::default(), now)
        .expect("redeem succeeds")
}

/// Live principal plus idle balance, recomputed from the positions
pub fn ledger_value(vault: &SimVault) -> u64 {
    let principal: u64 = vault
        .positions()
        .filter(|p| p.is_live())
        .map(|p| p.principal)
        .sum();
    principal + vault.state().idle_balance
}

pub fn holder_share_sum(vault: &SimVault) -> u64 {
    vault.state().shares.holders().map(|(_, a)| a.shares).sum()
}
