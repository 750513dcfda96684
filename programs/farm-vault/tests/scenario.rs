mod common;

use common::*;
use farm_vault::sim::FixedRateConverter;
use farm_vault::{
    AssetId, Collaborator, CollaboratorError, HarvestPolicy, LegSource, PlanLeg, PositionStatus,
    StakeRef, VaultConfig, VaultError, VaultEvent, WithdrawOptions,
};

const ETH: u64 = 1_000_000_000_000_000_000;

fn short_lock_config(lock_duration_secs: u64) -> VaultConfig {
    VaultConfig {
        lock_duration_secs,
        ..VaultConfig::default()
    }
}

#[test]
fn test_three_holders_harvest_and_redeem() {
    let mut vault = eth_vault();

    for name in ["alice", "bob", "carol"] {
        assert_eq!(fund_and_deposit(&mut vault, name, 100, 0), 100);
    }
    assert_eq!(vault.total_assets().unwrap(), 300);
    assert_eq!(vault.total_supply(), 300);

    // Same-instant deposits share a single stake
    assert_eq!(vault.positions().count(), 1);
    assert_eq!(vault.venue().principal_of(StakeRef(0)), 300);

    vault.venue_mut().accrue(StakeRef(0), 30);
    let report = vault.harvest(DAY).unwrap();
    assert_eq!(report.harvested, 30);
    assert!(report.skipped.is_empty());
    assert_eq!(vault.total_assets().unwrap(), 330);
    assert_eq!(vault.total_supply(), 300);
    assert_eq!(vault.price_per_share().unwrap(), 1_100_000_000);

    let alice = holder("alice");
    let received = vault
        .redeem(&alice, 100, &alice, &WithdrawOptions::default(), WEEK)
        .unwrap();
    assert_eq!(received, 110);
    assert_eq!(vault.custody().balance(&alice, "ETH"), 110);
    assert_eq!(vault.balance_of(&alice), 0);

    assert_eq!(vault.total_assets().unwrap(), 220);
    assert_eq!(vault.total_supply(), 200);
    assert_eq!(ledger_value(&vault), 220);
    assert_eq!(holder_share_sum(&vault), 200);
    assert_eq!(vault.venue().principal_of(StakeRef(0)), 220);
}

#[test]
fn test_eth_farm_deposit_then_full_exit() {
    let mut vault = eth_vault();
    for name in ["alice", "bob", "carol"] {
        fund_and_deposit(&mut vault, name, ETH, 0);
    }
    assert_eq!(vault.total_assets().unwrap(), 3 * ETH);

    // alice: amount-based withdraw with explicit options
    let alice = holder("alice");
    let assets = vault.convert_to_assets(vault.balance_of(&alice)).unwrap();
    let options = WithdrawOptions::default().with_min_out(0);
    assert_eq!(
        vault.withdraw(&alice, assets, &alice, &options, WEEK).unwrap(),
        ETH
    );

    // bob: plain withdraw
    let bob = holder("bob");
    let assets = vault.convert_to_assets(vault.balance_of(&bob)).unwrap();
    vault
        .withdraw(&bob, assets, &bob, &WithdrawOptions::default(), WEEK)
        .unwrap();

    // carol: redeem by shares
    assert_eq!(redeem_all(&mut vault, "carol", WEEK), ETH);

    assert_eq!(vault.total_assets().unwrap(), 0);
    assert_eq!(vault.total_supply(), 0);
    for name in ["alice", "bob", "carol"] {
        assert_eq!(vault.custody().balance(&holder(name), "ETH"), ETH);
    }
    assert!(vault
        .positions()
        .all(|p| p.status == PositionStatus::Closed));
}

#[test]
fn test_stable_basket_deposit() {
    let config = VaultConfig {
        name: "STABLE FARM".to_string(),
        symbol: "PUSD".to_string(),
        base_asset: AssetId::from("USDC"),
        reward_asset: AssetId::from("USDC"),
        ..VaultConfig::default()
    };
    let converter = FixedRateConverter::new()
        .with_rate("USDT", "USDC", 1, 1)
        .with_rate("FRAX", "USDC", 99, 100)
        .with_rate("LUSD", "USDC", 1, 1);
    let mut vault = vault_with(config, converter);

    let alice = holder("alice");
    for asset in ["USDC", "USDT", "FRAX"] {
        vault.custody_mut().fund(&alice, asset, 100);
    }

    let basket = vec![
        (AssetId::from("USDC"), 100),
        (AssetId::from("USDT"), 100),
        (AssetId::from("FRAX"), 100),
        (AssetId::from("LUSD"), 0),
    ];
    let shares = vault.deposit_basket(&alice, &basket, &alice, 299, 0).unwrap();
    assert_eq!(shares, 299);
    assert_eq!(vault.total_assets().unwrap(), 299);
    for asset in ["USDC", "USDT", "FRAX"] {
        assert_eq!(vault.custody().balance(&alice, asset), 0);
    }

    let empty = vec![(AssetId::from("USDC"), 0)];
    assert!(matches!(
        vault.deposit_basket(&alice, &empty, &alice, 0, 1),
        Err(VaultError::InvalidAmount { amount: 0 })
    ));
}

#[test]
fn test_basket_conversion_failure_leaves_vault_untouched() {
    let config = VaultConfig {
        base_asset: AssetId::from("USDC"),
        reward_asset: AssetId::from("USDC"),
        ..VaultConfig::default()
    };
    let mut vault = vault_with(config, FixedRateConverter::new());
    let alice = holder("alice");
    vault.custody_mut().fund(&alice, "DAI", 50);
    let before = vault.state().clone();

    let basket = vec![(AssetId::from("DAI"), 50)];
    let err = vault.deposit_basket(&alice, &basket, &alice, 0, 0).unwrap_err();
    assert!(matches!(
        err,
        VaultError::ExternalCollaboratorFailure {
            collaborator: Collaborator::AssetConverter,
            ..
        }
    ));
    assert_eq!(vault.state(), &before);
    assert!(vault.events().is_empty());
    assert_eq!(vault.custody().balance(&alice, "DAI"), 50);
    assert_eq!(vault.custody().vault_balance("DAI"), 0);
    assert_eq!(vault.total_supply(), 0);
}

#[test]
fn test_basket_is_refunded_when_staking_fails() {
    let config = VaultConfig {
        base_asset: AssetId::from("USDC"),
        reward_asset: AssetId::from("USDC"),
        ..VaultConfig::default()
    };
    let converter = FixedRateConverter::new().with_rate("USDT", "USDC", 1, 1);
    let mut vault = vault_with(config, converter);
    let alice = holder("alice");
    vault.custody_mut().fund(&alice, "USDC", 100);
    vault.custody_mut().fund(&alice, "USDT", 100);
    let before = vault.state().clone();

    vault.venue_mut().reject_stakes();
    let basket = vec![(AssetId::from("USDC"), 100), (AssetId::from("USDT"), 100)];
    assert!(matches!(
        vault.deposit_basket(&alice, &basket, &alice, 0, 0),
        Err(VaultError::ExternalCollaboratorFailure {
            collaborator: Collaborator::StakingVenue,
            ..
        })
    ));

    // Converted legs come back in the base asset
    assert_eq!(vault.custody().balance(&alice, "USDC"), 200);
    assert_eq!(vault.custody().vault_balance("USDC"), 0);
    assert_eq!(vault.state(), &before);
    assert_eq!(vault.total_supply(), 0);
}

#[test]
fn test_deposit_is_refunded_when_staking_fails() {
    let mut vault = eth_vault();
    let alice = holder("alice");
    vault.custody_mut().fund(&alice, "ETH", 100);
    let before = vault.state().clone();

    vault.venue_mut().reject_stakes();
    assert!(matches!(
        vault.deposit(&alice, 100, &alice, 0, 0),
        Err(VaultError::ExternalCollaboratorFailure {
            collaborator: Collaborator::StakingVenue,
            ..
        })
    ));
    assert!(matches!(
        vault.mint(&alice, 50, &alice, 50, 0),
        Err(VaultError::ExternalCollaboratorFailure {
            collaborator: Collaborator::StakingVenue,
            ..
        })
    ));

    assert_eq!(vault.custody().balance(&alice, "ETH"), 100);
    assert_eq!(vault.custody().vault_balance("ETH"), 0);
    assert_eq!(vault.balance_of(&alice), 0);
    assert_eq!(vault.state(), &before);
    assert_eq!(vault.venue().total_principal(), 0);

    vault.venue_mut().clear_failures();
    assert_eq!(vault.deposit(&alice, 100, &alice, 0, 0).unwrap(), 100);
    assert_eq!(vault.venue().total_principal(), 100);
}

#[test]
fn test_first_deposit_is_one_to_one() {
    let mut vault = eth_vault();
    assert_eq!(vault.preview_deposit(12_345).unwrap(), 12_345);
    assert_eq!(fund_and_deposit(&mut vault, "alice", 12_345, 0), 12_345);
    assert_eq!(vault.price_per_share().unwrap(), 1_000_000_000);
}

#[test]
fn test_deposit_guards() {
    let config = VaultConfig {
        min_deposit_amount: 10,
        ..VaultConfig::default()
    };
    let mut vault = vault_with(config, FixedRateConverter::new());
    let alice = holder("alice");
    vault.custody_mut().fund(&alice, "ETH", 1_000);

    assert!(matches!(
        vault.deposit(&alice, 0, &alice, 0, 0),
        Err(VaultError::InvalidAmount { amount: 0 })
    ));
    assert!(matches!(
        vault.deposit(&alice, 9, &alice, 0, 0),
        Err(VaultError::DepositTooSmall { minimum: 10 })
    ));
    assert!(matches!(
        vault.deposit(&alice, 100, &alice, 101, 0),
        Err(VaultError::SlippageExceeded {
            limit: 101,
            actual: 100
        })
    ));

    // Custody refusal surfaces as a collaborator failure
    let err = vault.deposit(&alice, 5_000, &alice, 0, 0).unwrap_err();
    assert!(matches!(
        err,
        VaultError::ExternalCollaboratorFailure {
            collaborator: Collaborator::Custody,
            ..
        }
    ));
    assert_eq!(vault.total_supply(), 0);
}

#[test]
fn test_mint_charges_rounded_up_assets() {
    let mut vault = eth_vault();
    fund_and_deposit(&mut vault, "alice", 300, 0);
    vault.venue_mut().accrue(StakeRef(0), 30);
    vault.harvest(1).unwrap();

    // 10 shares at 330/300 cost 11 exactly; 7 shares cost 7.7 -> 8
    assert_eq!(vault.preview_mint(10).unwrap(), 11);
    assert_eq!(vault.preview_mint(7).unwrap(), 8);

    let bob = holder("bob");
    vault.custody_mut().fund(&bob, "ETH", 100);
    assert!(matches!(
        vault.mint(&bob, 7, &bob, 7, 2),
        Err(VaultError::SlippageExceeded { limit: 7, actual: 8 })
    ));
    assert_eq!(vault.mint(&bob, 7, &bob, 8, 2).unwrap(), 8);
    assert_eq!(vault.balance_of(&bob), 7);
    assert_eq!(vault.custody().balance(&bob, "ETH"), 92);
}

#[test]
fn test_greedy_selection_prefers_unlocked() {
    let mut vault = vault_with(short_lock_config(100), FixedRateConverter::new());
    fund_and_deposit(&mut vault, "alice", 10, 0);
    fund_and_deposit(&mut vault, "bob", 50, 200);

    let ids: Vec<_> = vault.positions().map(|p| p.id).collect();
    let (unlocked, locked) = (ids[0], ids[1]);

    let plan = vault.preview_withdraw(8, 200, false).unwrap();
    assert_eq!(
        plan.legs,
        vec![PlanLeg {
            source: LegSource::Position(unlocked),
            amount: 8,
            early_exit: false,
        }]
    );
    assert_eq!(plan.penalty, 0);
    assert_eq!(plan, vault.get_best_withdrawal(8, 200).unwrap());

    // Shares are pooled: bob's withdrawal is sourced from alice's old stake
    let bob = holder("bob");
    vault
        .withdraw(&bob, 8, &bob, &WithdrawOptions::default(), 200)
        .unwrap();
    assert_eq!(vault.state().positions.get(&unlocked).unwrap().principal, 2);
    assert_eq!(vault.state().positions.get(&locked).unwrap().principal, 50);
    assert_eq!(vault.balance_of(&bob), 42);
}

#[test]
fn test_locked_positions_need_opt_in() {
    let mut vault = vault_with(short_lock_config(100), FixedRateConverter::new());
    fund_and_deposit(&mut vault, "alice", 10, 0);
    fund_and_deposit(&mut vault, "bob", 50, 200);
    let locked = vault.positions().nth(1).map(|p| p.id).unwrap();
    let bob = holder("bob");

    assert!(matches!(
        vault.preview_withdraw(20, 200, false),
        Err(VaultError::InsufficientLiquidity {
            requested: 20,
            available: 10
        })
    ));
    assert_eq!(vault.max_withdraw(&bob, 200).unwrap(), 10);

    let before = serde_json::to_vec(vault.state()).unwrap();
    assert!(matches!(
        vault.withdraw(&bob, 20, &bob, &WithdrawOptions::default(), 200),
        Err(VaultError::InsufficientLiquidity { .. })
    ));
    assert!(matches!(
        vault.withdraw_with_id(&bob, 20, &bob, &[locked], &WithdrawOptions::default(), 200),
        Err(VaultError::PositionLocked { id, unlocks_at: 300 }) if id == locked
    ));
    assert_eq!(serde_json::to_vec(vault.state()).unwrap(), before);

    let plan = vault.preview_withdraw(20, 200, true).unwrap();
    assert_eq!(plan.legs.len(), 2);
    assert!(!plan.legs[0].early_exit);
    assert_eq!(plan.legs[1].source, LegSource::Position(locked));
    assert!(plan.legs[1].early_exit);

    let out = vault
        .withdraw(&bob, 20, &bob, &WithdrawOptions::early_exit(), 200)
        .unwrap();
    assert_eq!(out, 20);
    assert_eq!(vault.state().positions.get(&locked).unwrap().principal, 40);
}

#[test]
fn test_slippage_failure_is_atomic() {
    let mut vault = eth_vault();
    fund_and_deposit(&mut vault, "alice", 100, 0);
    let alice = holder("alice");

    let state_before = serde_json::to_vec(vault.state()).unwrap();
    let events_before = vault.events().len();

    let options = WithdrawOptions::default().with_min_out(60);
    assert!(matches!(
        vault.withdraw(&alice, 50, &alice, &options, WEEK),
        Err(VaultError::SlippageExceeded {
            limit: 60,
            actual: 50
        })
    ));

    assert_eq!(serde_json::to_vec(vault.state()).unwrap(), state_before);
    assert_eq!(vault.balance_of(&alice), 100);
    assert_eq!(vault.events().len(), events_before);
    assert_eq!(vault.custody().balance(&alice, "ETH"), 0);
    assert_eq!(vault.custody().vault_balance("ETH"), 100);
    assert_eq!(vault.venue().principal_of(StakeRef(0)), 100);
}

#[test]
fn test_insufficient_shares() {
    let mut vault = eth_vault();
    fund_and_deposit(&mut vault, "alice", 100, 0);
    let bob = holder("bob");

    assert!(matches!(
        vault.redeem(&bob, 1, &bob, &WithdrawOptions::default(), WEEK),
        Err(VaultError::InsufficientShares {
            requested: 1,
            available: 0,
            ..
        })
    ));
    let alice = holder("alice");
    assert!(matches!(
        vault.withdraw(&alice, 101, &alice, &WithdrawOptions::default(), WEEK),
        Err(VaultError::InsufficientShares {
            requested: 101,
            available: 100,
            ..
        })
    ));
}

#[test]
fn test_withdraw_with_id_follows_caller_order() {
    let mut vault = vault_with(short_lock_config(100), FixedRateConverter::new());
    fund_and_deposit(&mut vault, "alice", 100, 0);
    fund_and_deposit(&mut vault, "alice", 200, 50);
    let ids: Vec<_> = vault.positions().map(|p| p.id).collect();
    let (first, second) = (ids[0], ids[1]);
    let alice = holder("alice");

    // Policy would drain the smaller position first
    let policy = vault.preview_withdraw(150, 200, false).unwrap();
    assert_eq!(policy.positions().next(), Some(&first));

    let order = [second, second, first];
    let plan = vault
        .preview_withdraw_with_id(150, &order, 200, false)
        .unwrap();
    assert_eq!(plan.positions().copied().collect::<Vec<_>>(), vec![second]);

    vault
        .withdraw_with_id(&alice, 150, &alice, &order, &WithdrawOptions::default(), 200)
        .unwrap();
    assert_eq!(vault.state().positions.get(&first).unwrap().principal, 100);
    assert_eq!(vault.state().positions.get(&second).unwrap().principal, 50);
    assert_eq!(
        vault.state().positions.get(&second).unwrap().status,
        PositionStatus::PartiallyWithdrawn
    );

    assert!(matches!(
        vault.withdraw_with_id(&alice, 60, &alice, &[second], &WithdrawOptions::default(), 200),
        Err(VaultError::InsufficientLiquidity {
            requested: 60,
            available: 50
        })
    ));

    let stranger = farm_vault::PositionId::derive("elsewhere", 0, 0);
    assert!(matches!(
        vault.withdraw_with_id(&alice, 1, &alice, &[stranger], &WithdrawOptions::default(), 200),
        Err(VaultError::UnknownPosition(id)) if id == stranger
    ));
}

#[test]
fn test_early_exit_penalty_stays_in_vault() {
    let config = VaultConfig {
        lock_duration_secs: 100,
        early_exit_penalty_bps: 100,
        ..VaultConfig::default()
    };
    let mut vault = vault_with(config, FixedRateConverter::new());
    fund_and_deposit(&mut vault, "alice", 1_000, 0);
    fund_and_deposit(&mut vault, "bob", 1_000, 0);
    let alice = holder("alice");

    assert!(matches!(
        vault.withdraw(&alice, 500, &alice, &WithdrawOptions::default(), 10),
        Err(VaultError::InsufficientLiquidity {
            requested: 500,
            available: 0
        })
    ));

    let plan = vault.preview_withdraw(500, 10, true).unwrap();
    assert_eq!(plan.penalty, 5);
    assert_eq!(plan.assets_out(), 495);

    let out = vault
        .withdraw(&alice, 500, &alice, &WithdrawOptions::early_exit(), 10)
        .unwrap();
    assert_eq!(out, 495);
    assert_eq!(vault.custody().balance(&alice, "ETH"), 495);
    assert_eq!(vault.balance_of(&alice), 500);
    assert_eq!(vault.state().idle_balance, 5);
    assert_eq!(vault.total_assets().unwrap(), 1_505);
    assert_eq!(vault.total_supply(), 1_500);
    assert!(vault.price_per_share().unwrap() > 1_000_000_000);

    // No penalty once the lock has expired
    let plan = vault.preview_withdraw(500, 100, true).unwrap();
    assert_eq!(plan.penalty, 0);
}

#[test]
fn test_payout_in_another_asset() {
    let converter = FixedRateConverter::new().with_rate("ETH", "USDC", 2_000, 1);
    let mut vault = vault_with(VaultConfig::default(), converter);
    fund_and_deposit(&mut vault, "alice", 10, 0);
    let alice = holder("alice");

    let too_greedy = WithdrawOptions::default()
        .with_payout(AssetId::from("USDC"))
        .with_min_out(10_001);
    assert!(matches!(
        vault.withdraw(&alice, 5, &alice, &too_greedy, WEEK),
        Err(VaultError::SlippageExceeded {
            limit: 10_001,
            actual: 10_000
        })
    ));
    assert_eq!(vault.balance_of(&alice), 10);
    assert_eq!(vault.venue().principal_of(StakeRef(0)), 10);

    let options = WithdrawOptions::default()
        .with_payout(AssetId::from("USDC"))
        .with_min_out(10_000);
    assert_eq!(vault.withdraw(&alice, 5, &alice, &options, WEEK).unwrap(), 10_000);
    assert_eq!(vault.custody().balance(&alice, "USDC"), 10_000);
    assert_eq!(vault.total_assets().unwrap(), 5);

    match vault.events().last() {
        Some(VaultEvent::Withdraw {
            assets,
            payout,
            payout_asset,
            ..
        }) => {
            assert_eq!(*assets, 5);
            assert_eq!(*payout, 10_000);
            assert_eq!(payout_asset, &AssetId::from("USDC"));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    assert_eq!(redeem_all(&mut vault, "alice", WEEK), 5);
    assert_eq!(vault.venue().principal_of(StakeRef(0)), 0);
    assert_eq!(vault.total_supply(), 0);
}

#[test]
fn test_failed_conversion_puts_stake_back() {
    let converter = FixedRateConverter::new().with_rate("ETH", "USDC", 2_000, 1);
    let mut vault = vault_with(VaultConfig::default(), converter);
    fund_and_deposit(&mut vault, "alice", 10, 0);
    let alice = holder("alice");
    let before = vault.state().clone();

    // Quotes still succeed, but every conversion is past its deadline
    vault.converter_mut().set_clock(i64::MAX);
    let options = WithdrawOptions::default().with_payout(AssetId::from("USDC"));
    match vault.withdraw(&alice, 5, &alice, &options, WEEK).unwrap_err() {
        VaultError::ExternalCollaboratorFailure {
            collaborator: Collaborator::AssetConverter,
            reason,
        } => assert!(matches!(
            reason.downcast_ref::<CollaboratorError>(),
            Some(CollaboratorError::Expired { .. })
        )),
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(vault.state(), &before);
    assert_eq!(vault.venue().principal_of(StakeRef(0)), 10);
    assert_eq!(vault.custody().balance(&alice, "USDC"), 0);
    assert_eq!(vault.custody().balance(&alice, "ETH"), 0);

    assert_eq!(redeem_all(&mut vault, "alice", WEEK), 10);
    assert_eq!(vault.custody().balance(&alice, "ETH"), 10);
    assert_eq!(vault.venue().principal_of(StakeRef(0)), 0);
}

#[test]
fn test_failed_payout_puts_stake_back() {
    let mut vault = eth_vault();
    fund_and_deposit(&mut vault, "alice", 100, 0);
    let alice = holder("alice");
    let before = vault.state().clone();

    vault.custody_mut().reject_payouts();
    assert!(matches!(
        vault.redeem(&alice, 40, &alice, &WithdrawOptions::default(), WEEK),
        Err(VaultError::ExternalCollaboratorFailure {
            collaborator: Collaborator::Custody,
            ..
        })
    ));
    assert_eq!(vault.state(), &before);
    assert_eq!(vault.venue().principal_of(StakeRef(0)), 100);
    assert_eq!(vault.custody().vault_balance("ETH"), 100);

    vault.custody_mut().accept_payouts();
    assert_eq!(redeem_all(&mut vault, "alice", WEEK), 100);
    assert_eq!(vault.venue().principal_of(StakeRef(0)), 0);
    assert_eq!(vault.custody().balance(&alice, "ETH"), 100);
}

#[test]
fn test_harvest_skips_failed_claims() {
    let mut vault = vault_with(short_lock_config(100), FixedRateConverter::new());
    fund_and_deposit(&mut vault, "alice", 100, 0);
    fund_and_deposit(&mut vault, "bob", 100, 1);
    let ids: Vec<_> = vault.positions().map(|p| p.id).collect();

    vault.venue_mut().accrue(StakeRef(0), 10);
    vault.venue_mut().accrue(StakeRef(1), 20);
    vault.venue_mut().fail_claims_for(StakeRef(0));

    let report = vault.harvest(10).unwrap();
    assert_eq!(report.harvested, 20);
    assert_eq!(report.skipped, vec![ids[0]]);
    assert_eq!(vault.state().positions.get(&ids[0]).unwrap().principal, 100);
    assert_eq!(vault.state().positions.get(&ids[1]).unwrap().principal, 120);

    vault.venue_mut().clear_failures();
    let report = vault.harvest(11).unwrap();
    assert_eq!(report.harvested, 10);
    assert!(report.skipped.is_empty());
    assert_eq!(vault.total_assets().unwrap(), 230);
    assert_eq!(vault.state().total_harvested, 30);
}

#[test]
fn test_harvest_keeps_reward_when_conversion_fails() {
    let config = VaultConfig {
        reward_asset: AssetId::from("RWD"),
        ..VaultConfig::default()
    };
    let converter = FixedRateConverter::new().with_rate("RWD", "ETH", 1, 2);
    let mut vault = vault_with(config, converter);
    fund_and_deposit(&mut vault, "alice", 100, 0);
    fund_and_deposit(&mut vault, "bob", 100, 1);
    let ids: Vec<_> = vault.positions().map(|p| p.id).collect();

    vault.venue_mut().accrue(StakeRef(0), 10);
    vault.venue_mut().accrue(StakeRef(1), 20);
    vault.converter_mut().halt();

    let price_before = vault.price_per_share().unwrap();
    let report = vault.harvest(10).unwrap();
    assert_eq!(report.harvested, 0);
    assert_eq!(report.skipped, ids);
    assert_eq!(vault.price_per_share().unwrap(), price_before);
    assert_eq!(vault.state().positions.get(&ids[0]).unwrap().reward_accrued, 10);
    assert_eq!(vault.state().positions.get(&ids[1]).unwrap().reward_accrued, 20);

    vault.converter_mut().resume();
    let report = vault.harvest(11).unwrap();
    assert_eq!(report.harvested, 15);
    assert!(vault.positions().all(|p| p.reward_accrued == 0));
    assert_eq!(vault.total_assets().unwrap(), 215);
}

#[test]
fn test_same_instant_harvest_is_a_noop() {
    let mut vault = eth_vault();
    fund_and_deposit(&mut vault, "alice", 100, 0);

    vault.venue_mut().accrue(StakeRef(0), 10);
    assert_eq!(vault.harvest(5).unwrap().harvested, 10);

    vault.venue_mut().accrue(StakeRef(0), 10);
    let report = vault.harvest(5).unwrap();
    assert_eq!(report.harvested, 0);
    assert!(report.skipped.is_empty());
    assert_eq!(vault.total_assets().unwrap(), 110);

    assert_eq!(vault.harvest(6).unwrap().harvested, 10);
    assert_eq!(vault.total_assets().unwrap(), 120);
}

#[test]
fn test_harvest_into_new_position() {
    let config = VaultConfig {
        harvest_policy: HarvestPolicy::NewPosition {
            lock_duration_secs: DAY as u64,
        },
        ..VaultConfig::default()
    };
    let mut vault = vault_with(config, FixedRateConverter::new());
    fund_and_deposit(&mut vault, "alice", 100, 0);

    vault.venue_mut().accrue(StakeRef(0), 10);
    assert_eq!(vault.harvest(DAY).unwrap().harvested, 10);

    let positions: Vec<_> = vault.positions().cloned().collect();
    assert_eq!(positions.len(), 2);
    assert_eq!(positions[0].principal, 100);
    assert_eq!(positions[1].principal, 10);
    assert_eq!(positions[1].lock_start, DAY);
    assert_eq!(positions[1].lock_end, 2 * DAY);
    assert_eq!(vault.total_assets().unwrap(), 110);

    // The short harvest lock unlocks before the deposit lock
    assert_eq!(vault.max_withdraw(&holder("alice"), 2 * DAY).unwrap(), 10);
}

#[test]
fn test_pause_and_authority() {
    let mut vault = eth_vault();
    let admin = holder("admin");
    let alice = holder("alice");
    vault.custody_mut().fund(&alice, "ETH", 100);

    assert!(matches!(
        vault.pause(&alice, 0),
        Err(VaultError::Unauthorized)
    ));
    vault.pause(&admin, 0).unwrap();
    assert_eq!(vault.max_deposit(), 0);
    assert_eq!(vault.max_redeem(&alice), 0);
    assert!(matches!(
        vault.deposit(&alice, 100, &alice, 0, 1),
        Err(VaultError::VaultPaused)
    ));
    assert!(matches!(vault.harvest(1), Err(VaultError::VaultPaused)));

    let ops = holder("ops");
    vault.transfer_authority(&admin, ops.clone(), 2).unwrap();
    assert_eq!(vault.state().authority, ops);
    assert!(matches!(
        vault.unpause(&admin, 3),
        Err(VaultError::Unauthorized)
    ));
    vault.unpause(&ops, 3).unwrap();

    assert_eq!(vault.deposit(&alice, 100, &alice, 0, 4).unwrap(), 100);
    assert_eq!(vault.max_deposit(), u64::MAX);

    let statuses: Vec<_> = vault
        .events()
        .iter()
        .filter_map(|e| match e {
            VaultEvent::VaultStatusChanged { paused } => Some(*paused),
            _ => None,
        })
        .collect();
    assert_eq!(statuses, vec![true, false]);
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = VaultConfig {
        early_exit_penalty_bps: 10_001,
        ..VaultConfig::default()
    };
    let result = farm_vault::FarmVault::new(
        config,
        FixedRateConverter::new(),
        farm_vault::sim::InMemoryVenue::new(),
        farm_vault::sim::LedgerCustody::new(),
    );
    assert!(matches!(result, Err(VaultError::InvalidConfig(_))));
}

#[test]
fn test_preview_matches_execution() {
    let mut vault = eth_vault();
    fund_and_deposit(&mut vault, "alice", 1_000, 0);
    fund_and_deposit(&mut vault, "bob", 333, 1);
    vault.venue_mut().distribute_reward(97);
    vault.harvest(2).unwrap();

    let alice = holder("alice");
    let shares = vault.preview_withdraw_shares(250).unwrap();
    let before = vault.balance_of(&alice);
    vault
        .withdraw(&alice, 250, &alice, &WithdrawOptions::default(), 2 * WEEK)
        .unwrap();
    assert_eq!(before - vault.balance_of(&alice), shares);

    let bob = holder("bob");
    let expected = vault.preview_redeem(vault.balance_of(&bob)).unwrap();
    assert_eq!(redeem_all(&mut vault, "bob", 2 * WEEK), expected);
    assert_eq!(ledger_value(&vault), vault.total_assets().unwrap());
}
