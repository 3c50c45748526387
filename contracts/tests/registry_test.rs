//! Integration tests for the vault registry and its time vaults.
//!
//! These follow a vault through the registry the way a front end would:
//! create, fund, wait or hit the goal, withdraw, and use the emergency exit,
//! with the administrator changing fees and ownership along the way.

use timevault_contracts::{
    CallContext, FeePolicy, PenaltyPolicy, Registry, RegistryConfig, VaultError, VaultEvent,
    VaultKey,
};
use timevault_protocol::config::MAX_PROTOCOL_FEE_BPS;
use timevault_protocol::{Address, SettlementLedger, Timestamp};

const ETH: u64 = 1_000_000_000_000_000_000;
const START: Timestamp = 1_700_000_000;
const DAY: Timestamp = 86_400;

fn admin() -> Address {
    Address::from_low_u8(0xA0)
}

fn alice() -> Address {
    Address::from_low_u8(0x01)
}

fn mallory() -> Address {
    Address::from_low_u8(0x66)
}

/// Helper: a registry with default settings.
fn registry() -> Registry {
    Registry::new(RegistryConfig::new(Address::from_low_u8(0xFE), admin()))
}

fn call(caller: Address, now: Timestamp) -> CallContext {
    CallContext::new(caller, now)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn goal_unlocks_before_maturity() {
    let mut r = registry();
    let mut settlement = SettlementLedger::new();
    let vault = r
        .create_vault(&call(alice(), START), "Emergency fund", START + 30 * DAY, ETH)
        .unwrap();

    r.deposit(&call(alice(), START).with_value(ETH / 2), &vault).unwrap();
    assert!(!r.vault_info(&vault).unwrap().goal_reached);

    r.deposit(&call(alice(), START).with_value(ETH / 2), &vault).unwrap();
    assert!(r.vault_info(&vault).unwrap().goal_reached);

    r.withdraw(&call(alice(), START + 1), &vault, ETH / 2, &mut settlement)
        .unwrap();
    let info = r.vault_info(&vault).unwrap();
    assert_eq!(info.balance, ETH / 2);
    assert!(info.goal_reached);
    assert_eq!(settlement.credited(&alice()), u128::from(ETH / 2));
}

#[test]
fn time_lock_releases_at_maturity() {
    let mut r = registry();
    let mut settlement = SettlementLedger::new();
    let vault = r
        .create_vault(&call(alice(), START), "Short", START + 1, 0)
        .unwrap();
    r.deposit(&call(alice(), START).with_value(100), &vault).unwrap();

    let locked = r.withdraw(&call(alice(), START), &vault, 100, &mut settlement);
    assert_eq!(
        locked,
        Err(VaultError::VaultLocked {
            unlock_time: START + 1,
            now: START
        })
    );
    assert_eq!(r.vault_info(&vault).unwrap().balance, 100);

    r.withdraw(&call(alice(), START + 1), &vault, 100, &mut settlement)
        .unwrap();
    assert_eq!(r.vault_info(&vault).unwrap().balance, 0);
    assert!(r.is_vault(&vault));
}

#[test]
fn non_owner_is_rejected_everywhere() {
    let mut r = registry();
    let mut settlement = SettlementLedger::new();
    let vault = r
        .create_vault(&call(alice(), START), "Mine", START + DAY, 0)
        .unwrap();
    r.deposit(&call(alice(), START).with_value(1_000), &vault).unwrap();
    r.enable_emergency_withdrawal(&call(alice(), START), &vault)
        .unwrap();

    for stranger in [mallory(), admin(), Address::ZERO] {
        let expected = Err(VaultError::NotOwner { caller: stranger });
        let late = START + 2 * DAY;
        assert_eq!(
            r.deposit(&call(stranger, late).with_value(5), &vault),
            expected
        );
        assert_eq!(
            r.receive(&call(stranger, late).with_value(5), &vault),
            expected
        );
        assert_eq!(
            r.withdraw(&call(stranger, late), &vault, 1, &mut settlement),
            expected
        );
        assert_eq!(
            r.enable_emergency_withdrawal(&call(stranger, late), &vault),
            expected
        );
        assert_eq!(
            r.emergency_withdraw(&call(stranger, late), &vault, &mut settlement),
            expected
        );
    }
    assert_eq!(r.vault_info(&vault).unwrap().balance, 1_000);
    assert_eq!(settlement.total_paid(), 0);
}

#[test]
fn withdrawal_error_precedence() {
    let mut r = registry();
    let mut settlement = SettlementLedger::new();
    let vault = r
        .create_vault(&call(alice(), START), "Order", START + DAY, 0)
        .unwrap();

    // Stranger, locked, zero amount: ownership wins.
    assert!(matches!(
        r.withdraw(&call(mallory(), START), &vault, 0, &mut settlement),
        Err(VaultError::NotOwner { .. })
    ));
    // Owner, locked, zero amount: lock wins.
    assert!(matches!(
        r.withdraw(&call(alice(), START), &vault, 0, &mut settlement),
        Err(VaultError::VaultLocked { .. })
    ));
    // Owner, unlocked, zero amount over empty balance: zero wins.
    assert_eq!(
        r.withdraw(&call(alice(), START + DAY), &vault, 0, &mut settlement),
        Err(VaultError::ZeroAmount)
    );
    assert_eq!(
        r.withdraw(&call(alice(), START + DAY), &vault, 1, &mut settlement),
        Err(VaultError::InsufficientBalance {
            balance: 0,
            requested: 1
        })
    );
}

#[test]
fn zero_deposit_rejected() {
    let mut r = registry();
    let vault = r
        .create_vault(&call(alice(), START), "Zero", START + DAY, 0)
        .unwrap();
    assert_eq!(
        r.deposit(&call(alice(), START), &vault),
        Err(VaultError::ZeroAmount)
    );
    assert_eq!(
        r.receive(&call(alice(), START), &vault),
        Err(VaultError::ZeroAmount)
    );
}

// ---------------------------------------------------------------------------
// Emergency Exit
// ---------------------------------------------------------------------------

#[test]
fn emergency_exit_pays_less_than_deposited() {
    let mut r = registry();
    let mut settlement = SettlementLedger::new();
    let vault = r
        .create_vault(&call(alice(), START), "Oops", START + 365 * DAY, 0)
        .unwrap();
    r.deposit(&call(alice(), START).with_value(ETH), &vault).unwrap();

    assert_eq!(
        r.emergency_withdraw(&call(alice(), START), &vault, &mut settlement),
        Err(VaultError::EmergencyNotEnabled)
    );

    r.enable_emergency_withdrawal(&call(alice(), START), &vault)
        .unwrap();
    let event = r
        .emergency_withdraw(&call(alice(), START), &vault, &mut settlement)
        .unwrap();

    let penalty = ETH / 200; // 50 bps
    assert_eq!(
        event,
        VaultEvent::EmergencyWithdrawal {
            vault: VaultKey::Instance(vault),
            penalty,
            payout: ETH - penalty
        }
    );
    assert!(settlement.credited(&alice()) < u128::from(ETH));
    assert_eq!(
        settlement.credited(&alice()) + settlement.credited(&admin()),
        u128::from(ETH)
    );
    assert_eq!(r.vault_info(&vault).unwrap().balance, 0);
}

#[test]
fn fixed_penalty_overrides_fee() {
    let mut config = RegistryConfig::new(Address::from_low_u8(0xFE), admin());
    config.penalty = PenaltyPolicy::Fixed(1_000);
    let mut r = Registry::new(config);
    let mut settlement = SettlementLedger::new();

    let vault = r
        .create_vault(&call(alice(), START).with_value(10_000), "Strict", START + DAY, 0)
        .unwrap();
    r.enable_emergency_withdrawal(&call(alice(), START), &vault)
        .unwrap();
    r.emergency_withdraw(&call(alice(), START), &vault, &mut settlement)
        .unwrap();
    assert_eq!(settlement.credited(&admin()), 1_000);
    assert_eq!(settlement.credited(&alice()), 9_000);
}

// ---------------------------------------------------------------------------
// Administration
// ---------------------------------------------------------------------------

#[test]
fn fee_bounds_are_inclusive() {
    let mut r = registry();
    for fee in [0, 1, 500, 999, MAX_PROTOCOL_FEE_BPS] {
        r.set_protocol_fee(&call(admin(), START), fee).unwrap();
        assert_eq!(r.protocol_fee_bps(), fee);
    }
    for fee in [MAX_PROTOCOL_FEE_BPS + 1, 5_000, u16::MAX] {
        assert_eq!(
            r.set_protocol_fee(&call(admin(), START), fee),
            Err(VaultError::FeeTooHigh {
                fee_bps: fee,
                max_bps: MAX_PROTOCOL_FEE_BPS
            })
        );
        assert_eq!(r.protocol_fee_bps(), MAX_PROTOCOL_FEE_BPS);
    }
}

#[test]
fn only_owner_administers() {
    let mut r = registry();
    assert_eq!(
        r.set_protocol_fee(&call(mallory(), START), 10),
        Err(VaultError::NotOwner { caller: mallory() })
    );
    assert_eq!(
        r.transfer_ownership(&call(mallory(), START), mallory()),
        Err(VaultError::NotOwner { caller: mallory() })
    );
    assert_eq!(
        r.transfer_ownership(&call(admin(), START), Address::ZERO),
        Err(VaultError::ZeroAddress)
    );

    r.transfer_ownership(&call(admin(), START), alice()).unwrap();
    assert_eq!(r.owner(), alice());
    assert!(r.set_protocol_fee(&call(alice(), START), 10).is_ok());
}

#[test]
fn fee_change_is_not_retroactive_by_default() {
    let mut r = registry();
    assert_eq!(r.fee_policy(), FeePolicy::CapturedAtCreation);
    let before = r
        .create_vault(&call(alice(), START), "before", START + DAY, 0)
        .unwrap();
    r.set_protocol_fee(&call(admin(), START), 200).unwrap();
    let after = r
        .create_vault(&call(alice(), START), "after", START + DAY, 0)
        .unwrap();

    assert_eq!(r.vault(&before).unwrap().protocol_fee_bps(), 50);
    assert_eq!(r.vault(&after).unwrap().protocol_fee_bps(), 200);
}

#[test]
fn events_follow_operation_order() {
    let mut r = registry();
    let vault = r
        .create_vault(&call(alice(), START).with_value(7), "Log", START + DAY, 0)
        .unwrap();
    r.set_protocol_fee(&call(admin(), START), 60).unwrap();

    let kinds: Vec<&str> = r.events().iter().map(VaultEvent::kind).collect();
    assert_eq!(kinds, vec!["vault_created", "vault_deposit", "protocol_fee_updated"]);
    assert!(matches!(
        &r.events()[0],
        VaultEvent::VaultCreated { creator, vault: VaultKey::Instance(v), .. }
            if *creator == alice() && *v == vault
    ));
}

#[test]
fn snapshot_survives_serialization() {
    let mut r = registry();
    let vault = r
        .create_vault(&call(alice(), START).with_value(42), "Persist", START + DAY, 0)
        .unwrap();

    let bytes = bincode::serialize(&r).unwrap();
    let restored: Registry = bincode::deserialize(&bytes).unwrap();
    assert_eq!(restored.total_vaults(), 1);
    assert_eq!(restored.get_user_vaults(&alice()), &[vault]);
    assert_eq!(restored.vault_info(&vault), r.vault_info(&vault));
    assert!(restored.events().is_empty());
}

#[test]
fn payouts_continue_past_u64_lifetime_total() {
    let mut r = registry();
    let mut settlement = SettlementLedger::new();

    // 19 ETH paid out in total is more than u64::MAX base units.
    for n in 1..=19u8 {
        let user = Address::from_low_u8(n);
        let vault = r
            .create_vault(&call(user, START).with_value(ETH), "Savings", START + DAY, 0)
            .unwrap();
        r.withdraw(&call(user, START + DAY), &vault, ETH, &mut settlement)
            .unwrap();
        assert_eq!(settlement.credited(&user), u128::from(ETH));
    }

    assert_eq!(r.value_locked(), 0);
    assert_eq!(settlement.total_paid(), 19 * u128::from(ETH));
}
