//! Randomized checks of the vault invariants, run against both storage
//! shapes through the shared [`VaultBook`] interface.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use timevault_contracts::{
    CallContext, LedgerConfig, MultiVaultLedger, Registry, RegistryConfig, VaultBook, VaultError,
};
use timevault_protocol::{Address, SettlementLedger, Timestamp, TransferError, ValueTransfer};

const START: Timestamp = 1_000_000;
const UNLOCK: Timestamp = START + 500;

fn owner() -> Address {
    Address::from_low_u8(0x11)
}

fn admin() -> Address {
    Address::from_low_u8(0xA0)
}

fn registry() -> Registry {
    Registry::new(RegistryConfig::new(Address::from_low_u8(0xFE), admin()))
}

fn ledger() -> MultiVaultLedger {
    MultiVaultLedger::new(LedgerConfig::new(admin(), Address::from_low_u8(0xEE)))
}

/// A transfer primitive that refuses everything.
struct Refusing;

impl ValueTransfer for Refusing {
    fn transfer_batch(&mut self, payments: &[(Address, u64)]) -> Result<(), TransferError> {
        Err(TransferError::Rejected(payments[0].0))
    }
}

// ---------------------------------------------------------------------------
// Generic properties
// ---------------------------------------------------------------------------

/// Random deposits and withdrawals: the balance always equals accepted
/// deposits minus accepted withdrawals, `goal_reached` never flips back, and
/// withdrawal succeeds exactly when the vault is unlocked.
fn balance_is_conserved<B: VaultBook>(book: &mut B, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut settlement = SettlementLedger::new();
    let goal = rng.gen_range(0..5_000u64);
    let vault = book
        .create_vault(&CallContext::new(owner(), START), "prop", UNLOCK, goal)
        .unwrap();

    let mut expected: u64 = 0;
    let mut withdrawn: u64 = 0;
    let mut goal_seen = false;
    let mut now = START;

    for _ in 0..300 {
        now += rng.gen_range(0..4);
        let ctx = CallContext::new(owner(), now);

        if rng.gen_bool(0.5) {
            let amount = rng.gen_range(0..400u64);
            match book.deposit(&ctx.with_value(amount), vault) {
                Ok(_) => expected += amount,
                Err(err) => {
                    assert_eq!(amount, 0);
                    assert_eq!(err, VaultError::ZeroAmount);
                }
            }
        } else {
            let amount = rng.gen_range(0..600u64);
            let unlocked = now >= UNLOCK || goal_seen;
            match book.withdraw(&ctx, vault, amount, &mut settlement) {
                Ok(_) => {
                    assert!(unlocked);
                    expected -= amount;
                    withdrawn += amount;
                }
                Err(VaultError::VaultLocked { .. }) => assert!(!unlocked),
                Err(VaultError::ZeroAmount) => assert!(unlocked && amount == 0),
                Err(VaultError::InsufficientBalance { balance, requested }) => {
                    assert!(unlocked);
                    assert_eq!(balance, expected);
                    assert!(requested > balance);
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        let info = book.vault_info(&owner(), vault).unwrap();
        assert_eq!(info.balance, expected);
        if goal_seen {
            assert!(info.goal_reached, "goal_reached must be sticky");
        }
        goal_seen = info.goal_reached;
        if goal > 0 && expected >= goal {
            assert!(info.goal_reached);
        }
    }

    assert_eq!(settlement.credited(&owner()), u128::from(withdrawn));
}

/// Emergency exit always splits the balance exactly.
fn emergency_split_is_exact<B: VaultBook>(book: &mut B, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for round in 0..50u64 {
        let mut settlement = SettlementLedger::new();
        let ctx = CallContext::new(owner(), START + round);
        let vault = book.create_vault(&ctx, "exit", UNLOCK + round, 0).unwrap();
        let amount = rng.gen_range(1..u64::MAX / 2);
        book.deposit(&ctx.with_value(amount), vault).unwrap();
        book.enable_emergency_withdrawal(&ctx, vault).unwrap();
        book.emergency_withdraw(&ctx, vault, &mut settlement).unwrap();

        assert_eq!(settlement.total_paid(), u128::from(amount));
        assert!(settlement.credited(&owner()) <= u128::from(amount));
        assert_eq!(book.vault_info(&owner(), vault).unwrap().balance, 0);
    }
}

/// A refused payout leaves the vault exactly as it was.
fn refused_payout_rolls_back<B: VaultBook>(book: &mut B) {
    let ctx = CallContext::new(owner(), START);
    let vault = book.create_vault(&ctx, "rollback", START + 1, 0).unwrap();
    book.deposit(&ctx.with_value(1_000), vault).unwrap();
    book.enable_emergency_withdrawal(&ctx, vault).unwrap();
    let before = book.vault_info(&owner(), vault).unwrap();

    let later = CallContext::new(owner(), START + 10);
    assert!(matches!(
        book.withdraw(&later, vault, 400, &mut Refusing),
        Err(VaultError::Transfer(_))
    ));
    assert_eq!(book.vault_info(&owner(), vault).unwrap(), before);

    assert!(matches!(
        book.emergency_withdraw(&later, vault, &mut Refusing),
        Err(VaultError::Transfer(_))
    ));
    assert_eq!(book.vault_info(&owner(), vault).unwrap(), before);
}

// ---------------------------------------------------------------------------
// Registry shape
// ---------------------------------------------------------------------------

#[test]
fn registry_balance_is_conserved() {
    for seed in 0..8 {
        balance_is_conserved(&mut registry(), seed);
    }
}

#[test]
fn registry_emergency_split_is_exact() {
    emergency_split_is_exact(&mut registry(), 7);
}

#[test]
fn registry_refused_payout_rolls_back() {
    let mut r = registry();
    refused_payout_rolls_back(&mut r);
    assert_eq!(r.value_locked(), 1_000);
}

#[test]
fn registry_creation_counts_exactly_once() {
    let mut r = registry();
    let mut rng = StdRng::seed_from_u64(99);
    let now = START;

    for _ in 0..200 {
        let creator = Address::from_low_u8(rng.gen_range(1..6));
        let unlock = now - 5 + rng.gen_range(0..10);
        let name = if rng.gen_bool(0.1) { "" } else { "v" };

        let total = r.total_vaults();
        let all = r.get_all_vaults().len();
        let mine = r.get_user_vaults(&creator).len();

        match r.create_vault(&CallContext::new(creator, now), name, unlock, 0) {
            Ok(vault) => {
                assert_eq!(r.total_vaults(), total + 1);
                assert_eq!(r.get_all_vaults().len(), all + 1);
                assert_eq!(r.get_user_vaults(&creator).len(), mine + 1);
                assert_eq!(r.get_all_vaults().last(), Some(&vault));
                assert!(r.is_vault(&vault));
            }
            Err(err) => {
                assert!(matches!(
                    err,
                    VaultError::EmptyName | VaultError::InvalidUnlockTime { .. }
                ));
                assert_eq!(r.total_vaults(), total);
                assert_eq!(r.get_all_vaults().len(), all);
                assert_eq!(r.get_user_vaults(&creator).len(), mine);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger shape
// ---------------------------------------------------------------------------

#[test]
fn ledger_balance_is_conserved() {
    for seed in 100..108 {
        balance_is_conserved(&mut ledger(), seed);
    }
}

#[test]
fn ledger_emergency_split_is_exact() {
    emergency_split_is_exact(&mut ledger(), 11);
}

#[test]
fn ledger_refused_payout_rolls_back() {
    let mut l = ledger();
    refused_payout_rolls_back(&mut l);
    assert_eq!(l.value_locked(), 1_000);
}
