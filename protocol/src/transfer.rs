//! # Value Transfer
//!
//! Moving value out of custody is the one operation the engine cannot undo.
//! The engine talks to it through [`ValueTransfer`] and always calls it last,
//! after every check has passed and every state change has been applied. If
//! the transfer fails the engine restores the vault and surfaces the error.
//!
//! [`SettlementLedger`] is the in-process implementation: it records what
//! each identity has been paid. A chain host would implement the trait over
//! its native transfer instead.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;

/// Errors a value transfer can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// Value sent to the reserved zero address would be burned.
    #[error("transfer to the zero address")]
    ZeroRecipient,

    /// The recipient refused the transfer.
    #[error("transfer to {0} rejected")]
    Rejected(Address),
}

/// The irreversible value-transfer primitive supplied by the host.
///
/// `transfer_batch` is all-or-nothing: either every payment in the batch is
/// executed or none is. The engine relies on this when a single operation
/// pays more than one recipient.
pub trait ValueTransfer {
    /// Executes every `(recipient, amount)` pair, or none of them.
    fn transfer_batch(&mut self, payments: &[(Address, u64)]) -> Result<(), TransferError>;

    /// Sends `amount` to `to`.
    fn transfer(&mut self, to: &Address, amount: u64) -> Result<(), TransferError> {
        self.transfer_batch(&[(*to, amount)])
    }
}

/// Per-identity record of value paid out of custody.
///
/// Running totals are `u128` and saturate; they never reject a payout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettlementLedger {
    credits: HashMap<Address, u128>,
    total_paid: u128,
    transfer_count: u64,
}

impl SettlementLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total amount ever paid to `address`, or 0.
    pub fn credited(&self, address: &Address) -> u128 {
        self.credits.get(address).copied().unwrap_or(0)
    }

    /// Sum of every transfer.
    pub fn total_paid(&self) -> u128 {
        self.total_paid
    }

    /// Number of transfers executed.
    pub fn transfer_count(&self) -> u64 {
        self.transfer_count
    }
}

impl ValueTransfer for SettlementLedger {
    fn transfer_batch(&mut self, payments: &[(Address, u64)]) -> Result<(), TransferError> {
        if payments.iter().any(|(to, _)| to.is_zero()) {
            return Err(TransferError::ZeroRecipient);
        }

        for (to, amount) in payments {
            let credit = self.credits.entry(*to).or_default();
            *credit = credit.saturating_add(u128::from(*amount));
            self.total_paid = self.total_paid.saturating_add(u128::from(*amount));
        }
        self.transfer_count = self.transfer_count.saturating_add(payments.len() as u64);

        tracing::debug!(
            payments = payments.len(),
            total_paid = %self.total_paid,
            "value transferred"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_credits_recipient() {
        let mut ledger = SettlementLedger::new();
        let alice = Address::from_low_u8(1);
        ledger.transfer(&alice, 500).unwrap();
        ledger.transfer(&alice, 250).unwrap();
        assert_eq!(ledger.credited(&alice), 750);
        assert_eq!(ledger.total_paid(), 750);
        assert_eq!(ledger.transfer_count(), 2);
    }

    #[test]
    fn transfer_to_zero_address_rejected() {
        let mut ledger = SettlementLedger::new();
        assert_eq!(
            ledger.transfer(&Address::ZERO, 1),
            Err(TransferError::ZeroRecipient)
        );
        assert_eq!(ledger.total_paid(), 0);
    }

    #[test]
    fn lifetime_totals_pass_u64_max() {
        const ETH: u64 = 1_000_000_000_000_000_000;
        let mut ledger = SettlementLedger::new();
        let alice = Address::from_low_u8(1);

        // Nineteen distinct users withdrawing 1 ETH each push the total past
        // u64::MAX (about 18.4 ETH).
        for n in 1..=19u8 {
            ledger.transfer(&Address::from_low_u8(n), ETH).unwrap();
        }
        assert_eq!(ledger.total_paid(), 19 * u128::from(ETH));
        assert!(ledger.total_paid() > u128::from(u64::MAX));

        ledger.transfer(&alice, u64::MAX).unwrap();
        ledger.transfer(&alice, u64::MAX).unwrap();
        assert_eq!(ledger.credited(&alice), 2 * u128::from(u64::MAX) + u128::from(ETH));
        assert_eq!(ledger.transfer_count(), 21);
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let mut ledger = SettlementLedger::new();
        let alice = Address::from_low_u8(1);
        let result = ledger.transfer_batch(&[(alice, 100), (Address::ZERO, 5)]);
        assert_eq!(result, Err(TransferError::ZeroRecipient));
        assert_eq!(ledger.credited(&alice), 0);
        assert_eq!(ledger.transfer_count(), 0);
    }

    #[test]
    fn batch_credits_every_recipient() {
        let mut ledger = SettlementLedger::new();
        let alice = Address::from_low_u8(1);
        let treasury = Address::from_low_u8(2);
        ledger
            .transfer_batch(&[(treasury, 5), (alice, 995), (alice, 1)])
            .unwrap();
        assert_eq!(ledger.credited(&treasury), 5);
        assert_eq!(ledger.credited(&alice), 996);
        assert_eq!(ledger.total_paid(), 1_001);
        assert_eq!(ledger.transfer_count(), 3);
    }

    #[test]
    fn unknown_address_has_no_credit() {
        let ledger = SettlementLedger::new();
        assert_eq!(ledger.credited(&Address::from_low_u8(9)), 0);
    }
}
