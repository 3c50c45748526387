//! # Events
//!
//! Observable side effects for off-chain indexers. An event is recorded only
//! after its operation has fully committed, so a consumer never sees an
//! event for a rolled-back call.

use std::fmt;

use serde::{Deserialize, Serialize};
use timevault_protocol::{Address, Timestamp};

/// Names a vault in either storage shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VaultKey {
    /// An independently addressable vault created by the registry.
    Instance(Address),
    /// The `index`-th record in `owner`'s sequence in the shared ledger.
    Record { owner: Address, index: usize },
}

impl fmt::Display for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultKey::Instance(address) => write!(f, "{address}"),
            VaultKey::Record { owner, index } => write!(f, "{owner}#{index}"),
        }
    }
}

/// Everything the engine reports to the outside world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
    /// A vault was created.
    VaultCreated {
        creator: Address,
        vault: VaultKey,
        name: String,
        unlock_time: Timestamp,
        goal_amount: u64,
    },
    /// Value entered a vault.
    VaultDeposit {
        vault: VaultKey,
        amount: u64,
        new_balance: u64,
    },
    /// Value left a vault through a regular withdrawal.
    VaultWithdrawal {
        vault: VaultKey,
        amount: u64,
        new_balance: u64,
    },
    /// The owner armed the emergency exit.
    EmergencyWithdrawalEnabled { vault: VaultKey },
    /// The owner drained the vault through the emergency exit.
    EmergencyWithdrawal {
        vault: VaultKey,
        penalty: u64,
        payout: u64,
    },
    /// The administrator changed the protocol fee.
    ProtocolFeeUpdated { old_fee_bps: u16, new_fee_bps: u16 },
    /// Administration passed to a new identity.
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
    /// The shared ledger's fee recipient changed.
    FeeRecipientUpdated { previous: Address, new: Address },
}

impl VaultEvent {
    /// Short name used in logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            VaultEvent::VaultCreated { .. } => "vault_created",
            VaultEvent::VaultDeposit { .. } => "vault_deposit",
            VaultEvent::VaultWithdrawal { .. } => "vault_withdrawal",
            VaultEvent::EmergencyWithdrawalEnabled { .. } => "emergency_withdrawal_enabled",
            VaultEvent::EmergencyWithdrawal { .. } => "emergency_withdrawal",
            VaultEvent::ProtocolFeeUpdated { .. } => "protocol_fee_updated",
            VaultEvent::OwnershipTransferred { .. } => "ownership_transferred",
            VaultEvent::FeeRecipientUpdated { .. } => "fee_recipient_updated",
        }
    }
}

/// Events recorded since the host last drained them.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<VaultEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: VaultEvent) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = VaultEvent>) {
        self.events.extend(events);
    }

    /// Events not yet drained, oldest first.
    pub fn as_slice(&self) -> &[VaultEvent] {
        &self.events
    }

    /// Removes and returns every pending event.
    pub fn take(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }
}
