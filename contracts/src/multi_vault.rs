//! # Multi-Vault Ledger
//!
//! A second storage shape for the same vault rules. Instead of one
//! addressable instance per vault, every vault is a [`VaultRecord`] in its
//! owner's ordered sequence inside one shared ledger. Per-vault operations
//! take an index into the *caller's* sequence, so a caller can only ever
//! reach their own vaults; an index past the end is rejected.
//!
//! Differences from the registry shape:
//!
//! - A single `fee_recipient`, set by the administrator, receives every
//!   emergency penalty.
//! - The protocol fee is read live by default ([`FeePolicy::Live`]).
//! - Each record carries a [`VaultCategory`] label.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use timevault_protocol::{Address, Timestamp, ValueTransfer};

use crate::admin::Admin;
use crate::config::{FeePolicy, LedgerConfig, PenaltyPolicy};
use crate::context::CallContext;
use crate::error::{VaultError, VaultResult};
use crate::events::{EventLog, VaultEvent, VaultKey};
use crate::vault_state::{VaultInfo, VaultState};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Label attached to a ledger vault. Stored and returned, nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VaultCategory {
    #[default]
    Personal,
    Shared,
    Emergency,
    Retirement,
    Education,
}

impl fmt::Display for VaultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultCategory::Personal => write!(f, "PERSONAL"),
            VaultCategory::Shared => write!(f, "SHARED"),
            VaultCategory::Emergency => write!(f, "EMERGENCY"),
            VaultCategory::Retirement => write!(f, "RETIREMENT"),
            VaultCategory::Education => write!(f, "EDUCATION"),
        }
    }
}

impl FromStr for VaultCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PERSONAL" => Ok(VaultCategory::Personal),
            "SHARED" => Ok(VaultCategory::Shared),
            "EMERGENCY" => Ok(VaultCategory::Emergency),
            "RETIREMENT" => Ok(VaultCategory::Retirement),
            "EDUCATION" => Ok(VaultCategory::Education),
            other => Err(format!("unknown vault category: {other}")),
        }
    }
}

/// One vault inside the shared ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    pub category: VaultCategory,
    /// Fee in force at creation. Only consulted under
    /// [`FeePolicy::CapturedAtCreation`].
    pub protocol_fee_bps: u16,
    pub created_at: Timestamp,
    pub state: VaultState,
}

impl VaultRecord {
    pub fn balance(&self) -> u64 {
        self.state.balance()
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Every owner's vaults in one shared structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiVaultLedger {
    admin: Admin,
    fee_recipient: Address,
    fee_policy: FeePolicy,
    penalty: PenaltyPolicy,
    vaults: HashMap<Address, Vec<VaultRecord>>,
    #[serde(skip)]
    events: EventLog,
}

impl MultiVaultLedger {
    /// Creates an empty ledger. The configuration is assumed valid; see
    /// [`LedgerConfig::validate`].
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            admin: Admin::new(config.owner, config.protocol_fee_bps),
            fee_recipient: config.fee_recipient,
            fee_policy: config.fee_policy,
            penalty: config.penalty,
            vaults: HashMap::new(),
            events: EventLog::new(),
        }
    }

    fn record_mut(&mut self, owner: &Address, index: usize) -> VaultResult<&mut VaultRecord> {
        let records = self.vaults.get_mut(owner);
        let len = records.as_ref().map_or(0, |r| r.len());
        records
            .and_then(|r| r.get_mut(index))
            .ok_or(VaultError::VaultIndexOutOfRange { index, len })
    }

    fn commit(&mut self, event: VaultEvent) -> VaultEvent {
        self.events.push(event.clone());
        event
    }

    // -- Creation -----------------------------------------------------------

    /// Appends a new vault to the caller's sequence and returns its index.
    /// Attached value becomes the first deposit.
    ///
    /// # Errors
    ///
    /// [`VaultError::EmptyName`], [`VaultError::NameTooLong`], or
    /// [`VaultError::InvalidUnlockTime`].
    pub fn create_vault(
        &mut self,
        ctx: &CallContext,
        name: &str,
        unlock_time: Timestamp,
        goal_amount: u64,
        category: VaultCategory,
    ) -> VaultResult<usize> {
        let mut state = VaultState::open(name, unlock_time, goal_amount, ctx.now)?;
        let index = self.vault_count(&ctx.caller);
        let key = VaultKey::Record {
            owner: ctx.caller,
            index,
        };

        let mut events = vec![VaultEvent::VaultCreated {
            creator: ctx.caller,
            vault: key,
            name: name.to_string(),
            unlock_time,
            goal_amount,
        }];
        if ctx.value > 0 {
            let new_balance = state.deposit(ctx.value)?;
            events.push(VaultEvent::VaultDeposit {
                vault: key,
                amount: ctx.value,
                new_balance,
            });
        }

        self.vaults.entry(ctx.caller).or_default().push(VaultRecord {
            category,
            protocol_fee_bps: self.admin.protocol_fee_bps(),
            created_at: ctx.now,
            state,
        });
        self.events.extend(events);

        tracing::info!(
            owner = %ctx.caller,
            index,
            %category,
            unlock_time,
            goal_amount,
            initial_deposit = ctx.value,
            "ledger vault created"
        );
        Ok(index)
    }

    // -- Vault operations ---------------------------------------------------

    /// Deposits the attached value into the caller's vault at `index`.
    ///
    /// # Errors
    ///
    /// [`VaultError::VaultIndexOutOfRange`], [`VaultError::ZeroAmount`], or
    /// [`VaultError::AmountOverflow`].
    pub fn deposit(&mut self, ctx: &CallContext, index: usize) -> VaultResult<VaultEvent> {
        let new_balance = self.record_mut(&ctx.caller, index)?.state.deposit(ctx.value)?;
        tracing::info!(
            owner = %ctx.caller,
            index,
            amount = ctx.value,
            new_balance,
            "ledger deposit"
        );
        Ok(self.commit(VaultEvent::VaultDeposit {
            vault: VaultKey::Record {
                owner: ctx.caller,
                index,
            },
            amount: ctx.value,
            new_balance,
        }))
    }

    /// Pays `amount` from the caller's vault at `index` back to the caller.
    ///
    /// # Errors
    ///
    /// [`VaultError::VaultIndexOutOfRange`], [`VaultError::UnexpectedValue`],
    /// then VaultLocked, ZeroAmount, InsufficientBalance, or Transfer.
    pub fn withdraw<T: ValueTransfer + ?Sized>(
        &mut self,
        ctx: &CallContext,
        index: usize,
        amount: u64,
        transfer: &mut T,
    ) -> VaultResult<VaultEvent> {
        let record = self.record_mut(&ctx.caller, index)?;
        ctx.ensure_no_value()?;
        let new_balance = record.state.withdraw(&ctx.caller, amount, ctx.now, transfer)?;
        tracing::info!(owner = %ctx.caller, index, amount, new_balance, "ledger withdrawal");
        Ok(self.commit(VaultEvent::VaultWithdrawal {
            vault: VaultKey::Record {
                owner: ctx.caller,
                index,
            },
            amount,
            new_balance,
        }))
    }

    /// Arms the emergency exit of the caller's vault at `index`.
    pub fn enable_emergency_withdrawal(
        &mut self,
        ctx: &CallContext,
        index: usize,
    ) -> VaultResult<VaultEvent> {
        let record = self.record_mut(&ctx.caller, index)?;
        ctx.ensure_no_value()?;
        record.state.enable_emergency();
        tracing::info!(owner = %ctx.caller, index, "ledger emergency withdrawal enabled");
        Ok(self.commit(VaultEvent::EmergencyWithdrawalEnabled {
            vault: VaultKey::Record {
                owner: ctx.caller,
                index,
            },
        }))
    }

    /// Drains the caller's vault at `index`. The penalty goes to the ledger's
    /// fee recipient.
    ///
    /// # Errors
    ///
    /// [`VaultError::VaultIndexOutOfRange`], [`VaultError::UnexpectedValue`],
    /// [`VaultError::EmergencyNotEnabled`], or [`VaultError::Transfer`].
    pub fn emergency_withdraw<T: ValueTransfer + ?Sized>(
        &mut self,
        ctx: &CallContext,
        index: usize,
        transfer: &mut T,
    ) -> VaultResult<VaultEvent> {
        let live_fee = self.admin.protocol_fee_bps();
        let fee_recipient = self.fee_recipient;
        let fee_policy = self.fee_policy;
        let penalty_policy = self.penalty;

        let record = self.record_mut(&ctx.caller, index)?;
        ctx.ensure_no_value()?;
        let fee_bps = match fee_policy {
            FeePolicy::CapturedAtCreation => record.protocol_fee_bps,
            FeePolicy::Live => live_fee,
        };
        let penalty_bps = penalty_policy.rate_bps(fee_bps);
        let split = record
            .state
            .emergency_exit(&ctx.caller, &fee_recipient, penalty_bps, transfer)?;

        tracing::info!(
            owner = %ctx.caller,
            index,
            penalty_bps,
            penalty = split.penalty,
            payout = split.payout,
            "ledger emergency withdrawal"
        );
        Ok(self.commit(VaultEvent::EmergencyWithdrawal {
            vault: VaultKey::Record {
                owner: ctx.caller,
                index,
            },
            penalty: split.penalty,
            payout: split.payout,
        }))
    }

    // -- Administration -----------------------------------------------------

    /// # Errors
    ///
    /// [`VaultError::NotOwner`] or [`VaultError::FeeTooHigh`].
    pub fn set_protocol_fee(
        &mut self,
        ctx: &CallContext,
        new_fee_bps: u16,
    ) -> VaultResult<VaultEvent> {
        self.admin.ensure_owner(&ctx.caller)?;
        ctx.ensure_no_value()?;
        let event = self.admin.set_protocol_fee(&ctx.caller, new_fee_bps)?;
        tracing::info!(new_fee_bps, "ledger protocol fee updated");
        Ok(self.commit(event))
    }

    /// # Errors
    ///
    /// [`VaultError::NotOwner`] or [`VaultError::ZeroAddress`].
    pub fn transfer_ownership(
        &mut self,
        ctx: &CallContext,
        new_owner: Address,
    ) -> VaultResult<VaultEvent> {
        self.admin.ensure_owner(&ctx.caller)?;
        ctx.ensure_no_value()?;
        let event = self.admin.transfer_ownership(&ctx.caller, new_owner)?;
        tracing::info!(new_owner = %new_owner, "ledger ownership transferred");
        Ok(self.commit(event))
    }

    /// Redirects future fees and penalties to `new_recipient`.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotOwner`], [`VaultError::UnexpectedValue`], or
    /// [`VaultError::ZeroAddress`].
    pub fn update_fee_recipient(
        &mut self,
        ctx: &CallContext,
        new_recipient: Address,
    ) -> VaultResult<VaultEvent> {
        self.admin.ensure_owner(&ctx.caller)?;
        ctx.ensure_no_value()?;
        if new_recipient.is_zero() {
            return Err(VaultError::ZeroAddress);
        }

        let previous = std::mem::replace(&mut self.fee_recipient, new_recipient);
        tracing::info!(previous = %previous, new = %new_recipient, "fee recipient updated");
        Ok(self.commit(VaultEvent::FeeRecipientUpdated {
            previous,
            new: new_recipient,
        }))
    }

    // -- Reads --------------------------------------------------------------

    pub fn owner(&self) -> Address {
        self.admin.owner()
    }

    pub fn protocol_fee_bps(&self) -> u16 {
        self.admin.protocol_fee_bps()
    }

    pub fn fee_recipient(&self) -> Address {
        self.fee_recipient
    }

    pub fn fee_policy(&self) -> FeePolicy {
        self.fee_policy
    }

    pub fn penalty_policy(&self) -> PenaltyPolicy {
        self.penalty
    }

    /// `owner`'s vaults in creation order. Empty if none.
    pub fn get_user_vaults(&self, owner: &Address) -> &[VaultRecord] {
        self.vaults.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn vault_count(&self, owner: &Address) -> usize {
        self.vaults.get(owner).map_or(0, Vec::len)
    }

    /// Number of vaults across every owner.
    pub fn total_vaults(&self) -> usize {
        self.vaults.values().map(Vec::len).sum()
    }

    /// # Errors
    ///
    /// [`VaultError::VaultIndexOutOfRange`] if `owner` has no vault at `index`.
    pub fn vault_info(&self, owner: &Address, index: usize) -> VaultResult<VaultInfo> {
        let records = self.get_user_vaults(owner);
        records
            .get(index)
            .map(|r| r.state.info(*owner))
            .ok_or(VaultError::VaultIndexOutOfRange {
                index,
                len: records.len(),
            })
    }

    /// Sum of every record's balance, saturating at `u64::MAX`.
    pub fn value_locked(&self) -> u64 {
        self.vaults
            .values()
            .flatten()
            .fold(0u64, |acc, r| acc.saturating_add(r.balance()))
    }

    pub fn events(&self) -> &[VaultEvent] {
        self.events.as_slice()
    }

    pub fn take_events(&mut self) -> Vec<VaultEvent> {
        self.events.take()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
