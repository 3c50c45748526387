//! # Vault State Machine
//!
//! The rules every vault obeys, written once and shared by both storage
//! shapes. A vault has a single lifecycle state, active, and two orthogonal
//! flags on top of it:
//!
//! - **Unlocked** when `now >= unlock_time` *or* the savings goal has been
//!   reached. Either condition alone permits withdrawal.
//! - **Emergency enabled** once the owner arms the emergency exit. There is
//!   no way to disarm it.
//!
//! `goal_reached` is sticky: a withdrawal that drops the balance below the
//! goal does not lock the vault again.
//!
//! Ownership is not checked here. Each storage shape knows who owns a vault
//! and authenticates the caller before delegating to [`VaultState`].
//!
//! ## Call Protocol
//!
//! Every mutation follows the same order: validate every precondition,
//! apply the new state, then call the value transfer. If the transfer fails
//! the pre-call state is restored before the error is returned, so a failed
//! call leaves nothing behind.

use serde::{Deserialize, Serialize};
use timevault_protocol::config::{apply_bps, MAX_VAULT_NAME_LENGTH};
use timevault_protocol::{Address, Timestamp, ValueTransfer};

use crate::error::{VaultError, VaultResult};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Balance and unlock policy of one vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultState {
    name: String,
    unlock_time: Timestamp,
    goal_amount: u64,
    balance: u64,
    goal_reached: bool,
    emergency_enabled: bool,
}

/// How an emergency exit split the drained balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencySplit {
    /// Sent to the fee recipient.
    pub penalty: u64,
    /// Sent to the vault owner.
    pub payout: u64,
}

/// Read-only view of a vault, as returned by `vault_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultInfo {
    pub name: String,
    pub unlock_time: Timestamp,
    pub goal_amount: u64,
    pub owner: Address,
    pub balance: u64,
    pub goal_reached: bool,
    pub emergency_enabled: bool,
}

// ---------------------------------------------------------------------------
// Construction and reads
// ---------------------------------------------------------------------------

impl VaultState {
    /// Validates creation parameters and returns an empty vault.
    ///
    /// A `goal_amount` of zero means the vault is time-locked only.
    ///
    /// # Errors
    ///
    /// - [`VaultError::EmptyName`] if `name` is empty.
    /// - [`VaultError::NameTooLong`] if `name` exceeds
    ///   [`MAX_VAULT_NAME_LENGTH`] bytes.
    /// - [`VaultError::InvalidUnlockTime`] unless `unlock_time > now`.
    pub fn open(
        name: &str,
        unlock_time: Timestamp,
        goal_amount: u64,
        now: Timestamp,
    ) -> VaultResult<Self> {
        if name.is_empty() {
            return Err(VaultError::EmptyName);
        }
        if name.len() > MAX_VAULT_NAME_LENGTH {
            return Err(VaultError::NameTooLong {
                len: name.len(),
                max: MAX_VAULT_NAME_LENGTH,
            });
        }
        if unlock_time <= now {
            return Err(VaultError::InvalidUnlockTime { unlock_time, now });
        }

        Ok(Self {
            name: name.to_string(),
            unlock_time,
            goal_amount,
            balance: 0,
            goal_reached: false,
            emergency_enabled: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unlock_time(&self) -> Timestamp {
        self.unlock_time
    }

    pub fn goal_amount(&self) -> u64 {
        self.goal_amount
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn goal_reached(&self) -> bool {
        self.goal_reached
    }

    pub fn emergency_enabled(&self) -> bool {
        self.emergency_enabled
    }

    /// `true` once the unlock time has passed or the goal was ever reached.
    pub fn is_unlocked(&self, now: Timestamp) -> bool {
        now >= self.unlock_time || self.goal_reached
    }

    pub fn info(&self, owner: Address) -> VaultInfo {
        VaultInfo {
            name: self.name.clone(),
            unlock_time: self.unlock_time,
            goal_amount: self.goal_amount,
            owner,
            balance: self.balance,
            goal_reached: self.goal_reached,
            emergency_enabled: self.emergency_enabled,
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Adds `amount` to the balance and returns the new balance.
    ///
    /// # Errors
    ///
    /// - [`VaultError::ZeroAmount`] if `amount == 0`.
    /// - [`VaultError::AmountOverflow`] if the balance would exceed `u64::MAX`.
    pub fn deposit(&mut self, amount: u64) -> VaultResult<u64> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let new_balance = self
            .balance
            .checked_add(amount)
            .ok_or(VaultError::AmountOverflow)?;

        self.balance = new_balance;
        if self.goal_amount > 0 && new_balance >= self.goal_amount {
            self.goal_reached = true;
        }
        Ok(new_balance)
    }

    /// Debits `amount` and pays it to `owner`. Returns the new balance.
    ///
    /// Checks run in a fixed order: lock state, then zero amount, then
    /// balance. The caller has already authenticated the owner.
    ///
    /// # Errors
    ///
    /// - [`VaultError::VaultLocked`] before unlock with the goal unmet.
    /// - [`VaultError::ZeroAmount`] if `amount == 0`.
    /// - [`VaultError::InsufficientBalance`] if `amount > balance`.
    /// - [`VaultError::Transfer`] if the payout fails; the balance is
    ///   restored first.
    pub fn withdraw<T: ValueTransfer + ?Sized>(
        &mut self,
        owner: &Address,
        amount: u64,
        now: Timestamp,
        transfer: &mut T,
    ) -> VaultResult<u64> {
        if !self.is_unlocked(now) {
            return Err(VaultError::VaultLocked {
                unlock_time: self.unlock_time,
                now,
            });
        }
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if amount > self.balance {
            return Err(VaultError::InsufficientBalance {
                balance: self.balance,
                requested: amount,
            });
        }

        let before = self.clone();
        self.balance -= amount;

        if let Err(err) = transfer.transfer(owner, amount) {
            *self = before;
            return Err(err.into());
        }
        Ok(self.balance)
    }

    /// Arms the emergency exit. Idempotent.
    pub fn enable_emergency(&mut self) {
        self.emergency_enabled = true;
    }

    /// Drains the whole balance: `penalty_bps` of it to `fee_recipient`,
    /// the rest to `owner`.
    ///
    /// The penalty is rounded down, so `penalty + payout` always equals the
    /// balance at call time. Draining an empty vault succeeds with a zero
    /// split. Zero-value legs are not sent.
    ///
    /// # Errors
    ///
    /// - [`VaultError::EmergencyNotEnabled`] unless the exit was armed.
    /// - [`VaultError::Transfer`] if either payment fails; neither is made
    ///   and the balance is restored.
    pub fn emergency_exit<T: ValueTransfer + ?Sized>(
        &mut self,
        owner: &Address,
        fee_recipient: &Address,
        penalty_bps: u16,
        transfer: &mut T,
    ) -> VaultResult<EmergencySplit> {
        if !self.emergency_enabled {
            return Err(VaultError::EmergencyNotEnabled);
        }

        let drained = self.balance;
        let penalty = apply_bps(drained, penalty_bps);
        let payout = drained - penalty;

        let before = self.clone();
        self.balance = 0;

        let payments: Vec<(Address, u64)> = [(*fee_recipient, penalty), (*owner, payout)]
            .into_iter()
            .filter(|(_, amount)| *amount > 0)
            .collect();

        if !payments.is_empty() {
            if let Err(err) = transfer.transfer_batch(&payments) {
                *self = before;
                return Err(err.into());
            }
        }

        Ok(EmergencySplit { penalty, payout })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
