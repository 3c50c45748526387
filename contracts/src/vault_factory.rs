//! # Vault Registry
//!
//! Creates [`TimeVault`] instances and indexes them. The registry is the
//! only way a vault comes into existence: creation validates the request,
//! derives a fresh vault address, binds the vault to its creator, and
//! appends it to both the global list and the creator's list in one step.
//!
//! ## Identity
//!
//! A vault's address is derived from the registry address, the creator,
//! and the number of vaults created so far (see
//! [`derive_vault_address`]). Addresses are therefore deterministic and
//! never reused.
//!
//! ## Fees
//!
//! Under [`FeePolicy::CapturedAtCreation`] each vault keeps the fee that was
//! in force when it was created and later fee changes do not affect it.
//! Under [`FeePolicy::Live`] the registry's current fee is used instead.
//! Emergency penalties are paid to whoever owns the registry at the time of
//! the exit.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use timevault_protocol::{derive_vault_address, Address, Timestamp, ValueTransfer};

use crate::admin::Admin;
use crate::config::{FeePolicy, PenaltyPolicy, RegistryConfig};
use crate::context::CallContext;
use crate::error::{VaultError, VaultResult};
use crate::events::{EventLog, VaultEvent};
use crate::time_vault::TimeVault;
use crate::vault_state::VaultInfo;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Factory and index of every vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    address: Address,
    admin: Admin,
    fee_policy: FeePolicy,
    penalty: PenaltyPolicy,
    total_vaults: u64,
    all_vaults: Vec<Address>,
    vaults_by_owner: HashMap<Address, Vec<Address>>,
    vaults: HashMap<Address, TimeVault>,
    #[serde(skip)]
    events: EventLog,
}

impl Registry {
    /// Creates an empty registry. The configuration is assumed valid; see
    /// [`RegistryConfig::validate`].
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            address: config.address,
            admin: Admin::new(config.owner, config.protocol_fee_bps),
            fee_policy: config.fee_policy,
            penalty: config.penalty,
            total_vaults: 0,
            all_vaults: Vec::new(),
            vaults_by_owner: HashMap::new(),
            vaults: HashMap::new(),
            events: EventLog::new(),
        }
    }

    // -- Creation -----------------------------------------------------------

    /// Creates a vault owned by `ctx.caller` and returns its address.
    ///
    /// Value attached to the call becomes the vault's first deposit, in the
    /// same step.
    ///
    /// # Errors
    ///
    /// [`VaultError::EmptyName`], [`VaultError::NameTooLong`], or
    /// [`VaultError::InvalidUnlockTime`]. On failure nothing is created and
    /// no counter moves.
    pub fn create_vault(
        &mut self,
        ctx: &CallContext,
        name: &str,
        unlock_time: Timestamp,
        goal_amount: u64,
    ) -> VaultResult<Address> {
        let address = derive_vault_address(&self.address, &ctx.caller, self.total_vaults);
        let total_vaults = self
            .total_vaults
            .checked_add(1)
            .ok_or(VaultError::AmountOverflow)?;

        let mut vault = TimeVault::create(
            address,
            ctx,
            name,
            unlock_time,
            goal_amount,
            self.admin.protocol_fee_bps(),
        )?;

        let mut events = vec![VaultEvent::VaultCreated {
            creator: ctx.caller,
            vault: vault.key(),
            name: name.to_string(),
            unlock_time,
            goal_amount,
        }];
        if ctx.value > 0 {
            events.push(vault.deposit(ctx)?);
        }

        self.total_vaults = total_vaults;
        self.all_vaults.push(address);
        self.vaults_by_owner
            .entry(ctx.caller)
            .or_default()
            .push(address);
        self.vaults.insert(address, vault);
        self.events.extend(events);

        tracing::info!(
            vault = %address,
            creator = %ctx.caller,
            unlock_time,
            goal_amount,
            initial_deposit = ctx.value,
            "vault created"
        );
        Ok(address)
    }

    // -- Vault operations ---------------------------------------------------

    fn vault_mut(&mut self, address: &Address) -> VaultResult<&mut TimeVault> {
        self.vaults
            .get_mut(address)
            .ok_or(VaultError::UnknownVault(*address))
    }

    /// Deposits the value attached to the call into the vault at `vault`.
    ///
    /// # Errors
    ///
    /// [`VaultError::UnknownVault`], [`VaultError::NotOwner`],
    /// [`VaultError::ZeroAmount`], or [`VaultError::AmountOverflow`].
    pub fn deposit(&mut self, ctx: &CallContext, vault: &Address) -> VaultResult<VaultEvent> {
        let event = self.vault_mut(vault)?.deposit(ctx)?;
        tracing::info!(vault = %vault, amount = ctx.value, "deposit");
        Ok(self.commit(event))
    }

    /// A bare value transfer to a vault. Same rules as [`deposit`](Self::deposit).
    pub fn receive(&mut self, ctx: &CallContext, vault: &Address) -> VaultResult<VaultEvent> {
        self.deposit(ctx, vault)
    }

    /// Pays `amount` from the vault to its owner.
    ///
    /// # Errors
    ///
    /// [`VaultError::UnknownVault`], then the vault's own checks in the
    /// order NotOwner, VaultLocked, ZeroAmount, InsufficientBalance.
    pub fn withdraw<T: ValueTransfer + ?Sized>(
        &mut self,
        ctx: &CallContext,
        vault: &Address,
        amount: u64,
        transfer: &mut T,
    ) -> VaultResult<VaultEvent> {
        let event = self.vault_mut(vault)?.withdraw(ctx, amount, transfer)?;
        tracing::info!(vault = %vault, amount, "withdrawal");
        Ok(self.commit(event))
    }

    /// Arms the emergency exit of the vault at `vault`.
    pub fn enable_emergency_withdrawal(
        &mut self,
        ctx: &CallContext,
        vault: &Address,
    ) -> VaultResult<VaultEvent> {
        let event = self.vault_mut(vault)?.enable_emergency_withdrawal(ctx)?;
        tracing::info!(vault = %vault, "emergency withdrawal enabled");
        Ok(self.commit(event))
    }

    /// Drains the vault through its emergency exit. The penalty goes to the
    /// current registry owner.
    ///
    /// # Errors
    ///
    /// [`VaultError::UnknownVault`], [`VaultError::NotOwner`],
    /// [`VaultError::EmergencyNotEnabled`], or [`VaultError::Transfer`].
    pub fn emergency_withdraw<T: ValueTransfer + ?Sized>(
        &mut self,
        ctx: &CallContext,
        vault: &Address,
        transfer: &mut T,
    ) -> VaultResult<VaultEvent> {
        let live_fee = self.admin.protocol_fee_bps();
        let fee_recipient = self.admin.owner();
        let fee_policy = self.fee_policy;
        let penalty_policy = self.penalty;

        let target = self.vault_mut(vault)?;
        let fee_bps = match fee_policy {
            FeePolicy::CapturedAtCreation => target.protocol_fee_bps(),
            FeePolicy::Live => live_fee,
        };
        let penalty_bps = penalty_policy.rate_bps(fee_bps);

        let event = target.emergency_withdraw(ctx, penalty_bps, &fee_recipient, transfer)?;
        tracing::info!(
            vault = %vault,
            penalty_bps,
            recipient = %fee_recipient,
            "emergency withdrawal"
        );
        Ok(self.commit(event))
    }

    fn commit(&mut self, event: VaultEvent) -> VaultEvent {
        self.events.push(event.clone());
        event
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
        tracing::info!(new_fee_bps, "registry protocol fee updated");
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
        tracing::info!(new_owner = %new_owner, "registry ownership transferred");
        Ok(self.commit(event))
    }

    // -- Reads --------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.admin.owner()
    }

    pub fn protocol_fee_bps(&self) -> u16 {
        self.admin.protocol_fee_bps()
    }

    pub fn fee_policy(&self) -> FeePolicy {
        self.fee_policy
    }

    pub fn penalty_policy(&self) -> PenaltyPolicy {
        self.penalty
    }

    pub fn total_vaults(&self) -> u64 {
        self.total_vaults
    }

    /// Every vault ever created, in creation order.
    pub fn get_all_vaults(&self) -> &[Address] {
        &self.all_vaults
    }

    /// Vaults created by `owner`, in creation order. Empty if none.
    pub fn get_user_vaults(&self, owner: &Address) -> &[Address] {
        self.vaults_by_owner
            .get(owner)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_vault(&self, address: &Address) -> bool {
        self.vaults.contains_key(address)
    }

    pub fn vault(&self, address: &Address) -> Option<&TimeVault> {
        self.vaults.get(address)
    }

    /// # Errors
    ///
    /// [`VaultError::UnknownVault`] if `address` is not a vault.
    pub fn vault_info(&self, address: &Address) -> VaultResult<VaultInfo> {
        self.vaults
            .get(address)
            .map(TimeVault::info)
            .ok_or(VaultError::UnknownVault(*address))
    }

    /// Sum of every vault balance, saturating at `u64::MAX`.
    pub fn value_locked(&self) -> u64 {
        self.vaults
            .values()
            .fold(0u64, |acc, v| acc.saturating_add(v.balance()))
    }

    /// Events committed since the last [`take_events`](Self::take_events).
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
