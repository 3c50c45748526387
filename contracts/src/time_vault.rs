//! # Time Vault
//!
//! One independently addressable vault, owned by the identity that created
//! it through the [`Registry`](crate::vault_factory::Registry). The owner is
//! the only identity allowed to touch it:
//!
//! 1. **Deposit**: value attached to the call is added to the balance.
//!    A bare transfer with no operation is treated the same way.
//! 2. **Withdraw**: once unlocked by time or by goal, any amount up to the
//!    balance.
//! 3. **Emergency exit**: after arming it, drain the whole balance minus a
//!    penalty, regardless of the lock.
//!
//! A vault is never destroyed. Once emptied it stays addressable with a
//! zero balance.

use serde::{Deserialize, Serialize};
use timevault_protocol::{Address, Timestamp, ValueTransfer};

use crate::context::CallContext;
use crate::error::{VaultError, VaultResult};
use crate::events::{VaultEvent, VaultKey};
use crate::vault_state::{VaultInfo, VaultState};

/// A single-owner vault instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeVault {
    address: Address,
    owner: Address,
    /// Fee in force when the vault was created.
    protocol_fee_bps: u16,
    created_at: Timestamp,
    state: VaultState,
}

impl TimeVault {
    /// Creates an empty vault owned by `ctx.caller`.
    ///
    /// Attached value is ignored here; the registry forwards it as a
    /// separate deposit once the vault exists.
    ///
    /// # Errors
    ///
    /// Any creation error from [`VaultState::open`].
    pub fn create(
        address: Address,
        ctx: &CallContext,
        name: &str,
        unlock_time: Timestamp,
        goal_amount: u64,
        protocol_fee_bps: u16,
    ) -> VaultResult<Self> {
        let state = VaultState::open(name, unlock_time, goal_amount, ctx.now)?;
        Ok(Self {
            address,
            owner: ctx.caller,
            protocol_fee_bps,
            created_at: ctx.now,
            state,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn protocol_fee_bps(&self) -> u16 {
        self.protocol_fee_bps
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn state(&self) -> &VaultState {
        &self.state
    }

    pub fn balance(&self) -> u64 {
        self.state.balance()
    }

    pub fn key(&self) -> VaultKey {
        VaultKey::Instance(self.address)
    }

    pub fn info(&self) -> VaultInfo {
        self.state.info(self.owner)
    }

    fn ensure_owner(&self, ctx: &CallContext) -> VaultResult<()> {
        if ctx.caller != self.owner {
            return Err(VaultError::NotOwner { caller: ctx.caller });
        }
        Ok(())
    }

    /// Adds the value attached to the call.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotOwner`], then [`VaultError::ZeroAmount`] or
    /// [`VaultError::AmountOverflow`].
    pub fn deposit(&mut self, ctx: &CallContext) -> VaultResult<VaultEvent> {
        self.ensure_owner(ctx)?;
        let new_balance = self.state.deposit(ctx.value)?;
        Ok(VaultEvent::VaultDeposit {
            vault: self.key(),
            amount: ctx.value,
            new_balance,
        })
    }

    /// Pays `amount` to the owner.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotOwner`], [`VaultError::UnexpectedValue`], then the
    /// lock and amount checks of [`VaultState::withdraw`].
    pub fn withdraw<T: ValueTransfer + ?Sized>(
        &mut self,
        ctx: &CallContext,
        amount: u64,
        transfer: &mut T,
    ) -> VaultResult<VaultEvent> {
        self.ensure_owner(ctx)?;
        ctx.ensure_no_value()?;
        let new_balance = self.state.withdraw(&self.owner, amount, ctx.now, transfer)?;
        Ok(VaultEvent::VaultWithdrawal {
            vault: self.key(),
            amount,
            new_balance,
        })
    }

    /// Arms the emergency exit.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotOwner`] or [`VaultError::UnexpectedValue`].
    pub fn enable_emergency_withdrawal(&mut self, ctx: &CallContext) -> VaultResult<VaultEvent> {
        self.ensure_owner(ctx)?;
        ctx.ensure_no_value()?;
        self.state.enable_emergency();
        Ok(VaultEvent::EmergencyWithdrawalEnabled { vault: self.key() })
    }

    /// Drains the vault, sending `penalty_bps` of the balance to
    /// `fee_recipient` and the rest to the owner.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotOwner`], [`VaultError::UnexpectedValue`],
    /// [`VaultError::EmergencyNotEnabled`], or [`VaultError::Transfer`].
    pub fn emergency_withdraw<T: ValueTransfer + ?Sized>(
        &mut self,
        ctx: &CallContext,
        penalty_bps: u16,
        fee_recipient: &Address,
        transfer: &mut T,
    ) -> VaultResult<VaultEvent> {
        self.ensure_owner(ctx)?;
        ctx.ensure_no_value()?;
        let split = self
            .state
            .emergency_exit(&self.owner, fee_recipient, penalty_bps, transfer)?;
        Ok(VaultEvent::EmergencyWithdrawal {
            vault: self.key(),
            penalty: split.penalty,
            payout: split.payout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timevault_protocol::SettlementLedger;

    const NOW: Timestamp = 1_000;

    fn owner() -> Address {
        Address::from_low_u8(1)
    }

    fn vault() -> TimeVault {
        let ctx = CallContext::new(owner(), NOW);
        TimeVault::create(Address::from_low_u8(50), &ctx, "Car", NOW + 100, 0, 50).unwrap()
    }

    #[test]
    fn create_binds_caller_as_owner() {
        let v = vault();
        assert_eq!(v.owner(), owner());
        assert_eq!(v.created_at(), NOW);
        assert_eq!(v.protocol_fee_bps(), 50);
        assert_eq!(v.balance(), 0);
    }

    #[test]
    fn deposit_uses_attached_value() {
        let mut v = vault();
        let ctx = CallContext::new(owner(), NOW).with_value(300);
        let event = v.deposit(&ctx).unwrap();
        assert_eq!(
            event,
            VaultEvent::VaultDeposit {
                vault: v.key(),
                amount: 300,
                new_balance: 300
            }
        );
    }

    #[test]
    fn stranger_rejected_before_anything_else() {
        let mut v = vault();
        let mut ledger = SettlementLedger::new();
        let stranger = CallContext::new(Address::from_low_u8(2), NOW);
        let not_owner = VaultError::NotOwner {
            caller: stranger.caller,
        };
        assert_eq!(v.deposit(&stranger), Err(not_owner.clone()));
        assert_eq!(v.withdraw(&stranger, 0, &mut ledger), Err(not_owner.clone()));
        assert_eq!(v.enable_emergency_withdrawal(&stranger), Err(not_owner.clone()));
        assert_eq!(
            v.emergency_withdraw(&stranger, 50, &owner(), &mut ledger),
            Err(not_owner)
        );
    }

    #[test]
    fn withdraw_rejects_attached_value() {
        let mut v = vault();
        let mut ledger = SettlementLedger::new();
        let ctx = CallContext::new(owner(), NOW + 100).with_value(1);
        assert_eq!(
            v.withdraw(&ctx, 1, &mut ledger),
            Err(VaultError::UnexpectedValue { attached: 1 })
        );
    }

    #[test]
    fn unlock_by_time() {
        let mut v = vault();
        let mut ledger = SettlementLedger::new();
        v.deposit(&CallContext::new(owner(), NOW).with_value(10)).unwrap();

        let early = CallContext::new(owner(), NOW + 99);
        assert!(matches!(
            v.withdraw(&early, 10, &mut ledger),
            Err(VaultError::VaultLocked { .. })
        ));

        let on_time = CallContext::new(owner(), NOW + 100);
        v.withdraw(&on_time, 10, &mut ledger).unwrap();
        assert_eq!(ledger.credited(&owner()), 10);
    }
}
