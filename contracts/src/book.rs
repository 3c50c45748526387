//! The operation surface both storage shapes share.
//!
//! [`Registry`] names a vault by its address; [`MultiVaultLedger`] names it
//! by an index into the caller's own sequence. Code written against
//! [`VaultBook`] works with either.

use timevault_protocol::{Address, Timestamp, ValueTransfer};

use crate::context::CallContext;
use crate::error::VaultResult;
use crate::events::VaultEvent;
use crate::multi_vault::{MultiVaultLedger, VaultCategory};
use crate::vault_factory::Registry;
use crate::vault_state::VaultInfo;

/// Vault operations independent of how vaults are stored.
pub trait VaultBook {
    /// How a vault is named in this shape.
    type Handle: Copy;

    fn create_vault(
        &mut self,
        ctx: &CallContext,
        name: &str,
        unlock_time: Timestamp,
        goal_amount: u64,
    ) -> VaultResult<Self::Handle>;

    fn deposit(&mut self, ctx: &CallContext, vault: Self::Handle) -> VaultResult<VaultEvent>;

    fn withdraw(
        &mut self,
        ctx: &CallContext,
        vault: Self::Handle,
        amount: u64,
        transfer: &mut dyn ValueTransfer,
    ) -> VaultResult<VaultEvent>;

    fn enable_emergency_withdrawal(
        &mut self,
        ctx: &CallContext,
        vault: Self::Handle,
    ) -> VaultResult<VaultEvent>;

    fn emergency_withdraw(
        &mut self,
        ctx: &CallContext,
        vault: Self::Handle,
        transfer: &mut dyn ValueTransfer,
    ) -> VaultResult<VaultEvent>;

    /// Reads a vault as seen by `caller`.
    fn vault_info(&self, caller: &Address, vault: Self::Handle) -> VaultResult<VaultInfo>;
}

impl VaultBook for Registry {
    type Handle = Address;

    fn create_vault(
        &mut self,
        ctx: &CallContext,
        name: &str,
        unlock_time: Timestamp,
        goal_amount: u64,
    ) -> VaultResult<Address> {
        Registry::create_vault(self, ctx, name, unlock_time, goal_amount)
    }

    fn deposit(&mut self, ctx: &CallContext, vault: Address) -> VaultResult<VaultEvent> {
        Registry::deposit(self, ctx, &vault)
    }

    fn withdraw(
        &mut self,
        ctx: &CallContext,
        vault: Address,
        amount: u64,
        transfer: &mut dyn ValueTransfer,
    ) -> VaultResult<VaultEvent> {
        Registry::withdraw(self, ctx, &vault, amount, transfer)
    }

    fn enable_emergency_withdrawal(
        &mut self,
        ctx: &CallContext,
        vault: Address,
    ) -> VaultResult<VaultEvent> {
        Registry::enable_emergency_withdrawal(self, ctx, &vault)
    }

    fn emergency_withdraw(
        &mut self,
        ctx: &CallContext,
        vault: Address,
        transfer: &mut dyn ValueTransfer,
    ) -> VaultResult<VaultEvent> {
        Registry::emergency_withdraw(self, ctx, &vault, transfer)
    }

    fn vault_info(&self, _caller: &Address, vault: Address) -> VaultResult<VaultInfo> {
        Registry::vault_info(self, &vault)
    }
}

/// Vaults created through the trait are [`VaultCategory::Personal`].
impl VaultBook for MultiVaultLedger {
    type Handle = usize;

    fn create_vault(
        &mut self,
        ctx: &CallContext,
        name: &str,
        unlock_time: Timestamp,
        goal_amount: u64,
    ) -> VaultResult<usize> {
        MultiVaultLedger::create_vault(
            self,
            ctx,
            name,
            unlock_time,
            goal_amount,
            VaultCategory::Personal,
        )
    }

    fn deposit(&mut self, ctx: &CallContext, vault: usize) -> VaultResult<VaultEvent> {
        MultiVaultLedger::deposit(self, ctx, vault)
    }

    fn withdraw(
        &mut self,
        ctx: &CallContext,
        vault: usize,
        amount: u64,
        transfer: &mut dyn ValueTransfer,
    ) -> VaultResult<VaultEvent> {
        MultiVaultLedger::withdraw(self, ctx, vault, amount, transfer)
    }

    fn enable_emergency_withdrawal(
        &mut self,
        ctx: &CallContext,
        vault: usize,
    ) -> VaultResult<VaultEvent> {
        MultiVaultLedger::enable_emergency_withdrawal(self, ctx, vault)
    }

    fn emergency_withdraw(
        &mut self,
        ctx: &CallContext,
        vault: usize,
        transfer: &mut dyn ValueTransfer,
    ) -> VaultResult<VaultEvent> {
        MultiVaultLedger::emergency_withdraw(self, ctx, vault, transfer)
    }

    fn vault_info(&self, caller: &Address, vault: usize) -> VaultResult<VaultInfo> {
        MultiVaultLedger::vault_info(self, caller, vault)
    }
}
