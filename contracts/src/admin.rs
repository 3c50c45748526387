//! Administration shared by the registry and the shared ledger: one owner
//! identity and the protocol fee it controls.

use serde::{Deserialize, Serialize};
use timevault_protocol::config::MAX_PROTOCOL_FEE_BPS;
use timevault_protocol::Address;

use crate::error::{VaultError, VaultResult};
use crate::events::VaultEvent;

/// Owner identity and protocol fee of a registry or ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    owner: Address,
    protocol_fee_bps: u16,
}

impl Admin {
    pub fn new(owner: Address, protocol_fee_bps: u16) -> Self {
        Self {
            owner,
            protocol_fee_bps,
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn protocol_fee_bps(&self) -> u16 {
        self.protocol_fee_bps
    }

    /// # Errors
    ///
    /// Returns [`VaultError::NotOwner`] unless `caller` is the owner.
    pub fn ensure_owner(&self, caller: &Address) -> VaultResult<()> {
        if *caller != self.owner {
            return Err(VaultError::NotOwner { caller: *caller });
        }
        Ok(())
    }

    /// Replaces the protocol fee. Accepts `0..=MAX_PROTOCOL_FEE_BPS`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NotOwner`] unless `caller` is the owner.
    /// - [`VaultError::FeeTooHigh`] above the ceiling.
    pub fn set_protocol_fee(
        &mut self,
        caller: &Address,
        new_fee_bps: u16,
    ) -> VaultResult<VaultEvent> {
        self.ensure_owner(caller)?;
        if new_fee_bps > MAX_PROTOCOL_FEE_BPS {
            return Err(VaultError::FeeTooHigh {
                fee_bps: new_fee_bps,
                max_bps: MAX_PROTOCOL_FEE_BPS,
            });
        }

        let old_fee_bps = std::mem::replace(&mut self.protocol_fee_bps, new_fee_bps);
        Ok(VaultEvent::ProtocolFeeUpdated {
            old_fee_bps,
            new_fee_bps,
        })
    }

    /// Hands administration to `new_owner` immediately. There is no
    /// acceptance step.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NotOwner`] unless `caller` is the owner.
    /// - [`VaultError::ZeroAddress`] if `new_owner` is the zero address.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> VaultResult<VaultEvent> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(VaultError::ZeroAddress);
        }

        let previous_owner = std::mem::replace(&mut self.owner, new_owner);
        Ok(VaultEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Admin {
        Admin::new(Address::from_low_u8(1), 50)
    }

    #[test]
    fn fee_boundaries() {
        let mut a = admin();
        let owner = a.owner();
        assert!(a.set_protocol_fee(&owner, 0).is_ok());
        assert!(a.set_protocol_fee(&owner, MAX_PROTOCOL_FEE_BPS).is_ok());
        assert_eq!(
            a.set_protocol_fee(&owner, MAX_PROTOCOL_FEE_BPS + 1),
            Err(VaultError::FeeTooHigh {
                fee_bps: 1_001,
                max_bps: 1_000
            })
        );
        assert_eq!(a.protocol_fee_bps(), MAX_PROTOCOL_FEE_BPS);
    }

    #[test]
    fn owner_check_precedes_fee_check() {
        let mut a = admin();
        let stranger = Address::from_low_u8(2);
        assert_eq!(
            a.set_protocol_fee(&stranger, 5_000),
            Err(VaultError::NotOwner { caller: stranger })
        );
    }

    #[test]
    fn transfer_ownership_is_immediate() {
        let mut a = admin();
        let old = a.owner();
        let new = Address::from_low_u8(7);
        let event = a.transfer_ownership(&old, new).unwrap();
        assert_eq!(
            event,
            VaultEvent::OwnershipTransferred {
                previous_owner: old,
                new_owner: new
            }
        );
        assert_eq!(a.owner(), new);
        assert!(a.set_protocol_fee(&old, 10).is_err());
    }

    #[test]
    fn transfer_to_zero_rejected() {
        let mut a = admin();
        let owner = a.owner();
        assert_eq!(
            a.transfer_ownership(&owner, Address::ZERO),
            Err(VaultError::ZeroAddress)
        );
        assert_eq!(a.owner(), owner);
    }
}
