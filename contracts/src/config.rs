//! # Engine Configuration
//!
//! Two behaviors differ between the registry and the shared ledger and are
//! configured explicitly rather than unified:
//!
//! - **Fee policy.** A registry vault captures the protocol fee when it is
//!   created; a shared-ledger record reads the ledger's fee at the moment it
//!   is needed. Either shape can be switched to the other policy.
//! - **Emergency penalty.** By default the penalty rate *is* the effective
//!   protocol fee of the vault. A deployment can instead set a separate,
//!   fixed emergency rate.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use timevault_protocol::config::{DEFAULT_PROTOCOL_FEE_BPS, MAX_PENALTY_BPS, MAX_PROTOCOL_FEE_BPS};
use timevault_protocol::Address;

/// Invalid engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must not be the zero address")]
    ZeroAddress(&'static str),

    #[error("protocol fee {0} bps exceeds the maximum of {MAX_PROTOCOL_FEE_BPS} bps")]
    FeeTooHigh(u16),

    #[error("emergency penalty {0} bps exceeds {MAX_PENALTY_BPS} bps")]
    PenaltyTooHigh(u16),
}

/// When a vault learns the protocol fee rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeePolicy {
    /// The fee in force at creation is stored with the vault and never
    /// changes afterwards.
    #[default]
    CapturedAtCreation,
    /// The current administrator fee is read on every use.
    Live,
}

/// How the emergency-exit penalty rate is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyPolicy {
    /// Penalty rate equals the vault's effective protocol fee.
    #[default]
    ProtocolFee,
    /// A dedicated emergency rate in basis points, independent of the fee.
    Fixed(u16),
}

impl PenaltyPolicy {
    /// The penalty rate for a vault whose effective protocol fee is
    /// `protocol_fee_bps`.
    pub fn rate_bps(&self, protocol_fee_bps: u16) -> u16 {
        match self {
            PenaltyPolicy::ProtocolFee => protocol_fee_bps,
            PenaltyPolicy::Fixed(bps) => *bps,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            PenaltyPolicy::Fixed(bps) if *bps > MAX_PENALTY_BPS => {
                Err(ConfigError::PenaltyTooHigh(*bps))
            }
            _ => Ok(()),
        }
    }
}

/// Settings for a [`Registry`](crate::vault_factory::Registry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// The registry's own identity, mixed into derived vault addresses.
    pub address: Address,
    /// Initial registry administrator.
    pub owner: Address,
    /// Initial protocol fee.
    pub protocol_fee_bps: u16,
    pub fee_policy: FeePolicy,
    pub penalty: PenaltyPolicy,
}

impl RegistryConfig {
    /// Defaults for everything except the identities.
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            protocol_fee_bps: DEFAULT_PROTOCOL_FEE_BPS,
            fee_policy: FeePolicy::CapturedAtCreation,
            penalty: PenaltyPolicy::ProtocolFee,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner.is_zero() {
            return Err(ConfigError::ZeroAddress("registry owner"));
        }
        if self.protocol_fee_bps > MAX_PROTOCOL_FEE_BPS {
            return Err(ConfigError::FeeTooHigh(self.protocol_fee_bps));
        }
        self.penalty.validate()
    }
}

/// Settings for a [`MultiVaultLedger`](crate::multi_vault::MultiVaultLedger).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Initial ledger administrator.
    pub owner: Address,
    /// Receives every protocol fee and emergency penalty.
    pub fee_recipient: Address,
    pub protocol_fee_bps: u16,
    pub fee_policy: FeePolicy,
    pub penalty: PenaltyPolicy,
}

impl LedgerConfig {
    pub fn new(owner: Address, fee_recipient: Address) -> Self {
        Self {
            owner,
            fee_recipient,
            protocol_fee_bps: DEFAULT_PROTOCOL_FEE_BPS,
            fee_policy: FeePolicy::Live,
            penalty: PenaltyPolicy::ProtocolFee,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner.is_zero() {
            return Err(ConfigError::ZeroAddress("ledger owner"));
        }
        if self.fee_recipient.is_zero() {
            return Err(ConfigError::ZeroAddress("fee recipient"));
        }
        if self.protocol_fee_bps > MAX_PROTOCOL_FEE_BPS {
            return Err(ConfigError::FeeTooHigh(self.protocol_fee_bps));
        }
        self.penalty.validate()
    }
}

/// Complete engine configuration as loaded by a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Administrator of both the registry and the shared ledger.
    pub admin: Address,
    /// Identity of the registry.
    pub registry_address: Address,
    /// Fee recipient of the shared ledger.
    pub fee_recipient: Address,
    pub protocol_fee_bps: u16,
    pub registry_fee_policy: FeePolicy,
    pub ledger_fee_policy: FeePolicy,
    pub penalty: PenaltyPolicy,
}

impl EngineConfig {
    /// Default policies: captured fees for the registry, live fees for the
    /// shared ledger, penalty equal to the protocol fee.
    pub fn new(admin: Address, registry_address: Address, fee_recipient: Address) -> Self {
        Self {
            admin,
            registry_address,
            fee_recipient,
            protocol_fee_bps: DEFAULT_PROTOCOL_FEE_BPS,
            registry_fee_policy: FeePolicy::CapturedAtCreation,
            ledger_fee_policy: FeePolicy::Live,
            penalty: PenaltyPolicy::ProtocolFee,
        }
    }

    pub fn registry(&self) -> RegistryConfig {
        RegistryConfig {
            address: self.registry_address,
            owner: self.admin,
            protocol_fee_bps: self.protocol_fee_bps,
            fee_policy: self.registry_fee_policy,
            penalty: self.penalty,
        }
    }

    pub fn ledger(&self) -> LedgerConfig {
        LedgerConfig {
            owner: self.admin,
            fee_recipient: self.fee_recipient,
            protocol_fee_bps: self.protocol_fee_bps,
            fee_policy: self.ledger_fee_policy,
            penalty: self.penalty,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.registry().validate()?;
        self.ledger().validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_low_u8(n)
    }

    #[test]
    fn defaults_differ_per_shape() {
        let config = EngineConfig::new(addr(1), addr(2), addr(3));
        assert_eq!(config.registry().fee_policy, FeePolicy::CapturedAtCreation);
        assert_eq!(config.ledger().fee_policy, FeePolicy::Live);
        assert_eq!(config.protocol_fee_bps, DEFAULT_PROTOCOL_FEE_BPS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn penalty_rate_follows_policy() {
        assert_eq!(PenaltyPolicy::ProtocolFee.rate_bps(75), 75);
        assert_eq!(PenaltyPolicy::Fixed(1_000).rate_bps(75), 1_000);
    }

    #[test]
    fn zero_fee_recipient_rejected() {
        let config = EngineConfig::new(addr(1), addr(2), Address::ZERO);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroAddress("fee recipient"))
        );
    }

    #[test]
    fn fee_above_ceiling_rejected() {
        let mut config = EngineConfig::new(addr(1), addr(2), addr(3));
        config.protocol_fee_bps = MAX_PROTOCOL_FEE_BPS + 1;
        assert_eq!(
            config.validate(),
            Err(ConfigError::FeeTooHigh(MAX_PROTOCOL_FEE_BPS + 1))
        );
    }

    #[test]
    fn oversized_penalty_rejected() {
        let mut config = EngineConfig::new(addr(1), addr(2), addr(3));
        config.penalty = PenaltyPolicy::Fixed(10_001);
        assert_eq!(config.validate(), Err(ConfigError::PenaltyTooHigh(10_001)));
    }

    #[test]
    fn policies_serialize_snake_case() {
        let json = serde_json::to_string(&FeePolicy::CapturedAtCreation).unwrap();
        assert_eq!(json, "\"captured_at_creation\"");
        let json = serde_json::to_string(&PenaltyPolicy::Fixed(500)).unwrap();
        assert_eq!(json, "{\"fixed\":500}");
    }
}
