//! # Engine Errors
//!
//! Every failure in the engine is a precondition violation. Each one aborts
//! the whole operation with no state change and surfaces here as a distinct
//! variant; the engine never retries and never degrades.

use thiserror::Error;
use timevault_protocol::{Address, Timestamp, TransferError};

/// Errors returned by vault, registry, and ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// The caller is not the owner of the vault (or of the registry).
    #[error("caller {caller} is not the owner")]
    NotOwner {
        /// The identity that attempted the operation.
        caller: Address,
    },

    /// A deposit or withdrawal of zero.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// The zero address was supplied where a real identity is required.
    #[error("the zero address is not a valid identity")]
    ZeroAddress,

    /// Withdrawal attempted before unlock time with the goal not reached.
    #[error("vault is locked until {unlock_time} (now {now}) and its goal is not reached")]
    VaultLocked {
        /// The vault's unlock timestamp.
        unlock_time: Timestamp,
        /// The time of the attempt.
        now: Timestamp,
    },

    /// Withdrawal of more than the vault holds.
    #[error("insufficient balance: vault holds {balance}, requested {requested}")]
    InsufficientBalance {
        /// Current vault balance.
        balance: u64,
        /// Amount the caller tried to withdraw.
        requested: u64,
    },

    /// Emergency withdrawal attempted before the owner enabled it.
    #[error("emergency withdrawal is not enabled for this vault")]
    EmergencyNotEnabled,

    /// A vault was created with an empty name.
    #[error("vault name must not be empty")]
    EmptyName,

    /// A vault name exceeded the length limit.
    #[error("vault name is {len} bytes, limit is {max}")]
    NameTooLong {
        /// Length of the rejected name in bytes.
        len: usize,
        /// The configured maximum.
        max: usize,
    },

    /// A vault was created with an unlock time that is not in the future.
    #[error("unlock time {unlock_time} must be after the current time {now}")]
    InvalidUnlockTime {
        /// The requested unlock timestamp.
        unlock_time: Timestamp,
        /// The time of the attempt.
        now: Timestamp,
    },

    /// A protocol fee above the 10% ceiling.
    #[error("protocol fee {fee_bps} bps exceeds the maximum of {max_bps} bps")]
    FeeTooHigh {
        /// The rejected fee.
        fee_bps: u16,
        /// The ceiling.
        max_bps: u16,
    },

    /// The address does not name a vault created by this registry.
    #[error("no vault at address {0}")]
    UnknownVault(Address),

    /// A vault index outside the caller's own sequence.
    #[error("vault index {index} out of range: caller has {len} vaults")]
    VaultIndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of vaults the caller owns.
        len: usize,
    },

    /// A balance would exceed `u64::MAX`.
    #[error("amount overflow: operation would exceed u64::MAX")]
    AmountOverflow,

    /// Value was attached to an operation that does not accept any.
    #[error("operation does not accept value, {attached} attached")]
    UnexpectedValue {
        /// The attached value.
        attached: u64,
    },

    /// The host's value transfer refused the payout. Vault state was
    /// restored before this error was returned.
    #[error("value transfer failed: {0}")]
    Transfer(#[from] TransferError),
}

impl VaultError {
    /// Stable, machine-readable name of the failure kind.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::NotOwner { .. } => "NotOwner",
            VaultError::ZeroAmount => "ZeroAmount",
            VaultError::ZeroAddress => "ZeroAddress",
            VaultError::VaultLocked { .. } => "VaultLocked",
            VaultError::InsufficientBalance { .. } => "InsufficientBalance",
            VaultError::EmergencyNotEnabled => "EmergencyNotEnabled",
            VaultError::EmptyName => "EmptyName",
            VaultError::NameTooLong { .. } => "NameTooLong",
            VaultError::InvalidUnlockTime { .. } => "InvalidUnlockTime",
            VaultError::FeeTooHigh { .. } => "FeeTooHigh",
            VaultError::UnknownVault(_) => "UnknownVault",
            VaultError::VaultIndexOutOfRange { .. } => "VaultIndexOutOfRange",
            VaultError::AmountOverflow => "AmountOverflow",
            VaultError::UnexpectedValue { .. } => "UnexpectedValue",
            VaultError::Transfer(_) => "TransferFailed",
        }
    }
}

/// Convenience alias used throughout the engine.
pub type VaultResult<T> = Result<T, VaultError>;
