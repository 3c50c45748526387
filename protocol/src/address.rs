//! # Identities
//!
//! Every participant in TimeVault (a saver, the registry administrator, the
//! fee recipient, and every vault created by the registry) is named by a
//! 20-byte [`Address`]. On the wire and in logs it is `0x` followed by 40
//! lowercase hex digits.
//!
//! The all-zero address is reserved: it is never a valid owner or fee
//! recipient, and administrative operations reject it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::config::VAULT_ADDRESS_DOMAIN;

/// Address length in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Errors produced when parsing an address from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The string was not `0x` + 40 hex characters.
    #[error("invalid address length: expected {ADDRESS_LENGTH} bytes, got {0}")]
    InvalidLength(usize),

    /// The string contained non-hex characters.
    #[error("invalid address hex: {0}")]
    InvalidHex(String),
}

/// A 20-byte participant or vault identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The reserved zero address.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Wraps raw bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Returns `true` for the reserved zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }

    /// Builds an address whose last byte is `n` and every other byte is zero.
    ///
    /// Handy for tests and fixtures; `from_low_u8(0)` is the zero address.
    pub const fn from_low_u8(n: u8) -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes[ADDRESS_LENGTH - 1] = n;
        Self(bytes)
    }

    /// Lowercase `0x`-prefixed hex rendering.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parses `0x`-prefixed (or bare) hex.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let array: [u8; ADDRESS_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }
}

/// Derives the address of the `nonce`-th vault created by `registry` on
/// behalf of `creator`.
///
/// `BLAKE3(domain || registry || creator || nonce_be)`, truncated to 20 bytes.
/// The registry passes its vault counter as the nonce, so two creations never
/// collide even for the same creator.
pub fn derive_vault_address(registry: &Address, creator: &Address, nonce: u64) -> Address {
    let mut hasher = blake3::Hasher::new();
    hasher.update(VAULT_ADDRESS_DOMAIN);
    hasher.update(registry.as_bytes());
    hasher.update(creator.as_bytes());
    hasher.update(&nonce.to_be_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; ADDRESS_LENGTH];
    bytes.copy_from_slice(&digest.as_bytes()[..ADDRESS_LENGTH]);
    Address(bytes)
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Address::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            let array: [u8; ADDRESS_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
                serde::de::Error::custom(AddressError::InvalidLength(bytes.len()))
            })?;
            Ok(Address(array))
        }
    }
}
