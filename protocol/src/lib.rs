// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # TimeVault Protocol Primitives
//!
//! The building blocks every TimeVault component shares. The engine in
//! `timevault-contracts` is written against these types and nothing else,
//! so a host only has to provide what lives here: identities, a clock, a
//! way to move value, and somewhere to persist state.
//!
//! ## Modules
//!
//! - **address**: 20-byte identities and vault address derivation.
//! - **clock**: Unix-second timestamps and non-decreasing clocks.
//! - **config**: Protocol constants: fee bounds, basis points, name limits.
//! - **transfer**: The irreversible value-transfer primitive and an
//!   in-process settlement ledger implementing it.
//! - **storage**: sled-backed snapshots and event journal.

pub mod address;
pub mod clock;
pub mod config;
pub mod storage;
pub mod transfer;

pub use address::{derive_vault_address, Address, AddressError};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use transfer::{SettlementLedger, TransferError, ValueTransfer};
