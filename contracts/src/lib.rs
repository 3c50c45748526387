//! # TimeVault Engine
//!
//! Time-locked, goal-based vaults. A saver locks value into a vault that
//! opens at a maturity time or as soon as a savings goal is met, whichever
//! comes first, with an owner-armed emergency exit that costs a penalty.
//!
//! - **Vault state machine** ([`vault_state`]): deposit, withdraw, and
//!   emergency-exit rules, written once.
//! - **Time vault** ([`time_vault`]): one addressable vault per owner call.
//! - **Registry** ([`vault_factory`]): creates and indexes time vaults and
//!   administers the protocol fee.
//! - **Multi-vault ledger** ([`multi_vault`]): every vault as a record in
//!   one shared, owner-keyed ledger.
//! - **Vault book** ([`book`]): the interface both shapes implement.
//!
//! ## Design Principles
//!
//! 1. Every operation checks all preconditions before touching state, and
//!    calls the value transfer last. A failed transfer restores the vault.
//! 2. All balance arithmetic is checked. Penalties are computed in `u128`
//!    and rounded down, so `penalty + payout` is exactly the drained balance.
//! 3. Events are recorded only for committed operations.
//! 4. Every stored type is serializable so a host can snapshot and restore
//!    the engine.

pub mod admin;
pub mod book;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod multi_vault;
pub mod time_vault;
pub mod vault_factory;
pub mod vault_state;

pub use book::VaultBook;
pub use config::{EngineConfig, FeePolicy, LedgerConfig, PenaltyPolicy, RegistryConfig};
pub use context::CallContext;
pub use error::{VaultError, VaultResult};
pub use events::{VaultEvent, VaultKey};
pub use multi_vault::{MultiVaultLedger, VaultCategory, VaultRecord};
pub use time_vault::TimeVault;
pub use vault_factory::Registry;
pub use vault_state::{EmergencySplit, VaultInfo, VaultState};
