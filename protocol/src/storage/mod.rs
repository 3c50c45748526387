//! # Storage Module
//!
//! Persistence for a TimeVault node. The engine keeps its state in memory;
//! this module makes it survive restarts.
//!
//! ```text
//! db.rs : sled persistence: engine snapshots + append-only event journal
//! ```
//!
//! Bincode for on-disk serialization. JSON is for APIs and debugging;
//! bincode is for storage.

pub mod db;

pub use db::{DbError, DbResult, SnapshotBatch, VaultDb};
