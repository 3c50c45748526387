// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Engine Host State
//!
//! Everything the node mutates lives in one [`Engine`]: the vault registry,
//! the shared vault ledger, and the settlement ledger that stands in for
//! the value-transfer primitive. The API wraps it in a single
//! `tokio::sync::RwLock`, so every mutation runs to completion (committed
//! or rejected) before the next one starts.
//!
//! After each committed mutation the node writes all three snapshots and the
//! emitted events through a [`CommitLog`] in one atomic commit. [`VaultDb`]
//! is the production log.

use serde::{Deserialize, Serialize};
use timevault_contracts::{EngineConfig, MultiVaultLedger, Registry, VaultEvent};
use timevault_protocol::storage::{DbResult, SnapshotBatch, VaultDb};
use timevault_protocol::SettlementLedger;

const REGISTRY_SNAPSHOT: &str = "registry";
const LEDGER_SNAPSHOT: &str = "ledger";
const SETTLEMENT_SNAPSHOT: &str = "settlement";

/// A journaled event together with its sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedEvent {
    pub sequence: u64,
    pub event: VaultEvent,
}

/// Durable sink for committed operations.
pub trait CommitLog: Send + Sync {
    /// Atomically replaces every snapshot in `snapshots` and journals
    /// `events`. Returns the sequence number of the last journaled event.
    fn commit(&self, snapshots: &SnapshotBatch, events: &[VaultEvent]) -> DbResult<u64>;

    /// Sequence number of the last journaled event.
    fn event_head(&self) -> DbResult<u64>;
}

impl CommitLog for VaultDb {
    fn commit(&self, snapshots: &SnapshotBatch, events: &[VaultEvent]) -> DbResult<u64> {
        VaultDb::commit(self, snapshots, events)
    }

    fn event_head(&self) -> DbResult<u64> {
        VaultDb::event_head(self)
    }
}

/// All mutable node state.
#[derive(Debug, Clone)]
pub struct Engine {
    pub registry: Registry,
    pub ledger: MultiVaultLedger,
    pub settlement: SettlementLedger,
}

impl Engine {
    /// A fresh engine built from `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            registry: Registry::new(config.registry()),
            ledger: MultiVaultLedger::new(config.ledger()),
            settlement: SettlementLedger::new(),
        }
    }

    /// Restores the engine from `db`, falling back to a fresh engine for any
    /// snapshot that has never been written.
    pub fn restore(db: &VaultDb, config: &EngineConfig) -> DbResult<Self> {
        let registry = db.get_snapshot::<Registry>(REGISTRY_SNAPSHOT)?;
        let ledger = db.get_snapshot::<MultiVaultLedger>(LEDGER_SNAPSHOT)?;
        let settlement = db.get_snapshot::<SettlementLedger>(SETTLEMENT_SNAPSHOT)?;

        if registry.is_some() || ledger.is_some() {
            tracing::info!(
                event_head = db.event_head()?,
                "restored engine from snapshot; stored settings take precedence over flags"
            );
        }

        Ok(Self {
            registry: registry.unwrap_or_else(|| Registry::new(config.registry())),
            ledger: ledger.unwrap_or_else(|| MultiVaultLedger::new(config.ledger())),
            settlement: settlement.unwrap_or_default(),
        })
    }

    /// Drains the events both shapes committed since the last call.
    pub fn take_events(&mut self) -> Vec<VaultEvent> {
        let mut events = self.registry.take_events();
        events.extend(self.ledger.take_events());
        events
    }

    /// Writes every snapshot and journals `events` in one commit. Returns
    /// the events with their assigned sequence numbers.
    pub fn persist(
        &self,
        log: &dyn CommitLog,
        events: Vec<VaultEvent>,
    ) -> DbResult<Vec<SequencedEvent>> {
        let snapshots = SnapshotBatch::new()
            .put(REGISTRY_SNAPSHOT, &self.registry)?
            .put(LEDGER_SNAPSHOT, &self.ledger)?
            .put(SETTLEMENT_SNAPSHOT, &self.settlement)?;
        let head = log.commit(&snapshots, &events)?;

        let first = (head + 1).saturating_sub(events.len() as u64);
        Ok(events
            .into_iter()
            .zip(first..)
            .map(|(event, sequence)| SequencedEvent { sequence, event })
            .collect())
    }

    /// Total value held across both shapes.
    pub fn value_locked(&self) -> u64 {
        self.registry
            .value_locked()
            .saturating_add(self.ledger.value_locked())
    }
}
