//! # VaultDb Persistent Storage
//!
//! The persistence layer for a TimeVault node, built on sled's embedded
//! key-value store. The engine itself is an in-memory state machine; the
//! node snapshots it here after every committed operation and journals the
//! events that operation emitted.
//!
//! ## Tree Layout
//!
//! | Tree        | Key                 | Value                    |
//! |-------------|---------------------|--------------------------|
//! | `snapshots` | name (UTF-8)        | `bincode(T)`             |
//! | `events`    | `seq` (8B BE)       | `bincode(E)`             |
//! | `metadata`  | key (UTF-8)         | value (bytes)            |
//!
//! Event sequence numbers start at 1 and are stored big-endian so that
//! sled's lexicographic ordering matches numeric ordering and range scans
//! return events in the order they were emitted.
//!
//! ## Atomicity
//!
//! [`VaultDb::commit`] writes a [`SnapshotBatch`], a batch of events and the
//! updated head sequence in one sled transaction across all three trees:
//! either the whole commit lands or none of it does. A restart therefore
//! never sees one snapshot from before an operation next to another from
//! after it.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt metadata: {0}")]
    Corrupt(String),
}

impl From<TransactionError<DbError>> for DbError {
    fn from(err: TransactionError<DbError>) -> Self {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => DbError::Sled(e),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

// ---------------------------------------------------------------------------
// Metadata Keys
// ---------------------------------------------------------------------------

/// Well-known key in the `metadata` tree for the last journaled event.
const META_EVENT_HEAD: &[u8] = b"event_head";

fn encode<T: Serialize>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> DbResult<T> {
    bincode::deserialize(bytes).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode_seq(bytes: &[u8]) -> DbResult<u64> {
    let array: [u8; 8] = bytes
        .try_into()
        .map_err(|_| DbError::Corrupt("invalid sequence bytes".to_string()))?;
    Ok(u64::from_be_bytes(array))
}

// ---------------------------------------------------------------------------
// Snapshot Batch
// ---------------------------------------------------------------------------

/// Named snapshots encoded up front, ready to be written in one commit.
#[derive(Debug, Clone, Default)]
pub struct SnapshotBatch {
    entries: Vec<(String, Vec<u8>)>,
}

impl SnapshotBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` under `name`. A later entry with the same name wins.
    pub fn put<T: Serialize>(mut self, name: &str, value: &T) -> DbResult<Self> {
        self.entries.push((name.to_string(), encode(value)?));
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// VaultDb
// ---------------------------------------------------------------------------

/// Persistent storage for engine snapshots and the event journal.
///
/// sled is thread-safe, so `VaultDb` can be shared via `Arc<VaultDb>`.
/// Writers are expected to be serialized by the host; the event head is
/// read and advanced inside a transaction regardless.
#[derive(Debug, Clone)]
pub struct VaultDb {
    db: Db,
    snapshots: Tree,
    events: Tree,
    metadata: Tree,
}

impl VaultDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is removed when dropped.
    ///
    /// Ideal for unit tests: no filesystem side effects, no cleanup needed.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let snapshots = db.open_tree("snapshots")?;
        let events = db.open_tree("events")?;
        let metadata = db.open_tree("metadata")?;

        Ok(Self {
            db,
            snapshots,
            events,
            metadata,
        })
    }

    // -- Snapshots ----------------------------------------------------------

    /// Persist a named snapshot, replacing any previous one.
    pub fn put_snapshot<T: Serialize>(&self, name: &str, value: &T) -> DbResult<()> {
        let bytes = encode(value)?;
        self.snapshots.insert(name.as_bytes(), bytes)?;
        Ok(())
    }

    /// Load a named snapshot. `None` if it was never written.
    pub fn get_snapshot<T: DeserializeOwned>(&self, name: &str) -> DbResult<Option<T>> {
        match self.snapshots.get(name.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    // -- Event journal ------------------------------------------------------

    /// Append events to the journal and return the sequence number of the
    /// last one (or the current head if `events` is empty).
    pub fn append_events<E: Serialize>(&self, events: &[E]) -> DbResult<u64> {
        self.commit(&SnapshotBatch::new(), events)
    }

    /// Writes every snapshot in `snapshots` and appends `events` to the
    /// journal as one transaction. Returns the new head sequence number.
    pub fn commit<E: Serialize>(&self, snapshots: &SnapshotBatch, events: &[E]) -> DbResult<u64> {
        let encoded = events.iter().map(encode).collect::<DbResult<Vec<_>>>()?;

        let head = (&self.snapshots, &self.events, &self.metadata).transaction(
            |(snapshots_tx, events_tx, meta_tx)| {
                for (name, bytes) in &snapshots.entries {
                    snapshots_tx.insert(name.as_bytes(), bytes.as_slice())?;
                }

                let mut seq = match meta_tx.get(META_EVENT_HEAD)? {
                    Some(bytes) => {
                        decode_seq(&bytes).map_err(ConflictableTransactionError::Abort)?
                    }
                    None => 0,
                };
                for bytes in &encoded {
                    seq += 1;
                    events_tx.insert(&seq.to_be_bytes(), bytes.as_slice())?;
                }
                meta_tx.insert(META_EVENT_HEAD, &seq.to_be_bytes())?;
                Ok(seq)
            },
        )?;

        Ok(head)
    }

    /// Every journaled event with sequence number strictly greater than
    /// `after`, in emission order, paired with its sequence number.
    pub fn events_since<E: DeserializeOwned>(&self, after: u64) -> DbResult<Vec<(u64, E)>> {
        let start = after.saturating_add(1).to_be_bytes();
        let mut out = Vec::new();
        for entry in self.events.range(start..) {
            let (key, value) = entry?;
            out.push((decode_seq(&key)?, decode(&value)?));
        }
        Ok(out)
    }

    /// Sequence number of the last journaled event, 0 if the journal is empty.
    pub fn event_head(&self) -> DbResult<u64> {
        match self.metadata.get(META_EVENT_HEAD)? {
            Some(bytes) => decode_seq(&bytes),
            None => Ok(0),
        }
    }

    /// Number of journaled events.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Force a flush of all pending writes to disk.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        balance: u64,
    }

    #[test]
    fn open_temporary_database() {
        let db = VaultDb::open_temporary().expect("should create temp db");
        assert_eq!(db.event_count(), 0);
        assert_eq!(db.event_head().unwrap(), 0);
    }

    #[test]
    fn open_persistent_database_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sample = Sample {
            name: "savings".into(),
            balance: 42,
        };

        {
            let db = VaultDb::open(dir.path()).expect("should open db");
            db.put_snapshot("registry", &sample).unwrap();
            db.append_events(&["created".to_string()]).unwrap();
            db.flush().unwrap();
        }

        let db = VaultDb::open(dir.path()).expect("should reopen db");
        let restored: Sample = db.get_snapshot("registry").unwrap().unwrap();
        assert_eq!(restored, sample);
        assert_eq!(db.event_head().unwrap(), 1);
    }

    #[test]
    fn missing_snapshot_is_none() {
        let db = VaultDb::open_temporary().unwrap();
        let result: Option<Sample> = db.get_snapshot("nothing").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn snapshot_overwrite_replaces_value() {
        let db = VaultDb::open_temporary().unwrap();
        let mut sample = Sample {
            name: "a".into(),
            balance: 1,
        };
        db.put_snapshot("s", &sample).unwrap();
        sample.balance = 2;
        db.put_snapshot("s", &sample).unwrap();
        let restored: Sample = db.get_snapshot("s").unwrap().unwrap();
        assert_eq!(restored.balance, 2);
    }

    #[test]
    fn events_get_sequential_numbers() {
        let db = VaultDb::open_temporary().unwrap();
        let head = db.append_events(&["a", "b"]).unwrap();
        assert_eq!(head, 2);
        let head = db.append_events(&["c"]).unwrap();
        assert_eq!(head, 3);

        let all: Vec<(u64, String)> = db.events_since(0).unwrap();
        let seqs: Vec<u64> = all.iter().map(|(s, _)| *s).collect();
        let names: Vec<&str> = all.iter().map(|(_, e)| e.as_str()).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn events_since_skips_earlier_entries() {
        let db = VaultDb::open_temporary().unwrap();
        db.append_events(&[1u64, 2, 3, 4]).unwrap();
        let tail: Vec<(u64, u64)> = db.events_since(2).unwrap();
        assert_eq!(tail, vec![(3, 3), (4, 4)]);
    }

    #[test]
    fn empty_append_keeps_head() {
        let db = VaultDb::open_temporary().unwrap();
        db.append_events(&[7u64]).unwrap();
        let empty: [u64; 0] = [];
        assert_eq!(db.append_events(&empty).unwrap(), 1);
        assert_eq!(db.event_count(), 1);
    }

    #[test]
    fn commit_writes_snapshots_and_events_together() {
        let db = VaultDb::open_temporary().unwrap();
        let sample = Sample {
            name: "house".into(),
            balance: 9,
        };
        let batch = SnapshotBatch::new()
            .put("registry", &sample)
            .unwrap()
            .put("count", &3u32)
            .unwrap();
        assert_eq!(batch.len(), 2);

        let head = db.commit(&batch, &["deposit", "withdrawal"]).unwrap();
        assert_eq!(head, 2);
        assert_eq!(db.get_snapshot::<Sample>("registry").unwrap(), Some(sample));
        assert_eq!(db.get_snapshot::<u32>("count").unwrap(), Some(3));
        assert_eq!(db.event_count(), 2);
    }

    #[test]
    fn corrupt_head_aborts_whole_commit() {
        let db = VaultDb::open_temporary().unwrap();
        db.metadata.insert(META_EVENT_HEAD, &[1u8, 2, 3][..]).unwrap();

        let batch = SnapshotBatch::new().put("registry", &1u64).unwrap();
        let result = db.commit(&batch, &["lost"]);
        assert!(matches!(result, Err(DbError::Corrupt(_))));
        assert_eq!(db.get_snapshot::<u64>("registry").unwrap(), None);
        assert_eq!(db.event_count(), 0);
    }

    #[test]
    fn flush_does_not_error() {
        let db = VaultDb::open_temporary().unwrap();
        db.put_snapshot("x", &1u8).unwrap();
        assert!(db.flush().is_ok());
    }
}
