//! Durable storage for escrow transactions
//!
//! Records are persisted individually, keyed by transaction id, so each
//! mutation costs one bounded write instead of rewriting the whole
//! collection. The embedded [`SledRepository`] is the production backend;
//! [`MemoryRepository`] backs tests and can simulate write failures.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use trato_types::{EscrowTransaction, Result, TratoError};

const ESCROW_TREE: &str = "trato:escrows";

/// Storage backend for the escrow store
#[async_trait]
pub trait EscrowRepository: Send + Sync {
    /// Load every persisted record, sorted by creation time descending
    async fn load_all(&self) -> Result<Vec<EscrowTransaction>>;

    /// Write one record (insert or overwrite by id)
    async fn save(&self, record: &EscrowTransaction) -> Result<()>;
}

fn sort_newest_first(records: &mut [EscrowTransaction]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

// ── Sled backend ─────────────────────────────────────────────────────────────

/// Embedded sled KV store, one JSON-serialized record per key
pub struct SledRepository {
    _db: sled::Db,
    tree: sled::Tree,
}

impl SledRepository {
    /// Open (or create) a repository at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path).map_err(|e| TratoError::persistence(e.to_string()))?;
        Self::with_db(db)
    }

    /// Open an ephemeral repository backed by a temporary database
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| TratoError::persistence(e.to_string()))?;
        Self::with_db(db)
    }

    fn with_db(db: sled::Db) -> Result<Self> {
        let tree = db
            .open_tree(ESCROW_TREE)
            .map_err(|e| TratoError::persistence(e.to_string()))?;
        Ok(Self { _db: db, tree })
    }
}

#[async_trait]
impl EscrowRepository for SledRepository {
    async fn load_all(&self) -> Result<Vec<EscrowTransaction>> {
        let mut records = Vec::new();
        for item in self.tree.iter() {
            let (_, value) = item.map_err(|e| TratoError::persistence(e.to_string()))?;
            let record: EscrowTransaction = serde_json::from_slice(&value)
                .map_err(|e| TratoError::persistence(e.to_string()))?;
            records.push(record);
        }
        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn save(&self, record: &EscrowTransaction) -> Result<()> {
        let key = record.id.to_prefixed_string();
        let value =
            serde_json::to_vec(record).map_err(|e| TratoError::persistence(e.to_string()))?;
        self.tree
            .insert(key.as_bytes(), value)
            .map_err(|e| TratoError::persistence(e.to_string()))?;
        self.tree
            .flush()
            .map_err(|e| TratoError::persistence(e.to_string()))?;
        Ok(())
    }
}

// ── In-memory backend ────────────────────────────────────────────────────────

/// In-memory repository for tests
///
/// `fail_saves(true)` makes every subsequent write fail, which is how the
/// store's dirty-state path is exercised.
#[derive(Default)]
pub struct MemoryRepository {
    records: RwLock<HashMap<String, EscrowTransaction>>,
    fail_saves: AtomicBool,
}

impl MemoryRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated write failures
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EscrowRepository for MemoryRepository {
    async fn load_all(&self) -> Result<Vec<EscrowTransaction>> {
        let records = self.records.read().await;
        let mut all: Vec<_> = records.values().cloned().collect();
        sort_newest_first(&mut all);
        Ok(all)
    }

    async fn save(&self, record: &EscrowTransaction) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(TratoError::persistence("simulated write failure"));
        }
        let mut records = self.records.write().await;
        records.insert(record.id.to_prefixed_string(), record.clone());
        Ok(())
    }
}
