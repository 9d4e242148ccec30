//! Payment record store
//!
//! Independent read-only source for the unified ledger, with its own
//! minimal lifecycle: a payment is recorded `pending` and settles to
//! `completed` or `failed`.

use std::sync::Arc;

use tokio::sync::RwLock;
use trato_types::{PaymentId, PaymentRecord, PaymentStatus, Result, SourceKind, TratoError};

/// Store of monetary payment records
#[derive(Clone, Default)]
pub struct PaymentLedger {
    records: Arc<RwLock<Vec<PaymentRecord>>>,
}

impl PaymentLedger {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a payment
    pub async fn add(&self, record: PaymentRecord) {
        self.records.write().await.push(record);
    }

    /// Defensive copies of all records
    pub async fn list(&self) -> Vec<PaymentRecord> {
        self.records.read().await.clone()
    }

    /// Settle a pending payment
    pub async fn mark_completed(&self, id: &PaymentId) -> Result<PaymentRecord> {
        self.advance(id, PaymentStatus::Completed).await
    }

    /// Reject a pending payment
    pub async fn mark_failed(&self, id: &PaymentId) -> Result<PaymentRecord> {
        self.advance(id, PaymentStatus::Failed).await
    }

    async fn advance(&self, id: &PaymentId, to: PaymentStatus) -> Result<PaymentRecord> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| TratoError::RecordNotFound {
                kind: SourceKind::Payment,
                id: id.to_string(),
            })?;
        if record.status != PaymentStatus::Pending {
            return Err(TratoError::InvalidStatusChange {
                kind: SourceKind::Payment,
                id: id.to_string(),
                from: record.status.to_string(),
            });
        }
        record.status = to;
        Ok(record.clone())
    }
}
