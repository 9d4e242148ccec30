//! Event ticket record store

use std::sync::Arc;

use tokio::sync::RwLock;
use trato_types::{Result, SourceKind, TicketId, TicketRecord, TicketStatus, TratoError};

/// Store of event ticket records
#[derive(Clone, Default)]
pub struct TicketLedger {
    records: Arc<RwLock<Vec<TicketRecord>>>,
}

impl TicketLedger {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a purchased ticket
    pub async fn add(&self, record: TicketRecord) {
        self.records.write().await.push(record);
    }

    /// Defensive copies of all records
    pub async fn list(&self) -> Vec<TicketRecord> {
        self.records.read().await.clone()
    }

    /// Mark an upcoming ticket as scanned at the venue
    pub async fn mark_used(&self, id: &TicketId) -> Result<TicketRecord> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| TratoError::RecordNotFound {
                kind: SourceKind::Ticket,
                id: id.to_string(),
            })?;
        if record.status != TicketStatus::Upcoming {
            return Err(TratoError::InvalidStatusChange {
                kind: SourceKind::Ticket,
                id: id.to_string(),
                from: record.status.to_string(),
            });
        }
        record.status = TicketStatus::Used;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_mark_used_once() {
        let ledger = TicketLedger::new();
        let ticket = TicketRecord {
            id: TicketId::new(),
            event_name: "Feria del libro".to_string(),
            venue: "Centro de convenciones".to_string(),
            price: dec!(180.00),
            status: TicketStatus::Upcoming,
            date: Utc::now() + Duration::days(3),
        };
        ledger.add(ticket.clone()).await;

        let used = ledger.mark_used(&ticket.id).await.unwrap();
        assert_eq!(used.status, TicketStatus::Used);

        let err = ledger.mark_used(&ticket.id).await.unwrap_err();
        assert!(matches!(err, TratoError::InvalidStatusChange { .. }));
    }
}
