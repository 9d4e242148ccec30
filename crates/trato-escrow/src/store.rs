//! The escrow store
//!
//! Owns the collection of escrow transactions, enforces the state machine,
//! persists each mutation per-record, and broadcasts change events. The
//! collection lives behind a single writer lock and each mutation runs to
//! completion — validate, mutate, persist, notify — while holding it, so of
//! two racing calls on the same id the first wins and the second observes
//! `InvalidTransition` against the updated state, and durable writes can
//! never land out of order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use trato_types::{
    CreateEscrow, EscrowId, EscrowMessage, EscrowStatus, EscrowTransaction, MessageAuthor,
    Remaining, Result, Role, TratoError, UserId,
};

use crate::clock::Clock;
use crate::events::EscrowEvent;
use crate::persist::EscrowRepository;
use crate::seed;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Filter for [`EscrowStore::list`]
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Only transactions in this status
    pub status: Option<EscrowStatus>,
    /// Only transactions bound to this buyer
    pub buyer: Option<UserId>,
    /// Only transactions bound to this seller
    pub seller: Option<UserId>,
}

/// The escrow transaction store
///
/// Constructed once per process and passed by reference (it is cheap to
/// clone; all state is shared) to collaborators.
#[derive(Clone)]
pub struct EscrowStore {
    records: Arc<RwLock<HashMap<EscrowId, EscrowTransaction>>>,
    dirty: Arc<RwLock<HashSet<EscrowId>>>,
    repo: Arc<dyn EscrowRepository>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<EscrowEvent>,
}

impl EscrowStore {
    /// Open the store over a repository, seeding it on first run
    pub async fn open(repo: Arc<dyn EscrowRepository>, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut loaded = repo.load_all().await?;
        if loaded.is_empty() {
            loaded = seed::seed_transactions(clock.now());
            for record in &loaded {
                repo.save(record).await?;
            }
            tracing::info!(count = loaded.len(), "seeded first-run escrow data");
        }

        let records: HashMap<EscrowId, EscrowTransaction> = loaded
            .into_iter()
            .map(|tx| (tx.id.clone(), tx))
            .collect();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            records: Arc::new(RwLock::new(records)),
            dirty: Arc::new(RwLock::new(HashSet::new())),
            repo,
            clock,
            events,
        })
    }

    /// Subscribe to change events
    ///
    /// A lagging or dropped receiver never affects the store or other
    /// subscribers. Consumers should re-query after being notified.
    pub fn subscribe(&self) -> broadcast::Receiver<EscrowEvent> {
        self.events.subscribe()
    }

    // ── Mutations ────────────────────────────────────────────────────────────

    /// Allocate a new transaction in custody
    pub async fn create_escrow(&self, params: CreateEscrow) -> Result<EscrowTransaction> {
        let tx = params.build(self.clock.now());

        let mut records = self.records.write().await;
        records.insert(tx.id.clone(), tx.clone());

        self.persist(&tx).await;
        tracing::info!(escrow = %tx.id, title = %tx.title, "escrow created");
        self.emit(EscrowEvent::Created {
            escrow_id: tx.id.clone(),
            title: tx.title.clone(),
            at: tx.created_at,
        });
        Ok(tx)
    }

    /// Seller asserts shipment with a tracking code
    pub async fn confirm_shipment(
        &self,
        id: &EscrowId,
        actor: &UserId,
        tracking: &str,
    ) -> Result<EscrowTransaction> {
        let now = self.clock.now();
        let mut records = self.records.write().await;
        let tx = get_mut(&mut records, id)?;
        check_transition(tx, EscrowStatus::Shipped)?;
        bind_or_verify_seller(tx, actor)?;

        tx.status = EscrowStatus::Shipped;
        tx.tracking = Some(tracking.to_string());
        tx.messages.push(EscrowMessage::system(
            format!("Envío confirmado. Guía de rastreo: {}", tracking),
            now,
        ));
        let updated = tx.clone();

        self.persist(&updated).await;
        tracing::info!(escrow = %id, tracking = %tracking, "shipment confirmed");
        self.emit(EscrowEvent::ShipmentConfirmed {
            escrow_id: id.clone(),
            tracking: tracking.to_string(),
            at: now,
        });
        Ok(updated)
    }

    /// Buyer confirms receipt; idempotent once delivered
    ///
    /// The edge from `held` is intentional: a buyer may confirm receipt
    /// before any shipment event was recorded.
    pub async fn confirm_delivery(&self, id: &EscrowId, actor: &UserId) -> Result<EscrowTransaction> {
        let now = self.clock.now();
        let mut records = self.records.write().await;
        let tx = get_mut(&mut records, id)?;

        if tx.status == EscrowStatus::Delivered {
            verify_buyer(tx, actor)?;
            return Ok(tx.clone());
        }
        check_transition(tx, EscrowStatus::Delivered)?;
        bind_or_verify_buyer(tx, actor)?;

        tx.status = EscrowStatus::Delivered;
        tx.messages.push(EscrowMessage::system(
            "Entrega confirmada por el comprador.",
            now,
        ));
        let updated = tx.clone();

        self.persist(&updated).await;
        tracing::info!(escrow = %id, "delivery confirmed");
        self.emit(EscrowEvent::DeliveryConfirmed {
            escrow_id: id.clone(),
            at: now,
        });
        Ok(updated)
    }

    /// Buyer releases custody to the seller
    ///
    /// After this point no state mutation is permitted except message append.
    pub async fn release_funds(&self, id: &EscrowId, actor: &UserId) -> Result<EscrowTransaction> {
        let now = self.clock.now();
        let mut records = self.records.write().await;
        let tx = get_mut(&mut records, id)?;
        check_transition(tx, EscrowStatus::Released)?;
        bind_or_verify_buyer(tx, actor)?;

        tx.status = EscrowStatus::Released;
        tx.messages
            .push(EscrowMessage::system("Fondos liberados al vendedor.", now));
        let updated = tx.clone();

        self.persist(&updated).await;
        tracing::info!(escrow = %id, "funds released");
        self.emit(EscrowEvent::FundsReleased {
            escrow_id: id.clone(),
            at: now,
        });
        Ok(updated)
    }

    /// A bound participant opens a dispute
    ///
    /// Once disputed, participant transitions are rejected until the
    /// administrative edges resolve the transaction.
    pub async fn open_dispute(&self, id: &EscrowId, actor: &UserId) -> Result<EscrowTransaction> {
        let now = self.clock.now();
        let mut records = self.records.write().await;
        let tx = get_mut(&mut records, id)?;
        check_transition(tx, EscrowStatus::Disputed)?;
        verify_participant(tx, actor)?;

        tx.status = EscrowStatus::Disputed;
        tx.messages
            .push(EscrowMessage::system("Disputa abierta.", now));
        let updated = tx.clone();

        self.persist(&updated).await;
        tracing::info!(escrow = %id, "dispute opened");
        self.emit(EscrowEvent::DisputeOpened {
            escrow_id: id.clone(),
            at: now,
        });
        Ok(updated)
    }

    /// Administrative transition to `abandoned`
    pub async fn mark_abandoned(&self, id: &EscrowId) -> Result<EscrowTransaction> {
        let now = self.clock.now();
        let mut records = self.records.write().await;
        let tx = get_mut(&mut records, id)?;
        check_transition(tx, EscrowStatus::Abandoned)?;

        tx.status = EscrowStatus::Abandoned;
        tx.messages
            .push(EscrowMessage::system("Transacción marcada como abandonada.", now));
        let updated = tx.clone();

        self.persist(&updated).await;
        tracing::info!(escrow = %id, "escrow abandoned");
        self.emit(EscrowEvent::Abandoned {
            escrow_id: id.clone(),
            at: now,
        });
        Ok(updated)
    }

    /// Administrative transition to `cancelled`, valid from any non-terminal
    /// state (including `disputed` — this is the adjudication hook)
    pub async fn cancel_escrow(&self, id: &EscrowId) -> Result<EscrowTransaction> {
        let now = self.clock.now();
        let mut records = self.records.write().await;
        let tx = get_mut(&mut records, id)?;
        check_transition(tx, EscrowStatus::Cancelled)?;

        tx.status = EscrowStatus::Cancelled;
        tx.messages
            .push(EscrowMessage::system("Transacción cancelada.", now));
        let updated = tx.clone();

        self.persist(&updated).await;
        tracing::info!(escrow = %id, "escrow cancelled");
        self.emit(EscrowEvent::Cancelled {
            escrow_id: id.clone(),
            at: now,
        });
        Ok(updated)
    }

    /// Append a participant message; permitted in every status
    ///
    /// The conversation must remain possible even around a dispute or after
    /// release.
    pub async fn send_message(
        &self,
        id: &EscrowId,
        actor: &UserId,
        text: &str,
    ) -> Result<EscrowMessage> {
        let now = self.clock.now();
        let mut records = self.records.write().await;
        let tx = get_mut(&mut records, id)?;
        let author = bind_or_verify_author(tx, actor)?;

        let message = EscrowMessage::new(author, text, now);
        tx.messages.push(message.clone());
        let updated = tx.clone();

        self.persist(&updated).await;
        self.emit(EscrowEvent::MessageAppended {
            escrow_id: id.clone(),
            author: message.author,
            at: now,
        });
        Ok(message)
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    /// Defensive copy of one transaction
    pub async fn get(&self, id: &EscrowId) -> Result<EscrowTransaction> {
        let records = self.records.read().await;
        records
            .get(id)
            .cloned()
            .ok_or_else(|| TratoError::NotFound {
                escrow_id: id.to_string(),
            })
    }

    /// Defensive copies of matching transactions, newest first
    pub async fn list(&self, filter: &ListFilter) -> Vec<EscrowTransaction> {
        let records = self.records.read().await;
        let mut matching: Vec<_> = records
            .values()
            .filter(|tx| {
                if let Some(status) = filter.status {
                    if tx.status != status {
                        return false;
                    }
                }
                if let Some(ref buyer) = filter.buyer {
                    if tx.buyer.as_ref() != Some(buyer) {
                        return false;
                    }
                }
                if let Some(ref seller) = filter.seller {
                    if tx.seller.as_ref() != Some(seller) {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching
    }

    /// Time left in the dispute window; pure, never mutates state
    pub async fn remaining(&self, id: &EscrowId) -> Result<Remaining> {
        let records = self.records.read().await;
        let tx = records.get(id).ok_or_else(|| TratoError::NotFound {
            escrow_id: id.to_string(),
        })?;
        Ok(tx.remaining_window(self.clock.now()))
    }

    // ── Durability ───────────────────────────────────────────────────────────

    /// Transactions whose latest state has not reached durable storage
    pub async fn dirty_ids(&self) -> Vec<EscrowId> {
        self.dirty.read().await.iter().cloned().collect()
    }

    /// Check whether any record awaits a retried write
    pub async fn is_dirty(&self) -> bool {
        !self.dirty.read().await.is_empty()
    }

    /// Retry the durable write for every dirty record
    ///
    /// Returns the number flushed; on failure the remaining ids stay dirty
    /// so the caller can retry again.
    pub async fn flush_dirty(&self) -> Result<usize> {
        let ids = self.dirty_ids().await;
        let mut flushed = 0;
        for id in ids {
            // Holding the read guard keeps writers out while this record
            // reaches durable storage
            let records = self.records.read().await;
            if let Some(record) = records.get(&id) {
                self.repo.save(record).await?;
                flushed += 1;
            }
            drop(records);
            self.dirty.write().await.remove(&id);
        }
        Ok(flushed)
    }

    /// Write one record, keeping the in-memory mutation on failure
    async fn persist(&self, record: &EscrowTransaction) {
        match self.repo.save(record).await {
            Ok(()) => {
                self.dirty.write().await.remove(&record.id);
            }
            Err(e) => {
                tracing::warn!(
                    escrow = %record.id,
                    error = %e,
                    "durable write failed; record kept in memory and marked dirty"
                );
                self.dirty.write().await.insert(record.id.clone());
            }
        }
    }

    fn emit(&self, event: EscrowEvent) {
        // Ignore send errors (no receivers)
        let _ = self.events.send(event);
    }
}

// ── Validation helpers ───────────────────────────────────────────────────────

fn get_mut<'a>(
    records: &'a mut HashMap<EscrowId, EscrowTransaction>,
    id: &EscrowId,
) -> Result<&'a mut EscrowTransaction> {
    records.get_mut(id).ok_or_else(|| TratoError::NotFound {
        escrow_id: id.to_string(),
    })
}

fn check_transition(tx: &EscrowTransaction, requested: EscrowStatus) -> Result<()> {
    if tx.status.can_become(requested) {
        Ok(())
    } else {
        Err(TratoError::InvalidTransition {
            escrow_id: tx.id.to_string(),
            from: tx.status,
            requested,
        })
    }
}

fn bind_or_verify_seller(tx: &mut EscrowTransaction, actor: &UserId) -> Result<()> {
    match tx.role_of(actor) {
        Role::Seller => Ok(()),
        Role::Viewer if tx.seller.is_none() => {
            tx.seller = Some(actor.clone());
            Ok(())
        }
        _ => Err(TratoError::unauthorized(
            tx.id.to_string(),
            "only the seller may perform this action",
        )),
    }
}

fn bind_or_verify_buyer(tx: &mut EscrowTransaction, actor: &UserId) -> Result<()> {
    match tx.role_of(actor) {
        Role::Buyer => Ok(()),
        Role::Viewer if tx.buyer.is_none() => {
            tx.buyer = Some(actor.clone());
            Ok(())
        }
        _ => Err(TratoError::unauthorized(
            tx.id.to_string(),
            "only the buyer may perform this action",
        )),
    }
}

fn verify_buyer(tx: &EscrowTransaction, actor: &UserId) -> Result<()> {
    match tx.role_of(actor) {
        Role::Buyer => Ok(()),
        _ => Err(TratoError::unauthorized(
            tx.id.to_string(),
            "only the buyer may perform this action",
        )),
    }
}

fn verify_participant(tx: &mut EscrowTransaction, actor: &UserId) -> Result<()> {
    match tx.role_of(actor) {
        Role::Buyer | Role::Seller => Ok(()),
        // The buyer is the commonly unbound party; bind on first interaction
        Role::Viewer if tx.buyer.is_none() => {
            tx.buyer = Some(actor.clone());
            Ok(())
        }
        Role::Viewer => Err(TratoError::unauthorized(
            tx.id.to_string(),
            "only a bound participant may perform this action",
        )),
    }
}

fn bind_or_verify_author(tx: &mut EscrowTransaction, actor: &UserId) -> Result<MessageAuthor> {
    match tx.role_of(actor) {
        Role::Buyer => Ok(MessageAuthor::Buyer),
        Role::Seller => Ok(MessageAuthor::Seller),
        Role::Viewer if tx.buyer.is_none() => {
            tx.buyer = Some(actor.clone());
            Ok(MessageAuthor::Buyer)
        }
        Role::Viewer => Err(TratoError::unauthorized(
            tx.id.to_string(),
            "only a bound participant may message this conversation",
        )),
    }
}
