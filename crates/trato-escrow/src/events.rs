//! Change events emitted by the escrow store
//!
//! Every successful mutation broadcasts one event after the durable write
//! completes. Events carry id/status context for logging and dashboards;
//! consumers are expected to re-query the store rather than apply diffs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trato_types::{EscrowId, MessageAuthor};

/// Events broadcast on every successful escrow mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EscrowEvent {
    /// A purchase created a new transaction in custody
    Created {
        escrow_id: EscrowId,
        title: String,
        at: DateTime<Utc>,
    },

    /// Seller asserted shipment
    ShipmentConfirmed {
        escrow_id: EscrowId,
        tracking: String,
        at: DateTime<Utc>,
    },

    /// Buyer confirmed receipt
    DeliveryConfirmed {
        escrow_id: EscrowId,
        at: DateTime<Utc>,
    },

    /// Custody transferred to the seller
    FundsReleased {
        escrow_id: EscrowId,
        at: DateTime<Utc>,
    },

    /// A participant opened a dispute
    DisputeOpened {
        escrow_id: EscrowId,
        at: DateTime<Utc>,
    },

    /// Administratively abandoned
    Abandoned {
        escrow_id: EscrowId,
        at: DateTime<Utc>,
    },

    /// Cancelled before completion
    Cancelled {
        escrow_id: EscrowId,
        at: DateTime<Utc>,
    },

    /// A message was appended to the conversation
    MessageAppended {
        escrow_id: EscrowId,
        author: MessageAuthor,
        at: DateTime<Utc>,
    },
}

impl EscrowEvent {
    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Created { at, .. } => *at,
            Self::ShipmentConfirmed { at, .. } => *at,
            Self::DeliveryConfirmed { at, .. } => *at,
            Self::FundsReleased { at, .. } => *at,
            Self::DisputeOpened { at, .. } => *at,
            Self::Abandoned { at, .. } => *at,
            Self::Cancelled { at, .. } => *at,
            Self::MessageAppended { at, .. } => *at,
        }
    }

    /// The transaction this event concerns
    pub fn escrow_id(&self) -> &EscrowId {
        match self {
            Self::Created { escrow_id, .. } => escrow_id,
            Self::ShipmentConfirmed { escrow_id, .. } => escrow_id,
            Self::DeliveryConfirmed { escrow_id, .. } => escrow_id,
            Self::FundsReleased { escrow_id, .. } => escrow_id,
            Self::DisputeOpened { escrow_id, .. } => escrow_id,
            Self::Abandoned { escrow_id, .. } => escrow_id,
            Self::Cancelled { escrow_id, .. } => escrow_id,
            Self::MessageAppended { escrow_id, .. } => escrow_id,
        }
    }

    /// Get a short description for logging
    pub fn summary(&self) -> String {
        match self {
            Self::Created { escrow_id, title, .. } => {
                format!("Escrow {} created: {}", escrow_id, title)
            }
            Self::ShipmentConfirmed { escrow_id, tracking, .. } => {
                format!("Escrow {} shipped ({})", escrow_id, tracking)
            }
            Self::DeliveryConfirmed { escrow_id, .. } => {
                format!("Escrow {} delivered", escrow_id)
            }
            Self::FundsReleased { escrow_id, .. } => {
                format!("Escrow {} released", escrow_id)
            }
            Self::DisputeOpened { escrow_id, .. } => {
                format!("Escrow {} disputed", escrow_id)
            }
            Self::Abandoned { escrow_id, .. } => {
                format!("Escrow {} abandoned", escrow_id)
            }
            Self::Cancelled { escrow_id, .. } => {
                format!("Escrow {} cancelled", escrow_id)
            }
            Self::MessageAppended { escrow_id, author, .. } => {
                format!("Escrow {} message from {:?}", escrow_id, author)
            }
        }
    }
}
