//! Escrow transaction types for Trato
//!
//! An escrow transaction holds a buyer's payment in custody while the seller
//! fulfils the sale. Status changes only along the enumerated transition
//! edges, and the attached conversation log is append-only.

use crate::{EscrowId, MessageId, ProductId, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dispute window applied when a purchase does not specify one
pub const DEFAULT_WINDOW_HOURS: i64 = 72;

/// Status of an escrow transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscrowStatus {
    /// Payment held in custody, awaiting fulfilment
    Held,
    /// Seller asserted shipment (tracking code recorded)
    Shipped,
    /// Buyer confirmed receipt
    Delivered,
    /// Custody transferred to the seller
    Released,
    /// A participant opened a dispute
    Disputed,
    /// Administratively abandoned
    Abandoned,
    /// Cancelled before completion
    Cancelled,
}

impl EscrowStatus {
    /// Check if this is a terminal state (no participant-driven edges out)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Abandoned | Self::Cancelled)
    }

    /// Check whether the transition graph contains an edge to `next`
    pub fn can_become(&self, next: EscrowStatus) -> bool {
        use EscrowStatus::*;
        matches!(
            (*self, next),
            (Held, Shipped)
                | (Held, Delivered)
                | (Shipped, Delivered)
                | (Delivered, Released)
                | (Held | Shipped | Delivered, Disputed)
                | (Held | Shipped | Delivered, Abandoned)
                | (Held | Shipped | Delivered | Disputed, Cancelled)
        )
    }
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Held => "held",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Released => "released",
            Self::Disputed => "disputed",
            Self::Abandoned => "abandoned",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

/// Author of an escrow conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageAuthor {
    /// The bound buyer
    Buyer,
    /// The bound seller
    Seller,
    /// Appended by the engine on a state transition
    System,
}

/// A single message in an escrow conversation
///
/// Messages are append-only: never edited, never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowMessage {
    /// Unique message ID
    pub id: MessageId,
    /// Who wrote the message
    pub author: MessageAuthor,
    /// Message body
    pub text: String,
    /// When the message was appended
    pub at: DateTime<Utc>,
}

impl EscrowMessage {
    /// Create a participant message
    pub fn new(author: MessageAuthor, text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::new(),
            author,
            text: text.into(),
            at,
        }
    }

    /// Create a system message (transition audit trail)
    pub fn system(text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(MessageAuthor::System, text, at)
    }
}

/// Role of an identity relative to a transaction, derived by comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The bound buyer
    Buyer,
    /// The bound seller
    Seller,
    /// Neither bound party
    Viewer,
}

/// Time left in the dispute window, floored at zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remaining {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Remaining {
    /// An elapsed window
    pub const ZERO: Remaining = Remaining {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    /// Compute the remaining window at `now`; never negative
    pub fn until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let secs = (deadline - now).num_seconds().max(0);
        Self {
            hours: secs / 3600,
            minutes: (secs % 3600) / 60,
            seconds: secs % 60,
        }
    }

    /// Check if the window has fully elapsed
    pub fn is_expired(&self) -> bool {
        *self == Self::ZERO
    }
}

/// An escrow transaction: custody of funds for one sale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTransaction {
    /// Unique transaction code
    pub id: EscrowId,
    /// Product being sold
    pub product: ProductId,
    /// Listing title
    pub title: String,
    /// Buyer identity, optional until bound
    pub buyer: Option<UserId>,
    /// Seller identity, optional until bound
    pub seller: Option<UserId>,
    /// Current status
    pub status: EscrowStatus,
    /// Shipment tracking code, present only once shipped
    pub tracking: Option<String>,
    /// Creation timestamp (immutable)
    pub created_at: DateTime<Utc>,
    /// After this instant the buyer's normal dispute path is past deadline
    pub dispute_deadline: DateTime<Utc>,
    /// Append-only conversation log
    pub messages: Vec<EscrowMessage>,
}

impl EscrowTransaction {
    /// Derive the role of an identity for this transaction
    pub fn role_of(&self, user: &UserId) -> Role {
        if self.buyer.as_ref() == Some(user) {
            Role::Buyer
        } else if self.seller.as_ref() == Some(user) {
            Role::Seller
        } else {
            Role::Viewer
        }
    }

    /// Time left in the dispute window at `now`
    pub fn remaining_window(&self, now: DateTime<Utc>) -> Remaining {
        Remaining::until(self.dispute_deadline, now)
    }

    /// Check if the transaction is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Parameters for creating an escrow transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEscrow {
    /// Product being sold
    pub product: ProductId,
    /// Listing title
    pub title: String,
    /// Buyer identity, if known at purchase time
    pub buyer: Option<UserId>,
    /// Seller identity, if known at purchase time
    pub seller: Option<UserId>,
    /// Dispute window length in hours
    pub window_hours: i64,
}

impl CreateEscrow {
    /// Create purchase parameters with the default dispute window
    pub fn new(product: ProductId, title: impl Into<String>) -> Self {
        Self {
            product,
            title: title.into(),
            buyer: None,
            seller: None,
            window_hours: DEFAULT_WINDOW_HOURS,
        }
    }

    /// Bind the buyer at creation
    pub fn with_buyer(mut self, buyer: UserId) -> Self {
        self.buyer = Some(buyer);
        self
    }

    /// Bind the seller at creation
    pub fn with_seller(mut self, seller: UserId) -> Self {
        self.seller = Some(seller);
        self
    }

    /// Override the dispute window length
    pub fn with_window_hours(mut self, hours: i64) -> Self {
        self.window_hours = hours;
        self
    }

    /// Materialize the transaction record at `now`
    pub fn build(self, now: DateTime<Utc>) -> EscrowTransaction {
        EscrowTransaction {
            id: EscrowId::new(),
            product: self.product,
            title: self.title,
            buyer: self.buyer,
            seller: self.seller,
            status: EscrowStatus::Held,
            tracking: None,
            created_at: now,
            dispute_deadline: now + Duration::hours(self.window_hours),
            messages: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(EscrowStatus::Released.is_terminal());
        assert!(EscrowStatus::Abandoned.is_terminal());
        assert!(EscrowStatus::Cancelled.is_terminal());
        assert!(!EscrowStatus::Held.is_terminal());
        assert!(!EscrowStatus::Disputed.is_terminal());
    }

    #[test]
    fn test_transition_graph() {
        use EscrowStatus::*;

        assert!(Held.can_become(Shipped));
        assert!(Held.can_become(Delivered)); // buyer may skip shipment ack
        assert!(Shipped.can_become(Delivered));
        assert!(Delivered.can_become(Released));
        assert!(Disputed.can_become(Cancelled));

        assert!(!Held.can_become(Released));
        assert!(!Shipped.can_become(Shipped));
        assert!(!Released.can_become(Disputed));
        assert!(!Cancelled.can_become(Held));
        assert!(!Disputed.can_become(Abandoned));
    }

    #[test]
    fn test_role_derivation() {
        let buyer = UserId::new();
        let seller = UserId::new();
        let stranger = UserId::new();

        let tx = CreateEscrow::new(ProductId::new(), "Cámara digital")
            .with_buyer(buyer.clone())
            .with_seller(seller.clone())
            .build(Utc::now());

        assert_eq!(tx.role_of(&buyer), Role::Buyer);
        assert_eq!(tx.role_of(&seller), Role::Seller);
        assert_eq!(tx.role_of(&stranger), Role::Viewer);
    }

    #[test]
    fn test_remaining_floors_at_zero() {
        let now = Utc::now();
        let tx = CreateEscrow::new(ProductId::new(), "Bicicleta")
            .with_window_hours(1)
            .build(now);

        let r = tx.remaining_window(now + Duration::seconds(1));
        assert_eq!(r.hours, 0);
        assert_eq!(r.minutes, 59);
        assert_eq!(r.seconds, 59);

        let past = tx.remaining_window(now + Duration::minutes(61));
        assert_eq!(past, Remaining::ZERO);
        assert!(past.is_expired());
    }

    #[test]
    fn test_build_sets_deadline() {
        let now = Utc::now();
        let tx = CreateEscrow::new(ProductId::new(), "Silla").build(now);
        assert_eq!(tx.status, EscrowStatus::Held);
        assert_eq!(tx.dispute_deadline, now + Duration::hours(DEFAULT_WINDOW_HOURS));
        assert!(tx.tracking.is_none());
        assert!(tx.messages.is_empty());
    }
}
