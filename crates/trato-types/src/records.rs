//! Peer ledger records for Trato
//!
//! Payments, coupon redemptions, and event tickets are independent record
//! stores with minimal lifecycles of their own. The unified transaction
//! ledger projects over them without the stores knowing about each other.

use crate::{CouponId, PaymentId, TicketId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Cash,
    Transfer,
}

/// Lifecycle status of a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Authorized, not yet settled
    Pending,
    /// Settled with the merchant
    Completed,
    /// Rejected or reversed
    Failed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// A monetary payment record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Unique payment ID
    pub id: PaymentId,
    /// What was paid for
    pub concept: String,
    /// Merchant that received the payment
    pub merchant: String,
    /// Amount paid
    pub amount: Decimal,
    /// Payment method
    pub method: PaymentMethod,
    /// Current status
    pub status: PaymentStatus,
    /// When the payment happened
    pub date: DateTime<Utc>,
}

/// Lifecycle status of a coupon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponStatus {
    /// Redeemable
    Active,
    /// Spent at the merchant
    Redeemed,
    /// Past its validity window
    Expired,
}

impl fmt::Display for CouponStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Active => "active",
            Self::Redeemed => "redeemed",
            Self::Expired => "expired",
        };
        write!(f, "{}", name)
    }
}

/// A coupon redemption record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponRecord {
    /// Unique coupon ID
    pub id: CouponId,
    /// Offer title
    pub title: String,
    /// Merchant honoring the coupon
    pub merchant: String,
    /// Face value of the discount
    pub value: Decimal,
    /// Current status
    pub status: CouponStatus,
    /// When the coupon was acquired
    pub date: DateTime<Utc>,
    /// Last instant the coupon is redeemable
    pub expires_at: DateTime<Utc>,
}

/// Lifecycle status of an event ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Event has not happened yet
    Upcoming,
    /// Scanned at the venue
    Used,
    /// Event passed without use
    Expired,
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Upcoming => "upcoming",
            Self::Used => "used",
            Self::Expired => "expired",
        };
        write!(f, "{}", name)
    }
}

/// An event ticket record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    /// Unique ticket ID
    pub id: TicketId,
    /// Event name
    pub event_name: String,
    /// Where the event takes place
    pub venue: String,
    /// Price paid for the ticket
    pub price: Decimal,
    /// Current status
    pub status: TicketStatus,
    /// When the event takes place
    pub date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_display() {
        assert_eq!(PaymentStatus::Completed.to_string(), "completed");
        assert_eq!(CouponStatus::Redeemed.to_string(), "redeemed");
        assert_eq!(TicketStatus::Upcoming.to_string(), "upcoming");
    }

    #[test]
    fn test_payment_serialization() {
        let payment = PaymentRecord {
            id: PaymentId::new(),
            concept: "Suscripción mensual".to_string(),
            merchant: "MercadoSur".to_string(),
            amount: dec!(149.90),
            method: PaymentMethod::Card,
            status: PaymentStatus::Completed,
            date: Utc::now(),
        };

        let json = serde_json::to_string(&payment).unwrap();
        let back: PaymentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payment);
    }
}
