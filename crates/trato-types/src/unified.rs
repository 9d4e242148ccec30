//! Unified transaction projection for Trato
//!
//! A `UnifiedTransaction` is a read-only projection, not a stored entity:
//! every field is derived at query time from exactly one source record, so
//! the aggregated view can never fall out of sync with its sources.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which record store a unified transaction was projected from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Monetary payment
    Payment,
    /// Escrow transaction
    Escrow,
    /// Coupon redemption
    Coupon,
    /// Event ticket
    Ticket,
}

impl SourceKind {
    /// All source kinds, in presentation order
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Payment,
        SourceKind::Escrow,
        SourceKind::Coupon,
        SourceKind::Ticket,
    ];

    /// Localized label used on export surfaces
    pub fn label(&self) -> &'static str {
        match self {
            Self::Payment => "Pago",
            Self::Escrow => "Compra protegida",
            Self::Coupon => "Cupón",
            Self::Ticket => "Evento",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Payment => "payment",
            Self::Escrow => "escrow",
            Self::Coupon => "coupon",
            Self::Ticket => "ticket",
        };
        write!(f, "{}", name)
    }
}

/// A record projected into the unified transaction ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedTransaction {
    /// Source record type
    pub source: SourceKind,
    /// Source record ID in prefixed string form
    pub id: String,
    /// Human-facing title of the record
    pub title: String,
    /// Reference date of the record
    pub date: DateTime<Utc>,
    /// Amount, when the source carries one (escrow does not)
    pub amount: Option<Decimal>,
    /// Raw status string of the source entity
    pub status: String,
    /// Source-specific key/value bag
    pub meta: serde_json::Value,
}

impl UnifiedTransaction {
    /// Synthesized lowercase haystack for free-text matching: the record's
    /// id, title, and every string value in the meta bag.
    pub fn haystack(&self) -> String {
        let mut parts = vec![self.id.to_lowercase(), self.title.to_lowercase()];
        if let serde_json::Value::Object(map) = &self.meta {
            for value in map.values() {
                if let serde_json::Value::String(s) = value {
                    parts.push(s.to_lowercase());
                }
            }
        }
        parts.join(" ")
    }
}
