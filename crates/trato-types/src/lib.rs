//! Trato Types - Canonical domain types for the Trato marketplace escrow platform
//!
//! This crate contains all foundational types for Trato with zero dependencies
//! on other trato crates. It defines the complete type system for:
//!
//! - Identity types (EscrowId, UserId, PaymentId, etc.)
//! - The escrow transaction record and its state machine
//! - Peer ledger records (payments, coupons, event tickets)
//! - The unified transaction projection used by the read-side ledger
//!
//! # Architectural Invariants
//!
//! These types support the core Trato guarantees:
//!
//! 1. Escrow status mutates only along the enumerated transition edges
//! 2. The message log of a transaction is append-only
//! 3. Buyer and seller are bound at most once and never reassigned
//! 4. The unified ledger holds no state of its own — every field of a
//!    projection is derived from exactly one source record at query time

pub mod identity;
pub mod escrow;
pub mod records;
pub mod unified;
pub mod error;

pub use identity::*;
pub use escrow::*;
pub use records::*;
pub use unified::*;
pub use error::*;
