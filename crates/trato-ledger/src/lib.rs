//! Trato Ledger - The unified transaction ledger
//!
//! A read-side aggregation layer that projects records from the escrow
//! store and the peer record stores (payments, coupons, event tickets)
//! into one normalized, filterable, sortable, exportable stream.
//!
//! The ledger holds no state of its own: every query recomputes the
//! projection from fresh snapshots of the four sources, so it can never
//! present stale data relative to a just-completed escrow transition.

pub mod coupons;
pub mod export;
pub mod payments;
pub mod query;
pub mod tickets;

pub use coupons::CouponLedger;
pub use export::export_csv;
pub use payments::PaymentLedger;
pub use query::{LedgerQuery, SortDirection, SortKey, UnifiedLedger};
pub use tickets::TicketLedger;
