//! Trato Escrow - The escrow transaction engine
//!
//! The engine holds a buyer's payment in logical custody and coordinates
//! the state transitions between buyer and seller under a bounded dispute
//! window:
//!
//! ```text
//! held ──confirm_shipment──> shipped ──confirm_delivery──> delivered ──release_funds──> released
//!   └───────────confirm_delivery (buyer skip)──────────────────^
//! held|shipped|delivered ──open_dispute──> disputed
//! held|shipped|delivered ──mark_abandoned──> abandoned
//! any non-terminal ──cancel_escrow──> cancelled
//! ```
//!
//! # Invariants
//!
//! 1. Status mutates only along the edges above; racing mutations are
//!    serialized and the loser observes `InvalidTransition`
//! 2. Every mutation is persisted per-record before subscribers are notified
//! 3. The conversation log is append-only
//! 4. Role-gated operations verify the acting identity against the bound party

pub mod clock;
pub mod events;
pub mod persist;
pub mod store;

mod seed;

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::EscrowEvent;
pub use persist::{EscrowRepository, MemoryRepository, SledRepository};
pub use store::{EscrowStore, ListFilter};
