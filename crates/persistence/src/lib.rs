//! The embedded SQLite store backing the scheduler: job digests, stages,
//! tags, and the append-only log tables, plus the conditional `UPDATE`s
//! that arbitrate claims and result delivery.

pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::{AbortOutcome, DigestSort, DispatchNext, FocusOutcome, Store, UpdateOutcome};
