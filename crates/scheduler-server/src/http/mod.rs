//! The REST facade: a thin, operator-facing read/write surface over the
//! same [`Scheduler`] the broker-driven RPCs use.

mod handlers;
mod routes;

pub use routes::build_router;
