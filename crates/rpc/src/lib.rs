//! Request/reply RPC over the message bus.
//!
//! Two roles, both parameterized over a request schema `R` and an optional
//! response schema `S`: [`RpcClient`] calls a named queue and awaits a reply
//! on its own exclusive queue; [`RpcServer`] serves a named queue and replies
//! to each caller's `reply_to`.

pub mod client;
pub mod error;
pub mod server;

pub use client::{RpcClient, DEFAULT_TIMEOUT};
pub use error::RpcError;
pub use server::RpcServer;
