//! Durable-connection broker client used by the RPC layer and the worker
//! runtime: named queues, default-exchange direct routing, manual-ack
//! consumption with requeue-on-failure.

pub mod connection;
pub mod consume;
pub mod error;
pub mod publish;
pub mod queue;

pub use connection::BusConnection;
pub use consume::{ack, nack_requeue, ManualAckConsumer, NoAckConsumer};
pub use error::BusError;
pub use publish::{publish, PublishOptions};
pub use queue::{declare_durable_queue, declare_reply_queue};

pub use lapin::message::Delivery;
