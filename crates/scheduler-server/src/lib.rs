//! The scheduler process: loads configuration, recovers from a previous
//! crash, and serves the broker RPCs, the log intake queues, and the REST
//! facade off one shared [`Scheduler`].

pub mod config;
pub mod http;
pub mod rpc_servers;

pub use config::Settings;
