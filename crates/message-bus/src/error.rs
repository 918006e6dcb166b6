use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("broker error: {0}")]
    Lapin(#[from] lapin::Error),

    #[error("connection closed and not yet reconnected")]
    Disconnected,

    #[error("delivery had no reply_to property, cannot be used for RPC")]
    MissingReplyTo,
}
