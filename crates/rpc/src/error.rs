use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("bus error: {0}")]
    Bus(#[from] message_bus::BusError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("rpc call timed out")]
    Timeout,

    #[error("reply channel dropped before a reply arrived")]
    ReplyDropped,
}
