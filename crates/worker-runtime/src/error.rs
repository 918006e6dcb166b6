use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Bus(#[from] message_bus::BusError),

    #[error(transparent)]
    Rpc(#[from] rpc::RpcError),

    #[error("failed to install shutdown signal handler: {0}")]
    Signal(#[from] std::io::Error),
}
