use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Bus(#[from] message_bus::BusError),

    #[error(transparent)]
    Storage(#[from] object_storage::ObjectStorageError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
