//! Queue declaration helpers.

use lapin::options::QueueDeclareOptions;
use lapin::types::FieldTable;
use lapin::Channel;

use crate::error::BusError;

/// Declare a durable, named queue (stage queues, RPC server queues).
/// Declaration is idempotent: re-declaring with the same arguments is a no-op.
pub async fn declare_durable_queue(channel: &Channel, name: &str) -> Result<(), BusError> {
    channel
        .queue_declare(
            name,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;
    Ok(())
}

/// Declare a server-named, exclusive, auto-deleted queue. Used for RPC reply
/// queues: one per `RpcClient`, torn down automatically when its channel closes.
pub async fn declare_reply_queue(channel: &Channel) -> Result<String, BusError> {
    let queue = channel
        .queue_declare(
            "",
            QueueDeclareOptions {
                exclusive: true,
                auto_delete: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;
    Ok(queue.name().as_str().to_string())
}
