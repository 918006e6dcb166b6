//! `RpcClient`: correlation-id request/reply over an exclusive reply queue.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lapin::Channel;
use message_bus::{publish, BusConnection, NoAckConsumer, PublishOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::RpcError;

/// Default timeout recommended for scheduler RPCs (§5).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

type PendingSlots = Arc<Mutex<HashMap<Uuid, oneshot::Sender<Vec<u8>>>>>;

/// A typed RPC client bound to one target queue. `R` is the request schema,
/// `S` the response schema (use `()` for fire-and-forget-style calls that
/// still want a reply, since `()` deserializes from the literal `null` the
/// server sends when no response schema is configured).
pub struct RpcClient<R, S = ()> {
    channel: Channel,
    reply_queue: String,
    target_queue: String,
    pending: PendingSlots,
    _marker: PhantomData<(R, S)>,
}

impl<R, S> RpcClient<R, S>
where
    R: Serialize,
    S: DeserializeOwned + Send + 'static,
{
    pub async fn new(bus: &BusConnection, target_queue: impl Into<String>) -> Result<Self, RpcError> {
        let channel = bus.channel().await?;
        let reply_queue = message_bus::declare_reply_queue(&channel).await?;
        let pending: PendingSlots = Arc::new(Mutex::new(HashMap::new()));

        let reply_channel = bus.channel().await?;
        spawn_reply_reader(reply_channel, reply_queue.clone(), pending.clone());

        Ok(Self {
            channel,
            reply_queue,
            target_queue: target_queue.into(),
            pending,
            _marker: PhantomData,
        })
    }

    pub async fn call(&self, request: &R) -> Result<S, RpcError> {
        self.call_with_timeout(request, DEFAULT_TIMEOUT).await
    }

    pub async fn call_with_timeout(&self, request: &R, timeout: Duration) -> Result<S, RpcError> {
        let correlation_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(correlation_id, tx);

        let payload = serde_json::to_vec(request)?;
        let publish_result = publish(
            &self.channel,
            &self.target_queue,
            &payload,
            PublishOptions {
                correlation_id: Some(correlation_id.to_string()),
                reply_to: Some(self.reply_queue.clone()),
            },
        )
        .await;

        if let Err(err) = publish_result {
            self.pending.lock().unwrap().remove(&correlation_id);
            return Err(err.into());
        }

        let body = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(body)) => body,
            Ok(Err(_)) => return Err(RpcError::ReplyDropped),
            Err(_) => {
                self.pending.lock().unwrap().remove(&correlation_id);
                return Err(RpcError::Timeout);
            }
        };

        Ok(serde_json::from_slice(&body)?)
    }
}

fn spawn_reply_reader(channel: Channel, reply_queue: String, pending: PendingSlots) {
    tokio::spawn(async move {
        let mut consumer = match NoAckConsumer::new(&channel, &reply_queue).await {
            Ok(consumer) => consumer,
            Err(err) => {
                warn!(%err, "failed to start rpc reply consumer");
                return;
            }
        };

        while let Some(delivery) = consumer.next().await {
            let delivery = match delivery {
                Ok(delivery) => delivery,
                Err(err) => {
                    warn!(%err, "rpc reply consumer error, stopping");
                    break;
                }
            };

            let correlation_id = delivery
                .properties
                .correlation_id()
                .as_ref()
                .and_then(|c| Uuid::parse_str(c.as_str()).ok());

            let Some(correlation_id) = correlation_id else {
                debug!("dropping rpc reply with missing/invalid correlation id");
                continue;
            };

            if let Some(tx) = pending.lock().unwrap().remove(&correlation_id) {
                let _ = tx.send(delivery.data.clone());
            }
            // No pending slot: the caller already timed out and moved on.
        }
    });
}
