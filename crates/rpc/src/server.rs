//! `RpcServer`: a named, prefetch-1, manual-ack consumer that dispatches
//! each request to a handler and replies on the delivery's `reply_to`.

use std::future::Future;
use std::marker::PhantomData;

use message_bus::{ack, nack_requeue, publish, BusConnection, ManualAckConsumer, PublishOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::RpcError;

pub struct RpcServer<R, S = ()> {
    consumer: ManualAckConsumer,
    _marker: PhantomData<(R, S)>,
}

impl<R, S> RpcServer<R, S>
where
    R: DeserializeOwned,
    S: Serialize,
{
    pub async fn new(bus: &BusConnection, queue_name: impl Into<String>) -> Result<Self, RpcError> {
        let queue_name = queue_name.into();
        let channel = bus.channel().await?;
        let consumer = ManualAckConsumer::new(channel, &queue_name, 1).await?;
        Ok(Self {
            consumer,
            _marker: PhantomData,
        })
    }

    /// Run the server loop, invoking `handler` for each request. A handler
    /// error acks-with-requeue so a transient fault retries on another
    /// consumer; this call only returns once the underlying connection is
    /// gone (process shutdown).
    pub async fn serve<F, Fut>(mut self, handler: F)
    where
        F: Fn(R) -> Fut,
        Fut: Future<Output = anyhow::Result<S>>,
    {
        loop {
            let delivery = match self.consumer.next().await {
                Some(Ok(delivery)) => delivery,
                Some(Err(err)) => {
                    warn!(%err, "rpc server consumer error, stopping");
                    return;
                }
                None => return,
            };

            let Some(reply_to) = delivery.properties.reply_to().clone() else {
                warn!("rpc request missing reply_to, dropping without requeue");
                let _ = ack(&delivery).await;
                continue;
            };
            let correlation_id = delivery.properties.correlation_id().clone();

            let request: R = match serde_json::from_slice(&delivery.data) {
                Ok(request) => request,
                Err(err) => {
                    warn!(%err, "failed to deserialize rpc request, dropping without requeue");
                    let _ = ack(&delivery).await;
                    continue;
                }
            };

            match handler(request).await {
                Ok(response) => {
                    let payload = match serde_json::to_vec(&response) {
                        Ok(payload) => payload,
                        Err(err) => {
                            warn!(%err, "failed to serialize rpc response");
                            let _ = nack_requeue(&delivery).await;
                            continue;
                        }
                    };
                    let publish_result = publish(
                        self.consumer.channel(),
                        reply_to.as_str(),
                        &payload,
                        PublishOptions {
                            correlation_id: correlation_id.as_ref().map(|c| c.as_str().to_string()),
                            reply_to: None,
                        },
                    )
                    .await;
                    if let Err(err) = publish_result {
                        warn!(%err, "failed to publish rpc reply");
                    }
                    if let Err(err) = ack(&delivery).await {
                        warn!(%err, "failed to ack rpc request after reply");
                    }
                }
                Err(err) => {
                    warn!(%err, "rpc handler failed, requeueing");
                    let _ = nack_requeue(&delivery).await;
                }
            }
        }
    }
}
