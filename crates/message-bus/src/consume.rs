//! Consumer helpers: manual-ack with requeue-on-failure for stage and
//! RPC-server queues, implicit ack for RPC reply queues.

use futures_lite::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions,
};
use lapin::types::FieldTable;
use lapin::{message::Delivery, Channel, Consumer};
use uuid::Uuid;

use crate::error::BusError;
use crate::queue::declare_durable_queue;

/// A manual-ack consumer bound to a single durable queue, used for stage
/// queues and RPC server queues. `prefetch` is 1 for both in this system.
pub struct ManualAckConsumer {
    channel: Channel,
    consumer: Consumer,
}

impl ManualAckConsumer {
    pub async fn new(
        channel: Channel,
        queue_name: &str,
        prefetch: u16,
    ) -> Result<Self, BusError> {
        declare_durable_queue(&channel, queue_name).await?;
        channel
            .basic_qos(prefetch, BasicQosOptions::default())
            .await?;
        let consumer_tag = format!("consumer-{}", Uuid::new_v4());
        let consumer = channel
            .basic_consume(
                queue_name,
                &consumer_tag,
                BasicConsumeOptions {
                    no_ack: false,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(Self { channel, consumer })
    }

    pub async fn next(&mut self) -> Option<Result<Delivery, BusError>> {
        self.consumer
            .next()
            .await
            .map(|r| r.map_err(BusError::from))
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }
}

pub async fn ack(delivery: &Delivery) -> Result<(), BusError> {
    delivery.ack(BasicAckOptions::default()).await?;
    Ok(())
}

pub async fn nack_requeue(delivery: &Delivery) -> Result<(), BusError> {
    delivery
        .nack(BasicNackOptions {
            requeue: true,
            ..BasicNackOptions::default()
        })
        .await?;
    Ok(())
}

/// A no-ack consumer for an exclusive reply queue (RPC clients). Unlimited
/// prefetch: replies are small and the client drains them immediately.
pub struct NoAckConsumer {
    consumer: Consumer,
}

impl NoAckConsumer {
    pub async fn new(channel: &Channel, queue_name: &str) -> Result<Self, BusError> {
        let consumer_tag = format!("reply-{}", Uuid::new_v4());
        let consumer = channel
            .basic_consume(
                queue_name,
                &consumer_tag,
                BasicConsumeOptions {
                    no_ack: true,
                    exclusive: true,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(Self { consumer })
    }

    pub async fn next(&mut self) -> Option<Result<Delivery, BusError>> {
        self.consumer
            .next()
            .await
            .map(|r| r.map_err(BusError::from))
    }
}
