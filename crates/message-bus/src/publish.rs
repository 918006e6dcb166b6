//! Publish to the default (direct) exchange, routing on queue name.

use lapin::options::BasicPublishOptions;
use lapin::{BasicProperties, Channel};

use crate::error::BusError;

#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
}

pub async fn publish(
    channel: &Channel,
    routing_key: &str,
    payload: &[u8],
    options: PublishOptions,
) -> Result<(), BusError> {
    let mut properties = BasicProperties::default();
    if let Some(correlation_id) = options.correlation_id {
        properties = properties.with_correlation_id(correlation_id.into());
    }
    if let Some(reply_to) = options.reply_to {
        properties = properties.with_reply_to(reply_to.into());
    }

    channel
        .basic_publish(
            "",
            routing_key,
            BasicPublishOptions::default(),
            payload,
            properties,
        )
        .await?
        .await?;
    Ok(())
}
