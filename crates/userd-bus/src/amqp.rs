//! RabbitMQ bus backend using publisher confirms.

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions};
use lapin::publisher_confirm::{Confirmation, PublisherConfirm};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tracing::info;

use crate::error::BusError;
use crate::traits::{Bus, Confirm};

/// AMQP-backed [`Bus`]. The channel runs in confirm-select mode, so every
/// publish yields a broker acknowledgement.
pub struct AmqpBus {
    channel: Channel,
    exchange: String,
    routing_key: String,
}

impl AmqpBus {
    /// Connect to the broker and open a confirming channel.
    ///
    /// When `exchange` is empty (the AMQP default exchange) the routing key
    /// doubles as a queue name, which is declared durable so events survive
    /// broker restarts.
    pub async fn connect(
        uri: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<Self, BusError> {
        let connection = Connection::connect(uri, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;

        if exchange.is_empty() {
            channel
                .queue_declare(
                    routing_key,
                    QueueDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await?;
        }
        info!(exchange, routing_key, "connected to message bus");

        Ok(Self {
            channel,
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
        })
    }
}

struct AmqpConfirm {
    confirm: PublisherConfirm,
}

#[async_trait]
impl Confirm for AmqpConfirm {
    async fn done(self: Box<Self>) -> Result<(), BusError> {
        match self.confirm.await? {
            Confirmation::Ack(_) | Confirmation::NotRequested => Ok(()),
            Confirmation::Nack(_) => Err(BusError::Rejected),
        }
    }
}

#[async_trait]
impl Bus for AmqpBus {
    async fn send(&self, body: Vec<u8>) -> Result<Box<dyn Confirm>, BusError> {
        let confirm = self
            .channel
            .basic_publish(
                &self.exchange,
                &self.routing_key,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default(),
            )
            .await?;
        Ok(Box::new(AmqpConfirm { confirm }))
    }
}
