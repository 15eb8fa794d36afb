use crate::{abstract_trait::KafkaTrait, errors::ServiceError};
use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    error::KafkaResult,
    producer::{BaseProducer, BaseRecord, Producer},
};
use std::time::Duration;
use tracing::{debug, info, warn};

const FLUSH_TIMEOUT: Duration = Duration::from_millis(500);

pub struct Kafka {
    producer: BaseProducer,
}

impl Kafka {
    pub fn new(brokers: &str) -> KafkaResult<Self> {
        let producer: BaseProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("client.id", "payment-service")
            .set("message.timeout.ms", "5000")
            .set("acks", "all")
            .set("allow.auto.create.topics", "true")
            .create()?;

        info!("📨 Kafka producer ready for {brokers}");

        Ok(Kafka { producer })
    }

    pub fn send_message(&self, topic: &str, key: &str, value: &[u8]) -> KafkaResult<()> {
        self.producer
            .send(BaseRecord::to(topic).key(key).payload(value))
            .map_err(|(err, _)| err)?;

        if let Err(e) = self.producer.flush(FLUSH_TIMEOUT) {
            warn!(topic, key, "Event queued but not yet acknowledged: {e}");
        } else {
            debug!(topic, key, "Event delivered");
        }

        Ok(())
    }
}

#[async_trait]
impl KafkaTrait for Kafka {
    async fn publish(&self, topic: &str, key: &str, value: &[u8]) -> Result<(), ServiceError> {
        self.send_message(topic, key, value)
            .map_err(|e| ServiceError::Kafka(format!("{topic}: {e}")))
    }
}
