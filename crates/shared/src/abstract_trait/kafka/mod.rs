use crate::errors::ServiceError;
use async_trait::async_trait;
use std::sync::Arc;

pub type DynKafka = Arc<dyn KafkaTrait + Send + Sync>;

/// Sink for payment lifecycle events. `key` keeps one order's events on one
/// partition.
#[async_trait]
pub trait KafkaTrait {
    async fn publish(&self, topic: &str, key: &str, value: &[u8]) -> Result<(), ServiceError>;
}
