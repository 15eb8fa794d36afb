use crate::pi::{CreatePiPayment, PiPayment, PiUser};
use async_trait::async_trait;
use shared::errors::ProviderError;
use std::sync::Arc;

pub type DynPiClient = Arc<dyn PiClientTrait + Send + Sync>;

#[async_trait]
pub trait PiClientTrait {
    async fn create_payment(&self, req: &CreatePiPayment) -> Result<PiPayment, ProviderError>;
    async fn get_payment(&self, payment_id: &str) -> Result<PiPayment, ProviderError>;
    async fn approve_payment(&self, payment_id: &str) -> Result<PiPayment, ProviderError>;
    async fn complete_payment(
        &self,
        payment_id: &str,
        txid: &str,
    ) -> Result<PiPayment, ProviderError>;
    async fn cancel_payment(&self, payment_id: &str) -> Result<PiPayment, ProviderError>;
    async fn incomplete_payments(&self) -> Result<Vec<PiPayment>, ProviderError>;
    async fn me(&self, access_token: &str) -> Result<PiUser, ProviderError>;
}
