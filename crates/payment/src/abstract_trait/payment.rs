use crate::domain::{
    auth::AuthUser,
    requests::pi::{CreatePaymentRequest, WebhookPayload},
    response::{api::ApiResponse, order::OrderResponse, payment::PaymentStatusResponse},
};
use async_trait::async_trait;
use shared::errors::ServiceError;
use std::sync::Arc;

pub type DynPaymentService = Arc<dyn PaymentServiceTrait + Send + Sync>;

#[async_trait]
pub trait PaymentServiceTrait {
    async fn create_payment(
        &self,
        buyer: &AuthUser,
        req: &CreatePaymentRequest,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError>;
    async fn approve_payment(
        &self,
        buyer: &AuthUser,
        payment_id: &str,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError>;
    async fn complete_payment(
        &self,
        buyer: &AuthUser,
        payment_id: &str,
        txid: &str,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError>;
    async fn cancel_payment(
        &self,
        buyer: &AuthUser,
        payment_id: &str,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError>;
    async fn payment_status(
        &self,
        user: &AuthUser,
        payment_id: &str,
    ) -> Result<ApiResponse<PaymentStatusResponse>, ServiceError>;
    /// Signature is checked before anything else; a bad one yields
    /// `ServiceError::InvalidSignature`.
    async fn handle_webhook(
        &self,
        payload: &WebhookPayload,
        signature: &str,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError>;
    /// Settles payments the buyer signed while nobody completed them, e.g.
    /// across a restart. Returns how many orders were settled.
    async fn reconcile_incomplete(&self) -> Result<usize, ServiceError>;
}
