use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePaymentRequest {
    #[validate(range(min = 1))]
    pub product_id: i32,

    #[validate(range(min = 1, max = 1000))]
    pub quantity: i32,

    #[validate(length(min = 1, max = 200))]
    pub memo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CompletePaymentRequest {
    #[validate(length(min = 1, max = 128))]
    pub txid: String,
}

/// Body posted by the Pi webhook.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookPayload {
    #[serde(rename = "paymentId")]
    pub payment_id: String,
    pub txid: String,
}
