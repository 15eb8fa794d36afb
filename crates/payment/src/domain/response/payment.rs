use crate::{
    domain::response::order::OrderResponse,
    pi::{PaymentState, PiPayment},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentStatusResponse {
    pub order: OrderResponse,
    pub provider_state: PaymentState,
    pub payment: PiPayment,
}
