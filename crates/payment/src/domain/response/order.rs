use crate::{domain::status::OrderStatus, model::order::Order};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: i32,
    pub buyer_id: i32,
    pub seller_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub amount: f64,
    pub memo: String,
    pub payment_id: String,
    pub txid: Option<String>,
    pub status: OrderStatus,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub completed_at: Option<String>,
}

impl From<Order> for OrderResponse {
    fn from(value: Order) -> Self {
        let status = value.status.parse().unwrap_or_else(|e| {
            warn!("Order {} carries {e}; reporting DISPUTED", value.order_id);
            OrderStatus::Disputed
        });

        OrderResponse {
            id: value.order_id,
            buyer_id: value.buyer_id,
            seller_id: value.seller_id,
            product_id: value.product_id,
            quantity: value.quantity,
            amount: value.amount,
            memo: value.memo,
            payment_id: value.payment_id,
            txid: value.txid,
            status,
            created_at: value.created_at.map(|dt| dt.to_string()),
            updated_at: value.updated_at.map(|dt| dt.to_string()),
            completed_at: value.completed_at.map(|dt| dt.to_string()),
        }
    }
}
