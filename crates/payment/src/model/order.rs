use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub order_id: i32,
    pub buyer_id: i32,
    pub seller_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub amount: f64,
    pub memo: String,
    pub nonce: String,
    pub payment_id: String,
    pub txid: Option<String>,
    pub status: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
}
