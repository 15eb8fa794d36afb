use serde::{Deserialize, Serialize};
use utoipa::IntoParams;
use validator::Validate;

fn default_page() -> i32 {
    1
}

fn default_page_size() -> i32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, IntoParams)]
pub struct FindOrders {
    #[validate(range(min = 1))]
    #[serde(default = "default_page")]
    pub page: i32,

    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_page_size")]
    pub page_size: i32,
}

impl Default for FindOrders {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl FindOrders {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * i64::from(self.page_size)
    }
}

/// Row to insert once the provider has issued a payment identifier.
#[derive(Debug, Clone)]
pub struct CreateOrderRecord {
    pub buyer_id: i32,
    pub seller_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub amount: f64,
    pub memo: String,
    pub nonce: String,
    pub payment_id: String,
}
