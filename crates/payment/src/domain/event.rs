use serde::{Deserialize, Serialize};

pub const TOPIC_APPROVED: &str = "payment.approved";
pub const TOPIC_COMPLETED: &str = "payment.completed";
pub const TOPIC_CANCELLED: &str = "payment.cancelled";
pub const TOPIC_DISPUTED: &str = "payment.disputed";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum PaymentEvent {
    Approved {
        order_id: i32,
        payment_id: String,
        buyer_id: i32,
        amount: f64,
    },
    Completed {
        order_id: i32,
        payment_id: String,
        txid: String,
        product_id: i32,
        quantity: i32,
        seller_id: i32,
    },
    Cancelled {
        order_id: i32,
        payment_id: String,
    },
    Disputed {
        order_id: i32,
        payment_id: String,
        txid: String,
        reason: String,
    },
}

impl PaymentEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            PaymentEvent::Approved { .. } => TOPIC_APPROVED,
            PaymentEvent::Completed { .. } => TOPIC_COMPLETED,
            PaymentEvent::Cancelled { .. } => TOPIC_CANCELLED,
            PaymentEvent::Disputed { .. } => TOPIC_DISPUTED,
        }
    }

    pub fn order_id(&self) -> i32 {
        match self {
            PaymentEvent::Approved { order_id, .. }
            | PaymentEvent::Completed { order_id, .. }
            | PaymentEvent::Cancelled { order_id, .. }
            | PaymentEvent::Disputed { order_id, .. } => *order_id,
        }
    }
}
