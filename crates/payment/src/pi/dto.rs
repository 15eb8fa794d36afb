use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Payment as reported by the Pi Platform API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PiPayment {
    pub identifier: String,
    pub user_uid: String,
    pub amount: f64,
    pub memo: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub from_address: Option<String>,
    #[serde(default)]
    pub to_address: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    pub status: PiPaymentFlags,
    #[serde(default)]
    pub transaction: Option<PiTransaction>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PiPaymentFlags {
    #[serde(default)]
    pub developer_approved: bool,
    #[serde(default)]
    pub transaction_verified: bool,
    #[serde(default)]
    pub developer_completed: bool,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub user_cancelled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PiTransaction {
    pub txid: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(rename = "_link", default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiUser {
    pub uid: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePiPayment {
    pub amount: f64,
    pub memo: String,
    pub metadata: serde_json::Value,
    pub uid: String,
}

/// Coarse provider state derived from the status flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    Pending,
    Completed,
    Cancelled,
}

impl PaymentState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentState::Pending)
    }
}

impl PiPayment {
    pub fn state(&self) -> PaymentState {
        if self.status.cancelled || self.status.user_cancelled {
            PaymentState::Cancelled
        } else if self.status.developer_completed {
            PaymentState::Completed
        } else {
            PaymentState::Pending
        }
    }

    pub fn txid(&self) -> Option<&str> {
        self.transaction.as_ref().map(|tx| tx.txid.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payment(flags: serde_json::Value) -> PiPayment {
        serde_json::from_value(json!({
            "identifier": "pay_1",
            "user_uid": "uid_1",
            "amount": 3.5,
            "memo": "Handmade mug",
            "metadata": { "nonce": "abc" },
            "from_address": null,
            "to_address": null,
            "direction": "user_to_app",
            "network": "Pi Testnet",
            "created_at": "2025-06-01T10:00:00Z",
            "status": flags,
            "transaction": {
                "txid": "tx_1",
                "verified": true,
                "_link": "https://api.testnet.minepi.com/transactions/tx_1"
            }
        }))
        .unwrap()
    }

    #[test]
    fn decodes_provider_payload() {
        let p = payment(json!({
            "developer_approved": true,
            "transaction_verified": true,
            "developer_completed": false,
            "cancelled": false,
            "user_cancelled": false
        }));

        assert_eq!(p.identifier, "pay_1");
        assert_eq!(p.txid(), Some("tx_1"));
        assert_eq!(p.metadata["nonce"], "abc");
        assert_eq!(p.state(), PaymentState::Pending);
    }

    #[test]
    fn cancellation_wins_over_completion() {
        let p = payment(json!({ "developer_completed": true, "user_cancelled": true }));
        assert_eq!(p.state(), PaymentState::Cancelled);

        let p = payment(json!({ "developer_completed": true, "cancelled": true }));
        assert_eq!(p.state(), PaymentState::Cancelled);
    }

    #[test]
    fn developer_completed_means_completed() {
        let p = payment(json!({ "developer_approved": true, "developer_completed": true }));
        assert_eq!(p.state(), PaymentState::Completed);
        assert!(p.state().is_terminal());
    }

    #[test]
    fn missing_transaction_has_no_txid() {
        let p: PiPayment = serde_json::from_value(json!({
            "identifier": "pay_2",
            "user_uid": "uid_1",
            "amount": 1.0,
            "memo": "m",
            "status": {}
        }))
        .unwrap();

        assert_eq!(p.txid(), None);
        assert!(!p.state().is_terminal());
    }
}
