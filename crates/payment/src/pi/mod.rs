mod client;
mod dto;
mod signature;

pub use self::client::{MAX_ATTEMPTS, PiClient};
pub use self::dto::{
    CreatePiPayment, PaymentState, PiPayment, PiPaymentFlags, PiTransaction, PiUser,
};
pub use self::signature::WebhookVerifier;
