mod auth;
mod order_query;
mod payment;
mod telemetry;

pub use self::auth::AuthService;
pub use self::order_query::OrderQueryService;
pub use self::payment::{PaymentService, PaymentServiceDeps, amounts_match, round_amount};
pub use self::telemetry::ServiceTelemetry;
