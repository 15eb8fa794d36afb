mod logs;
mod metadata;
mod metrics;
mod otel;
mod random_string;
mod shutdown;

pub use self::logs::{LoggerOptions, init_logger};
pub use self::metadata::HeaderInjector;
pub use self::metrics::{
    Method, Metrics, PaymentStage, ProviderCall, Status, SystemMetrics, run_metrics_collector,
};
pub use self::otel::{Telemetry, TracingContext};
pub use self::random_string::generate_random_string;
pub use self::shutdown::shutdown_signal;
