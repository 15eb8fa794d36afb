use opentelemetry::{
    Context, KeyValue,
    global::{self, BoxedTracer},
    trace::{SpanKind, Status as SpanStatus, TraceContextExt, Tracer},
};
use shared::utils::{Method, Metrics, Status, TracingContext};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info};

/// Span and metrics bookkeeping shared by the services.
#[derive(Clone)]
pub struct ServiceTelemetry {
    tracer_name: &'static str,
    metrics: Arc<Metrics>,
}

impl ServiceTelemetry {
    pub fn new(tracer_name: &'static str, metrics: Arc<Metrics>) -> Self {
        Self {
            tracer_name,
            metrics,
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn tracer(&self) -> BoxedTracer {
        global::tracer(self.tracer_name)
    }

    pub fn start(&self, operation: &str, attributes: Vec<KeyValue>) -> TracingContext {
        let start_time = Instant::now();
        let tracer = self.tracer();
        let span = tracer
            .span_builder(operation.to_string())
            .with_kind(SpanKind::Server)
            .with_attributes(attributes)
            .start(&tracer);

        info!("Starting operation: {operation}");

        let cx = Context::current_with_span(span);
        cx.span().add_event(
            "Operation started",
            vec![KeyValue::new("operation", operation.to_string())],
        );

        TracingContext { cx, start_time }
    }

    pub fn success(&self, ctx: &TracingContext, method: Method, operation: &str, message: &str) {
        self.finish(ctx, method, operation, true, message);
    }

    pub fn error(&self, ctx: &TracingContext, method: Method, operation: &str, message: &str) {
        self.finish(ctx, method, operation, false, message);
    }

    fn finish(
        &self,
        ctx: &TracingContext,
        method: Method,
        operation: &str,
        is_success: bool,
        message: &str,
    ) {
        let elapsed = ctx.start_time.elapsed().as_secs_f64();
        let span = ctx.cx.span();

        span.add_event(
            "Operation completed",
            vec![
                KeyValue::new("status", if is_success { "SUCCESS" } else { "ERROR" }),
                KeyValue::new("duration_secs", elapsed),
                KeyValue::new("message", message.to_string()),
            ],
        );

        let status = if is_success {
            span.set_status(SpanStatus::Ok);
            info!("✅ {operation}: {message}");
            Status::Success
        } else {
            span.set_status(SpanStatus::error(message.to_string()));
            error!("❌ {operation}: {message}");
            Status::Error
        };

        self.metrics.record(method, operation, status, elapsed);
        span.end();
    }
}
