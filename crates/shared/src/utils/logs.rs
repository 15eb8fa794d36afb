use anyhow::Result;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use tracing_appender::{
    non_blocking,
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggerOptions {
    pub is_dev: bool,
    pub enable_file: bool,
}

/// Installs the global subscriber: pretty console output, the OTLP log bridge
/// and, when enabled, a daily rolling JSON file.
///
/// The returned guard flushes the file writer and must live until shutdown.
pub fn init_logger(
    sdk_logger_provider: &SdkLoggerProvider,
    component: &str,
    options: LoggerOptions,
) -> Result<Option<WorkerGuard>> {
    let console_default = if options.is_dev { "debug" } else { "info" };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(console_default));

    let console_layer = fmt::layer()
        .pretty()
        .with_thread_names(true)
        .with_ansi(options.is_dev)
        .with_filter(console_filter);

    let otel_filter = EnvFilter::new("info")
        .add_directive("hyper=off".parse()?)
        .add_directive("opentelemetry=off".parse()?)
        .add_directive("tonic=off".parse()?)
        .add_directive("h2=off".parse()?)
        .add_directive("reqwest=off".parse()?)
        .add_directive("sqlx=warn".parse()?);

    let otel_layer = OpenTelemetryTracingBridge::new(sdk_logger_provider).with_filter(otel_filter);

    let (file_layer, guard) = if options.enable_file {
        let log_dir = if options.is_dev { "./logs" } else { "/var/log/app" };
        let appender =
            RollingFileAppender::new(Rotation::DAILY, log_dir, format!("{component}.log"));
        let (writer, guard) = non_blocking(appender);

        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .json()
            .with_filter(EnvFilter::new("info"));

        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(guard)
}
