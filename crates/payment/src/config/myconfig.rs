use anyhow::{Context, Result, anyhow};
use shared::config::RedisConfig;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PiConfig {
    pub api_key: String,
    pub base_url: String,
    pub webhook_secret: String,
    pub max_payment_amount: f64,
    pub retry_delay: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub run_migrations: bool,
    pub port: u16,
    pub kafka_broker: String,
    pub db_max_conn: u32,
    pub db_min_conn: u32,
    pub redis: RedisConfig,
    pub pi: PiConfig,
    pub otel_endpoint: String,
    pub is_dev: bool,
    pub enable_file_log: bool,
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Missing environment variable: {key}"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Unable to parse {key}: '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

impl Config {
    pub fn init() -> Result<Self> {
        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;
        let kafka_broker = required("KAFKA")?;

        let run_migrations = match required("RUN_MIGRATIONS")?.as_str() {
            "true" => true,
            "false" => false,
            other => {
                return Err(anyhow!(
                    "RUN_MIGRATIONS must be 'true' or 'false', got '{}'",
                    other
                ));
            }
        };

        let port = required("PORT")?
            .parse::<u16>()
            .context("PORT must be a valid u16 integer")?;

        let db_max_conn = parsed_or("DB_MAX_CONNECTION", 5u32)?;
        let db_min_conn = parsed_or("DB_MIN_CONNECTION", 1u32)?;

        let redis = RedisConfig::new(
            std::env::var("REDIS_HOST").unwrap_or_else(|_| "redis".to_string()),
            parsed_or("REDIS_PORT", 6379u16)?,
            parsed_or("REDIS_DB", 0u8)?,
            std::env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
        );

        let max_payment_amount = parsed_or("PI_MAX_PAYMENT_AMOUNT", 10_000f64)?;
        if max_payment_amount < 0.01 {
            return Err(anyhow!(
                "PI_MAX_PAYMENT_AMOUNT must be at least 0.01, got {}",
                max_payment_amount
            ));
        }

        let pi = PiConfig {
            api_key: required("PI_API_KEY")?,
            base_url: std::env::var("PI_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.minepi.com".to_string()),
            webhook_secret: required("PI_WEBHOOK_SECRET")?,
            max_payment_amount,
            retry_delay: Duration::from_millis(parsed_or("PI_RETRY_DELAY_MS", 500u64)?),
            timeout: Duration::from_secs(15),
        };

        Ok(Self {
            database_url,
            jwt_secret,
            run_migrations,
            port,
            kafka_broker,
            db_max_conn,
            db_min_conn,
            redis,
            pi,
            otel_endpoint: std::env::var("OTEL_ENDPOINT")
                .unwrap_or_else(|_| "http://otel-collector:4317".to_string()),
            is_dev: flag("DEV_MODE"),
            enable_file_log: std::env::var("ENABLE_FILE_LOG")
                .map(|v| v == "true")
                .unwrap_or(false),
        })
    }
}
