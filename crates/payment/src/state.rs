use crate::{
    config::Config,
    di::{DependenciesInject, DependenciesInjectDeps},
    pi::{PiClient, WebhookVerifier},
    repository::{OrderRepository, ProductRepository, UserRepository},
};
use anyhow::{Context, Result};
use prometheus_client::registry::Registry;
use shared::{
    abstract_trait::{DynJwtService, DynKafka},
    cache::CacheStore,
    config::{ConnectionPool, JwtConfig, Kafka, RedisClient},
    utils::{Metrics, SystemMetrics, run_metrics_collector},
};
use std::{fmt, sync::Arc};
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub di_container: DependenciesInject,
    pub jwt_config: DynJwtService,
    pub registry: Arc<Registry>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("deps", &self.di_container)
            .field("registry", &self.registry)
            .finish()
    }
}

impl AppState {
    pub fn from_parts(
        di_container: DependenciesInject,
        jwt_config: DynJwtService,
        registry: Registry,
    ) -> Self {
        Self {
            di_container,
            jwt_config,
            registry: Arc::new(registry),
        }
    }

    pub async fn new(pool: ConnectionPool, config: &Config) -> Result<Self> {
        let mut registry = Registry::default();
        let metrics = Arc::new(Metrics::new());
        let system_metrics = Arc::new(SystemMetrics::new());

        metrics.register(&mut registry);
        system_metrics.register(&mut registry);

        let kafka = Arc::new(
            Kafka::new(&config.kafka_broker).context("Failed to create Kafka producer")?,
        ) as DynKafka;

        let redis = RedisClient::new(&config.redis).context("Failed to create Redis pool")?;
        let cache = match redis.ping().await {
            Ok(()) => Some(CacheStore::new(redis.pool.clone(), "pi")),
            Err(e) => {
                warn!("⚠️ Redis unavailable, Pi responses will not be cached: {e:#}");
                None
            }
        };

        let pi = PiClient::new(&config.pi, cache, metrics.clone())
            .context("Failed to build Pi API client")?;

        let verifier = WebhookVerifier::new(&config.pi.webhook_secret)
            .map_err(|e| anyhow::anyhow!("Invalid webhook secret: {e}"))?;

        let jwt_config = Arc::new(JwtConfig::new(&config.jwt_secret)) as DynJwtService;

        let di_container = DependenciesInject::new(DependenciesInjectDeps {
            orders: Arc::new(OrderRepository::new(pool.clone())),
            products: Arc::new(ProductRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool)),
            pi: Arc::new(pi),
            kafka,
            jwt: jwt_config.clone(),
            verifier,
            max_payment_amount: config.pi.max_payment_amount,
            metrics,
        });

        tokio::spawn(run_metrics_collector(system_metrics));

        let payments = di_container.payment_service.clone();
        tokio::spawn(async move {
            match payments.reconcile_incomplete().await {
                Ok(settled) => info!("🔎 Start-up reconciliation settled {settled} order(s)"),
                Err(e) => warn!("⚠️ Start-up reconciliation skipped: {e}"),
            }
        });

        info!("✅ Application state initialized");

        Ok(Self::from_parts(di_container, jwt_config, registry))
    }
}
