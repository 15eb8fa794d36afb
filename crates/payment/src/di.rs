use crate::{
    abstract_trait::{
        auth::DynAuthService,
        order::{DynOrderQueryService, DynOrderRepository},
        payment::DynPaymentService,
        pi::DynPiClient,
        product::DynProductRepository,
        user::DynUserRepository,
    },
    pi::WebhookVerifier,
    service::{AuthService, OrderQueryService, PaymentService, PaymentServiceDeps},
};
use shared::{
    abstract_trait::{DynJwtService, DynKafka},
    utils::Metrics,
};
use std::{fmt, sync::Arc};

#[derive(Clone)]
pub struct DependenciesInject {
    pub payment_service: DynPaymentService,
    pub order_query: DynOrderQueryService,
    pub auth_service: DynAuthService,
}

impl fmt::Debug for DependenciesInject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependenciesInject")
            .field("payment_service", &"PaymentService")
            .field("order_query", &"OrderQueryService")
            .field("auth_service", &"AuthService")
            .finish()
    }
}

/// Collaborators the services are built from. Production wires sqlx, reqwest
/// and rdkafka implementations; tests substitute in-memory ones.
#[derive(Clone)]
pub struct DependenciesInjectDeps {
    pub orders: DynOrderRepository,
    pub products: DynProductRepository,
    pub users: DynUserRepository,
    pub pi: DynPiClient,
    pub kafka: DynKafka,
    pub jwt: DynJwtService,
    pub verifier: WebhookVerifier,
    pub max_payment_amount: f64,
    pub metrics: Arc<Metrics>,
}

impl DependenciesInject {
    pub fn new(deps: DependenciesInjectDeps) -> Self {
        let DependenciesInjectDeps {
            orders,
            products,
            users,
            pi,
            kafka,
            jwt,
            verifier,
            max_payment_amount,
            metrics,
        } = deps;

        let payment_deps = PaymentServiceDeps {
            orders: orders.clone(),
            products,
            pi: pi.clone(),
            kafka,
            verifier,
            max_payment_amount,
            metrics: metrics.clone(),
        };
        let payment_service: DynPaymentService = Arc::new(PaymentService::new(payment_deps));

        let order_query: DynOrderQueryService =
            Arc::new(OrderQueryService::new(orders, metrics.clone()));

        let auth_service: DynAuthService = Arc::new(AuthService::new(pi, users, jwt, metrics));

        Self {
            payment_service,
            order_query,
            auth_service,
        }
    }
}
