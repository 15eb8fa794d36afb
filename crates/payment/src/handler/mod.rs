mod auth;
mod order;
mod pi;

use crate::state::AppState;
use anyhow::Result;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
    routing::get,
};
use prometheus_client::encoding::text::encode;
use serde_json::json;
use shared::utils::shutdown_signal;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

pub use self::auth::auth_routes;
pub use self::order::order_routes;
pub use self::pi::{SIGNATURE_HEADER, pi_routes};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_with_pi,

        pi::create_payment,
        pi::get_payment,
        pi::approve_payment,
        pi::complete_payment,
        pi::cancel_payment,
        pi::pi_webhook,

        order::get_purchases,
        order::get_sales,
        order::get_order,
        order::create_order,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Pi session exchange"),
        (name = "Pi", description = "Pi Network payment lifecycle"),
        (name = "Order", description = "Marketplace orders"),
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut buffer = String::new();

    if let Err(e) = encode(&mut buffer, &state.registry) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}"),
        );
    }

    (
        StatusCode::OK,
        [(
            CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        buffer,
    )
}

pub async fn health_checker_handler() -> impl IntoResponse {
    Json(json!({
        "status": "success",
        "message": "Payment service is healthy",
    }))
}

pub struct AppRouter;

impl AppRouter {
    pub fn build(app_state: Arc<AppState>) -> Router {
        let api_router = OpenApiRouter::with_openapi(ApiDoc::openapi())
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_checker_handler))
            .with_state(app_state.clone())
            .merge(auth_routes(app_state.clone()))
            .merge(pi_routes(app_state.clone()))
            .merge(order_routes(app_state.clone()));

        let (router, api) = api_router
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(1024 * 1024))
            .layer(TraceLayer::new_for_http())
            .split_for_parts();

        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
    }

    pub async fn serve(port: u16, app_state: AppState) -> Result<()> {
        let app = Self::build(Arc::new(app_state));

        let listener = TcpListener::bind(format!("0.0.0.0:{port}")).await?;
        let addr = listener.local_addr()?;

        info!("🚀 Payment service listening on http://{addr}");
        info!("📖 Swagger UI: http://{addr}/swagger-ui");
        info!("📊 Metrics: http://{addr}/metrics");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}
