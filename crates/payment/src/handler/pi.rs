use crate::{
    abstract_trait::payment::DynPaymentService,
    domain::{
        auth::AuthUser,
        requests::pi::{CompletePaymentRequest, CreatePaymentRequest, WebhookPayload},
        response::{api::ApiResponse, order::OrderResponse, payment::PaymentStatusResponse},
    },
    middleware::{jwt::auth_middleware, validate::SimpleValidatedJson},
    state::AppState,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use shared::errors::{HttpError, ServiceError};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa_axum::router::OpenApiRouter;

pub const SIGNATURE_HEADER: &str = "x-pi-signature";

#[utoipa::path(
    post,
    path = "/api/pi/payments",
    tag = "Pi",
    security(("bearer_auth" = [])),
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Pi payment created", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Insufficient stock"),
        (status = 502, description = "Pi API failure")
    )
)]
pub async fn create_payment(
    Extension(service): Extension<DynPaymentService>,
    Extension(user): Extension<AuthUser>,
    SimpleValidatedJson(body): SimpleValidatedJson<CreatePaymentRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let response = service.create_payment(&user, &body).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/pi/payments/{payment_id}",
    tag = "Pi",
    security(("bearer_auth" = [])),
    params(("payment_id" = String, Path, description = "Pi payment identifier")),
    responses(
        (status = 200, description = "Local order with the provider view", body = ApiResponse<PaymentStatusResponse>),
        (status = 403, description = "Caller is not party to the payment"),
        (status = 404, description = "Unknown payment")
    )
)]
pub async fn get_payment(
    Extension(service): Extension<DynPaymentService>,
    Extension(user): Extension<AuthUser>,
    Path(payment_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let response = service.payment_status(&user, &payment_id).await?;
    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/pi/payments/{payment_id}/approve",
    tag = "Pi",
    security(("bearer_auth" = [])),
    params(("payment_id" = String, Path, description = "Pi payment identifier")),
    responses(
        (status = 200, description = "Payment approved", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Amount mismatch"),
        (status = 403, description = "Caller is not the buyer"),
        (status = 409, description = "Payment not approvable or stock exhausted"),
        (status = 502, description = "Pi API failure")
    )
)]
pub async fn approve_payment(
    Extension(service): Extension<DynPaymentService>,
    Extension(user): Extension<AuthUser>,
    Path(payment_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let response = service.approve_payment(&user, &payment_id).await?;
    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/pi/payments/{payment_id}/complete",
    tag = "Pi",
    security(("bearer_auth" = [])),
    params(("payment_id" = String, Path, description = "Pi payment identifier")),
    request_body = CompletePaymentRequest,
    responses(
        (status = 200, description = "Payment completed, or already completed with the same txid", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Amount mismatch"),
        (status = 403, description = "Caller is not the buyer"),
        (status = 409, description = "Different txid already recorded or payment not completable"),
        (status = 502, description = "Pi API failure")
    )
)]
pub async fn complete_payment(
    Extension(service): Extension<DynPaymentService>,
    Extension(user): Extension<AuthUser>,
    Path(payment_id): Path<String>,
    SimpleValidatedJson(body): SimpleValidatedJson<CompletePaymentRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let response = service
        .complete_payment(&user, &payment_id, &body.txid)
        .await?;
    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/pi/payments/{payment_id}/cancel",
    tag = "Pi",
    security(("bearer_auth" = [])),
    params(("payment_id" = String, Path, description = "Pi payment identifier")),
    responses(
        (status = 200, description = "Payment cancelled", body = ApiResponse<OrderResponse>),
        (status = 403, description = "Caller is not the buyer"),
        (status = 409, description = "Payment already settled"),
        (status = 502, description = "Pi API failure")
    )
)]
pub async fn cancel_payment(
    Extension(service): Extension<DynPaymentService>,
    Extension(user): Extension<AuthUser>,
    Path(payment_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let response = service.cancel_payment(&user, &payment_id).await?;
    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/pi/webhook",
    tag = "Pi",
    request_body = WebhookPayload,
    params(("x-pi-signature" = String, Header, description = "Hex HMAC-SHA256 of paymentId|txid")),
    responses(
        (status = 200, description = "Webhook accepted"),
        (status = 400, description = "Malformed body"),
        (status = 401, description = "Missing or invalid signature")
    )
)]
pub async fn pi_webhook(
    Extension(service): Extension<DynPaymentService>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
    else {
        warn!("🚫 Webhook without {SIGNATURE_HEADER}");
        return HttpError::Unauthorized("Missing webhook signature".into()).into_response();
    };

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Malformed webhook body: {e}");
            return HttpError::BadRequest(format!("Malformed webhook body: {e}")).into_response();
        }
    };

    match service.handle_webhook(&payload, &signature).await {
        Ok(response) => {
            info!("📬 Webhook for {} processed", payload.payment_id);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(ServiceError::InvalidSignature) => {
            HttpError::from(ServiceError::InvalidSignature).into_response()
        }
        // Anything else is acknowledged so the provider does not redeliver.
        Err(e) => {
            error!("❌ Webhook for {} failed: {e}", payload.payment_id);
            (
                StatusCode::OK,
                Json(json!({
                    "status": "accepted",
                    "message": "Webhook received",
                })),
            )
                .into_response()
        }
    }
}

pub fn pi_routes(app_state: Arc<AppState>) -> OpenApiRouter {
    let webhook = OpenApiRouter::new()
        .route("/api/pi/webhook", post(pi_webhook))
        .layer(Extension(app_state.di_container.payment_service.clone()));

    let payments = OpenApiRouter::new()
        .route("/api/pi/payments", post(create_payment))
        .route("/api/pi/payments/{payment_id}", get(get_payment))
        .route("/api/pi/payments/{payment_id}/approve", post(approve_payment))
        .route("/api/pi/payments/{payment_id}/complete", post(complete_payment))
        .route("/api/pi/payments/{payment_id}/cancel", post(cancel_payment))
        .route_layer(middleware::from_fn(auth_middleware))
        .layer(Extension(app_state.di_container.payment_service.clone()))
        .layer(Extension(app_state.jwt_config.clone()));

    webhook.merge(payments)
}
