use crate::{
    abstract_trait::{order::DynOrderQueryService, payment::DynPaymentService},
    domain::{
        auth::AuthUser,
        requests::{order::FindOrders, pi::CreatePaymentRequest},
        response::{
            api::{ApiResponse, ApiResponsePagination},
            order::OrderResponse,
        },
    },
    middleware::{
        jwt::auth_middleware,
        validate::{SimpleValidatedJson, SimpleValidatedQuery},
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use shared::errors::HttpError;
use std::sync::Arc;
use utoipa_axum::router::OpenApiRouter;

#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Order",
    security(("bearer_auth" = [])),
    params(FindOrders),
    responses(
        (status = 200, description = "Orders bought by the caller", body = ApiResponsePagination<Vec<OrderResponse>>),
        (status = 400, description = "Invalid pagination"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_purchases(
    Extension(service): Extension<DynOrderQueryService>,
    Extension(user): Extension<AuthUser>,
    SimpleValidatedQuery(params): SimpleValidatedQuery<FindOrders>,
) -> Result<impl IntoResponse, HttpError> {
    let response = service.find_purchases(&user, &params).await?;
    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/orders/sales",
    tag = "Order",
    security(("bearer_auth" = [])),
    params(FindOrders),
    responses(
        (status = 200, description = "Orders for the caller's products", body = ApiResponsePagination<Vec<OrderResponse>>),
        (status = 400, description = "Invalid pagination"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_sales(
    Extension(service): Extension<DynOrderQueryService>,
    Extension(user): Extension<AuthUser>,
    SimpleValidatedQuery(params): SimpleValidatedQuery<FindOrders>,
) -> Result<impl IntoResponse, HttpError> {
    let response = service.find_sales(&user, &params).await?;
    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "Order",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order details", body = ApiResponse<OrderResponse>),
        (status = 403, description = "Caller is neither buyer nor seller"),
        (status = 404, description = "Order not found"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_order(
    Extension(service): Extension<DynOrderQueryService>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, HttpError> {
    let response = service.find_by_id(&user, id).await?;
    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Order",
    security(("bearer_auth" = [])),
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Order and Pi payment created", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Insufficient stock"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn create_order(
    Extension(service): Extension<DynPaymentService>,
    Extension(user): Extension<AuthUser>,
    SimpleValidatedJson(body): SimpleValidatedJson<CreatePaymentRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let response = service.create_payment(&user, &body).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub fn order_routes(app_state: Arc<AppState>) -> OpenApiRouter {
    OpenApiRouter::new()
        .route("/api/orders", get(get_purchases).post(create_order))
        .route("/api/orders/sales", get(get_sales))
        .route("/api/orders/{id}", get(get_order))
        .route_layer(middleware::from_fn(auth_middleware))
        .layer(Extension(app_state.di_container.order_query.clone()))
        .layer(Extension(app_state.di_container.payment_service.clone()))
        .layer(Extension(app_state.jwt_config.clone()))
}
