use crate::{
    abstract_trait::auth::DynAuthService,
    domain::{
        requests::auth::PiAuthRequest,
        response::{api::ApiResponse, auth::TokenResponse},
    },
    middleware::validate::SimpleValidatedJson,
    state::AppState,
};
use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use shared::errors::HttpError;
use std::sync::Arc;
use utoipa_axum::router::OpenApiRouter;

#[utoipa::path(
    post,
    path = "/api/auth/pi",
    tag = "Auth",
    request_body = PiAuthRequest,
    responses(
        (status = 200, description = "Session issued", body = ApiResponse<TokenResponse>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Pi rejected the access token"),
        (status = 502, description = "Pi API unavailable")
    )
)]
pub async fn login_with_pi(
    Extension(service): Extension<DynAuthService>,
    jar: CookieJar,
    SimpleValidatedJson(body): SimpleValidatedJson<PiAuthRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let response = service.login_with_pi(&body.access_token).await?;

    let cookie = Cookie::build(("token", response.data.access_token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    Ok((StatusCode::OK, jar.add(cookie), Json(response)))
}

pub fn auth_routes(app_state: Arc<AppState>) -> OpenApiRouter {
    OpenApiRouter::new()
        .route("/api/auth/pi", post(login_with_pi))
        .layer(Extension(app_state.di_container.auth_service.clone()))
}
