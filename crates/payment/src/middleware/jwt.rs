use crate::domain::auth::AuthUser;
use axum::{
    Extension, Json,
    body::Body,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use shared::{abstract_trait::DynJwtService, config::ACCESS_TOKEN, errors::ErrorResponse};
use tracing::debug;

fn unauthorized(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            status: "error".to_string(),
            message: message.to_string(),
        }),
    )
}

pub async fn auth_middleware(
    cookie_jar: CookieJar,
    Extension(jwt): Extension<DynJwtService>,
    mut req: Request<Body>,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let token = cookie_jar
        .get("token")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|auth_value| auth_value.strip_prefix("Bearer ").map(str::to_owned))
        })
        .ok_or_else(|| unauthorized("You are not logged in, please provide token"))?;

    let claims = jwt.verify_token(&token, ACCESS_TOKEN).map_err(|e| {
        debug!("Rejected bearer token: {e}");
        unauthorized("Invalid token")
    })?;

    req.extensions_mut().insert(AuthUser {
        user_id: claims.user_id,
        uid: claims.uid,
    });

    Ok(next.run(req).await)
}
