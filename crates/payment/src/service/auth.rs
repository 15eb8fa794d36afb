use crate::{
    abstract_trait::{auth::AuthServiceTrait, pi::DynPiClient, user::DynUserRepository},
    domain::response::{api::ApiResponse, auth::TokenResponse},
    service::telemetry::ServiceTelemetry,
};
use async_trait::async_trait;
use opentelemetry::KeyValue;
use reqwest::StatusCode;
use shared::{
    abstract_trait::DynJwtService,
    config::ACCESS_TOKEN,
    errors::{ProviderError, ServiceError},
    utils::{Method, Metrics},
};
use std::sync::Arc;
use tracing::{info, warn};

const ACCESS_TOKEN_TTL_SECS: i64 = 60 * 60;

#[derive(Clone)]
pub struct AuthService {
    pi: DynPiClient,
    users: DynUserRepository,
    jwt: DynJwtService,
    telemetry: ServiceTelemetry,
}

impl AuthService {
    pub fn new(
        pi: DynPiClient,
        users: DynUserRepository,
        jwt: DynJwtService,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            pi,
            users,
            jwt,
            telemetry: ServiceTelemetry::new("auth-service", metrics),
        }
    }

    async fn exchange(&self, access_token: &str) -> Result<TokenResponse, ServiceError> {
        let pi_user = self.pi.me(access_token).await.map_err(|err| match err {
            ProviderError::Status { status, .. }
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN =>
            {
                warn!("🔐 Pi rejected the access token");
                ServiceError::InvalidCredentials
            }
            other => ServiceError::Provider(other),
        })?;

        let user = self
            .users
            .upsert_by_uid(&pi_user.uid, &pi_user.username)
            .await?;

        let access_token = self
            .jwt
            .generate_token(user.user_id, &user.uid, ACCESS_TOKEN)?;

        info!("🔑 Issued session for user {} ({})", user.user_id, user.username);

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: ACCESS_TOKEN_TTL_SECS,
            user: user.into(),
        })
    }
}

#[async_trait]
impl AuthServiceTrait for AuthService {
    async fn login_with_pi(
        &self,
        access_token: &str,
    ) -> Result<ApiResponse<TokenResponse>, ServiceError> {
        let operation = "login_with_pi";
        let ctx = self
            .telemetry
            .start(operation, vec![KeyValue::new("component", "auth")]);

        match self.exchange(access_token).await {
            Ok(token) => {
                self.telemetry
                    .success(&ctx, Method::Post, operation, "session issued");
                Ok(ApiResponse::success("Login successful", token))
            }
            Err(e) => {
                self.telemetry
                    .error(&ctx, Method::Post, operation, &e.to_string());
                Err(e)
            }
        }
    }
}
