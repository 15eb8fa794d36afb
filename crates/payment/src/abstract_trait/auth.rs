use crate::domain::response::{api::ApiResponse, auth::TokenResponse};
use async_trait::async_trait;
use shared::errors::ServiceError;
use std::sync::Arc;

pub type DynAuthService = Arc<dyn AuthServiceTrait + Send + Sync>;

#[async_trait]
pub trait AuthServiceTrait {
    async fn login_with_pi(
        &self,
        access_token: &str,
    ) -> Result<ApiResponse<TokenResponse>, ServiceError>;
}
