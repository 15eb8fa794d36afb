use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PiAuthRequest {
    #[validate(length(min = 1, message = "access_token is required"))]
    #[serde(rename = "accessToken", alias = "access_token")]
    pub access_token: String,
}
