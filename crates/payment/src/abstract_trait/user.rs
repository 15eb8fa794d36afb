use crate::model::user::User as UserModel;
use async_trait::async_trait;
use shared::errors::RepositoryError;
use std::sync::Arc;

pub type DynUserRepository = Arc<dyn UserRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait UserRepositoryTrait {
    async fn upsert_by_uid(&self, uid: &str, username: &str) -> Result<UserModel, RepositoryError>;
}
