use crate::{abstract_trait::user::UserRepositoryTrait, model::user::User};
use async_trait::async_trait;
use shared::{config::ConnectionPool, errors::RepositoryError};
use tracing::{error, info};

pub struct UserRepository {
    db: ConnectionPool,
}

impl UserRepository {
    pub fn new(db: ConnectionPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn upsert_by_uid(&self, uid: &str, username: &str) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (uid, username, created_at, updated_at)
            VALUES ($1, $2, current_timestamp, current_timestamp)
            ON CONFLICT (uid) DO UPDATE
                SET username = EXCLUDED.username, updated_at = current_timestamp
            RETURNING user_id, uid, username, created_at, updated_at
            "#,
        )
        .bind(uid)
        .bind(username)
        .fetch_one(&self.db)
        .await
        .map_err(|err| {
            error!("❌ Failed to upsert user {uid}: {:?}", err);
            RepositoryError::from(err)
        })?;

        info!("👤 Upserted user {} ({})", user.user_id, user.uid);
        Ok(user)
    }
}
