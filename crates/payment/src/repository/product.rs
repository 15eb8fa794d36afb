use crate::{abstract_trait::product::ProductRepositoryTrait, model::product::Product};
use async_trait::async_trait;
use shared::{config::ConnectionPool, errors::RepositoryError};
use tracing::error;

pub struct ProductRepository {
    db: ConnectionPool,
}

impl ProductRepository {
    pub fn new(db: ConnectionPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductRepositoryTrait for ProductRepository {
    async fn find_by_id(&self, product_id: i32) -> Result<Option<Product>, RepositoryError> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT product_id, seller_id, name, price, stock, created_at, updated_at, deleted_at
            FROM products
            WHERE product_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|err| {
            error!("❌ Failed to fetch product {product_id}: {:?}", err);
            RepositoryError::from(err)
        })
    }
}
