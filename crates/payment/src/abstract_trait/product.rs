use crate::model::product::Product as ProductModel;
use async_trait::async_trait;
use shared::errors::RepositoryError;
use std::sync::Arc;

pub type DynProductRepository = Arc<dyn ProductRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait ProductRepositoryTrait {
    /// Soft-deleted products are not returned.
    async fn find_by_id(&self, product_id: i32) -> Result<Option<ProductModel>, RepositoryError>;
}
