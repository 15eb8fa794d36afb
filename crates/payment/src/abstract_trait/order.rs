use crate::{
    domain::{
        auth::AuthUser,
        requests::order::{CreateOrderRecord, FindOrders},
        response::{
            api::{ApiResponse, ApiResponsePagination},
            order::OrderResponse,
        },
        status::OrderStatus,
    },
    model::order::Order as OrderModel,
};
use async_trait::async_trait;
use shared::errors::{RepositoryError, ServiceError};
use std::sync::Arc;

pub type DynOrderRepository = Arc<dyn OrderRepositoryTrait + Send + Sync>;
pub type DynOrderQueryService = Arc<dyn OrderQueryServiceTrait + Send + Sync>;

/// Result of the completion compare-and-set.
#[derive(Debug, Clone)]
pub enum CompletionOutcome {
    /// txid recorded, status COMPLETED and stock decremented.
    Completed(OrderModel),
    /// Another caller got there first; carries the current row.
    AlreadyFinalized(OrderModel),
    /// txid recorded but stock no longer covers the quantity; status DISPUTED.
    OutOfStock(OrderModel),
}

#[async_trait]
pub trait OrderRepositoryTrait {
    async fn find_by_id(&self, order_id: i32) -> Result<Option<OrderModel>, RepositoryError>;
    async fn find_by_payment_id(
        &self,
        payment_id: &str,
    ) -> Result<Option<OrderModel>, RepositoryError>;
    async fn find_by_buyer(
        &self,
        buyer_id: i32,
        req: &FindOrders,
    ) -> Result<(Vec<OrderModel>, i64), RepositoryError>;
    async fn find_by_seller(
        &self,
        seller_id: i32,
        req: &FindOrders,
    ) -> Result<(Vec<OrderModel>, i64), RepositoryError>;
    async fn create_order(&self, req: &CreateOrderRecord) -> Result<OrderModel, RepositoryError>;
    /// Moves the order to `to` only if its status is one of `from`. `None` when
    /// the guard did not match.
    async fn transition_status(
        &self,
        order_id: i32,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<Option<OrderModel>, RepositoryError>;
    /// Records the txid, marks the order COMPLETED and decrements stock in a
    /// single transaction. Only applies to open orders without a txid.
    async fn complete_order(
        &self,
        payment_id: &str,
        txid: &str,
    ) -> Result<CompletionOutcome, RepositoryError>;
}

#[async_trait]
pub trait OrderQueryServiceTrait {
    async fn find_purchases(
        &self,
        user: &AuthUser,
        req: &FindOrders,
    ) -> Result<ApiResponsePagination<Vec<OrderResponse>>, ServiceError>;
    async fn find_sales(
        &self,
        user: &AuthUser,
        req: &FindOrders,
    ) -> Result<ApiResponsePagination<Vec<OrderResponse>>, ServiceError>;
    async fn find_by_id(
        &self,
        user: &AuthUser,
        order_id: i32,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError>;
}
