use crate::{
    abstract_trait::order::{CompletionOutcome, OrderRepositoryTrait},
    domain::{
        requests::order::{CreateOrderRecord, FindOrders},
        status::OrderStatus,
    },
    model::order::Order as OrderModel,
};
use async_trait::async_trait;
use shared::{config::ConnectionPool, errors::RepositoryError};
use tracing::{error, info, warn};

const ORDER_COLUMNS: &str = "order_id, buyer_id, seller_id, product_id, quantity, amount, memo, \
     nonce, payment_id, txid, status, created_at, updated_at, completed_at";

pub struct OrderRepository {
    db: ConnectionPool,
}

impl OrderRepository {
    pub fn new(db: ConnectionPool) -> Self {
        Self { db }
    }

    async fn find_page(
        &self,
        column: &str,
        user_id: i32,
        req: &FindOrders,
    ) -> Result<(Vec<OrderModel>, i64), RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS}, COUNT(*) OVER() AS total_count
             FROM orders
             WHERE {column} = $1
             ORDER BY created_at DESC, order_id DESC
             LIMIT $2 OFFSET $3"
        );

        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id)
            .bind(i64::from(req.page_size))
            .bind(req.offset())
            .fetch_all(&self.db)
            .await
            .map_err(|err| {
                error!("❌ Failed to list orders by {column}={user_id}: {:?}", err);
                RepositoryError::from(err)
            })?;

        let total = rows.first().map(|r| r.total_count).unwrap_or(0);
        let orders = rows.into_iter().map(|r| r.order).collect();

        Ok((orders, total))
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    #[sqlx(flatten)]
    order: OrderModel,
    total_count: i64,
}

#[async_trait]
impl OrderRepositoryTrait for OrderRepository {
    async fn find_by_id(&self, order_id: i32) -> Result<Option<OrderModel>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1");

        sqlx::query_as::<_, OrderModel>(&sql)
            .bind(order_id)
            .fetch_optional(&self.db)
            .await
            .map_err(RepositoryError::from)
    }

    async fn find_by_payment_id(
        &self,
        payment_id: &str,
    ) -> Result<Option<OrderModel>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE payment_id = $1");

        sqlx::query_as::<_, OrderModel>(&sql)
            .bind(payment_id)
            .fetch_optional(&self.db)
            .await
            .map_err(RepositoryError::from)
    }

    async fn find_by_buyer(
        &self,
        buyer_id: i32,
        req: &FindOrders,
    ) -> Result<(Vec<OrderModel>, i64), RepositoryError> {
        self.find_page("buyer_id", buyer_id, req).await
    }

    async fn find_by_seller(
        &self,
        seller_id: i32,
        req: &FindOrders,
    ) -> Result<(Vec<OrderModel>, i64), RepositoryError> {
        self.find_page("seller_id", seller_id, req).await
    }

    async fn create_order(&self, req: &CreateOrderRecord) -> Result<OrderModel, RepositoryError> {
        let sql = format!(
            "INSERT INTO orders
                (buyer_id, seller_id, product_id, quantity, amount, memo, nonce, payment_id,
                 status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, current_timestamp, current_timestamp)
             RETURNING {ORDER_COLUMNS}"
        );

        let order = sqlx::query_as::<_, OrderModel>(&sql)
            .bind(req.buyer_id)
            .bind(req.seller_id)
            .bind(req.product_id)
            .bind(req.quantity)
            .bind(req.amount)
            .bind(&req.memo)
            .bind(&req.nonce)
            .bind(&req.payment_id)
            .bind(OrderStatus::Created.as_str())
            .fetch_one(&self.db)
            .await
            .map_err(|err| {
                error!(
                    "❌ Failed to create order for payment {}: {:?}",
                    req.payment_id, err
                );
                RepositoryError::on_insert(err, || {
                    format!("Order for payment {} already exists", req.payment_id)
                })
            })?;

        info!(
            "✅ Created order {} for payment {}",
            order.order_id, order.payment_id
        );
        Ok(order)
    }

    async fn transition_status(
        &self,
        order_id: i32,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<Option<OrderModel>, RepositoryError> {
        let sql = format!(
            "UPDATE orders
             SET status = $2, updated_at = current_timestamp
             WHERE order_id = $1 AND status = ANY($3)
             RETURNING {ORDER_COLUMNS}"
        );
        let from: Vec<&str> = from.iter().map(|s| s.as_str()).collect();

        let updated = sqlx::query_as::<_, OrderModel>(&sql)
            .bind(order_id)
            .bind(to.as_str())
            .bind(&from)
            .fetch_optional(&self.db)
            .await
            .map_err(|err| {
                error!("❌ Failed to move order {order_id} to {to}: {:?}", err);
                RepositoryError::from(err)
            })?;

        match &updated {
            Some(_) => info!("✅ Order {order_id} moved to {to}"),
            None => warn!("⚠️ Order {order_id} not in {from:?}; {to} not applied"),
        }

        Ok(updated)
    }

    async fn complete_order(
        &self,
        payment_id: &str,
        txid: &str,
    ) -> Result<CompletionOutcome, RepositoryError> {
        let mut tx = self.db.begin().await.map_err(RepositoryError::from)?;

        let claim = format!(
            "UPDATE orders
             SET txid = $2, status = $3, updated_at = current_timestamp,
                 completed_at = current_timestamp
             WHERE payment_id = $1 AND txid IS NULL AND status IN ($4, $5)
             RETURNING {ORDER_COLUMNS}"
        );

        let claimed = sqlx::query_as::<_, OrderModel>(&claim)
            .bind(payment_id)
            .bind(txid)
            .bind(OrderStatus::Completed.as_str())
            .bind(OrderStatus::Created.as_str())
            .bind(OrderStatus::Approved.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;

        let Some(order) = claimed else {
            tx.rollback().await.map_err(RepositoryError::from)?;

            let current = self
                .find_by_payment_id(payment_id)
                .await?
                .ok_or(RepositoryError::NotFound)?;

            info!("🔁 Payment {payment_id} already finalized as {}", current.status);
            return Ok(CompletionOutcome::AlreadyFinalized(current));
        };

        let decremented = sqlx::query(
            "UPDATE products
             SET stock = stock - $2, updated_at = current_timestamp
             WHERE product_id = $1 AND stock >= $2",
        )
        .bind(order.product_id)
        .bind(order.quantity)
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::from)?
        .rows_affected();

        if decremented == 0 {
            let sql = format!(
                "UPDATE orders
                 SET status = $2, completed_at = NULL, updated_at = current_timestamp
                 WHERE order_id = $1
                 RETURNING {ORDER_COLUMNS}"
            );

            let disputed = sqlx::query_as::<_, OrderModel>(&sql)
                .bind(order.order_id)
                .bind(OrderStatus::Disputed.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(RepositoryError::from)?;

            tx.commit().await.map_err(RepositoryError::from)?;

            warn!(
                "⚠️ Payment {payment_id} settled but product {} is out of stock; order {} disputed",
                order.product_id, order.order_id
            );
            return Ok(CompletionOutcome::OutOfStock(disputed));
        }

        tx.commit().await.map_err(|err| {
            error!("❌ Failed to commit completion of {payment_id}: {:?}", err);
            RepositoryError::from(err)
        })?;

        info!(
            "✅ Order {} completed with txid {txid}, stock -{}",
            order.order_id, order.quantity
        );
        Ok(CompletionOutcome::Completed(order))
    }
}
