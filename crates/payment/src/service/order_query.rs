use crate::{
    abstract_trait::order::{DynOrderRepository, OrderQueryServiceTrait},
    domain::{
        auth::AuthUser,
        requests::order::FindOrders,
        response::{
            api::{ApiResponse, ApiResponsePagination},
            order::OrderResponse,
            pagination::Pagination,
        },
    },
    model::order::Order as OrderModel,
    service::telemetry::ServiceTelemetry,
};
use async_trait::async_trait;
use opentelemetry::KeyValue;
use shared::{
    errors::ServiceError,
    utils::{Method, Metrics},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct OrderQueryService {
    orders: DynOrderRepository,
    telemetry: ServiceTelemetry,
}

impl OrderQueryService {
    pub fn new(orders: DynOrderRepository, metrics: Arc<Metrics>) -> Self {
        Self {
            orders,
            telemetry: ServiceTelemetry::new("order-query-service", metrics),
        }
    }

    fn page(
        req: &FindOrders,
        orders: Vec<OrderModel>,
        total: i64,
        message: &str,
    ) -> ApiResponsePagination<Vec<OrderResponse>> {
        ApiResponsePagination {
            status: "success".to_string(),
            message: message.to_string(),
            data: orders.into_iter().map(OrderResponse::from).collect(),
            pagination: Pagination::new(req.page, req.page_size, total),
        }
    }
}

#[async_trait]
impl OrderQueryServiceTrait for OrderQueryService {
    async fn find_purchases(
        &self,
        user: &AuthUser,
        req: &FindOrders,
    ) -> Result<ApiResponsePagination<Vec<OrderResponse>>, ServiceError> {
        let operation = "find_purchases";
        let ctx = self.telemetry.start(
            operation,
            vec![
                KeyValue::new("component", "order"),
                KeyValue::new("user.id", i64::from(user.user_id)),
                KeyValue::new("page", i64::from(req.page)),
            ],
        );

        match self.orders.find_by_buyer(user.user_id, req).await {
            Ok((orders, total)) => {
                self.telemetry.success(
                    &ctx,
                    Method::Get,
                    operation,
                    &format!("{} of {total} purchases", orders.len()),
                );
                Ok(Self::page(req, orders, total, "Purchases retrieved"))
            }
            Err(e) => {
                self.telemetry
                    .error(&ctx, Method::Get, operation, &e.to_string());
                Err(e.into())
            }
        }
    }

    async fn find_sales(
        &self,
        user: &AuthUser,
        req: &FindOrders,
    ) -> Result<ApiResponsePagination<Vec<OrderResponse>>, ServiceError> {
        let operation = "find_sales";
        let ctx = self.telemetry.start(
            operation,
            vec![
                KeyValue::new("component", "order"),
                KeyValue::new("user.id", i64::from(user.user_id)),
                KeyValue::new("page", i64::from(req.page)),
            ],
        );

        match self.orders.find_by_seller(user.user_id, req).await {
            Ok((orders, total)) => {
                self.telemetry.success(
                    &ctx,
                    Method::Get,
                    operation,
                    &format!("{} of {total} sales", orders.len()),
                );
                Ok(Self::page(req, orders, total, "Sales retrieved"))
            }
            Err(e) => {
                self.telemetry
                    .error(&ctx, Method::Get, operation, &e.to_string());
                Err(e.into())
            }
        }
    }

    async fn find_by_id(
        &self,
        user: &AuthUser,
        order_id: i32,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        let operation = "find_order_by_id";
        let ctx = self.telemetry.start(
            operation,
            vec![
                KeyValue::new("component", "order"),
                KeyValue::new("order.id", i64::from(order_id)),
            ],
        );

        let order = match self.orders.find_by_id(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                self.telemetry
                    .error(&ctx, Method::Get, operation, "order not found");
                return Err(ServiceError::NotFound(format!("Order {order_id} not found")));
            }
            Err(e) => {
                self.telemetry
                    .error(&ctx, Method::Get, operation, &e.to_string());
                return Err(e.into());
            }
        };

        if order.buyer_id != user.user_id && order.seller_id != user.user_id {
            self.telemetry
                .error(&ctx, Method::Get, operation, "caller is not a party");
            return Err(ServiceError::Forbidden(
                "Order belongs to another user".to_string(),
            ));
        }

        self.telemetry
            .success(&ctx, Method::Get, operation, "order retrieved");
        Ok(ApiResponse::success("Order retrieved", order.into()))
    }
}
