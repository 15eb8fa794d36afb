use crate::{
    abstract_trait::{
        order::{CompletionOutcome, DynOrderRepository},
        payment::PaymentServiceTrait,
        pi::DynPiClient,
        product::DynProductRepository,
    },
    domain::{
        auth::AuthUser,
        event::PaymentEvent,
        requests::{
            order::CreateOrderRecord,
            pi::{CreatePaymentRequest, WebhookPayload},
        },
        response::{api::ApiResponse, order::OrderResponse, payment::PaymentStatusResponse},
        status::OrderStatus,
    },
    model::order::Order as OrderModel,
    pi::{CreatePiPayment, PaymentState, PiPayment, WebhookVerifier},
    service::telemetry::ServiceTelemetry,
};
use async_trait::async_trait;
use opentelemetry::KeyValue;
use serde_json::json;
use shared::{
    abstract_trait::DynKafka,
    errors::ServiceError,
    utils::{Method, Metrics, PaymentStage, generate_random_string},
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Largest tolerated difference between the local total and the provider amount.
pub const AMOUNT_EPSILON: f64 = 0.01;
pub const MIN_PAYMENT_AMOUNT: f64 = 0.01;
const MEMO_MAX_CHARS: usize = 200;
const NONCE_LEN: usize = 32;

/// Pi amounts carry at most seven decimals.
pub fn round_amount(value: f64) -> f64 {
    (value * 1e7).round() / 1e7
}

pub fn amounts_match(expected: f64, actual: f64) -> bool {
    (expected - actual).abs() <= AMOUNT_EPSILON + 1e-9
}

pub struct PaymentServiceDeps {
    pub orders: DynOrderRepository,
    pub products: DynProductRepository,
    pub pi: DynPiClient,
    pub kafka: DynKafka,
    pub verifier: WebhookVerifier,
    pub max_payment_amount: f64,
    pub metrics: Arc<Metrics>,
}

#[derive(Clone)]
pub struct PaymentService {
    orders: DynOrderRepository,
    products: DynProductRepository,
    pi: DynPiClient,
    kafka: DynKafka,
    verifier: WebhookVerifier,
    max_payment_amount: f64,
    telemetry: ServiceTelemetry,
}

impl PaymentService {
    pub fn new(deps: PaymentServiceDeps) -> Self {
        let PaymentServiceDeps {
            orders,
            products,
            pi,
            kafka,
            verifier,
            max_payment_amount,
            metrics,
        } = deps;

        Self {
            orders,
            products,
            pi,
            kafka,
            verifier,
            max_payment_amount,
            telemetry: ServiceTelemetry::new("payment-service", metrics),
        }
    }

    async fn traced<T, F>(
        &self,
        operation: &str,
        method: Method,
        attributes: Vec<KeyValue>,
        fut: F,
    ) -> Result<T, ServiceError>
    where
        F: std::future::Future<Output = Result<T, ServiceError>>,
    {
        let ctx = self.telemetry.start(operation, attributes);
        let result = fut.await;

        match &result {
            Ok(_) => self.telemetry.success(&ctx, method, operation, "ok"),
            Err(e) => self.telemetry.error(&ctx, method, operation, &e.to_string()),
        }

        result
    }

    async fn load_order(&self, payment_id: &str) -> Result<OrderModel, ServiceError> {
        self.orders
            .find_by_payment_id(payment_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("No order for payment {payment_id}")))
    }

    fn status_of(order: &OrderModel) -> Result<OrderStatus, ServiceError> {
        order
            .status
            .parse()
            .map_err(|e| ServiceError::Internal(format!("order {}: {e}", order.order_id)))
    }

    fn ensure_buyer(order: &OrderModel, user: &AuthUser) -> Result<(), ServiceError> {
        if order.buyer_id != user.user_id {
            return Err(ServiceError::Forbidden(
                "Only the buyer may act on this payment".to_string(),
            ));
        }
        Ok(())
    }

    fn ensure_amount(order: &OrderModel, payment: &PiPayment) -> Result<(), ServiceError> {
        if !amounts_match(order.amount, payment.amount) {
            warn!(
                "💸 Amount mismatch on {}: order {} vs provider {}",
                order.payment_id, order.amount, payment.amount
            );
            return Err(ServiceError::AmountMismatch {
                expected: order.amount,
                actual: payment.amount,
            });
        }
        Ok(())
    }

    async fn publish(&self, event: PaymentEvent) {
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to encode {:?}: {e}", event);
                return;
            }
        };

        if let Err(e) = self
            .kafka
            .publish(event.topic(), &event.order_id().to_string(), &payload)
            .await
        {
            warn!("📭 Dropping {} event for order {}: {e}", event.topic(), event.order_id());
        }
    }

    fn already_settled(
        order: OrderModel,
        txid: &str,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        match order.txid.as_deref() {
            Some(existing) if existing == txid => {
                info!("🔁 Payment {} already settled with {txid}", order.payment_id);
                Ok(ApiResponse::success("Payment already completed", order.into()))
            }
            Some(_) => Err(ServiceError::Conflict(format!(
                "Payment {} is already settled with a different txid",
                order.payment_id
            ))),
            None => Err(ServiceError::InvalidPaymentState(format!(
                "Order {} is {}",
                order.order_id, order.status
            ))),
        }
    }

    /// Verifies the provider view and performs the completion write. Shared by
    /// the client and webhook paths.
    async fn settle(
        &self,
        order: OrderModel,
        payment: &PiPayment,
        txid: &str,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        if payment.state() != PaymentState::Completed {
            return Err(ServiceError::InvalidPaymentState(format!(
                "Provider reports payment {} as {:?}",
                payment.identifier,
                payment.state()
            )));
        }

        match payment.txid() {
            Some(reported) if reported == txid => {}
            Some(_) => {
                return Err(ServiceError::Conflict(format!(
                    "Provider txid for payment {} does not match",
                    payment.identifier
                )));
            }
            None => {
                return Err(ServiceError::InvalidPaymentState(format!(
                    "Provider payment {} has no transaction",
                    payment.identifier
                )));
            }
        }

        Self::ensure_amount(&order, payment)?;

        match self.orders.complete_order(&order.payment_id, txid).await? {
            CompletionOutcome::Completed(done) => {
                self.telemetry
                    .metrics()
                    .record_transition(PaymentStage::Completed);
                self.publish(PaymentEvent::Completed {
                    order_id: done.order_id,
                    payment_id: done.payment_id.clone(),
                    txid: txid.to_string(),
                    product_id: done.product_id,
                    quantity: done.quantity,
                    seller_id: done.seller_id,
                })
                .await;

                Ok(ApiResponse::success("Payment completed", done.into()))
            }
            CompletionOutcome::OutOfStock(disputed) => {
                self.telemetry
                    .metrics()
                    .record_transition(PaymentStage::Disputed);
                self.publish(PaymentEvent::Disputed {
                    order_id: disputed.order_id,
                    payment_id: disputed.payment_id.clone(),
                    txid: txid.to_string(),
                    reason: "insufficient stock at completion".to_string(),
                })
                .await;

                Ok(ApiResponse::success(
                    "Payment received but stock ran out; order disputed",
                    disputed.into(),
                ))
            }
            CompletionOutcome::AlreadyFinalized(current) => Self::already_settled(current, txid),
        }
    }

    /// The buyer signing the transaction only marks it verified. The provider
    /// reports COMPLETED once we call `/complete`, so a verified payment that
    /// carries `txid` is completed here before settling.
    async fn finish_signed(
        &self,
        order: OrderModel,
        payment: PiPayment,
        txid: &str,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        let payment = if payment.state() == PaymentState::Pending
            && payment.status.transaction_verified
            && payment.txid() == Some(txid)
        {
            info!("✍️ Completing buyer-signed payment {} with {txid}", payment.identifier);
            self.pi.complete_payment(&payment.identifier, txid).await?
        } else {
            payment
        };

        self.settle(order, &payment, txid).await
    }

    async fn create(
        &self,
        buyer: &AuthUser,
        req: &CreatePaymentRequest,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        let memo = req.memo.trim();
        let mut problems = Vec::new();
        if memo.is_empty() || memo.chars().count() > MEMO_MAX_CHARS {
            problems.push(format!("memo must be 1 to {MEMO_MAX_CHARS} characters"));
        }
        if req.quantity < 1 {
            problems.push("quantity must be at least 1".to_string());
        }
        if !problems.is_empty() {
            return Err(ServiceError::Validation(problems));
        }

        let product = self
            .products
            .find_by_id(req.product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", req.product_id)))?;

        if product.seller_id == buyer.user_id {
            return Err(ServiceError::Validation(vec![
                "cannot purchase your own product".to_string(),
            ]));
        }

        if product.stock < req.quantity {
            return Err(ServiceError::InsufficientStock {
                requested: req.quantity,
                available: product.stock,
            });
        }

        let amount = round_amount(product.price * f64::from(req.quantity));
        if !(MIN_PAYMENT_AMOUNT..=self.max_payment_amount).contains(&amount) {
            return Err(ServiceError::Validation(vec![format!(
                "amount {amount} must be between {MIN_PAYMENT_AMOUNT} and {}",
                self.max_payment_amount
            )]));
        }

        let nonce = generate_random_string(NONCE_LEN)
            .map_err(|e| ServiceError::Internal(format!("nonce generation failed: {e}")))?;

        let payment = self
            .pi
            .create_payment(&CreatePiPayment {
                amount,
                memo: memo.to_string(),
                metadata: json!({
                    "nonce": nonce,
                    "product_id": product.product_id,
                    "buyer_id": buyer.user_id,
                    "quantity": req.quantity,
                }),
                uid: buyer.uid.clone(),
            })
            .await?;

        let inserted = self
            .orders
            .create_order(&CreateOrderRecord {
                buyer_id: buyer.user_id,
                seller_id: product.seller_id,
                product_id: product.product_id,
                quantity: req.quantity,
                amount,
                memo: memo.to_string(),
                nonce,
                payment_id: payment.identifier.clone(),
            })
            .await;

        let order = match inserted {
            Ok(order) => order,
            Err(err) => {
                error!(
                    "❌ Order insert failed for Pi payment {}, cancelling it: {err}",
                    payment.identifier
                );
                if let Err(cancel_err) = self.pi.cancel_payment(&payment.identifier).await {
                    error!(
                        "❌ Pi payment {} left pending without an order: {cancel_err}",
                        payment.identifier
                    );
                }
                return Err(err.into());
            }
        };

        self.telemetry
            .metrics()
            .record_transition(PaymentStage::Created);

        Ok(ApiResponse::success("Payment created", order.into()))
    }

    async fn approve(
        &self,
        buyer: &AuthUser,
        payment_id: &str,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        let order = self.load_order(payment_id).await?;
        Self::ensure_buyer(&order, buyer)?;

        match Self::status_of(&order)? {
            OrderStatus::Approved => {
                return Ok(ApiResponse::success("Payment already approved", order.into()));
            }
            OrderStatus::Created => {}
            other => {
                return Err(ServiceError::InvalidPaymentState(format!(
                    "Order {} is {other}",
                    order.order_id
                )));
            }
        }

        let payment = self.pi.get_payment(payment_id).await?;
        if payment.state() != PaymentState::Pending {
            return Err(ServiceError::InvalidPaymentState(format!(
                "Provider reports payment {payment_id} as {:?}",
                payment.state()
            )));
        }
        Self::ensure_amount(&order, &payment)?;

        let product = self
            .products
            .find_by_id(order.product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product is no longer available".to_string()))?;

        if product.stock < order.quantity {
            return Err(ServiceError::InsufficientStock {
                requested: order.quantity,
                available: product.stock,
            });
        }

        self.pi.approve_payment(payment_id).await?;

        let approved = match self
            .orders
            .transition_status(order.order_id, &[OrderStatus::Created], OrderStatus::Approved)
            .await?
        {
            Some(approved) => approved,
            None => {
                let current = self.load_order(payment_id).await?;
                if Self::status_of(&current)? == OrderStatus::Approved {
                    return Ok(ApiResponse::success("Payment already approved", current.into()));
                }
                error!(
                    "❌ Pi payment {payment_id} approved but order {} is now {}; needs reconciliation",
                    current.order_id, current.status
                );
                return Err(ServiceError::Conflict(format!(
                    "Order {} changed to {} during approval",
                    current.order_id, current.status
                )));
            }
        };

        self.telemetry
            .metrics()
            .record_transition(PaymentStage::Approved);
        self.publish(PaymentEvent::Approved {
            order_id: approved.order_id,
            payment_id: approved.payment_id.clone(),
            buyer_id: approved.buyer_id,
            amount: approved.amount,
        })
        .await;

        Ok(ApiResponse::success("Payment approved", approved.into()))
    }

    async fn complete(
        &self,
        buyer: &AuthUser,
        payment_id: &str,
        txid: &str,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        let txid = txid.trim();
        if txid.is_empty() {
            return Err(ServiceError::Validation(vec!["txid is required".to_string()]));
        }

        let order = self.load_order(payment_id).await?;
        Self::ensure_buyer(&order, buyer)?;

        if order.txid.is_some() {
            return Self::already_settled(order, txid);
        }

        let status = Self::status_of(&order)?;
        if !status.is_open() {
            return Err(ServiceError::InvalidPaymentState(format!(
                "Order {} is {status}",
                order.order_id
            )));
        }

        let payment = self.pi.complete_payment(payment_id, txid).await?;
        self.settle(order, &payment, txid).await
    }

    async fn cancel(
        &self,
        buyer: &AuthUser,
        payment_id: &str,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        let order = self.load_order(payment_id).await?;
        Self::ensure_buyer(&order, buyer)?;

        if order.txid.is_some() {
            return Err(ServiceError::InvalidPaymentState(format!(
                "Payment {payment_id} already has a blockchain transaction"
            )));
        }

        let status = Self::status_of(&order)?;
        if !status.is_open() {
            return Err(ServiceError::InvalidPaymentState(format!(
                "Order {} is {status}",
                order.order_id
            )));
        }

        self.pi.cancel_payment(payment_id).await?;

        let cancelled = self
            .orders
            .transition_status(
                order.order_id,
                &[OrderStatus::Created, OrderStatus::Approved],
                OrderStatus::Cancelled,
            )
            .await?
            .ok_or_else(|| {
                ServiceError::Conflict(format!(
                    "Order {} changed state during cancellation",
                    order.order_id
                ))
            })?;

        self.telemetry
            .metrics()
            .record_transition(PaymentStage::Cancelled);
        self.publish(PaymentEvent::Cancelled {
            order_id: cancelled.order_id,
            payment_id: cancelled.payment_id.clone(),
        })
        .await;

        Ok(ApiResponse::success("Payment cancelled", cancelled.into()))
    }

    async fn status(
        &self,
        user: &AuthUser,
        payment_id: &str,
    ) -> Result<ApiResponse<PaymentStatusResponse>, ServiceError> {
        let order = self.load_order(payment_id).await?;
        if order.buyer_id != user.user_id && order.seller_id != user.user_id {
            return Err(ServiceError::Forbidden(
                "Payment belongs to another user".to_string(),
            ));
        }

        let payment = self.pi.get_payment(payment_id).await?;

        Ok(ApiResponse::success(
            "Payment status retrieved",
            PaymentStatusResponse {
                order: order.into(),
                provider_state: payment.state(),
                payment,
            },
        ))
    }

    async fn webhook(
        &self,
        payload: &WebhookPayload,
        signature: &str,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        if !self
            .verifier
            .verify(&payload.payment_id, &payload.txid, signature)
        {
            warn!("🚫 Rejected webhook for {} with bad signature", payload.payment_id);
            return Err(ServiceError::InvalidSignature);
        }

        let order = self.load_order(&payload.payment_id).await?;
        if order.txid.is_some() {
            return Self::already_settled(order, &payload.txid);
        }

        let status = Self::status_of(&order)?;
        if !status.is_open() {
            return Err(ServiceError::InvalidPaymentState(format!(
                "Order {} is {status}",
                order.order_id
            )));
        }

        let payment = self.pi.get_payment(&payload.payment_id).await?;
        self.finish_signed(order, payment, &payload.txid).await
    }

    /// `true` when the payment was settled locally by this pass.
    async fn reconcile_one(&self, payment: PiPayment) -> Result<bool, ServiceError> {
        let Some(txid) = payment.txid().map(str::to_owned) else {
            return Ok(false);
        };

        let Some(order) = self.orders.find_by_payment_id(&payment.identifier).await? else {
            warn!("⚠️ Pi payment {} has no local order", payment.identifier);
            return Ok(false);
        };

        if order.txid.is_some() {
            // recorded locally, provider side still open
            Self::already_settled(order, &txid)?;
            self.pi.complete_payment(&payment.identifier, &txid).await?;
            return Ok(false);
        }

        let status = Self::status_of(&order)?;
        if !status.is_open() {
            warn!(
                "⚠️ Pi payment {} is signed but order {} is {status}",
                payment.identifier, order.order_id
            );
            return Ok(false);
        }

        self.finish_signed(order, payment, &txid).await?;
        Ok(true)
    }

    async fn reconcile(&self) -> Result<usize, ServiceError> {
        let pending = self.pi.incomplete_payments().await?;
        info!("🔎 {} incomplete Pi payment(s) to reconcile", pending.len());

        let mut settled = 0;
        for payment in pending {
            let payment_id = payment.identifier.clone();
            match self.reconcile_one(payment).await {
                Ok(true) => settled += 1,
                Ok(false) => {}
                Err(e) => error!("❌ Could not reconcile Pi payment {payment_id}: {e}"),
            }
        }

        Ok(settled)
    }
}

#[async_trait]
impl PaymentServiceTrait for PaymentService {
    async fn create_payment(
        &self,
        buyer: &AuthUser,
        req: &CreatePaymentRequest,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        info!(
            "🛒 Creating payment for product {} x{} by user {}",
            req.product_id, req.quantity, buyer.user_id
        );

        self.traced(
            "create_payment",
            Method::Post,
            vec![
                KeyValue::new("component", "payment"),
                KeyValue::new("buyer.id", i64::from(buyer.user_id)),
                KeyValue::new("product.id", i64::from(req.product_id)),
            ],
            self.create(buyer, req),
        )
        .await
    }

    async fn approve_payment(
        &self,
        buyer: &AuthUser,
        payment_id: &str,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        self.traced(
            "approve_payment",
            Method::Post,
            vec![
                KeyValue::new("component", "payment"),
                KeyValue::new("payment.id", payment_id.to_string()),
            ],
            self.approve(buyer, payment_id),
        )
        .await
    }

    async fn complete_payment(
        &self,
        buyer: &AuthUser,
        payment_id: &str,
        txid: &str,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        self.traced(
            "complete_payment",
            Method::Post,
            vec![
                KeyValue::new("component", "payment"),
                KeyValue::new("payment.id", payment_id.to_string()),
                KeyValue::new("payment.txid", txid.to_string()),
            ],
            self.complete(buyer, payment_id, txid),
        )
        .await
    }

    async fn cancel_payment(
        &self,
        buyer: &AuthUser,
        payment_id: &str,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        self.traced(
            "cancel_payment",
            Method::Post,
            vec![
                KeyValue::new("component", "payment"),
                KeyValue::new("payment.id", payment_id.to_string()),
            ],
            self.cancel(buyer, payment_id),
        )
        .await
    }

    async fn payment_status(
        &self,
        user: &AuthUser,
        payment_id: &str,
    ) -> Result<ApiResponse<PaymentStatusResponse>, ServiceError> {
        self.traced(
            "payment_status",
            Method::Get,
            vec![
                KeyValue::new("component", "payment"),
                KeyValue::new("payment.id", payment_id.to_string()),
            ],
            self.status(user, payment_id),
        )
        .await
    }

    async fn handle_webhook(
        &self,
        payload: &WebhookPayload,
        signature: &str,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        self.traced(
            "handle_webhook",
            Method::Post,
            vec![
                KeyValue::new("component", "webhook"),
                KeyValue::new("payment.id", payload.payment_id.clone()),
            ],
            self.webhook(payload, signature),
        )
        .await
    }

    async fn reconcile_incomplete(&self) -> Result<usize, ServiceError> {
        self.traced(
            "reconcile_incomplete",
            Method::Post,
            vec![KeyValue::new("component", "reconciler")],
            self.reconcile(),
        )
        .await
    }
}
