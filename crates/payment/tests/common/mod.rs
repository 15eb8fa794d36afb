#![allow(dead_code)]

use async_trait::async_trait;
use payment::{
    abstract_trait::{
        order::{CompletionOutcome, OrderRepositoryTrait},
        pi::PiClientTrait,
        product::ProductRepositoryTrait,
        user::UserRepositoryTrait,
    },
    di::{DependenciesInject, DependenciesInjectDeps},
    domain::{
        auth::AuthUser,
        requests::order::{CreateOrderRecord, FindOrders},
        status::OrderStatus,
    },
    model::{order::Order, product::Product, user::User},
    pi::{CreatePiPayment, PiPayment, PiPaymentFlags, PiTransaction, PiUser, WebhookVerifier},
    state::AppState,
};
use prometheus_client::registry::Registry;
use reqwest::StatusCode;
use shared::{
    abstract_trait::{JwtServiceTrait, KafkaTrait},
    config::JwtConfig,
    errors::{ProviderError, RepositoryError, ServiceError},
    utils::Metrics,
};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

pub const SELLER_ID: i32 = 1;
pub const BUYER_ID: i32 = 2;
pub const STRANGER_ID: i32 = 3;
pub const PRODUCT_ID: i32 = 10;
pub const PRICE: f64 = 2.5;

#[derive(Default)]
struct StoreInner {
    orders: Vec<Order>,
    products: HashMap<i32, Product>,
    users: Vec<User>,
}

/// In-memory stand-in for the orders, products and users tables. One lock
/// covers everything so completion is atomic like the SQL transaction.
#[derive(Default, Clone)]
pub struct FakeStore {
    inner: Arc<Mutex<StoreInner>>,
    pub stock_decrements: Arc<AtomicUsize>,
}

impl FakeStore {
    pub fn add_product(&self, product_id: i32, seller_id: i32, price: f64, stock: i32) {
        self.inner.lock().unwrap().products.insert(
            product_id,
            Product {
                product_id,
                seller_id,
                name: format!("product-{product_id}"),
                price,
                stock,
                created_at: None,
                updated_at: None,
                deleted_at: None,
            },
        );
    }

    pub fn set_stock(&self, product_id: i32, stock: i32) {
        if let Some(p) = self.inner.lock().unwrap().products.get_mut(&product_id) {
            p.stock = stock;
        }
    }

    pub fn stock(&self, product_id: i32) -> i32 {
        self.inner.lock().unwrap().products[&product_id].stock
    }

    pub fn order(&self, payment_id: &str) -> Order {
        self.inner
            .lock()
            .unwrap()
            .orders
            .iter()
            .find(|o| o.payment_id == payment_id)
            .cloned()
            .unwrap()
    }

    pub fn set_status(&self, payment_id: &str, status: OrderStatus) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(o) = inner.orders.iter_mut().find(|o| o.payment_id == payment_id) {
            o.status = status.as_str().to_string();
        }
    }

    /// Seeds a row that already owns `payment_id`.
    pub fn seed_order(&self, payment_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        let order_id = inner.orders.len() as i32 + 1;
        inner.orders.push(Order {
            order_id,
            buyer_id: STRANGER_ID,
            seller_id: SELLER_ID,
            product_id: PRODUCT_ID,
            quantity: 1,
            amount: PRICE,
            memo: "older order".into(),
            nonce: "n".into(),
            payment_id: payment_id.to_string(),
            txid: None,
            status: OrderStatus::Created.as_str().to_string(),
            created_at: None,
            updated_at: None,
            completed_at: None,
        });
    }

    pub fn users(&self) -> Vec<User> {
        self.inner.lock().unwrap().users.clone()
    }
}

fn page(mut orders: Vec<Order>, req: &FindOrders) -> (Vec<Order>, i64) {
    orders.sort_by(|a, b| b.order_id.cmp(&a.order_id));
    let total = orders.len() as i64;
    let items = orders
        .into_iter()
        .skip(req.offset() as usize)
        .take(req.page_size as usize)
        .collect();
    (items, total)
}

#[async_trait]
impl OrderRepositoryTrait for FakeStore {
    async fn find_by_id(&self, order_id: i32) -> Result<Option<Order>, RepositoryError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.orders.iter().find(|o| o.order_id == order_id).cloned())
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, RepositoryError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .orders
            .iter()
            .find(|o| o.payment_id == payment_id)
            .cloned())
    }

    async fn find_by_buyer(
        &self,
        buyer_id: i32,
        req: &FindOrders,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let inner = self.inner.lock().unwrap();
        let mine = inner
            .orders
            .iter()
            .filter(|o| o.buyer_id == buyer_id)
            .cloned()
            .collect();
        Ok(page(mine, req))
    }

    async fn find_by_seller(
        &self,
        seller_id: i32,
        req: &FindOrders,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let inner = self.inner.lock().unwrap();
        let mine = inner
            .orders
            .iter()
            .filter(|o| o.seller_id == seller_id)
            .cloned()
            .collect();
        Ok(page(mine, req))
    }

    async fn create_order(&self, req: &CreateOrderRecord) -> Result<Order, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.orders.iter().any(|o| o.payment_id == req.payment_id) {
            return Err(RepositoryError::AlreadyExists(req.payment_id.clone()));
        }

        let order = Order {
            order_id: inner.orders.len() as i32 + 1,
            buyer_id: req.buyer_id,
            seller_id: req.seller_id,
            product_id: req.product_id,
            quantity: req.quantity,
            amount: req.amount,
            memo: req.memo.clone(),
            nonce: req.nonce.clone(),
            payment_id: req.payment_id.clone(),
            txid: None,
            status: OrderStatus::Created.as_str().to_string(),
            created_at: None,
            updated_at: None,
            completed_at: None,
        };
        inner.orders.push(order.clone());
        Ok(order)
    }

    async fn transition_status(
        &self,
        order_id: i32,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(order) = inner.orders.iter_mut().find(|o| o.order_id == order_id) else {
            return Ok(None);
        };

        if !from.iter().any(|s| s.as_str() == order.status) {
            return Ok(None);
        }

        order.status = to.as_str().to_string();
        Ok(Some(order.clone()))
    }

    async fn complete_order(
        &self,
        payment_id: &str,
        txid: &str,
    ) -> Result<CompletionOutcome, RepositoryError> {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;

        let order = inner
            .orders
            .iter_mut()
            .find(|o| o.payment_id == payment_id)
            .ok_or(RepositoryError::NotFound)?;

        let open = order.status == "CREATED" || order.status == "APPROVED";
        if order.txid.is_some() || !open {
            return Ok(CompletionOutcome::AlreadyFinalized(order.clone()));
        }

        order.txid = Some(txid.to_string());

        let product = inner
            .products
            .get_mut(&order.product_id)
            .ok_or(RepositoryError::NotFound)?;

        if product.stock < order.quantity {
            order.status = OrderStatus::Disputed.as_str().to_string();
            return Ok(CompletionOutcome::OutOfStock(order.clone()));
        }

        product.stock -= order.quantity;
        self.stock_decrements.fetch_add(1, Ordering::SeqCst);
        order.status = OrderStatus::Completed.as_str().to_string();
        Ok(CompletionOutcome::Completed(order.clone()))
    }
}

#[async_trait]
impl ProductRepositoryTrait for FakeStore {
    async fn find_by_id(&self, product_id: i32) -> Result<Option<Product>, RepositoryError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .products
            .get(&product_id)
            .filter(|p| p.deleted_at.is_none())
            .cloned())
    }
}

#[async_trait]
impl UserRepositoryTrait for FakeStore {
    async fn upsert_by_uid(&self, uid: &str, username: &str) -> Result<User, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner.users.iter_mut().find(|u| u.uid == uid) {
            user.username = username.to_string();
            return Ok(user.clone());
        }

        let user = User {
            user_id: 100 + inner.users.len() as i32,
            uid: uid.to_string(),
            username: username.to_string(),
            created_at: None,
            updated_at: None,
        };
        inner.users.push(user.clone());
        Ok(user)
    }
}

/// Pi API double. Completing a payment marks it developer-completed, signing
/// it with the given txid first if the buyer has not.
#[derive(Default, Clone)]
pub struct FakePi {
    payments: Arc<Mutex<HashMap<String, PiPayment>>>,
    users: Arc<Mutex<HashMap<String, PiUser>>>,
    pub approve_calls: Arc<AtomicUsize>,
    pub complete_calls: Arc<AtomicUsize>,
    pub cancel_calls: Arc<AtomicUsize>,
    next_id: Arc<AtomicUsize>,
    on_approve: Arc<Mutex<Option<Box<dyn FnOnce() + Send>>>>,
}

impl FakePi {
    pub fn payment(&self, payment_id: &str) -> PiPayment {
        self.payments.lock().unwrap()[payment_id].clone()
    }

    pub fn update(&self, payment_id: &str, f: impl FnOnce(&mut PiPayment)) {
        if let Some(p) = self.payments.lock().unwrap().get_mut(payment_id) {
            f(p);
        }
    }

    /// The buyer signing the blockchain transaction. Pi verifies it but only
    /// flips `developer_completed` once the server calls complete.
    pub fn sign(&self, payment_id: &str, txid: &str) {
        self.update(payment_id, |p| {
            p.status.transaction_verified = true;
            p.transaction = Some(PiTransaction {
                txid: txid.to_string(),
                verified: true,
                link: None,
            });
        });
    }

    /// Runs `f` once, while the next approve call is in flight at Pi.
    pub fn during_approve(&self, f: impl FnOnce() + Send + 'static) {
        *self.on_approve.lock().unwrap() = Some(Box::new(f));
    }

    pub fn add_user(&self, token: &str, uid: &str, username: &str) {
        self.users.lock().unwrap().insert(
            token.to_string(),
            PiUser {
                uid: uid.to_string(),
                username: username.to_string(),
            },
        );
    }

    fn lookup(&self, payment_id: &str) -> Result<PiPayment, ProviderError> {
        self.payments
            .lock()
            .unwrap()
            .get(payment_id)
            .cloned()
            .ok_or_else(|| ProviderError::Status {
                status: StatusCode::NOT_FOUND,
                body: "payment_not_found".into(),
            })
    }
}

#[async_trait]
impl PiClientTrait for FakePi {
    async fn create_payment(&self, req: &CreatePiPayment) -> Result<PiPayment, ProviderError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let payment = PiPayment {
            identifier: format!("pay_{n}"),
            user_uid: req.uid.clone(),
            amount: req.amount,
            memo: req.memo.clone(),
            metadata: req.metadata.clone(),
            from_address: None,
            to_address: None,
            direction: Some("user_to_app".into()),
            network: Some("Pi Testnet".into()),
            created_at: None,
            status: PiPaymentFlags::default(),
            transaction: None,
        };
        self.payments
            .lock()
            .unwrap()
            .insert(payment.identifier.clone(), payment.clone());
        Ok(payment)
    }

    async fn get_payment(&self, payment_id: &str) -> Result<PiPayment, ProviderError> {
        self.lookup(payment_id)
    }

    async fn approve_payment(&self, payment_id: &str) -> Result<PiPayment, ProviderError> {
        self.approve_calls.fetch_add(1, Ordering::SeqCst);
        let hook = self.on_approve.lock().unwrap().take();
        if let Some(f) = hook {
            f();
        }
        self.update(payment_id, |p| p.status.developer_approved = true);
        self.lookup(payment_id)
    }

    async fn complete_payment(
        &self,
        payment_id: &str,
        txid: &str,
    ) -> Result<PiPayment, ProviderError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        if self.lookup(payment_id)?.transaction.is_none() {
            self.sign(payment_id, txid);
        }
        self.update(payment_id, |p| p.status.developer_completed = true);
        self.lookup(payment_id)
    }

    async fn cancel_payment(&self, payment_id: &str) -> Result<PiPayment, ProviderError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.update(payment_id, |p| p.status.cancelled = true);
        self.lookup(payment_id)
    }

    async fn incomplete_payments(&self) -> Result<Vec<PiPayment>, ProviderError> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.transaction.is_some() && !p.status.developer_completed)
            .cloned()
            .collect())
    }

    async fn me(&self, access_token: &str) -> Result<PiUser, ProviderError> {
        self.users
            .lock()
            .unwrap()
            .get(access_token)
            .cloned()
            .ok_or_else(|| ProviderError::Status {
                status: StatusCode::UNAUTHORIZED,
                body: "invalid token".into(),
            })
    }
}

#[derive(Default, Clone)]
pub struct FakeKafka {
    pub sent: Arc<Mutex<Vec<(String, String, serde_json::Value)>>>,
    pub fail: bool,
}

impl FakeKafka {
    pub fn topics(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(topic, _, _)| topic.clone())
            .collect()
    }
}

#[async_trait]
impl KafkaTrait for FakeKafka {
    async fn publish(&self, topic: &str, key: &str, value: &[u8]) -> Result<(), ServiceError> {
        if self.fail {
            return Err(ServiceError::Kafka("broker down".into()));
        }
        let value = serde_json::from_slice(value).map_err(|e| ServiceError::Internal(e.to_string()))?;
        self.sent
            .lock()
            .unwrap()
            .push((topic.to_string(), key.to_string(), value));
        Ok(())
    }
}

pub struct Harness {
    pub store: FakeStore,
    pub pi: FakePi,
    pub kafka: FakeKafka,
    pub jwt: JwtConfig,
    pub verifier: WebhookVerifier,
    pub deps: DependenciesInject,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_kafka(FakeKafka::default())
    }

    pub fn with_kafka(kafka: FakeKafka) -> Self {
        let store = FakeStore::default();
        store.add_product(PRODUCT_ID, SELLER_ID, PRICE, 5);

        let pi = FakePi::default();
        let jwt = JwtConfig::new(JWT_SECRET);
        let verifier = WebhookVerifier::new(WEBHOOK_SECRET).unwrap();

        let deps = DependenciesInject::new(DependenciesInjectDeps {
            orders: Arc::new(store.clone()),
            products: Arc::new(store.clone()),
            users: Arc::new(store.clone()),
            pi: Arc::new(pi.clone()),
            kafka: Arc::new(kafka.clone()),
            jwt: Arc::new(jwt.clone()),
            verifier: verifier.clone(),
            max_payment_amount: 10_000.0,
            metrics: Arc::new(Metrics::new()),
        });

        Self {
            store,
            pi,
            kafka,
            jwt,
            verifier,
            deps,
        }
    }

    pub fn buyer() -> AuthUser {
        AuthUser {
            user_id: BUYER_ID,
            uid: "uid-buyer".into(),
        }
    }

    pub fn seller() -> AuthUser {
        AuthUser {
            user_id: SELLER_ID,
            uid: "uid-seller".into(),
        }
    }

    pub fn stranger() -> AuthUser {
        AuthUser {
            user_id: STRANGER_ID,
            uid: "uid-stranger".into(),
        }
    }

    pub fn token_for(&self, user: &AuthUser) -> String {
        self.jwt
            .generate_token(user.user_id, &user.uid, "access")
            .unwrap()
    }

    pub fn app_state(&self) -> Arc<AppState> {
        Arc::new(AppState::from_parts(
            self.deps.clone(),
            Arc::new(self.jwt.clone()),
            Registry::default(),
        ))
    }

    /// Creates a payment for `quantity` units and returns its identifier.
    pub async fn create(&self, quantity: i32) -> String {
        use payment::domain::requests::pi::CreatePaymentRequest;

        self.deps
            .payment_service
            .create_payment(
                &Self::buyer(),
                &CreatePaymentRequest {
                    product_id: PRODUCT_ID,
                    quantity,
                    memo: "Handmade mug".into(),
                },
            )
            .await
            .unwrap()
            .data
            .payment_id
    }

    /// Created, approved and signed by the buyer with `txid`.
    pub async fn signed(&self, quantity: i32, txid: &str) -> String {
        let payment_id = self.create(quantity).await;
        self.deps
            .payment_service
            .approve_payment(&Self::buyer(), &payment_id)
            .await
            .unwrap();
        self.pi.sign(&payment_id, txid);
        payment_id
    }
}
