use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use payment::{
    abstract_trait::pi::PiClientTrait,
    config::PiConfig,
    pi::{CreatePiPayment, MAX_ATTEMPTS, PaymentState, PiClient},
};
use serde_json::{Value, json};
use shared::{errors::ProviderError, utils::Metrics};
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};
use tokio::net::TcpListener;

/// Status codes the fake provider answers with, one per request. Once the
/// script runs out every request succeeds.
#[derive(Clone, Default)]
struct Provider {
    hits: Arc<AtomicU32>,
    script: Arc<Mutex<Vec<u16>>>,
    last_auth: Arc<Mutex<Option<String>>>,
    last_body: Arc<Mutex<Option<Value>>>,
}

impl Provider {
    fn scripted(codes: &[u16]) -> Self {
        let provider = Self::default();
        *provider.script.lock().unwrap() = codes.iter().rev().copied().collect();
        provider
    }

    fn observe(&self, headers: &HeaderMap) -> Option<StatusCode> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        *self.last_auth.lock().unwrap() = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        self.script
            .lock()
            .unwrap()
            .pop()
            .map(|code| StatusCode::from_u16(code).unwrap())
    }
}

fn payment_json(id: &str, completed: bool) -> Value {
    json!({
        "identifier": id,
        "user_uid": "uid-buyer",
        "amount": 2.5,
        "memo": "Handmade mug",
        "metadata": {},
        "status": {
            "developer_approved": true,
            "transaction_verified": completed,
            "developer_completed": completed,
            "cancelled": false,
            "user_cancelled": false
        },
        "transaction": if completed { json!({ "txid": "tx_1", "verified": true }) } else { Value::Null }
    })
}

async fn get_payment(
    State(p): State<Provider>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    match p.observe(&headers) {
        Some(code) => (code, "scripted failure").into_response(),
        None => Json(payment_json(&id, false)).into_response(),
    }
}

async fn complete_payment(
    State(p): State<Provider>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    *p.last_body.lock().unwrap() = Some(body);
    match p.observe(&headers) {
        Some(code) => (code, "scripted failure").into_response(),
        None => Json(payment_json(&id, true)).into_response(),
    }
}

async fn create_payment(
    State(p): State<Provider>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    *p.last_body.lock().unwrap() = Some(body);
    match p.observe(&headers) {
        Some(code) => (code, "scripted failure").into_response(),
        None => Json(payment_json("pay_new", false)).into_response(),
    }
}

async fn me(State(p): State<Provider>, headers: HeaderMap) -> Response {
    match p.observe(&headers) {
        Some(code) => (code, "scripted failure").into_response(),
        None => Json(json!({ "uid": "uid-buyer", "username": "pioneer" })).into_response(),
    }
}

async fn incomplete(State(p): State<Provider>, headers: HeaderMap) -> Response {
    match p.observe(&headers) {
        Some(code) => (code, "scripted failure").into_response(),
        None => {
            let mut signed = payment_json("pay_9", false);
            signed["transaction"] = json!({ "txid": "tx_9", "verified": true });
            Json(json!({ "incomplete_server_payments": [signed] })).into_response()
        }
    }
}

async fn garbage(State(p): State<Provider>, headers: HeaderMap) -> Response {
    p.observe(&headers);
    (StatusCode::OK, "not json").into_response()
}

async fn spawn(provider: Provider) -> PiClient {
    let app = Router::new()
        .route("/v2/payments", post(create_payment))
        .route("/v2/payments/incomplete_server_payments", get(incomplete))
        .route("/v2/payments/{id}", get(get_payment))
        .route("/v2/payments/{id}/complete", post(complete_payment))
        .route("/v2/payments/{id}/cancel", post(garbage))
        .route("/v2/me", get(me))
        .with_state(provider);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = PiConfig {
        api_key: "server-key".into(),
        base_url: format!("http://{addr}/"),
        webhook_secret: "secret".into(),
        max_payment_amount: 10_000.0,
        retry_delay: Duration::from_millis(5),
        timeout: Duration::from_secs(5),
    };

    PiClient::new(&config, None, Arc::new(Metrics::new())).unwrap()
}

#[tokio::test]
async fn succeeds_first_time_with_server_key() {
    let provider = Provider::default();
    let client = spawn(provider.clone()).await;

    let payment = client.get_payment("pay_1").await.unwrap();

    assert_eq!(payment.identifier, "pay_1");
    assert_eq!(payment.state(), PaymentState::Pending);
    assert_eq!(provider.hits.load(Ordering::SeqCst), 1);
    assert_eq!(
        provider.last_auth.lock().unwrap().as_deref(),
        Some("Key server-key")
    );
}

#[tokio::test]
async fn retries_server_errors_until_success() {
    let provider = Provider::scripted(&[500, 429]);
    let client = spawn(provider.clone()).await;

    let payment = client.get_payment("pay_1").await.unwrap();

    assert_eq!(payment.identifier, "pay_1");
    assert_eq!(provider.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let provider = Provider::scripted(&[503, 503, 503, 503]);
    let client = spawn(provider.clone()).await;

    let err = client.get_payment("pay_1").await.unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    assert_eq!(provider.hits.load(Ordering::SeqCst), MAX_ATTEMPTS);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let provider = Provider::scripted(&[400]);
    let client = spawn(provider.clone()).await;

    let err = client
        .complete_payment("pay_1", "tx_1")
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(provider.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn complete_sends_txid() {
    let provider = Provider::default();
    let client = spawn(provider.clone()).await;

    let payment = client.complete_payment("pay_1", "tx_1").await.unwrap();

    assert_eq!(payment.state(), PaymentState::Completed);
    assert_eq!(payment.txid(), Some("tx_1"));
    assert_eq!(
        provider.last_body.lock().unwrap().clone(),
        Some(json!({ "txid": "tx_1" }))
    );
}

#[tokio::test]
async fn create_wraps_payment_body() {
    let provider = Provider::default();
    let client = spawn(provider.clone()).await;

    client
        .create_payment(&CreatePiPayment {
            amount: 2.5,
            memo: "Handmade mug".into(),
            metadata: json!({ "nonce": "n1" }),
            uid: "uid-buyer".into(),
        })
        .await
        .unwrap();

    let body = provider.last_body.lock().unwrap().clone().unwrap();
    assert_eq!(body["payment"]["amount"], 2.5);
    assert_eq!(body["payment"]["uid"], "uid-buyer");
    assert_eq!(body["payment"]["metadata"]["nonce"], "n1");
}

#[tokio::test]
async fn me_uses_user_bearer_token() {
    let provider = Provider::default();
    let client = spawn(provider.clone()).await;

    let user = client.me("user-token").await.unwrap();

    assert_eq!(user.username, "pioneer");
    assert_eq!(
        provider.last_auth.lock().unwrap().as_deref(),
        Some("Bearer user-token")
    );
}

#[tokio::test]
async fn undecodable_body_is_not_retried() {
    let provider = Provider::default();
    let client = spawn(provider.clone()).await;

    let err = client.cancel_payment("pay_1").await.unwrap_err();

    assert!(matches!(err, ProviderError::Decode(_)));
    assert_eq!(provider.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn lists_incomplete_server_payments() {
    let provider = Provider::default();
    let client = spawn(provider.clone()).await;

    let pending = client.incomplete_payments().await.unwrap();

    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].identifier, "pay_9");
    assert_eq!(pending[0].txid(), Some("tx_9"));
    assert_eq!(pending[0].state(), PaymentState::Pending);
}
