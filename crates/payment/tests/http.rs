mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use common::{Harness, PRODUCT_ID};
use payment::handler::{AppRouter, SIGNATURE_HEADER};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn body_json(res: axum::response::Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn webhook(body: impl Into<Body>, signature: Option<&str>) -> Request<Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri("/api/pi/webhook")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        req = req.header(SIGNATURE_HEADER, signature);
    }
    req.body(body.into()).unwrap()
}

#[tokio::test]
async fn webhook_without_signature_is_unauthorized() {
    let h = Harness::new();
    let app = AppRouter::build(h.app_state());

    let body = json!({ "paymentId": "pay_1", "txid": "tx_1" }).to_string();
    let res = app.oneshot(webhook(body, None)).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_with_bad_signature_is_unauthorized() {
    let h = Harness::new();
    let payment_id = h.signed(1, "tx_1").await;
    let app = AppRouter::build(h.app_state());

    let forged = h.verifier.sign(&payment_id, "tx_other");
    let body = json!({ "paymentId": payment_id, "txid": "tx_1" }).to_string();
    let res = app.oneshot(webhook(body, Some(&forged))).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(h.store.stock(PRODUCT_ID), 5);
}

#[tokio::test]
async fn webhook_with_malformed_body_is_bad_request() {
    let h = Harness::new();
    let app = AppRouter::build(h.app_state());

    let res = app
        .oneshot(webhook("{\"paymentId\": 7", Some("abcd")))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signed_webhook_completes_order() {
    let h = Harness::new();
    let payment_id = h.signed(2, "tx_1").await;
    let app = AppRouter::build(h.app_state());

    let signature = h.verifier.sign(&payment_id, "tx_1");
    let body = json!({ "paymentId": payment_id, "txid": "tx_1" }).to_string();
    let res = app.oneshot(webhook(body, Some(&signature))).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["status"], "COMPLETED");
    assert_eq!(h.store.stock(PRODUCT_ID), 3);
}

#[tokio::test]
async fn webhook_processing_failure_is_still_acknowledged() {
    let h = Harness::new();
    let app = AppRouter::build(h.app_state());

    let signature = h.verifier.sign("pay_unknown", "tx_1");
    let body = json!({ "paymentId": "pay_unknown", "txid": "tx_1" }).to_string();
    let res = app.oneshot(webhook(body, Some(&signature))).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "accepted");
    assert_eq!(json["message"], "Webhook received");
}

#[tokio::test]
async fn protected_routes_require_token() {
    let h = Harness::new();
    let app = AppRouter::build(h.app_state());

    let res = app
        .oneshot(
            Request::builder()
                .uri("/api/orders")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let app = AppRouter::build(h.app_state());
    let res = app
        .oneshot(
            Request::builder()
                .uri("/api/orders")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bearer_token_reaches_payment_routes() {
    let h = Harness::new();
    let token = h.token_for(&Harness::buyer());
    let app = AppRouter::build(h.app_state());

    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/pi/payments")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "product_id": PRODUCT_ID, "quantity": 2, "memo": "Mug" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CREATED);
    let json = body_json(res).await;
    assert_eq!(json["data"]["status"], "CREATED");
    assert_eq!(json["data"]["amount"], 5.0);
}

#[tokio::test]
async fn invalid_payment_body_is_rejected() {
    let h = Harness::new();
    let token = h.token_for(&Harness::buyer());
    let app = AppRouter::build(h.app_state());

    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/pi/payments")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "product_id": PRODUCT_ID, "quantity": 0, "memo": "Mug" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = body_json(res).await;
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn stranger_gets_forbidden_on_payment_status() {
    let h = Harness::new();
    let payment_id = h.create(1).await;
    let token = h.token_for(&Harness::stranger());
    let app = AppRouter::build(h.app_state());

    let res = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/pi/payments/{payment_id}"))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_is_public() {
    let h = Harness::new();
    let app = AppRouter::build(h.app_state());

    let res = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
}
