use crate::{
    abstract_trait::pi::PiClientTrait,
    config::PiConfig,
    pi::dto::{CreatePiPayment, PiPayment, PiUser},
};
use async_trait::async_trait;
use opentelemetry::{
    Context, KeyValue, global,
    trace::{SpanKind, Status as SpanStatus, TraceContextExt, Tracer},
};
use reqwest::{
    Client, Method, RequestBuilder,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use shared::{
    cache::CacheStore,
    errors::ProviderError,
    utils::{HeaderInjector, Metrics, ProviderCall, Status},
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

/// Total attempts per provider call, the first one included.
pub const MAX_ATTEMPTS: u32 = 3;

const PAYMENT_CACHE_TTL: Duration = Duration::from_secs(300);

enum Auth<'a> {
    ServerKey,
    UserToken(&'a str),
}

#[derive(Clone)]
pub struct PiClient {
    http: Client,
    base_url: String,
    api_key: String,
    retry_delay: Duration,
    cache: Option<CacheStore>,
    metrics: Arc<Metrics>,
}

impl PiClient {
    pub fn new(
        config: &PiConfig,
        cache: Option<CacheStore>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            retry_delay: config.retry_delay,
            cache,
            metrics,
        })
    }

    fn cache_key(payment_id: &str) -> String {
        format!("payment:{payment_id}")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn trace_headers(cx: &Context) -> HeaderMap {
        let mut headers = HeaderMap::new();
        global::get_text_map_propagator(|propagator| {
            propagator.inject_context(cx, &mut HeaderInjector(&mut headers))
        });
        headers
    }

    fn request<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        auth: &Auth<'_>,
        body: Option<&B>,
        cx: &Context,
    ) -> Result<RequestBuilder, ProviderError> {
        let credential = match auth {
            Auth::ServerKey => format!("Key {}", self.api_key),
            Auth::UserToken(token) => format!("Bearer {token}"),
        };
        let credential = HeaderValue::from_str(&credential)
            .map_err(|e| ProviderError::Decode(format!("invalid credential header: {e}")))?;

        let mut builder = self
            .http
            .request(method, self.url(path))
            .headers(Self::trace_headers(cx))
            .header(AUTHORIZATION, credential);

        if let Some(body) = body {
            builder = builder.json(body);
        }

        Ok(builder)
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ProviderError> {
        let response = builder.send().await.map_err(ProviderError::transport)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let bytes = response.bytes().await.map_err(ProviderError::transport)?;
        serde_json::from_slice(&bytes).map_err(|e| ProviderError::Decode(e.to_string()))
    }

    /// Sends with up to `MAX_ATTEMPTS` attempts, sleeping `retry_delay * n`
    /// after the n-th retryable failure.
    async fn call<T, B>(
        &self,
        call: ProviderCall,
        method: Method,
        path: &str,
        auth: Auth<'_>,
        body: Option<&B>,
    ) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let tracer = global::tracer("pi-client");
        let span = tracer
            .span_builder(format!("pi {method} {path}"))
            .with_kind(SpanKind::Client)
            .with_attributes(vec![
                KeyValue::new("http.method", method.to_string()),
                KeyValue::new("pi.path", path.to_string()),
            ])
            .start(&tracer);
        let cx = Context::current_with_span(span);

        let mut attempt = 1;
        let result = loop {
            let builder = self.request(method.clone(), path, &auth, body, &cx)?;

            match self.send_once::<T>(builder).await {
                Ok(value) => break Ok(value),
                Err(err) if attempt < MAX_ATTEMPTS && err.is_retryable() => {
                    let delay = self.retry_delay * attempt;
                    warn!(
                        "🔁 Pi API {method} {path} failed on attempt {attempt}/{MAX_ATTEMPTS}: {err}; retrying in {delay:?}"
                    );
                    self.metrics.provider_retries.inc();
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => break Err(err),
            }
        };

        let span = cx.span();
        span.set_attribute(KeyValue::new("pi.attempts", i64::from(attempt)));
        match &result {
            Ok(_) => {
                self.metrics.record_provider(call, Status::Success);
                span.set_status(SpanStatus::Ok);
            }
            Err(err) => {
                self.metrics.record_provider(call, Status::Error);
                span.set_status(SpanStatus::error(err.to_string()));
            }
        }
        span.end();

        result
    }

    async fn remember(&self, payment: &PiPayment) {
        let Some(cache) = &self.cache else {
            return;
        };

        if payment.state().is_terminal() {
            cache
                .set(&Self::cache_key(&payment.identifier), payment, PAYMENT_CACHE_TTL)
                .await;
        } else {
            cache.delete(&Self::cache_key(&payment.identifier)).await;
        }
    }
}

#[async_trait]
impl PiClientTrait for PiClient {
    async fn create_payment(&self, req: &CreatePiPayment) -> Result<PiPayment, ProviderError> {
        info!("🪙 Creating Pi payment of {} for uid={}", req.amount, req.uid);

        self.call(
            ProviderCall::Create,
            Method::POST,
            "/v2/payments",
            Auth::ServerKey,
            Some(&json!({ "payment": req })),
        )
        .await
    }

    async fn get_payment(&self, payment_id: &str) -> Result<PiPayment, ProviderError> {
        if let Some(cache) = &self.cache
            && let Some(cached) = cache.get::<PiPayment>(&Self::cache_key(payment_id)).await
        {
            debug!("Serving Pi payment {payment_id} from cache");
            return Ok(cached);
        }

        let payment: PiPayment = self
            .call(
                ProviderCall::GetPayment,
                Method::GET,
                &format!("/v2/payments/{payment_id}"),
                Auth::ServerKey,
                None::<&()>,
            )
            .await?;

        self.remember(&payment).await;
        Ok(payment)
    }

    async fn approve_payment(&self, payment_id: &str) -> Result<PiPayment, ProviderError> {
        let payment: PiPayment = self
            .call(
                ProviderCall::Approve,
                Method::POST,
                &format!("/v2/payments/{payment_id}/approve"),
                Auth::ServerKey,
                None::<&()>,
            )
            .await?;

        self.remember(&payment).await;
        Ok(payment)
    }

    async fn complete_payment(
        &self,
        payment_id: &str,
        txid: &str,
    ) -> Result<PiPayment, ProviderError> {
        let payment: PiPayment = self
            .call(
                ProviderCall::Complete,
                Method::POST,
                &format!("/v2/payments/{payment_id}/complete"),
                Auth::ServerKey,
                Some(&json!({ "txid": txid })),
            )
            .await?;

        self.remember(&payment).await;
        Ok(payment)
    }

    async fn cancel_payment(&self, payment_id: &str) -> Result<PiPayment, ProviderError> {
        let payment: PiPayment = self
            .call(
                ProviderCall::Cancel,
                Method::POST,
                &format!("/v2/payments/{payment_id}/cancel"),
                Auth::ServerKey,
                None::<&()>,
            )
            .await?;

        self.remember(&payment).await;
        Ok(payment)
    }

    async fn incomplete_payments(&self) -> Result<Vec<PiPayment>, ProviderError> {
        #[derive(serde::Deserialize)]
        struct Incomplete {
            incomplete_server_payments: Vec<PiPayment>,
        }

        let body: Incomplete = self
            .call(
                ProviderCall::GetPayment,
                Method::GET,
                "/v2/payments/incomplete_server_payments",
                Auth::ServerKey,
                None::<&()>,
            )
            .await?;

        Ok(body.incomplete_server_payments)
    }

    async fn me(&self, access_token: &str) -> Result<PiUser, ProviderError> {
        self.call(
            ProviderCall::Me,
            Method::GET,
            "/v2/me",
            Auth::UserToken(access_token),
            None::<&()>,
        )
        .await
    }
}
