//! # HTTP Transaction Service
//!
//! `reqwest` implementation of [`TransactionService`].
//!
//! ## Response Interpretation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  2xx                              → Ok                                  │
//! │  4xx/5xx with { code, ... }       → Rejected(ServiceRejection)          │
//! │  5xx without a code               → Unavailable { status }              │
//! │  4xx without a code               → Rejected(code = "http_<status>")    │
//! │  timeout / refused / DNS          → Timeout / ConnectionFailed          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every request carries the tenant header and, when configured, a bearer
//! token. Nothing is retried here.

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use till_core::{CancelRequest, KitchenOrderSnapshot, KitchenOrderSummary, Money};

use crate::config::ServiceSettings;
use crate::error::{ClientError, ClientResult};
use crate::protocol::{
    ErrorBody, MarkPaidRequest, PriceUpdateRequest, RejectionCode, ServiceRejection,
    SettlementRequest,
};
use crate::service::TransactionService;

/// Transaction service client over authenticated HTTP.
#[derive(Clone)]
pub struct HttpTransactionService {
    client: Client,
    base_url: Url,
    service_header: HeaderName,
    service_id: HeaderValue,
    api_token: Option<String>,
}

impl HttpTransactionService {
    /// Builds a client from service settings.
    pub fn new(settings: &ServiceSettings) -> ClientResult<Self> {
        let base_url = Url::parse(settings.base_url.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(settings.base_url.clone()));
        }

        let service_header = HeaderName::from_bytes(settings.service_header.trim().as_bytes())
            .map_err(|e| ClientError::InvalidConfig(format!("service_header: {}", e)))?;
        let service_id = HeaderValue::from_str(settings.service_id.trim())
            .map_err(|e| ClientError::InvalidConfig(format!("service_id: {}", e)))?;

        let client = Client::builder()
            .timeout(settings.request_timeout())
            .connect_timeout(settings.connect_timeout())
            .build()?;

        Ok(HttpTransactionService {
            client,
            base_url,
            service_header,
            service_id,
            api_token: settings.api_token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// Joins path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> ClientResult<RequestBuilder> {
        let url = self.endpoint(segments)?;
        debug!(%method, %url, "Transaction service request");

        let mut builder = self
            .client
            .request(method, url)
            .header(self.service_header.clone(), self.service_id.clone());

        if let Some(token) = &self.api_token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        Ok(builder)
    }

    /// Sends and maps non-success statuses into errors.
    async fn send(&self, builder: RequestBuilder) -> ClientResult<Response> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(interpret_failure(status.as_u16(), &body))
    }

    async fn send_unit(&self, builder: RequestBuilder) -> ClientResult<()> {
        self.send(builder).await.map(|_| ())
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = self.send(builder).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::DeserializationFailed(e.to_string()))
    }
}

/// Maps a failed response body into a client error.
fn interpret_failure(status: u16, body: &str) -> ClientError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();

    let fallback_text = parsed.as_ref().and_then(|b| match &b.detail {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        _ => b.message.clone(),
    });

    if let Some(rejection) = parsed.and_then(|b| b.into_rejection(status)) {
        warn!(status, code = rejection.code.as_str(), "Transaction service rejected request");
        return ClientError::Rejected(rejection);
    }

    if status >= 500 {
        warn!(status, "Transaction service unavailable");
        return ClientError::Unavailable { status };
    }

    warn!(status, "Transaction service refused request without an error code");
    ClientError::Rejected(ServiceRejection {
        status,
        code: RejectionCode::Other(format!("http_{}", status)),
        detail: fallback_text.filter(|t| !t.trim().is_empty()),
        message: None,
        products: Vec::new(),
    })
}

#[async_trait]
impl TransactionService for HttpTransactionService {
    async fn settle(&self, request: &SettlementRequest) -> ClientResult<()> {
        let builder = self.request(Method::POST, &["settlements"])?.json(request);
        self.send_unit(builder).await
    }

    async fn open_kitchen_orders(&self) -> ClientResult<Vec<KitchenOrderSummary>> {
        let builder = self.request(Method::GET, &["kitchen", "open-orders"])?;
        self.send_json(builder).await
    }

    async fn kitchen_order_for_checkout(
        &self,
        order_id: &str,
    ) -> ClientResult<KitchenOrderSnapshot> {
        let builder =
            self.request(Method::GET, &["kitchen", "orders", order_id, "for-checkout"])?;
        self.send_json(builder).await
    }

    async fn mark_paid(&self, order_id: &str, request: &MarkPaidRequest) -> ClientResult<()> {
        let builder = self
            .request(Method::POST, &["kitchen", "orders", order_id, "mark-paid"])?
            .json(request);
        self.send_unit(builder).await
    }

    async fn mark_ready(&self, order_id: &str) -> ClientResult<()> {
        let builder = self.request(Method::POST, &["kitchen", "orders", order_id, "ready"])?;
        self.send_unit(builder).await
    }

    async fn mark_served(&self, order_id: &str) -> ClientResult<()> {
        let builder = self.request(Method::POST, &["kitchen", "orders", order_id, "served"])?;
        self.send_unit(builder).await
    }

    async fn cancel_order(&self, order_id: &str, request: &CancelRequest) -> ClientResult<()> {
        let builder = self
            .request(Method::POST, &["kitchen", "orders", order_id, "cancel"])?
            .json(request);
        self.send_unit(builder).await
    }

    async fn update_selling_price(&self, product_id: &str, price: Money) -> ClientResult<()> {
        let builder = self
            .request(Method::PATCH, &["products", product_id])?
            .json(&PriceUpdateRequest {
                selling_price: price,
            });
        self.send_unit(builder).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
