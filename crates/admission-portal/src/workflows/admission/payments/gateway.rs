use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::config::CashfreeCredentials;
use crate::workflows::money::Amount;

const API_VERSION: &str = "2023-08-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerDetails {
    pub customer_id: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderMeta {
    pub return_url: String,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayOrderRequest {
    pub order_id: String,
    pub order_amount: Amount,
    pub order_currency: String,
    pub customer_details: CustomerDetails,
    pub order_meta: OrderMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedOrder {
    pub payment_session_id: String,
}

/// Order as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayOrder {
    pub order_id: String,
    pub order_status: String,
    pub order_amount: Amount,
}

impl GatewayOrder {
    pub fn is_paid(&self) -> bool {
        self.order_status == "PAID"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("payment gateway unreachable: {0}")]
    Transport(String),
    #[error("unexpected payment gateway response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Mode reported to the checkout SDK (`sandbox` or `production`).
    fn mode(&self) -> &'static str;
    async fn create_order(&self, request: &GatewayOrderRequest)
        -> Result<CreatedOrder, GatewayError>;
    async fn fetch_order(&self, order_id: &str) -> Result<GatewayOrder, GatewayError>;
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 250,
        }
    }
}

/// Cashfree PG REST client.
pub struct CashfreeClient {
    http: reqwest::Client,
    base_url: String,
    credentials: CashfreeCredentials,
    retry: RetryPolicy,
}

impl CashfreeClient {
    pub fn new(credentials: CashfreeCredentials) -> Result<Self, GatewayError> {
        let base_url = credentials.mode.base_url().to_string();
        Self::with_base_url(credentials, base_url)
    }

    pub fn with_base_url(
        credentials: CashfreeCredentials,
        base_url: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn headers(&self) -> Result<HeaderMap, GatewayError> {
        let value = |raw: &str| {
            HeaderValue::from_str(raw.trim())
                .map_err(|err| GatewayError::Transport(format!("invalid credential header: {err}")))
        };
        let mut headers = HeaderMap::new();
        headers.insert("x-client-id", value(&self.credentials.app_id)?);
        headers.insert("x-client-secret", value(&self.credentials.secret_key)?);
        headers.insert("x-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn secret_hint(&self) -> String {
        self.credentials.secret_key.chars().take(5).collect()
    }

    async fn rejection(&self, response: reqwest::Response) -> GatewayError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|json| json.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| format!("payment gateway returned {status}"));
        warn!(
            status = status.as_u16(),
            app_id_prefix = %self.credentials.app_id.chars().take(5).collect::<String>(),
            secret_prefix = %self.secret_hint(),
            %message,
            "payment gateway rejected request"
        );
        GatewayError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl PaymentGateway for CashfreeClient {
    fn mode(&self) -> &'static str {
        self.credentials.mode.sdk_mode()
    }

    #[instrument(name = "cashfree_create_order", skip(self, request), fields(order_id = %request.order_id))]
    async fn create_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<CreatedOrder, GatewayError> {
        let url = format!("{}/orders", self.base_url);
        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(self.rejection(response).await);
        }

        response
            .json::<CreatedOrder>()
            .await
            .map_err(|err| GatewayError::Decode(err.to_string()))
    }

    /// Idempotent, so transport failures and 5xx answers are retried.
    #[instrument(name = "cashfree_fetch_order", skip(self))]
    async fn fetch_order(&self, order_id: &str) -> Result<GatewayOrder, GatewayError> {
        let url = format!("{}/orders/{}", self.base_url, order_id);
        let headers = self.headers()?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.http.get(&url).headers(headers.clone()).send().await {
                Ok(response) if response.status().is_success() => {
                    return response
                        .json::<GatewayOrder>()
                        .await
                        .map_err(|err| GatewayError::Decode(err.to_string()));
                }
                Ok(response) => {
                    let retryable = response.status().is_server_error()
                        || response.status() == StatusCode::TOO_MANY_REQUESTS;
                    if !retryable || attempt >= self.retry.max_attempts {
                        return Err(self.rejection(response).await);
                    }
                }
                Err(err) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(GatewayError::Transport(err.to_string()));
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(
                self.retry.base_backoff_ms.saturating_mul(attempt as u64),
            ))
            .await;
        }
    }
}
