//! NOWPayments REST client.
//!
//! Only the three calls the deposit flow needs are wrapped: invoice creation,
//! fiat to crypto estimates and payment status lookups. Every call carries the
//! `x-api-key` header and is bounded by the configured timeout.

use std::{sync::Arc, time::Duration};

use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{config::GatewayConfig, error::AppError};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Parse(String),
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::PaymentGateway(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceRequest {
    pub price_amount: f64,
    pub price_currency: String,
    pub pay_currency: String,
    pub order_id: String,
    pub ipn_callback_url: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub id: String,
    pub invoice_url: String,
}

#[derive(Debug, Deserialize)]
struct InvoiceBody {
    id: Option<Value>,
    invoice_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EstimateBody {
    estimated_amount: Option<Value>,
}

#[derive(Clone)]
pub struct NowPaymentsClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl NowPaymentsClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&config.api_key)
                .map_err(|e| GatewayError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                client,
                base_url: config.api_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    /// Creates a hosted invoice. A response without `invoice_url` or `id` is an error.
    pub async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice, GatewayError> {
        let response = self
            .inner
            .client
            .post(self.url("/invoice"))
            .json(request)
            .send()
            .await?;
        let body: InvoiceBody = read_json(response).await?;

        let invoice_url = body
            .invoice_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| GatewayError::Parse("missing invoice_url".into()))?;
        let id = body
            .id
            .as_ref()
            .and_then(id_string)
            .ok_or_else(|| GatewayError::Parse("missing invoice id".into()))?;

        Ok(Invoice { id, invoice_url })
    }

    pub async fn estimate(
        &self,
        amount: f64,
        currency_from: &str,
        currency_to: &str,
    ) -> Result<f64, GatewayError> {
        let response = self
            .inner
            .client
            .get(self.url("/estimate"))
            .query(&[
                ("amount", amount.to_string()),
                ("currency_from", currency_from.to_string()),
                ("currency_to", currency_to.to_string()),
            ])
            .send()
            .await?;
        let body: EstimateBody = read_json(response).await?;

        // The API has returned the amount both as a number and as a string.
        match body.estimated_amount {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.parse::<f64>().ok(),
            _ => None,
        }
        .filter(|v| v.is_finite())
        .ok_or_else(|| GatewayError::Parse("missing estimated_amount".into()))
    }

    /// Raw payment record as reported by the gateway.
    pub async fn payment_status(&self, payment_id: &str) -> Result<Value, GatewayError> {
        let response = self
            .inner
            .client
            .get(self.url(&format!("/payment/{payment_id}")))
            .send()
            .await?;
        read_json(response).await
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| GatewayError::Parse(e.to_string()))
}

/// Gateway identifiers arrive as JSON strings or numbers; both are stored as text.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
