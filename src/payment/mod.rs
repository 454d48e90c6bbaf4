// Payment-gateway integration. The gateway itself is an external
// collaborator behind the `PaymentGateway` trait; only order creation
// and signature verification live here.

pub mod signature;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::config;

pub use signature::{compute_signature, verify_signature};

/// Order as returned by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payment gateway rejected the order: status {0}")]
    Rejected(u16),

    #[error("payment gateway credentials are not configured")]
    NotConfigured,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError>;
}

/// Razorpay-style HTTP client with basic-auth key id/secret.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
}

impl HttpPaymentGateway {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let payment_config = &config::config().payment;
        if payment_config.key_id.is_empty() || payment_config.key_secret.is_empty() {
            return Err(GatewayError::NotConfigured);
        }

        let response = self
            .client
            .post(format!("{}/orders", payment_config.base_url))
            .basic_auth(&payment_config.key_id, Some(&payment_config.key_secret))
            .json(&json!({
                "amount": amount_minor,
                "currency": currency,
                "receipt": receipt,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Rejected(response.status().as_u16()));
        }

        Ok(response.json::<GatewayOrder>().await?)
    }
}

/// Receipt numbers are unique per payment: timestamp plus random
/// suffix, checked by a unique index as the backstop.
pub fn generate_receipt() -> String {
    let suffix = hex::encode(&Uuid::new_v4().as_bytes()[..4]);
    format!("RCPT-{}-{}", Utc::now().format("%Y%m%d%H%M%S"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipts_are_distinct() {
        let a = generate_receipt();
        let b = generate_receipt();
        assert_ne!(a, b);
        assert!(a.starts_with("RCPT-"));
    }
}
