//! Chapa payment gateway client.
//!
//! Redirect-based checkout: `initialize` returns a hosted checkout URL and
//! `verify` confirms the transaction once the customer returns.

use super::error::{ServiceError, ServiceResult};
use crate::config::ChapaConfig;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct ChapaClient {
    client: Client,
    config: ChapaConfig,
}

/// Body of `POST /transaction/initialize`.
#[derive(Debug, Serialize)]
pub struct InitializeRequest {
    /// Decimal amount as a string, e.g. "1150.00".
    pub amount: String,
    pub currency: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub tx_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChapaEnvelope<T> {
    message: serde_json::Value,
    status: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutData {
    pub checkout_url: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyData {
    pub status: String,
    pub tx_ref: Option<String>,
    pub reference: Option<String>,
}

/// Gateway verdict on a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Success,
    Pending,
    Failed,
}

#[derive(Debug)]
pub struct Verification {
    pub outcome: VerifyOutcome,
    pub reference: Option<String>,
}

pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// Chapa reports `success`, `pending` or a failure state.
pub fn classify_status(status: &str) -> VerifyOutcome {
    match status.to_ascii_lowercase().as_str() {
        "success" => VerifyOutcome::Success,
        "pending" => VerifyOutcome::Pending,
        _ => VerifyOutcome::Failed,
    }
}

fn message_text(message: &serde_json::Value) -> String {
    match message {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl ChapaClient {
    pub fn new(config: ChapaConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    pub fn callback_url(&self) -> Option<String> {
        self.config.callback_url.clone()
    }

    pub fn return_url(&self) -> Option<String> {
        self.config.return_url.clone()
    }

    fn ensure_configured(&self) -> ServiceResult<()> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(ServiceError::Gateway(
                "Chapa credentials not configured".to_string(),
            ))
        }
    }

    pub async fn initialize(&self, request: &InitializeRequest) -> ServiceResult<String> {
        self.ensure_configured()?;
        let url = format!("{}/transaction/initialize", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))?;
        tracing::debug!(status = %status, tx_ref = %request.tx_ref, "Chapa initialize response");

        let envelope: ChapaEnvelope<CheckoutData> = serde_json::from_str(&body)
            .map_err(|_| ServiceError::Gateway(format!("Unexpected Chapa response ({})", status)))?;

        match envelope.data {
            Some(data) if status.is_success() && envelope.status == "success" => {
                tracing::info!(tx_ref = %request.tx_ref, "Chapa checkout initialized");
                Ok(data.checkout_url)
            }
            _ => {
                let message = message_text(&envelope.message);
                tracing::error!(tx_ref = %request.tx_ref, status = %status, message = %message, "Chapa initialize failed");
                Err(ServiceError::Gateway(message))
            }
        }
    }

    pub async fn verify(&self, tx_ref: &str) -> ServiceResult<Verification> {
        self.ensure_configured()?;
        let url = format!("{}/transaction/verify/{}", self.config.base_url, tx_ref);

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))?;

        let envelope: ChapaEnvelope<VerifyData> = serde_json::from_str(&body)
            .map_err(|_| ServiceError::Gateway(format!("Unexpected Chapa response ({})", status)))?;

        if !status.is_success() {
            let message = message_text(&envelope.message);
            tracing::warn!(tx_ref = %tx_ref, status = %status, message = %message, "Chapa verification failed");
            return Err(ServiceError::Gateway(message));
        }

        let data = envelope
            .data
            .ok_or_else(|| ServiceError::Gateway("Chapa returned no transaction data".to_string()))?;
        if data.tx_ref.as_deref().is_some_and(|r| r != tx_ref) {
            return Err(ServiceError::Gateway(
                "Chapa returned a different transaction".to_string(),
            ));
        }

        Ok(Verification {
            outcome: classify_status(&data.status),
            reference: data.reference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn config(secret: &str) -> ChapaConfig {
        ChapaConfig {
            base_url: "https://api.chapa.co/v1".to_string(),
            secret_key: Secret::new(secret.to_string()),
            callback_url: None,
            return_url: None,
        }
    }

    #[test]
    fn test_is_configured() {
        assert!(ChapaClient::new(config("CHASECK_TEST-123")).is_configured());
        assert!(!ChapaClient::new(config("")).is_configured());
    }

    #[test]
    fn test_amount_formatting() {
        assert_eq!(format_amount(1150.0), "1150.00");
        assert_eq!(format_amount(0.5), "0.50");
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_status("success"), VerifyOutcome::Success);
        assert_eq!(classify_status("Pending"), VerifyOutcome::Pending);
        assert_eq!(classify_status("failed/cancelled"), VerifyOutcome::Failed);
    }

    #[tokio::test]
    async fn test_unconfigured_client_is_a_gateway_error() {
        let client = ChapaClient::new(config(""));
        let err = client.verify("tx-1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Gateway(_)));
    }
}
