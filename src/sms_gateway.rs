// src/sms_gateway.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::config::SmsConfig;

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("sms gateway request timed out")]
    Timeout,
    #[error("sms gateway connection failed")]
    Connect,
    #[error("sms gateway request failed: {0}")]
    Request(String),
    #[error("sms gateway returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound transactional SMS. Every failure mode is reported the same way.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send(&self, phone_number: &str, message: &str) -> Result<(), SmsError>;
}

#[derive(Debug, Serialize)]
struct TransactionalSms<'a> {
    sender: &'a str,
    recipient: &'a str,
    content: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Client for a Brevo-style `transactionalSMS/sms` endpoint.
pub struct HttpSmsGateway {
    client: Client,
    api_url: String,
    api_key: String,
    sender: String,
}

impl HttpSmsGateway {
    pub fn new(cfg: &SmsConfig) -> Result<Self, SmsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| SmsError::Request(e.to_string()))?;

        Ok(Self {
            client,
            api_url: cfg.api_url.clone(),
            api_key: cfg.api_key.clone(),
            sender: cfg.sender.clone(),
        })
    }
}

#[async_trait]
impl SmsGateway for HttpSmsGateway {
    async fn send(&self, phone_number: &str, message: &str) -> Result<(), SmsError> {
        // Brevo expects the recipient without the leading +
        let recipient = phone_number.trim_start_matches('+');

        let response = self
            .client
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .json(&TransactionalSms {
                sender: &self.sender,
                recipient,
                content: message,
                kind: "transactional",
            })
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(SmsError::Rejected {
            status: status.as_u16(),
            body: truncate(&body, 200),
        })
    }
}

fn map_reqwest_error(error: reqwest::Error) -> SmsError {
    if error.is_timeout() {
        return SmsError::Timeout;
    }
    if error.is_connect() {
        return SmsError::Connect;
    }
    // Strip the URL so the API host never lands in logs or responses.
    SmsError::Request(error.without_url().to_string())
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
