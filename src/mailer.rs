use crate::{domain::Mailer, errors::GatewayError};
use async_trait::async_trait;
use serde::Serialize;
use tracing;

const SERVICE: &str = "resend";
const API_BASE: &str = "https://api.resend.com";

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Transactional email via Resend's REST API. Callers treat a failed send
/// as best-effort: it is logged, never propagated into the request that
/// triggered it.
#[derive(Debug, Clone)]
pub struct ResendMailer {
    http: reqwest::Client,
    api_key: String,
    from: String,
    base_url: String,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            from,
            base_url: API_BASE.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), GatewayError> {
        let request = SendEmailRequest {
            from: &self.from,
            to: [to],
            subject,
            html: html_body,
        };

        let response = self
            .http
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|source| GatewayError::Transport { service: SERVICE, source })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                service: SERVICE,
                status: status.as_u16(),
                detail,
            });
        }

        tracing::debug!(to = %to, subject = %subject, "Email accepted for delivery");
        Ok(())
    }
}
