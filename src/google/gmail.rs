//! Gmail API client used to email the run summary.

use anyhow::{Error, Result};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use serde::Deserialize;
use serde_json::json;

#[async_trait]
pub trait EmailService: Send + Sync {
    /// Send an HTML email, returning the provider's message id.
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        html_body: &str,
        from: &str,
    ) -> Result<String, Error>;
}

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

pub struct GmailClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GmailClient {
    pub fn new(base_url: &str, access_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
            access_token: access_token.to_string(),
        }
    }
}

#[async_trait]
impl EmailService for GmailClient {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        html_body: &str,
        from: &str,
    ) -> Result<String, Error> {
        let raw_message = format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/html; charset=utf-8\r\n\r\n{}",
            from,
            recipients.join(", "),
            subject,
            html_body
        );
        let encoded = URL_SAFE.encode(raw_message.as_bytes());

        let url = format!("{}/gmail/v1/users/me/messages/send", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "raw": encoded }))
            .send()
            .await?
            .error_for_status()?;
        let sent: SendResponse = resp.json().await?;
        Ok(sent.id)
    }
}
