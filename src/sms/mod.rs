//! Twilio Messages API client.

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;

#[async_trait]
pub trait MessagingService: Send + Sync {
    /// Send one text message, returning the delivery id.
    async fn send(&self, phone_number: &str, message: &str) -> Result<String, Error>;
}

#[derive(Deserialize)]
struct MessageResponse {
    sid: String,
}

pub struct TwilioClient {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioClient {
    pub fn new(base_url: &str, account_sid: &str, auth_token: &str, from_number: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from_number: from_number.to_string(),
        }
    }
}

#[async_trait]
impl MessagingService for TwilioClient {
    async fn send(&self, phone_number: &str, message: &str) -> Result<String, Error> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", phone_number),
                ("From", self.from_number.as_str()),
                ("Body", message),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Twilio returned {}: {}", status, detail));
        }

        let sent: MessageResponse = resp.json().await?;
        Ok(sent.sid)
    }
}
