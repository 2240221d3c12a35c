//! Google OAuth token exchange and refresh.
//!
//! The stored credential is a `CredentialSnapshot` blob in the kv
//! store. A refresh response carries an `id_token`; its presence on a
//! snapshot is the signal that the credential was rotated during this
//! run and needs to be written back at finalize.

use anyhow::{Context, Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scopes requested during the bootstrap auth flow. `openid` is
/// included so refresh responses carry an `id_token`.
pub const SCOPES: &str = "openid https://www.googleapis.com/auth/calendar.events.readonly https://www.googleapis.com/auth/calendar.readonly https://www.googleapis.com/auth/spreadsheets.readonly https://www.googleapis.com/auth/gmail.send";

/// The OAuth credential held in memory for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialSnapshot {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry as epoch milliseconds
    pub expiry_date: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl CredentialSnapshot {
    /// Expired (or about to, within a 60s skew window).
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() >= self.expiry_date - 60_000
    }

    /// All four fields present, which marks a snapshot produced by a
    /// refresh during this run.
    pub fn is_complete(&self) -> bool {
        self.id_token.is_some()
            && !self.access_token.is_empty()
            && !self.refresh_token.is_empty()
            && self.expiry_date > 0
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
    id_token: Option<String>,
}

/// Exchange an authorization code for tokens during `headsup auth`.
pub async fn exchange_code_for_token(
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
    token_url: &str,
) -> Result<CredentialSnapshot, Error> {
    let resp = reqwest::Client::new()
        .post(token_url)
        .form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?
        .error_for_status()
        .context("Authorization code exchange failed")?;
    let token: TokenResponse = resp.json().await?;

    let refresh_token = token
        .refresh_token
        .context("Token response did not include a refresh token")?;
    Ok(CredentialSnapshot {
        access_token: token.access_token,
        refresh_token,
        expiry_date: expiry_from_now(token.expires_in),
        id_token: token.id_token,
    })
}

/// Exchange the stored refresh token for a fresh access token.
///
/// Google does not return the refresh token again, so the existing one
/// is carried over into the new snapshot.
pub async fn refresh_access_token(
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
    token_url: &str,
) -> Result<CredentialSnapshot, Error> {
    let resp = reqwest::Client::new()
        .post(token_url)
        .form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?
        .error_for_status()
        .context("Access token refresh failed")?;
    let token: TokenResponse = resp.json().await?;

    Ok(CredentialSnapshot {
        access_token: token.access_token,
        refresh_token: refresh_token.to_string(),
        expiry_date: expiry_from_now(token.expires_in),
        id_token: token.id_token,
    })
}

fn expiry_from_now(expires_in: i64) -> i64 {
    Utc::now().timestamp_millis() + expires_in * 1000
}
