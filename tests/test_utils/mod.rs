//! Shared fixtures for integration tests
use chrono::Utc;
use tempfile::TempDir;

use headsup::core::AppConfig;
use headsup::core::db::{async_db, initialize_db};
use headsup::google::oauth::CredentialSnapshot;
use headsup::pipeline::orchestrator::CREDENTIAL_TOKEN_ID;
use headsup::store::{KvStore, StoredCredential};

/// A kv store backed by a sqlite file in a temp dir. The dir is
/// returned so it lives as long as the test needs it.
pub async fn test_store() -> (KvStore, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db = async_db(dir.path().to_str().unwrap())
        .await
        .expect("Failed to connect to db");
    db.call(|conn| {
        initialize_db(conn).expect("Failed to initialize db");
        Ok(())
    })
    .await
    .unwrap();
    (KvStore::new(db), dir)
}

/// Config with every API hostname pointed at the mock server.
pub fn test_config(base_url: &str) -> AppConfig {
    AppConfig {
        storage_path: "./".to_string(),
        calendar_id: "primary".to_string(),
        sheet_id: "sheet-1".to_string(),
        sheet_range: "Contacts!A2:B".to_string(),
        monthly_quota: 100,
        message_template: "Reminder: {{ eventSummary }} at {{ time }}".to_string(),
        reply_to: "555-867-5309".to_string(),
        max_sms_chars: 320,
        dry_run: false,
        google_client_id: "client-id".to_string(),
        google_client_secret: "client-secret".to_string(),
        twilio_account_sid: "AC123".to_string(),
        twilio_auth_token: "twilio-token".to_string(),
        twilio_from_number: "+15550000000".to_string(),
        summary_recipients: vec![],
        summary_from: "me".to_string(),
        google_api_url: base_url.to_string(),
        google_token_url: format!("{}/token", base_url),
        twilio_api_url: base_url.to_string(),
    }
}

/// Store a credential blob as `headsup auth` would have.
pub async fn seed_credential(store: &KvStore, expired: bool) -> CredentialSnapshot {
    let expiry_date = if expired {
        Utc::now().timestamp_millis() - 10_000
    } else {
        Utc::now().timestamp_millis() + 3_600_000
    };
    let snapshot = CredentialSnapshot {
        access_token: "ya29.seeded".to_string(),
        refresh_token: "1//seeded-refresh".to_string(),
        expiry_date,
        id_token: None,
    };
    store
        .put(&StoredCredential {
            token_id: CREDENTIAL_TOKEN_ID.to_string(),
            content: serde_json::to_string(&snapshot).unwrap(),
        })
        .await
        .unwrap();
    snapshot
}

pub fn current_month() -> String {
    Utc::now().format("%Y-%m").to_string()
}
