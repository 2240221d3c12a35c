use anyhow::{Error, Result};
use serde::{Deserialize, Serialize};

use super::KvRecord;

/// Number of notifications admitted in a monthly window, keyed by
/// `"YYYY-MM"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub month: String,
    pub count: u32,
}

impl KvRecord for QuotaRecord {
    const KEY_SPACE: &'static str = "quota";

    fn key(&self) -> String {
        self.month.clone()
    }

    fn to_item(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    fn from_item(item: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(item)?)
    }
}

/// Opaque OAuth credential blob, keyed by a fixed token id. The
/// content is the JSON form of a `CredentialSnapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    pub token_id: String,
    pub content: String,
}

impl KvRecord for StoredCredential {
    const KEY_SPACE: &'static str = "credential";

    fn key(&self) -> String {
        self.token_id.clone()
    }

    fn to_item(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    fn from_item(item: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(item)?)
    }
}
