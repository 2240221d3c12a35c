//! Google Sheets API v4 client for the contact directory sheet.

use anyhow::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;

#[async_trait]
pub trait ContactSheet: Send + Sync {
    /// Fetch a range of rows, each row a list of cell strings.
    async fn get_rows(&self, sheet_id: &str, range: &str) -> Result<Vec<Vec<String>>, Error>;
}

#[derive(Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

pub struct GoogleSheets {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GoogleSheets {
    pub fn new(base_url: &str, access_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
            access_token: access_token.to_string(),
        }
    }
}

#[async_trait]
impl ContactSheet for GoogleSheets {
    async fn get_rows(&self, sheet_id: &str, range: &str) -> Result<Vec<Vec<String>>, Error> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url,
            urlencoding::encode(sheet_id),
            urlencoding::encode(range)
        );
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?;
        let values: ValuesResponse = resp.json().await?;
        Ok(values.values)
    }
}
