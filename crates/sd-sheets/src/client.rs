//! Google Sheets v4 REST client.
//!
//! Uses the `values.get`, `values.append` and `values.batchUpdate` endpoints
//! with a bearer token. Token acquisition happens outside this crate.

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::config::SheetsConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::{CellUpdate, TabularStore};

/// `values.get` response (only fields we need).
#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// `values.append` request body.
#[derive(Serialize)]
struct AppendBody {
    values: Vec<Vec<String>>,
}

/// `values.batchUpdate` request body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateBody<'a> {
    value_input_option: &'a str,
    data: Vec<BatchUpdateRange<'a>>,
}

#[derive(Serialize)]
struct BatchUpdateRange<'a> {
    range: &'a str,
    values: [[&'a str; 1]; 1],
}

/// Sheets-backed `TabularStore`.
pub struct SheetsClient {
    client: reqwest::Client,
    base_url: Url,
    spreadsheet_id: String,
    access_token: String,
}

impl SheetsClient {
    /// Build a client from config. Fails fast on missing id/token.
    pub fn new(config: &SheetsConfig) -> StoreResult<Self> {
        config.validate()?;
        let spreadsheet_id = config
            .spreadsheet_id
            .clone()
            .ok_or_else(|| StoreError::Config("SPREADSHEET_ID is not set".into()))?;
        let access_token = config
            .access_token
            .clone()
            .ok_or_else(|| StoreError::Config("SHEETS_ACCESS_TOKEN is not set".into()))?;
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| StoreError::Config(format!("invalid sheets base url: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Config(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            spreadsheet_id,
            access_token,
        })
    }

    /// `{base}/v4/spreadsheets/{id}/{segments..}`, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Config("sheets base url cannot be a base".into()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str()])
            .extend(segments);
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> StoreResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Api { status, body })
    }
}

#[async_trait]
impl TabularStore for SheetsClient {
    async fn read(&self, range: &str) -> StoreResult<Vec<Vec<String>>> {
        let url = self.url(&["values", range])?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let body: ValueRange = Self::check(response).await?.json().await?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn append(&self, range: &str, row: Vec<String>) -> StoreResult<()> {
        let url = self.url(&["values", &format!("{range}:append")])?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&AppendBody { values: vec![row] })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn patch(&self, updates: &[CellUpdate]) -> StoreResult<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let body = BatchUpdateBody {
            value_input_option: "RAW",
            data: updates
                .iter()
                .map(|u| BatchUpdateRange {
                    range: &u.range,
                    values: [[u.value.as_str()]],
                })
                .collect(),
        };
        let url = self.url(&["values:batchUpdate"])?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Render a cell as text; the API returns formatted strings but may send numbers/bools.
fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
