use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use shared::errors::{Result, ServiceError};
use shared::SheetsConfig;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const LAST_COLUMN: &str = "M";

/// Row-level access to the remote journal spreadsheet. Row numbers are the
/// sheet's own 1-based numbers; row 1 holds the header.
#[async_trait]
pub trait Spreadsheet: Send + Sync {
    async fn append_row(&self, values: Vec<String>) -> Result<()>;

    /// All rows including the header, in sheet order.
    async fn read_rows(&self) -> Result<Vec<Vec<String>>>;

    async fn update_row(&self, row_number: usize, values: Vec<String>) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Google Sheets v4 REST client authenticated with a bearer token.
#[derive(Clone)]
pub struct GoogleSheetsClient {
    http: reqwest::Client,
    config: SheetsConfig,
    base_url: String,
}

impl GoogleSheetsClient {
    pub fn new(http: reqwest::Client, config: SheetsConfig) -> Self {
        Self::with_base_url(http, config, SHEETS_API_BASE)
    }

    pub fn with_base_url(http: reqwest::Client, config: SheetsConfig, base_url: impl Into<String>) -> Self {
        Self {
            http,
            config,
            base_url: base_url.into(),
        }
    }

    fn access_token(&self) -> Result<&str> {
        self.config.access_token.as_deref().ok_or_else(|| {
            ServiceError::Configuration(
                "GOOGLE_SHEETS_ACCESS_TOKEN is not set; spreadsheet access is not configured".to_string(),
            )
        })
    }

    fn values_url(&self, range: &str) -> String {
        format!("{}/{}/values/{}", self.base_url, self.config.sheet_id, range)
    }

    fn sheet_range(&self, range: &str) -> String {
        format!("{}!{}", self.config.sheet_name, range)
    }

    async fn check_status(response: reqwest::Response, operation: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!(operation = operation, status = %status, body = %body, "Sheets API request failed");

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ServiceError::Configuration(format!(
                "{} rejected with {}: check the spreadsheet credentials",
                operation, status
            )));
        }

        Err(ServiceError::Spreadsheet(format!("{} failed with {}", operation, status)))
    }

    /// Writes the header row when the sheet is empty or its first row differs.
    pub async fn ensure_header(&self, headers: Vec<String>) -> Result<()> {
        let rows = self.read_rows().await?;
        if rows.first() == Some(&headers) {
            return Ok(());
        }

        info!(sheet = %self.config.sheet_name, "Writing journal header row");
        self.update_row(1, headers).await
    }
}

#[async_trait]
impl Spreadsheet for GoogleSheetsClient {
    async fn append_row(&self, values: Vec<String>) -> Result<()> {
        let token = self.access_token()?;
        let url = format!("{}:append", self.values_url(&self.sheet_range("A1")));

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "values": [values] }))
            .send()
            .await
            .map_err(|e| ServiceError::Spreadsheet(format!("append request failed: {}", e)))?;

        Self::check_status(response, "append").await?;
        debug!(sheet = %self.config.sheet_name, "Row appended");
        Ok(())
    }

    async fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        let token = self.access_token()?;
        let url = self.values_url(&self.sheet_range(&format!("A:{}", LAST_COLUMN)));

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ServiceError::Spreadsheet(format!("read request failed: {}", e)))?;

        let range: ValueRange = Self::check_status(response, "read")
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::Spreadsheet(format!("unexpected read response: {}", e)))?;

        Ok(range.values)
    }

    async fn update_row(&self, row_number: usize, values: Vec<String>) -> Result<()> {
        let token = self.access_token()?;
        let range = self.sheet_range(&format!("A{row_number}:{LAST_COLUMN}{row_number}"));
        let url = self.values_url(&range);

        let response = self
            .http
            .put(url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": [values] }))
            .send()
            .await
            .map_err(|e| ServiceError::Spreadsheet(format!("update request failed: {}", e)))?;

        Self::check_status(response, "update").await?;
        debug!(row = row_number, "Row updated");
        Ok(())
    }
}

/// In-process sheet, used when exercising the bot without Google access.
#[derive(Clone, Default)]
pub struct MemorySheet {
    rows: Arc<RwLock<Vec<Vec<String>>>>,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(headers: Vec<String>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(vec![headers])),
        }
    }

    pub async fn rows(&self) -> Vec<Vec<String>> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl Spreadsheet for MemorySheet {
    async fn append_row(&self, values: Vec<String>) -> Result<()> {
        self.rows.write().await.push(values);
        Ok(())
    }

    async fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        Ok(self.rows.read().await.clone())
    }

    async fn update_row(&self, row_number: usize, values: Vec<String>) -> Result<()> {
        let mut rows = self.rows.write().await;
        let index = row_number
            .checked_sub(1)
            .ok_or_else(|| ServiceError::Spreadsheet("row numbers start at 1".to_string()))?;

        if index < rows.len() {
            rows[index] = values;
        } else if index == rows.len() {
            rows.push(values);
        } else {
            return Err(ServiceError::Spreadsheet(format!("row {} does not exist", row_number)));
        }
        Ok(())
    }
}
