//! Read-only access to rows of a single table behind a PostgREST-style API.

use crate::config::RemoteConfig;
use crate::models::RemoteRow;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("invalid remote url: {0}")]
    InvalidUrl(String),

    #[error("remote request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote returned {status}: {message}")]
    Status { status: u16, message: String },
}

#[derive(Debug, Clone)]
pub struct RemoteTable {
    client: Client,
    config: RemoteConfig,
}

impl RemoteTable {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn table(&self) -> &str {
        &self.config.table
    }

    pub fn rows_url(&self) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&self.config.url)
            .map_err(|err| RemoteError::InvalidUrl(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidUrl(self.config.url.clone()))?
            .pop_if_empty()
            .extend(["rest", "v1", self.config.table.as_str()]);
        url.query_pairs_mut().append_pair("select", "*");
        Ok(url)
    }

    /// Single attempt, no pagination.
    pub async fn fetch_rows(&self) -> Result<Vec<RemoteRow>, RemoteError> {
        let response = self
            .client
            .get(self.rows_url()?)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(table = %self.config.table, %status, "remote fetch rejected");
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let rows: Vec<RemoteRow> = response.json().await?;
        info!(table = %self.config.table, rows = rows.len(), "fetched remote rows");
        Ok(rows)
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
