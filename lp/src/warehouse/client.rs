//! Minimal client for the Trino REST statement protocol

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{ConnectionDescriptor, WarehouseError};

/// Row count of one table, or the reason it could not be sampled
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableStats {
    pub table: String,
    pub row_count: Option<u64>,
    pub error: Option<String>,
}

/// One page of a statement's results
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResults {
    next_uri: Option<String>,
    #[serde(default)]
    data: Option<Vec<Vec<Value>>>,
    error: Option<QueryError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryError {
    message: String,
    error_name: Option<String>,
}

/// Runs SQL against a Trino/Presto coordinator
pub struct WarehouseClient {
    descriptor: ConnectionDescriptor,
    http: Client,
}

impl WarehouseClient {
    pub fn new(descriptor: ConnectionDescriptor, timeout: Duration) -> Result<Self, WarehouseError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { descriptor, http })
    }

    fn with_session(&self, builder: RequestBuilder) -> RequestBuilder {
        let d = &self.descriptor;
        let mut builder = builder.header("X-Trino-User", &d.user);
        if let Some(ref password) = d.password {
            builder = builder.basic_auth(&d.user, Some(password));
        }
        builder
    }

    /// Submit a statement and follow `nextUri` until every row is collected
    pub async fn execute(&self, sql: &str) -> Result<Vec<Vec<Value>>, WarehouseError> {
        debug!(host = %self.descriptor.host, "WarehouseClient::execute: called");
        let d = &self.descriptor;
        let mut request = self
            .with_session(self.http.post(format!("{}/v1/statement", d.base_url())))
            .header("Content-Type", "text/plain")
            .body(sql.to_string());
        if let Some(ref catalog) = d.catalog {
            request = request.header("X-Trino-Catalog", catalog);
        }
        if let Some(ref schema) = d.schema {
            request = request.header("X-Trino-Schema", schema);
        }
        for (key, value) in &d.session_properties {
            request = request.header("X-Trino-Session", format!("{}={}", key, value));
        }

        let mut rows = Vec::new();
        let mut page = fetch_page(request).await?;
        loop {
            match absorb(page, &mut rows)? {
                Some(next) => page = fetch_page(self.with_session(self.http.get(next))).await?,
                None => break,
            }
        }
        debug!(rows = rows.len(), "WarehouseClient::execute: complete");
        Ok(rows)
    }

    /// Count rows of `table`; failures are recorded, never raised
    pub async fn sample_stats(&self, table: &str) -> TableStats {
        debug!(%table, "WarehouseClient::sample_stats: called");
        match self.execute(&format!("SELECT count(*) AS row_count FROM {}", table)).await {
            Ok(rows) => TableStats {
                table: table.to_string(),
                row_count: Some(first_count(&rows)),
                error: None,
            },
            Err(e) => {
                warn!(%table, error = %e, "WarehouseClient::sample_stats: sampling failed");
                TableStats {
                    table: table.to_string(),
                    row_count: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

async fn fetch_page(request: RequestBuilder) -> Result<QueryResults, WarehouseError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(WarehouseError::Protocol(format!("HTTP {}: {}", status.as_u16(), body)));
    }
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| WarehouseError::Protocol(e.to_string()))
}

/// Move a page's rows into `rows`; returns the next page to fetch
fn absorb(page: QueryResults, rows: &mut Vec<Vec<Value>>) -> Result<Option<String>, WarehouseError> {
    if let Some(error) = page.error {
        let message = match error.error_name {
            Some(name) => format!("{}: {}", name, error.message),
            None => error.message,
        };
        return Err(WarehouseError::Query(message));
    }
    rows.extend(page.data.unwrap_or_default());
    Ok(page.next_uri)
}

fn first_count(rows: &[Vec<Value>]) -> u64 {
    rows.first()
        .and_then(|row| row.first())
        .and_then(|cell| cell.as_u64().or_else(|| cell.as_str().and_then(|s| s.parse().ok())))
        .unwrap_or(0)
}
