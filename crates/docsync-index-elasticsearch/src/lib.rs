// # Elasticsearch Search Index
//
// This crate provides an Elasticsearch implementation of the docsync
// `SearchIndex` trait.
//
// ## Behavior
//
// - One HTTP request per index or remove call
// - Every failure is returned to the engine, which contains it in the
//   relation's error boundary; nothing is retried here
// - HTTP timeout configured (30 seconds)
// - Specific error handling for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - Dry-run mode for safe testing
//
// ## Index Layout
//
// Each document kind lives in its own index, `{prefix}{kind}`:
//
// ```text
// PUT    {url}/{prefix}article/_doc/42      index (create or replace)
// DELETE {url}/{prefix}reaction/_doc/7      remove (404 means already gone)
// ```
//
// ## Security Requirements
//
// - API key NEVER appears in logs or Debug output
// - API key is sent as `Authorization: ApiKey <key>`

use async_trait::async_trait;
use docsync_core::config::SearchIndexConfig;
use docsync_core::model::{DocumentRef, RelatedRecord};
use docsync_core::traits::SearchIndex;
use docsync_core::{Error, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable selecting dry-run mode
pub const MODE_ENV: &str = "DOCSYNC_MODE";

/// Body of a successful document write or delete
#[derive(Debug, Deserialize)]
struct WriteResponse {
    result: String,
}

/// Elasticsearch search index
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the index logs the request it would have sent
/// and reports success without touching the cluster.
pub struct ElasticsearchIndex {
    /// Cluster base URL, without trailing slash
    url: String,

    /// Prefix for per-kind index names
    index_prefix: String,

    /// API key
    /// ⚠️ NEVER log this value
    api_key: Option<String>,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, log requests instead of sending them
    dry_run: bool,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for ElasticsearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchIndex")
            .field("url", &self.url)
            .field("index_prefix", &self.index_prefix)
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl ElasticsearchIndex {
    /// Create a new Elasticsearch index client
    ///
    /// # Parameters
    ///
    /// - `url`: Cluster base URL (e.g., "http://localhost:9200")
    /// - `index_prefix`: Prepended to every per-kind index name
    /// - `api_key`: Optional API key
    /// - `dry_run`: If true, log requests instead of sending them
    pub fn new(
        url: impl Into<String>,
        index_prefix: impl Into<String>,
        api_key: Option<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let url = url.into().trim_end_matches('/').to_string();
        if url.is_empty() {
            return Err(Error::config("Elasticsearch URL cannot be empty"));
        }
        if api_key.as_deref() == Some("") {
            return Err(Error::config("Elasticsearch API key cannot be empty when set"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::backend("elasticsearch", format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url,
            index_prefix: index_prefix.into(),
            api_key,
            client,
            dry_run,
        })
    }

    /// Create an index client from configuration
    ///
    /// Dry-run mode is taken from `DOCSYNC_MODE=dry-run`.
    pub fn from_config(config: &SearchIndexConfig) -> Result<Self> {
        match config {
            SearchIndexConfig::Elasticsearch {
                url,
                index_prefix,
                api_key,
            } => {
                config.validate()?;

                let dry_run = std::env::var(MODE_ENV)
                    .map(|mode| mode.eq_ignore_ascii_case("dry-run"))
                    .unwrap_or(false);
                if dry_run {
                    tracing::warn!("Elasticsearch index running in DRY-RUN mode - no changes will be made");
                }

                Self::new(url.clone(), index_prefix.clone(), api_key.clone(), dry_run)
            }
            other => Err(Error::config(format!(
                "Invalid config for Elasticsearch index: {}",
                other.type_name()
            ))),
        }
    }

    /// Whether requests are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Document URL for a record
    pub fn document_url(&self, document: &DocumentRef) -> String {
        format!(
            "{}/{}{}/_doc/{}",
            self.url,
            self.index_prefix,
            document.kind.as_str(),
            document.id
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("ApiKey {}", key)),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| Error::backend("elasticsearch", format!("HTTP request failed: {}", e)))
    }
}

/// Map a non-success status to an error
fn status_error(status: StatusCode, body: &str, operation: &str, document: &DocumentRef) -> Error {
    match status.as_u16() {
        401 | 403 => Error::backend(
            "elasticsearch",
            format!(
                "Authentication failed: Invalid API key or insufficient privileges. Status: {}",
                status
            ),
        ),
        404 => Error::not_found(format!("Index not found for {}", document)),
        409 => Error::backend(
            "elasticsearch",
            format!("Version conflict on {}. Status: {}", document, status),
        ),
        429 => Error::backend(
            "elasticsearch",
            format!("Rate limit exceeded. Please retry later. Status: {}", status),
        ),
        500..=599 => Error::backend(
            "elasticsearch",
            format!("Elasticsearch server error (transient): {} - {}", status, body),
        ),
        _ => Error::backend(
            "elasticsearch",
            format!("Failed to {} {}: {} - {}", operation, document, status, body),
        ),
    }
}

async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string())
}

#[async_trait]
impl SearchIndex for ElasticsearchIndex {
    /// Index (create or replace) one document
    ///
    /// ```http
    /// PUT {url}/{prefix}{kind}/_doc/{id}
    /// Authorization: ApiKey <key>
    ///
    /// { ...document }
    /// ```
    async fn index_document(&self, record: &RelatedRecord) -> Result<()> {
        let document = record.document_ref();
        let url = self.document_url(&document);

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send PUT request to {} with payload: {}", url, record.document);
            return Ok(());
        }

        let response = self.send(self.client.put(&url).json(&record.document)).await?;
        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(status_error(status, &body, "index", &document));
        }

        match response.json::<WriteResponse>().await {
            Ok(write) => tracing::debug!("Indexed {}: {}", document, write.result),
            Err(e) => tracing::debug!("Indexed {} (unparsed response: {})", document, e),
        }
        Ok(())
    }

    /// Remove one document
    ///
    /// ```http
    /// DELETE {url}/{prefix}{kind}/_doc/{id}
    /// ```
    ///
    /// A 404 means the document is already absent and counts as success.
    async fn remove_document(&self, document: &DocumentRef) -> Result<()> {
        let url = self.document_url(document);

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send DELETE request to {}", url);
            return Ok(());
        }

        let response = self.send(self.client.delete(&url)).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!("{} already absent from index", document);
            return Ok(());
        }
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(status_error(status, &body, "remove", document));
        }

        tracing::debug!("Removed {}", document);
        Ok(())
    }

    fn index_name(&self) -> &'static str {
        "elasticsearch"
    }
}
