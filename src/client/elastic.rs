//! Elasticsearch client module
//!
//! Provides `ElasticClient`, an [`IndexStore`] speaking the Elasticsearch REST API.

use super::{Auth, ElasticConfig, IndexStore, WriteAction};
use crate::error::EtlError;
use async_trait::async_trait;
use eyre::{Context, Result, eyre};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value as JsonValue;
use url::Url;

/// Actions sent per `_bulk` request
const DEFAULT_CHUNK_SIZE: usize = 500;

/// Elasticsearch client for index management and bulk writes.
///
/// # Example
/// ```no_run
/// use tabload::client::{Auth, ElasticClient, IndexStore};
/// use url::Url;
///
/// # async fn example() -> eyre::Result<()> {
/// let url = Url::parse("http://localhost:9200")?;
/// let client = ElasticClient::try_new(url, Auth::None, None)?;
///
/// if client.exists("sales_01_2024").await? {
///     println!("{} documents", client.count("sales_01_2024").await?);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ElasticClient {
    client: Client,
    url: Url,
    chunk_size: usize,
}

impl ElasticClient {
    /// Create a new client from a base URL, Auth, and an optional CA bundle to trust.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The CA file cannot be read or is not PEM
    /// - The HTTP client cannot be built
    pub fn try_new(mut url: Url, auth: Auth, cafile: Option<&std::path::Path>) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        auth.apply(&mut headers)?;

        let mut builder = Client::builder().default_headers(headers);
        if let Some(cafile) = cafile {
            let pem = std::fs::read(cafile)
                .with_context(|| format!("Failed to read CA file: {}", cafile.display()))?;
            let certificate = reqwest::Certificate::from_pem(&pem)
                .with_context(|| format!("Invalid CA file: {}", cafile.display()))?;
            builder = builder.add_root_certificate(certificate);
        }
        let client = builder.build()?;

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        log::debug!("Elasticsearch client for {} ({} auth)", url, auth);

        Ok(Self {
            client,
            url,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Create a client from connection settings
    pub fn from_config(config: &ElasticConfig) -> Result<Self> {
        Self::try_new(config.url()?, config.auth(), config.cafile.as_deref())
    }

    /// Number of actions sent per `_bulk` request
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Get the base URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Verify the connection and authentication to the cluster.
    pub async fn test_connection(&self) -> Result<JsonValue> {
        let response = self.request(Method::GET, "", None, None).await?;
        let response = check(response, "Connection test").await?;
        Ok(response.json().await?)
    }

    /// Send a request to a path relative to the base URL.
    async fn request(
        &self,
        method: Method,
        path: &str,
        content_type: Option<&str>,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response> {
        let path = path.strip_prefix('/').unwrap_or(path);
        let url = self.url.join(path)?;
        log::trace!("{} {}", method, url);

        let mut request = self.client.request(method, url);
        if let Some(content_type) = content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }
        if let Some(body) = body {
            request = request.body(body);
        }
        request
            .send()
            .await
            .map_err(|e| eyre!("Failed to send request: {}", e))
    }

    async fn send_json(&self, method: Method, path: &str, body: &JsonValue) -> Result<reqwest::Response> {
        let body = serde_json::to_vec(body)?;
        self.request(method, path, Some("application/json"), Some(body))
            .await
    }

    /// Send one `_bulk` request and read its per-item results
    async fn bulk_chunk(&self, actions: &[WriteAction]) -> Result<Vec<(bool, JsonValue)>> {
        let mut body = Vec::new();
        for action in actions {
            let header = serde_json::json!({ "index": { "_index": action.index } });
            serde_json::to_writer(&mut body, &header)?;
            body.push(b'\n');
            serde_json::to_writer(&mut body, &action.source)?;
            body.push(b'\n');
        }

        let response = self
            .request(Method::POST, "_bulk", Some("application/x-ndjson"), Some(body))
            .await?;
        let response = check(response, "Bulk write").await?;
        let payload: JsonValue = response
            .json()
            .await
            .context("Failed to parse bulk response")?;

        let items = payload
            .get("items")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| EtlError::Store("bulk response has no items".to_string()))?;
        if items.len() != actions.len() {
            return Err(EtlError::Store(format!(
                "bulk response has {} items for {} actions",
                items.len(),
                actions.len()
            ))
            .into());
        }
        Ok(items.iter().map(bulk_item_result).collect())
    }
}

/// Success flag and detail of one `_bulk` response item
fn bulk_item_result(item: &JsonValue) -> (bool, JsonValue) {
    let result = item
        .as_object()
        .and_then(|op| op.values().next())
        .cloned()
        .unwrap_or_else(|| item.clone());
    let status = result.get("status").and_then(JsonValue::as_u64).unwrap_or(0);
    let ok = (200..300).contains(&status) && result.get("error").is_none();
    (ok, item.clone())
}

/// Turn a non-success response into a store error carrying the body
async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(EtlError::Store(format!("{what} failed with {status}: {body}")).into())
}

#[async_trait]
impl IndexStore for ElasticClient {
    async fn exists(&self, index: &str) -> Result<bool> {
        let response = self.request(Method::HEAD, index, None, None).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(EtlError::Store(format!("Checking index {index} failed with {status}")).into()),
        }
    }

    async fn count(&self, index: &str) -> Result<u64> {
        let response = self
            .request(Method::GET, &format!("{index}/_count"), None, None)
            .await?;
        let payload: JsonValue = check(response, "Count").await?.json().await?;
        payload
            .get("count")
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| EtlError::Store(format!("count response for {index} has no count")).into())
    }

    async fn mappings(&self, index: &str) -> Result<JsonValue> {
        let response = self.request(Method::GET, index, None, None).await?;
        let payload: JsonValue = check(response, "Get index").await?.json().await?;
        Ok(payload
            .get(index)
            .and_then(|definition| definition.get("mappings"))
            .cloned()
            .unwrap_or_else(|| JsonValue::Object(Default::default())))
    }

    async fn delete(&self, index: &str) -> Result<()> {
        let response = self.request(Method::DELETE, index, None, None).await?;
        check(response, "Delete index").await?;
        log::debug!("Deleted index {}", index);
        Ok(())
    }

    async fn create(&self, index: &str, body: &JsonValue) -> Result<()> {
        let response = self.send_json(Method::PUT, index, body).await?;
        check(response, "Create index").await?;
        log::debug!("Created index {}", index);
        Ok(())
    }

    async fn stream_write(&self, actions: Vec<WriteAction>) -> Result<Vec<(bool, JsonValue)>> {
        let mut results = Vec::with_capacity(actions.len());
        for chunk in actions.chunks(self.chunk_size) {
            results.extend(self.bulk_chunk(chunk).await?);
        }
        Ok(results)
    }
}

impl std::fmt::Display for ElasticClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}
