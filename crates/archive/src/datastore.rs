//! EUMETSAT Data Store REST client.
//!
//! Endpoints used:
//! - `POST /token` (client credentials grant)
//! - `GET /data/browse/1.0.0/collections/{id}`
//! - `GET /data/search-products/1.0.0/os` (OpenSearch, GeoJSON results)
//! - `GET /data/download/1.0.0/collections/{id}/products/{identifier}`

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode, Url};
use sat_common::{parse_iso8601, TimeWindow};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::client::{
    download_error, AccessToken, ArchiveClient, CollectionInfo, Credentials, ProductHandle,
    ProductStream,
};
use crate::error::{ArchiveError, ArchiveResult};

pub const DEFAULT_BASE_URL: &str = "https://api.eumetsat.int";

/// Configuration for the Data Store client.
#[derive(Debug, Clone)]
pub struct DataStoreConfig {
    pub base_url: String,
    /// HTTP request timeout, covers the whole body of a download
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Search results requested per page
    pub page_size: usize,
}

impl Default for DataStoreConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(600), // 10 minutes
            connect_timeout: Duration::from_secs(30),
            page_size: 100,
        }
    }
}

/// Data Store implementation of [`ArchiveClient`].
pub struct DataStoreClient {
    client: Client,
    base_url: Url,
    page_size: usize,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    total_results: usize,
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    properties: FeatureProperties,
}

#[derive(Debug, Default, Deserialize)]
struct FeatureProperties {
    #[serde(default)]
    identifier: Option<String>,
    /// Sensing range as `start/end`
    #[serde(default)]
    date: Option<String>,
}

impl DataStoreClient {
    pub fn new(config: DataStoreConfig) -> ArchiveResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| ArchiveError::Protocol {
            url: config.base_url.clone(),
            message: format!("invalid base URL: {}", e),
        })?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("eumetsat2ani/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            page_size: config.page_size.max(1),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> ArchiveResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| ArchiveError::Protocol {
                url: self.base_url.to_string(),
                message: "base URL cannot carry a path".to_string(),
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn fetch_search_page(
        &self,
        token: &AccessToken,
        collection: &CollectionInfo,
        window: &TimeWindow,
        geometry_wkt: &str,
        start_index: usize,
    ) -> ArchiveResult<SearchPage> {
        let url = self.endpoint(&["data", "search-products", "1.0.0", "os"])?;
        let search_error = |message: String| ArchiveError::Search {
            collection: collection.id.clone(),
            message,
        };

        let response = self
            .client
            .get(url)
            .bearer_auth(&token.token)
            .query(&[
                ("format", "json".to_string()),
                ("pi", collection.id.clone()),
                ("dtstart", format_timestamp(&window.start)),
                ("dtend", format_timestamp(&window.end)),
                ("geo", geometry_wkt.to_string()),
                ("si", start_index.to_string()),
                ("c", self.page_size.to_string()),
            ])
            .send()
            .await
            .map_err(|e| search_error(e.to_string()))?;

        let response = check_status(response).await.map_err(search_error)?;
        let body = response.text().await.map_err(|e| search_error(e.to_string()))?;
        parse_search_page(&body).map_err(search_error)
    }
}

#[async_trait]
impl ArchiveClient for DataStoreClient {
    #[instrument(skip(self, credentials))]
    async fn authenticate(&self, credentials: &Credentials) -> ArchiveResult<AccessToken> {
        let url = self.endpoint(&["token"])?;

        let response = self
            .client
            .post(url)
            .basic_auth(credentials.key(), Some(credentials.secret()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| ArchiveError::Authentication(e.to_string()))?;

        let response = check_status(response)
            .await
            .map_err(ArchiveError::Authentication)?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ArchiveError::Authentication(format!("malformed token response: {}", e)))?;

        debug!(expires_in = ?token.expires_in, "Obtained access token");

        Ok(AccessToken {
            token: token.access_token,
            expires_in: token.expires_in.map(Duration::from_secs),
        })
    }

    #[instrument(skip(self, token))]
    async fn open_collection(
        &self,
        token: &AccessToken,
        collection_id: &str,
    ) -> ArchiveResult<CollectionInfo> {
        let mut url = self.endpoint(&["data", "browse", "1.0.0", "collections", collection_id])?;
        url.query_pairs_mut().append_pair("format", "json");

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&token.token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ArchiveError::CollectionNotFound(collection_id.to_string()));
        }

        let response = check_status(response)
            .await
            .map_err(|message| ArchiveError::Protocol {
                url: url.to_string(),
                message,
            })?;

        let body: Value = response.json().await?;
        let title = collection_title(&body);

        info!(collection = %collection_id, title = ?title, "Resolved collection");

        Ok(CollectionInfo {
            id: collection_id.to_string(),
            title,
        })
    }

    #[instrument(skip(self, token, collection, geometry_wkt), fields(collection = %collection.id))]
    async fn search(
        &self,
        token: &AccessToken,
        collection: &CollectionInfo,
        window: &TimeWindow,
        geometry_wkt: &str,
    ) -> ArchiveResult<Vec<ProductHandle>> {
        let mut products = Vec::new();
        let mut start_index = 0;

        loop {
            let page = self
                .fetch_search_page(token, collection, window, geometry_wkt, start_index)
                .await?;
            let received = page.features.len();
            let total = page.total_results;

            products.extend(
                page.features
                    .into_iter()
                    .filter_map(|feature| feature.into_handle(&collection.id)),
            );
            start_index += received;

            debug!(received, fetched = start_index, total, "Fetched search page");

            if received == 0 || start_index >= total {
                break;
            }
        }

        Ok(products)
    }

    #[instrument(skip(self, token, product), fields(identifier = %product.identifier))]
    async fn open_product(
        &self,
        token: &AccessToken,
        product: &ProductHandle,
    ) -> ArchiveResult<ProductStream> {
        let url = self.endpoint(&[
            "data",
            "download",
            "1.0.0",
            "collections",
            &product.collection_id,
            "products",
            &product.identifier,
        ])?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&token.token)
            .send()
            .await
            .map_err(|e| download_error(product, e))?;

        let response = check_status(response)
            .await
            .map_err(|message| download_error(product, message))?;

        let content_length = response.content_length();
        let identifier = product.identifier.clone();
        let stream = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| ArchiveError::Download {
                identifier: identifier.clone(),
                message: format!("error reading response chunk: {}", e),
            })
        });

        Ok(ProductStream {
            stream: Box::pin(stream),
            content_length,
        })
    }
}

impl Feature {
    fn into_handle(self, collection_id: &str) -> Option<ProductHandle> {
        let Some(identifier) = self.properties.identifier.or(self.id) else {
            warn!("Search result without identifier, skipping");
            return None;
        };

        let (sensing_start, sensing_end) = self
            .properties
            .date
            .as_deref()
            .map(parse_sensing_range)
            .unwrap_or((None, None));

        Some(ProductHandle {
            collection_id: collection_id.to_string(),
            identifier,
            sensing_start,
            sensing_end,
        })
    }
}

/// Return the response, or a message built from its status and body.
async fn check_status(response: Response) -> Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        Err(format!("HTTP {}", status))
    } else {
        Err(format!("HTTP {}: {}", status, truncate(body, 200)))
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_search_page(body: &str) -> Result<SearchPage, String> {
    serde_json::from_str(body).map_err(|e| format!("malformed search response: {}", e))
}

/// Collection title, from either the GeoJSON properties or the top level.
fn collection_title(body: &Value) -> Option<String> {
    body.get("properties")
        .and_then(|p| p.get("title"))
        .or_else(|| body.get("title"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Parse `start/end` into sensing times; unparseable parts become None.
fn parse_sensing_range(range: &str) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let mut parts = range.splitn(2, '/');
    let start = parts.next().and_then(|s| parse_iso8601(s.trim()).ok());
    let end = parts.next().and_then(|s| parse_iso8601(s.trim()).ok());
    (start, end)
}
