//! Archive client capability.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use sat_common::TimeWindow;

use crate::error::{ArchiveError, ArchiveResult};

/// API key pair for the archive.
#[derive(Clone)]
pub struct Credentials {
    key: String,
    secret: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Bearer token returned by the archive.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: Option<Duration>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// A resolved collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionInfo {
    pub id: String,
    pub title: Option<String>,
}

/// One product matched by a search.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductHandle {
    pub collection_id: String,
    pub identifier: String,
    pub sensing_start: Option<DateTime<Utc>>,
    pub sensing_end: Option<DateTime<Utc>>,
}

impl ProductHandle {
    pub fn new(collection_id: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            identifier: identifier.into(),
            sensing_start: None,
            sensing_end: None,
        }
    }

    /// Local file name of the product archive (`<identifier>.zip`).
    pub fn archive_file_name(&self) -> String {
        format!("{}.zip", self.identifier)
    }
}

pub type ByteStream = Pin<Box<dyn Stream<Item = ArchiveResult<Bytes>> + Send>>;

/// Body of a product download.
pub struct ProductStream {
    pub stream: ByteStream,
    /// Size announced by the server, if any
    pub content_length: Option<u64>,
}

impl fmt::Debug for ProductStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProductStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Operations the acquisition stage needs from a remote archive.
#[async_trait]
pub trait ArchiveClient: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ArchiveResult<AccessToken>;

    /// Resolve a collection id; unknown ids fail with
    /// [`ArchiveError::CollectionNotFound`].
    async fn open_collection(
        &self,
        token: &AccessToken,
        collection_id: &str,
    ) -> ArchiveResult<CollectionInfo>;

    /// Products intersecting the window and footprint, in the archive's order.
    async fn search(
        &self,
        token: &AccessToken,
        collection: &CollectionInfo,
        window: &TimeWindow,
        geometry_wkt: &str,
    ) -> ArchiveResult<Vec<ProductHandle>>;

    async fn open_product(
        &self,
        token: &AccessToken,
        product: &ProductHandle,
    ) -> ArchiveResult<ProductStream>;
}

#[async_trait]
impl<T: ArchiveClient + ?Sized> ArchiveClient for Arc<T> {
    async fn authenticate(&self, credentials: &Credentials) -> ArchiveResult<AccessToken> {
        (**self).authenticate(credentials).await
    }

    async fn open_collection(
        &self,
        token: &AccessToken,
        collection_id: &str,
    ) -> ArchiveResult<CollectionInfo> {
        (**self).open_collection(token, collection_id).await
    }

    async fn search(
        &self,
        token: &AccessToken,
        collection: &CollectionInfo,
        window: &TimeWindow,
        geometry_wkt: &str,
    ) -> ArchiveResult<Vec<ProductHandle>> {
        (**self).search(token, collection, window, geometry_wkt).await
    }

    async fn open_product(
        &self,
        token: &AccessToken,
        product: &ProductHandle,
    ) -> ArchiveResult<ProductStream> {
        (**self).open_product(token, product).await
    }
}

/// Turn a transport error into a per-product download error.
pub(crate) fn download_error(product: &ProductHandle, err: impl fmt::Display) -> ArchiveError {
    ArchiveError::Download {
        identifier: product.identifier.clone(),
        message: err.to_string(),
    }
}
