//! In-memory [`ArchiveClient`] for acquisition tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use archive::{
    AccessToken, ArchiveClient, ArchiveError, ArchiveResult, ByteStream, CollectionInfo,
    Credentials, ProductHandle, ProductStream,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use sat_common::TimeWindow;

/// How a fake product's body behaves when streamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBody {
    /// Whole body, announced length matches
    Complete,
    /// Errors after this many bytes
    FailAfter(usize),
    /// Announces the full length but ends halfway
    Truncated,
    /// Sends the first half and then never finishes
    Stall,
}

#[derive(Debug, Clone)]
pub struct FakeProduct {
    pub identifier: String,
    pub bytes: Vec<u8>,
    pub body: FakeBody,
}

/// Archive client serving a fixed product list.
///
/// Every `open_product` call is recorded. Identifiers can be marked
/// forbidden, in which case opening them fails; idempotence tests use this
/// to prove cached products are never fetched again.
pub struct FakeArchiveClient {
    collection_id: String,
    products: Vec<FakeProduct>,
    reject_credentials: bool,
    opened: Mutex<Vec<String>>,
    forbidden: Mutex<HashSet<String>>,
}

impl FakeArchiveClient {
    pub fn new(collection_id: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            products: Vec::new(),
            reject_credentials: false,
            opened: Mutex::new(Vec::new()),
            forbidden: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_product(self, identifier: &str, bytes: Vec<u8>) -> Self {
        self.with_body(identifier, bytes, FakeBody::Complete)
    }

    pub fn with_body(mut self, identifier: &str, bytes: Vec<u8>, body: FakeBody) -> Self {
        self.products.push(FakeProduct {
            identifier: identifier.to_string(),
            bytes,
            body,
        });
        self
    }

    pub fn rejecting_credentials(mut self) -> Self {
        self.reject_credentials = true;
        self
    }

    /// Make `open_product` fail for this identifier.
    pub fn forbid_open(&self, identifier: &str) {
        self.forbidden
            .lock()
            .expect("forbidden lock")
            .insert(identifier.to_string());
    }

    /// Make `open_product` fail for every product.
    pub fn forbid_all_opens(&self) {
        for product in &self.products {
            self.forbid_open(&product.identifier);
        }
    }

    /// Identifiers passed to `open_product`, in call order.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("opened lock").clone()
    }

    fn body_stream(product: &FakeProduct) -> ProductStream {
        let bytes = Bytes::from(product.bytes.clone());
        let len = bytes.len();
        let half = bytes.slice(..len / 2);

        let chunks: Vec<ArchiveResult<Bytes>> = match product.body {
            FakeBody::Complete => vec![Ok(half), Ok(bytes.slice(len / 2..))],
            FakeBody::FailAfter(n) => vec![
                Ok(bytes.slice(..n.min(len))),
                Err(ArchiveError::Download {
                    identifier: product.identifier.clone(),
                    message: "connection reset by peer".to_string(),
                }),
            ],
            FakeBody::Truncated | FakeBody::Stall => vec![Ok(half)],
        };

        let stream: ByteStream = if product.body == FakeBody::Stall {
            Box::pin(stream::iter(chunks).chain(stream::pending()))
        } else {
            Box::pin(stream::iter(chunks))
        };

        ProductStream {
            stream,
            content_length: Some(len as u64),
        }
    }
}

#[async_trait]
impl ArchiveClient for FakeArchiveClient {
    async fn authenticate(&self, _credentials: &Credentials) -> ArchiveResult<AccessToken> {
        if self.reject_credentials {
            return Err(ArchiveError::Authentication(
                "HTTP 401 Unauthorized: invalid client credentials".to_string(),
            ));
        }
        Ok(AccessToken {
            token: "fake-token".to_string(),
            expires_in: Some(Duration::from_secs(3600)),
        })
    }

    async fn open_collection(
        &self,
        _token: &AccessToken,
        collection_id: &str,
    ) -> ArchiveResult<CollectionInfo> {
        if collection_id != self.collection_id {
            return Err(ArchiveError::CollectionNotFound(collection_id.to_string()));
        }
        Ok(CollectionInfo {
            id: collection_id.to_string(),
            title: Some("Fake collection".to_string()),
        })
    }

    async fn search(
        &self,
        _token: &AccessToken,
        collection: &CollectionInfo,
        _window: &TimeWindow,
        _geometry_wkt: &str,
    ) -> ArchiveResult<Vec<ProductHandle>> {
        Ok(self
            .products
            .iter()
            .map(|p| ProductHandle::new(collection.id.clone(), p.identifier.clone()))
            .collect())
    }

    async fn open_product(
        &self,
        _token: &AccessToken,
        product: &ProductHandle,
    ) -> ArchiveResult<ProductStream> {
        self.opened
            .lock()
            .expect("opened lock")
            .push(product.identifier.clone());

        if self
            .forbidden
            .lock()
            .expect("forbidden lock")
            .contains(&product.identifier)
        {
            return Err(ArchiveError::Download {
                identifier: product.identifier.clone(),
                message: "open_product called for a forbidden product".to_string(),
            });
        }

        let fake = self
            .products
            .iter()
            .find(|p| p.identifier == product.identifier)
            .ok_or_else(|| ArchiveError::Download {
                identifier: product.identifier.clone(),
                message: "unknown product".to_string(),
            })?;

        Ok(Self::body_stream(fake))
    }
}
