//! Remote product archive access.
//!
//! [`ArchiveClient`] is the seam to the remote archive; [`DataStoreClient`]
//! implements it against the EUMETSAT Data Store REST API. [`Acquirer`]
//! drives a search and keeps a flat on-disk cache of downloaded archives.

pub mod acquire;
pub mod client;
pub mod datastore;
pub mod error;

pub use acquire::{AcquireOutcome, AcquireRequest, Acquirer, FailedProduct};
pub use client::{
    AccessToken, ArchiveClient, ByteStream, CollectionInfo, Credentials, ProductHandle,
    ProductStream,
};
pub use datastore::{DataStoreClient, DataStoreConfig};
pub use error::{ArchiveError, ArchiveResult};

pub use tokio_util::sync::CancellationToken;
