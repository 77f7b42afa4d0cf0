//! Product acquisition with an on-disk cache.
//!
//! Each matched product is stored as `<root>/<identifier>.zip`. A present
//! file is a cache hit and is never downloaded again. Downloads stream into
//! `<identifier>.zip.partial` and are renamed into place only once the whole
//! body has been written, so an interrupted run never leaves a truncated
//! archive behind under the final name.

use std::future::Future;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use sat_common::{partial_path, TimeWindow};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::client::{download_error, AccessToken, ArchiveClient, Credentials, ProductHandle, ProductStream};
use crate::error::{ArchiveError, ArchiveResult};

/// Parameters of one acquisition run.
#[derive(Debug, Clone)]
pub struct AcquireRequest {
    pub credentials: Credentials,
    pub collection_id: String,
    pub window: TimeWindow,
    /// Footprint in WKT, passed to the archive search
    pub polygon_wkt: String,
    pub destination_root: PathBuf,
}

/// A product that could not be downloaded.
#[derive(Debug)]
pub struct FailedProduct {
    pub identifier: String,
    pub error: ArchiveError,
}

/// Result of an acquisition run.
#[derive(Debug, Default)]
pub struct AcquireOutcome {
    /// Local archives in search order, downloaded and cached alike
    pub archives: Vec<PathBuf>,
    pub downloaded: usize,
    pub cached: usize,
    pub failed: Vec<FailedProduct>,
}

/// Searches an archive and mirrors the matched products locally.
pub struct Acquirer<C> {
    client: C,
}

impl<C: ArchiveClient> Acquirer<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Authenticate, search and download every product not already on disk.
    ///
    /// Authentication, collection and search failures abort the run. A
    /// product that fails to download is recorded in
    /// [`AcquireOutcome::failed`] and the run continues. Cancellation
    /// aborts immediately with [`ArchiveError::Cancelled`].
    #[instrument(
        skip(self, request, cancel),
        fields(collection = %request.collection_id, root = %request.destination_root.display())
    )]
    pub async fn acquire(
        &self,
        request: &AcquireRequest,
        cancel: &CancellationToken,
    ) -> ArchiveResult<AcquireOutcome> {
        let token = cancellable(cancel, self.client.authenticate(&request.credentials)).await?;
        info!("Authenticated with archive");

        let collection = cancellable(
            cancel,
            self.client.open_collection(&token, &request.collection_id),
        )
        .await?;

        let products = cancellable(
            cancel,
            self.client
                .search(&token, &collection, &request.window, &request.polygon_wkt),
        )
        .await?;

        info!(
            products = products.len(),
            start = %request.window.start,
            end = %request.window.end,
            "Search complete"
        );

        fs::create_dir_all(&request.destination_root).await?;

        let mut outcome = AcquireOutcome::default();

        for product in &products {
            let path = request.destination_root.join(product.archive_file_name());

            if path.exists() {
                info!(
                    identifier = %product.identifier,
                    path = %path.display(),
                    "Archive already present, skipping download"
                );
                outcome.cached += 1;
                outcome.archives.push(path);
                continue;
            }

            match self.download(&token, product, &path, cancel).await {
                Ok(bytes) => {
                    info!(
                        identifier = %product.identifier,
                        path = %path.display(),
                        bytes,
                        "Download completed"
                    );
                    outcome.downloaded += 1;
                    outcome.archives.push(path);
                }
                Err(ArchiveError::Cancelled) => {
                    warn!(identifier = %product.identifier, "Acquisition cancelled");
                    return Err(ArchiveError::Cancelled);
                }
                Err(e) => {
                    let error = e.into_download(&product.identifier);
                    warn!(
                        identifier = %product.identifier,
                        error = %error,
                        "Download failed, skipping product"
                    );
                    outcome.failed.push(FailedProduct {
                        identifier: product.identifier.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            archives = outcome.archives.len(),
            downloaded = outcome.downloaded,
            cached = outcome.cached,
            failed = outcome.failed.len(),
            "Acquisition complete"
        );

        Ok(outcome)
    }

    /// Download one product to `path` through its partial file.
    async fn download(
        &self,
        token: &AccessToken,
        product: &ProductHandle,
        path: &Path,
        cancel: &CancellationToken,
    ) -> ArchiveResult<u64> {
        let partial = partial_path(path);

        let result = match self.stream_to_file(token, product, &partial, cancel).await {
            Ok(bytes) => fs::rename(&partial, path)
                .await
                .map(|()| bytes)
                .map_err(ArchiveError::from),
            Err(e) => Err(e),
        };

        if result.is_err() {
            if let Err(e) = fs::remove_file(&partial).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %partial.display(), error = %e, "Failed to remove partial download");
                }
            }
        }

        result
    }

    async fn stream_to_file(
        &self,
        token: &AccessToken,
        product: &ProductHandle,
        partial: &Path,
        cancel: &CancellationToken,
    ) -> ArchiveResult<u64> {
        let ProductStream {
            mut stream,
            content_length,
        } = cancellable(cancel, self.client.open_product(token, product)).await?;

        let mut file = File::create(partial).await?;
        let mut written = 0u64;

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return Err(ArchiveError::Cancelled),
                chunk = stream.next() => chunk,
            };
            let Some(chunk) = chunk else { break };
            let chunk = chunk?;

            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;

        debug!(identifier = %product.identifier, bytes = written, "Stream finished");

        if let Some(expected) = content_length {
            if expected != written {
                return Err(download_error(
                    product,
                    format!(
                        "size mismatch: expected {} bytes, got {}",
                        expected, written
                    ),
                ));
            }
        }

        Ok(written)
    }
}

/// Run `fut` unless `cancel` fires first.
async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> ArchiveResult<T>
where
    F: Future<Output = ArchiveResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ArchiveError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancellable_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = cancellable(&cancel, async { Ok::<_, ArchiveError>(1) }).await;
        assert!(matches!(result, Err(ArchiveError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancellable_passes_result_through() {
        let cancel = CancellationToken::new();
        let result = cancellable(&cancel, async { Ok::<_, ArchiveError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_into_download_wraps_other_errors() {
        let err = ArchiveError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            .into_download("product-1");
        match err {
            ArchiveError::Download { identifier, message } => {
                assert_eq!(identifier, "product-1");
                assert!(message.contains("disk full"));
            }
            other => panic!("expected Download, got {:?}", other),
        }
        assert!(matches!(
            ArchiveError::Cancelled.into_download("x"),
            ArchiveError::Cancelled
        ));
    }
}
