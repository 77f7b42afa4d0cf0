use thiserror::Error;

/// Errors raised while talking to the archive or caching its products.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Search in {collection} failed: {message}")]
    Search { collection: String, message: String },

    #[error("Download of {identifier} failed: {message}")]
    Download { identifier: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response from {url}: {message}")]
    Protocol { url: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ArchiveError {
    /// Attribute an error to the product being downloaded.
    pub fn into_download(self, identifier: &str) -> Self {
        match self {
            e @ (ArchiveError::Download { .. } | ArchiveError::Cancelled) => e,
            other => ArchiveError::Download {
                identifier: identifier.to_string(),
                message: other.to_string(),
            },
        }
    }
}

pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;
