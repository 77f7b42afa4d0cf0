//! Error types for rendering and animation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning archives into captioned images.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("No reader configured for collection {0}")]
    UnsupportedCollection(String),

    #[error("Collection {collection} maps to reader {reader}, which is not registered")]
    ReaderNotRegistered { collection: String, reader: String },

    #[error("Collection {collection} is already mapped to reader {existing}, refusing {requested}")]
    DuplicateCollection {
        collection: String,
        existing: String,
        requested: String,
    },

    #[error("Reader {reader} already decodes collection {existing}, refusing {requested}")]
    ReaderAlreadyMapped {
        reader: String,
        existing: String,
        requested: String,
    },

    #[error("No .{extension} payload in {}", .archive.display())]
    PayloadNotFound { archive: PathBuf, extension: String },

    #[error("Archive {} contains unsafe entry {entry}", .archive.display())]
    UnsafeArchiveEntry { archive: PathBuf, entry: String },

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode {}: {message}", .source_file.display())]
    Decode { source_file: PathBuf, message: String },

    #[error("No caption font found (searched: {0})")]
    FontNotFound(String),

    #[error("Not a usable TrueType font: {}", .0.display())]
    InvalidFont(PathBuf),

    #[error("Rendering cancelled")]
    Cancelled,
}

/// Errors raised while assembling the animation.
#[derive(Error, Debug)]
pub enum AnimationError {
    #[error("No frames to animate")]
    EmptyFrameSequence,

    #[error(
        "Frame {} is {}x{}, expected {}x{}",
        .path.display(), .actual.0, .actual.1, .expected.0, .expected.1
    )]
    FrameSizeMismatch {
        path: PathBuf,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Frame duration must be positive, got {0}s")]
    InvalidFrameDuration(f64),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;
pub type AnimationResult<T> = std::result::Result<T, AnimationError>;
