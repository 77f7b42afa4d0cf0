//! Scene rendering and animation.
//!
//! - Unpacking product archives and locating the payload
//! - Decoding through a registered [`SceneReader`]
//! - Caption overlays
//! - GIF animation of the rendered frames

pub mod animation;
pub mod caption;
pub mod command_reader;
pub mod error;
pub mod reader;
pub mod render;
pub mod unpack;
pub mod warnings;

pub use animation::{animate, frame_duration_from_secs};
pub use caption::{fit_font_size, overlay_caption, scene_caption, Anchor, CaptionFace, CaptionFont};
pub use command_reader::{CommandReader, CommandReaderConfig};
pub use error::{AnimationError, AnimationResult, RenderError, RenderResult};
pub use reader::{
    CollectionReader, RawScene, ReaderRegistry, SceneImage, SceneReader, SEVIRI_HRIT_COLLECTION,
    SEVIRI_NATIVE_READER,
};
pub use render::{FailedArchive, RenderConfig, RenderOutcome, SceneRenderer, ATTRIBUTION};
pub use unpack::{find_payload, unzip_scene_files};
pub use warnings::{WarningFilter, WarningScope};
pub use tokio_util::sync::CancellationToken;
