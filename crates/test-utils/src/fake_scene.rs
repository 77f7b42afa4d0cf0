//! Stand-in decoder and caption face for rendering tests.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use projection::AreaDefinition;
use renderer::{CaptionFace, RawScene, RenderError, RenderResult, SceneImage, SceneReader, WarningScope};

/// Colour of every fake scene.
pub const FAKE_SCENE_COLOR: [u8; 4] = [30, 90, 160, 255];

/// Size of a scene before it is resampled.
const NATIVE_SIZE: (usize, usize) = (16, 16);

/// Reader that produces a solid image sized to the target area.
///
/// Counts `load` calls so tests can check that cached images skip decoding.
/// Every load emits one benign diagnostic.
pub struct FakeSceneReader {
    loads: AtomicUsize,
    failing: HashSet<String>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

impl Default for FakeSceneReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSceneReader {
    pub fn new() -> Self {
        Self {
            loads: AtomicUsize::new(0),
            failing: HashSet::new(),
            start_time: Utc.with_ymd_and_hms(2015, 4, 14, 9, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2015, 4, 14, 9, 12, 41).unwrap(),
        }
    }

    /// Fail decoding payloads whose file stem is `stem`.
    pub fn failing_on(mut self, stem: &str) -> Self {
        self.failing.insert(stem.to_string());
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl SceneReader for FakeSceneReader {
    fn load(
        &self,
        source: &Path,
        product: &str,
        warnings: &mut WarningScope<'_>,
    ) -> RenderResult<Box<dyn RawScene>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        warnings.observe("RuntimeWarning: invalid value encountered in divide");

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing.contains(&stem) || !source.is_file() {
            return Err(RenderError::Decode {
                source_file: source.to_path_buf(),
                message: format!("cannot load {}", product),
            });
        }

        Ok(Box::new(FakeScene {
            size: NATIVE_SIZE,
            start_time: self.start_time,
            end_time: self.end_time,
        }))
    }
}

struct FakeScene {
    size: (usize, usize),
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

impl RawScene for FakeScene {
    fn resample(
        self: Box<Self>,
        area: &AreaDefinition,
        _warnings: &mut WarningScope<'_>,
    ) -> RenderResult<Box<dyn RawScene>> {
        Ok(Box::new(FakeScene {
            size: (area.width, area.height),
            ..*self
        }))
    }

    fn enhance(self: Box<Self>, _warnings: &mut WarningScope<'_>) -> RenderResult<SceneImage> {
        let (width, height) = match (u32::try_from(self.size.0), u32::try_from(self.size.1)) {
            (Ok(width), Ok(height)) => (width, height),
            _ => {
                return Err(RenderError::Decode {
                    source_file: Default::default(),
                    message: format!("scene too large: {}x{}", self.size.0, self.size.1),
                })
            }
        };
        Ok(SceneImage {
            image: RgbaImage::from_pixel(width, height, Rgba(FAKE_SCENE_COLOR)),
            start_time: self.start_time,
            end_time: self.end_time,
        })
    }
}

/// Caption face drawing each line as a filled block.
///
/// A character is `0.6 * size` wide and a line is `size` tall.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockFace;

impl CaptionFace for BlockFace {
    fn text_width(&self, size: u32, text: &str) -> u32 {
        (text.chars().count() as f32 * size as f32 * 0.6).ceil() as u32
    }

    fn line_height(&self, size: u32) -> u32 {
        size
    }

    fn draw(&self, image: &mut RgbaImage, x: i32, y: i32, size: u32, color: Rgba<u8>, text: &str) {
        let width = self.text_width(size, text).max(1);
        draw_filled_rect_mut(image, Rect::at(x, y).of_size(width, size.max(1)), color);
    }
}
