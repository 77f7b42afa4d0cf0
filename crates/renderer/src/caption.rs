//! Caption overlays.
//!
//! Captions are drawn in white on an opaque black box. The font size is
//! chosen per caption so the widest line stays below a fraction of the image
//! width.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use rusttype::{Font, Scale};
use sat_common::{isoformat, isoformat_time};
use tracing::debug;

use crate::error::{RenderError, RenderResult};

/// Padding around caption text in pixels.
pub const CAPTION_PAD: i32 = 6;

/// Upper bound on the fitted font size.
pub const MAX_FONT_SIZE: u32 = 512;

/// Fonts tried when none is configured.
pub const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BOX_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Font capability used for captions.
pub trait CaptionFace: Send + Sync {
    /// Width in pixels of a single line at `size`.
    fn text_width(&self, size: u32, text: &str) -> u32;

    /// Distance between baselines at `size`.
    fn line_height(&self, size: u32) -> u32;

    /// Draw a single line with its top-left corner at `(x, y)`.
    fn draw(&self, image: &mut RgbaImage, x: i32, y: i32, size: u32, color: Rgba<u8>, text: &str);
}

/// Where a caption is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    UpperLeft,
    LowerLeft,
}

/// TrueType caption font.
pub struct CaptionFont {
    font: Font<'static>,
    path: PathBuf,
}

impl fmt::Debug for CaptionFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptionFont").field("path", &self.path).finish()
    }
}

impl CaptionFont {
    pub fn from_file(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let font =
            Font::try_from_vec(bytes).ok_or_else(|| RenderError::InvalidFont(path.to_path_buf()))?;
        Ok(Self {
            font,
            path: path.to_path_buf(),
        })
    }

    /// Load the configured font, or the first available system font.
    pub fn locate(explicit: Option<&Path>) -> RenderResult<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(RenderError::FontNotFound(path.display().to_string()));
            }
            return Self::from_file(path);
        }

        let found = SYSTEM_FONT_PATHS
            .iter()
            .map(Path::new)
            .find(|p| p.is_file())
            .ok_or_else(|| RenderError::FontNotFound(SYSTEM_FONT_PATHS.join(", ")))?;

        let font = Self::from_file(found)?;
        debug!(path = %found.display(), "Loaded caption font");
        Ok(font)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CaptionFace for CaptionFont {
    fn text_width(&self, size: u32, text: &str) -> u32 {
        let (width, _) = text_size(Scale::uniform(size as f32), &self.font, text);
        width.max(0) as u32
    }

    fn line_height(&self, size: u32) -> u32 {
        let v = self.font.v_metrics(Scale::uniform(size as f32));
        (v.ascent - v.descent + v.line_gap).ceil().max(1.0) as u32
    }

    fn draw(&self, image: &mut RgbaImage, x: i32, y: i32, size: u32, color: Rgba<u8>, text: &str) {
        draw_text_mut(image, color, x, y, Scale::uniform(size as f32), &self.font, text);
    }
}

/// Width of the widest line of `text`.
fn block_width(face: &dyn CaptionFace, size: u32, text: &str) -> u32 {
    text.lines()
        .map(|line| face.text_width(size, line))
        .max()
        .unwrap_or(0)
}

/// Largest font size whose widest line stays below `fraction` of `image_width`.
///
/// Grows from size 1 until the text reaches the limit, then steps back one
/// size. Never returns less than 1.
pub fn fit_font_size(face: &dyn CaptionFace, text: &str, image_width: u32, fraction: f64) -> u32 {
    let limit = fraction * f64::from(image_width);
    let mut size = 1;
    while f64::from(block_width(face, size, text)) < limit && size < MAX_FONT_SIZE {
        size += 1;
    }
    size.saturating_sub(1).max(1)
}

/// Two-line caption for a scene.
///
/// `"<collection> <product>"` over `"<start> (to <end time of day>)"`.
pub fn scene_caption(
    collection_id: &str,
    product: &str,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
) -> String {
    format!(
        "{} {}\n{} (to {})",
        collection_id,
        product,
        isoformat(start),
        isoformat_time(end)
    )
}

/// Draw `text` on a black box at the given corner. Returns the font size used.
pub fn overlay_caption(
    image: &mut RgbaImage,
    face: &dyn CaptionFace,
    text: &str,
    anchor: Anchor,
    fraction: f64,
) -> u32 {
    let size = fit_font_size(face, text, image.width(), fraction);
    let lines: Vec<&str> = text.lines().collect();
    let line_height = face.line_height(size);
    let width = block_width(face, size, text);
    let height = line_height * lines.len() as u32;

    let (x, y) = match anchor {
        Anchor::UpperLeft => (CAPTION_PAD, CAPTION_PAD / 2),
        Anchor::LowerLeft => (CAPTION_PAD, image.height() as i32 - height as i32 - CAPTION_PAD),
    };

    let pad = CAPTION_PAD as u32;
    draw_filled_rect_mut(
        image,
        Rect::at(x - CAPTION_PAD, y - CAPTION_PAD).of_size(width + 2 * pad, height + 2 * pad),
        BOX_COLOR,
    );

    for (i, line) in lines.iter().enumerate() {
        face.draw(image, x, y + (i as u32 * line_height) as i32, size, TEXT_COLOR, line);
    }

    size
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Monospace stand-in: each char is `size` wide, lines are `size` tall.
    struct Monospace;

    impl CaptionFace for Monospace {
        fn text_width(&self, size: u32, text: &str) -> u32 {
            size * text.chars().count() as u32
        }

        fn line_height(&self, size: u32) -> u32 {
            size
        }

        fn draw(&self, image: &mut RgbaImage, x: i32, y: i32, size: u32, color: Rgba<u8>, text: &str) {
            let width = self.text_width(size, text).max(1);
            draw_filled_rect_mut(image, Rect::at(x, y).of_size(width, size.max(1)), color);
        }
    }

    #[test]
    fn test_fit_font_size_steps_back_below_limit() {
        // 10 chars into 0.6 * 1000 = 600 px: size 60 reaches the limit
        assert_eq!(fit_font_size(&Monospace, "abcdefghij", 1000, 0.6), 59);
        assert!(Monospace.text_width(59, "abcdefghij") < 600);
    }

    #[test]
    fn test_fit_font_size_uses_widest_line() {
        assert_eq!(fit_font_size(&Monospace, "ab\nabcdefghij", 1000, 0.6), 59);
    }

    #[test]
    fn test_fit_font_size_exact_limit_is_not_below() {
        // One char at size 120 is exactly 0.6 * 200 px wide
        assert_eq!(fit_font_size(&Monospace, "a", 200, 0.6), 119);
        assert_eq!(fit_font_size(&Monospace, "abcde", 1000, 0.6), 119);
    }

    #[test]
    fn test_fit_font_size_never_below_one() {
        assert_eq!(fit_font_size(&Monospace, "a very long caption", 4, 0.6), 1);
    }

    #[test]
    fn test_scene_caption() {
        let start = Utc.with_ymd_and_hms(2015, 4, 14, 9, 0, 9).unwrap();
        let end = Utc.with_ymd_and_hms(2015, 4, 14, 9, 12, 41).unwrap();
        assert_eq!(
            scene_caption("EO:EUM:DAT:MSG:HRSEVIRI", "natural_color", &start, &end),
            "EO:EUM:DAT:MSG:HRSEVIRI natural_color\n2015-04-14T09:00:09 (to 09:12:41)"
        );
    }

    #[test]
    fn test_overlay_positions() {
        let mut image = RgbaImage::from_pixel(200, 100, Rgba([0, 0, 255, 255]));
        let size = overlay_caption(&mut image, &Monospace, "abc", Anchor::UpperLeft, 0.6);
        // 3 chars below 120 px
        assert_eq!(size, 39);
        // Text at (6, 3), box starts at the image edge
        assert_eq!(*image.get_pixel(0, 0), BOX_COLOR);
        assert_eq!(*image.get_pixel(6, 3), TEXT_COLOR);
        assert_eq!(*image.get_pixel(199, 0), Rgba([0, 0, 255, 255]));

        let mut image = RgbaImage::from_pixel(200, 100, Rgba([0, 0, 255, 255]));
        let size = overlay_caption(&mut image, &Monospace, "abc", Anchor::LowerLeft, 0.6);
        // Bottom pad below the text
        let text_bottom = 100 - CAPTION_PAD as u32 - 1;
        assert_eq!(*image.get_pixel(6, text_bottom), TEXT_COLOR);
        assert_eq!(*image.get_pixel(6, 99), BOX_COLOR);
        assert_eq!(*image.get_pixel(6, text_bottom + 1 - size - 1), BOX_COLOR);
    }

    #[test]
    fn test_locate_explicit_missing_font() {
        assert!(matches!(
            CaptionFont::locate(Some(Path::new("/nonexistent/font.ttf"))),
            Err(RenderError::FontNotFound(_))
        ));
    }
}
