//! Archive to captioned image rendering.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbaImage};
use projection::AreaDefinition;
use sat_common::write_atomically;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::caption::{overlay_caption, scene_caption, Anchor, CaptionFace};
use crate::error::{RenderError, RenderResult};
use crate::reader::{ReaderRegistry, ResolvedReader, SceneImage};
use crate::unpack::{find_payload, unzip_scene_files};
use crate::warnings::WarningFilter;

/// Attribution drawn at the bottom-left of every frame.
pub const ATTRIBUTION: &str = "made with eumetsat2ani";

/// Rendering options.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Extension of rendered images, without the dot
    pub image_extension: String,
    /// Fraction of the image width a caption may span
    pub img_fraction: f64,
    pub attribution: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            image_extension: "png".to_string(),
            img_fraction: 0.6,
            attribution: ATTRIBUTION.to_string(),
        }
    }
}

/// An archive that could not be rendered.
#[derive(Debug)]
pub struct FailedArchive {
    pub archive: PathBuf,
    pub error: RenderError,
}

/// Result of a render run.
#[derive(Debug, Default)]
pub struct RenderOutcome {
    /// Rendered images, in input order
    pub images: Vec<PathBuf>,
    pub rendered: usize,
    pub cached: usize,
    pub failed: Vec<FailedArchive>,
}

/// Turns product archives into captioned images next to their payloads.
pub struct SceneRenderer {
    registry: ReaderRegistry,
    face: Arc<dyn CaptionFace>,
    config: RenderConfig,
    warning_filter: WarningFilter,
}

enum Rendered {
    Fresh(PathBuf),
    Cached(PathBuf),
}

impl SceneRenderer {
    pub fn new(registry: ReaderRegistry, face: Arc<dyn CaptionFace>) -> Self {
        Self {
            registry,
            face,
            config: RenderConfig::default(),
            warning_filter: WarningFilter::default(),
        }
    }

    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_warning_filter(mut self, filter: WarningFilter) -> Self {
        self.warning_filter = filter;
        self
    }

    pub fn registry(&self) -> &ReaderRegistry {
        &self.registry
    }

    /// Render every archive in order.
    ///
    /// Fails before touching any archive if the collection has no reader.
    /// Per-archive failures are logged, collected in
    /// [`RenderOutcome::failed`] and skipped. `cancel` is checked before each
    /// archive; images already written stay cached.
    #[instrument(
        skip(self, archives, area, cancel),
        fields(archives = archives.len(), area = %area.area_id)
    )]
    pub fn render(
        &self,
        archives: &[PathBuf],
        collection_id: &str,
        product: &str,
        area: &AreaDefinition,
        cancel: &CancellationToken,
    ) -> RenderResult<RenderOutcome> {
        let resolved = self.registry.resolve(collection_id)?;
        let mut outcome = RenderOutcome::default();

        for archive in archives {
            if cancel.is_cancelled() {
                warn!(
                    rendered = outcome.rendered,
                    remaining = archives.len() - outcome.images.len() - outcome.failed.len(),
                    "Rendering cancelled"
                );
                return Err(RenderError::Cancelled);
            }
            match self.render_archive(archive, &resolved, collection_id, product, area) {
                Ok(Rendered::Fresh(path)) => {
                    info!(archive = %archive.display(), image = %path.display(), "Rendered scene");
                    outcome.rendered += 1;
                    outcome.images.push(path);
                }
                Ok(Rendered::Cached(path)) => {
                    info!(image = %path.display(), "Image already rendered, skipping decode");
                    outcome.cached += 1;
                    outcome.images.push(path);
                }
                Err(error) => {
                    warn!(archive = %archive.display(), error = %error, "Failed to render archive, skipping");
                    outcome.failed.push(FailedArchive {
                        archive: archive.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            images = outcome.images.len(),
            rendered = outcome.rendered,
            cached = outcome.cached,
            failed = outcome.failed.len(),
            "Rendering complete"
        );

        Ok(outcome)
    }

    fn render_archive(
        &self,
        archive: &Path,
        resolved: &ResolvedReader<'_>,
        collection_id: &str,
        product: &str,
        area: &AreaDefinition,
    ) -> RenderResult<Rendered> {
        let members = unzip_scene_files(archive)?;
        let payload = find_payload(&members, &resolved.collection.payload_extension, archive)?;

        let output = payload.with_extension(&self.config.image_extension);
        if output.exists() {
            return Ok(Rendered::Cached(output));
        }

        let SceneImage {
            mut image,
            start_time,
            end_time,
        } = {
            let mut warnings = self.warning_filter.scope(payload.display().to_string());
            let scene = resolved.reader.load(&payload, product, &mut warnings)?;
            let scene = scene.resample(area, &mut warnings)?;
            scene.enhance(&mut warnings)?
        };

        let caption = scene_caption(collection_id, product, &start_time, &end_time);
        overlay_caption(
            &mut image,
            self.face.as_ref(),
            &caption,
            Anchor::UpperLeft,
            self.config.img_fraction,
        );
        overlay_caption(
            &mut image,
            self.face.as_ref(),
            &self.config.attribution,
            Anchor::LowerLeft,
            self.config.img_fraction,
        );

        save_png(&output, &image)?;
        Ok(Rendered::Fresh(output))
    }
}

/// Write an RGBA image as PNG through a temporary file.
pub fn save_png(path: &Path, image: &RgbaImage) -> RenderResult<()> {
    write_atomically(path, |file| {
        let mut writer = BufWriter::new(file);
        PngEncoder::new(&mut writer).write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ColorType::Rgba8,
        )?;
        writer.flush()?;
        Ok::<_, RenderError>(())
    })
}
