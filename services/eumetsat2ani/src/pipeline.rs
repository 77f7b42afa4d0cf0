//! Acquire → render → animate.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use archive::{
    AcquireOutcome, AcquireRequest, Acquirer, ArchiveClient, CancellationToken, Credentials,
};
use projection::{derive_boundary_polygon, AreaCatalog};
use renderer::{animate, RenderOutcome, SceneRenderer};
use sat_common::{animation_file_name, TimeWindow};
use tracing::{info, instrument};

/// Parameters of one run.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub credentials: Credentials,
    pub collection_id: String,
    pub window: TimeWindow,
    pub area: String,
    pub root: PathBuf,
    pub product: String,
    pub frame_duration: Duration,
}

impl RunParams {
    /// Where the animation for these parameters is written.
    pub fn animation_path(&self) -> PathBuf {
        self.root.join(animation_file_name(
            &self.product,
            &self.collection_id,
            &self.window,
        ))
    }
}

/// What a run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub acquired: AcquireOutcome,
    pub rendered: RenderOutcome,
    pub animation: PathBuf,
}

pub struct Pipeline<C> {
    acquirer: Acquirer<C>,
    renderer: Arc<SceneRenderer>,
    catalog: AreaCatalog,
}

impl<C: ArchiveClient> Pipeline<C> {
    pub fn new(client: C, renderer: SceneRenderer, catalog: AreaCatalog) -> Self {
        Self {
            acquirer: Acquirer::new(client),
            renderer: Arc::new(renderer),
            catalog,
        }
    }

    /// Run every stage in order; each completes before the next starts.
    ///
    /// The collection's reader is resolved up front so a missing decoder
    /// fails the run before anything is downloaded.
    #[instrument(
        skip(self, params, cancel),
        fields(collection = %params.collection_id, product = %params.product, area = %params.area)
    )]
    pub async fn run(&self, params: &RunParams, cancel: &CancellationToken) -> Result<RunSummary> {
        let area = self
            .catalog
            .get(&params.area)
            .with_context(|| format!("Unknown area {}", params.area))?
            .clone();

        self.renderer
            .registry()
            .resolve(&params.collection_id)
            .with_context(|| format!("Cannot render collection {}", params.collection_id))?;

        let polygon = derive_boundary_polygon(&area)
            .with_context(|| format!("Cannot derive a footprint for area {}", params.area))?;
        info!(polygon = %polygon, "Derived search footprint");

        let request = AcquireRequest {
            credentials: params.credentials.clone(),
            collection_id: params.collection_id.clone(),
            window: params.window,
            polygon_wkt: polygon.to_wkt(),
            destination_root: params.root.clone(),
        };
        let acquired = self
            .acquirer
            .acquire(&request, cancel)
            .await
            .context("Acquisition failed")?;

        let rendered = {
            let renderer = Arc::clone(&self.renderer);
            let archives = acquired.archives.clone();
            let collection_id = params.collection_id.clone();
            let product = params.product.clone();
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || {
                renderer.render(&archives, &collection_id, &product, &area, &cancel)
            })
            .await
            .context("Render task failed")?
            .context("Rendering failed")?
        };

        if cancel.is_cancelled() {
            bail!("Cancelled before animating");
        }

        let animation = {
            let frames = rendered.images.clone();
            let output = params.animation_path();
            let frame_duration = params.frame_duration;
            tokio::task::spawn_blocking(move || animate(&frames, &output, frame_duration))
                .await
                .context("Animation task failed")?
                .context("Animation failed")?
        };

        Ok(RunSummary {
            acquired,
            rendered,
            animation,
        })
    }
}

/// Log what a run did.
pub fn log_summary(summary: &RunSummary) {
    let RunSummary {
        acquired,
        rendered,
        animation,
    } = summary;

    for failed in &acquired.failed {
        info!(identifier = %failed.identifier, error = %failed.error, "Product not downloaded");
    }
    for failed in &rendered.failed {
        info!(archive = %failed.archive.display(), error = %failed.error, "Archive not rendered");
    }

    info!(
        downloaded = acquired.downloaded,
        cached_archives = acquired.cached,
        failed_downloads = acquired.failed.len(),
        rendered = rendered.rendered,
        cached_images = rendered.cached,
        failed_renders = rendered.failed.len(),
        frames = rendered.images.len(),
        output = %animation.display(),
        "Run complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use image::codecs::gif::GifDecoder;
    use image::AnimationDecoder;
    use renderer::{ReaderRegistry, RenderError, SEVIRI_NATIVE_READER};
    use test_utils::{
        scenario_window, seviri_archive_bytes, BlockFace, FakeArchiveClient, FakeSceneReader,
        HRSEVIRI, NATURAL_COLOR, SCENARIO_ANIMATION, SCENARIO_PRODUCTS,
    };

    fn params(root: &Path) -> RunParams {
        RunParams {
            credentials: Credentials::new("key", "secret"),
            collection_id: HRSEVIRI.to_string(),
            window: scenario_window(),
            area: "global_latlon".to_string(),
            root: root.to_path_buf(),
            product: NATURAL_COLOR.to_string(),
            frame_duration: Duration::from_millis(500),
        }
    }

    fn pipeline(reader: Arc<FakeSceneReader>) -> Pipeline<FakeArchiveClient> {
        let client = SCENARIO_PRODUCTS
            .iter()
            .fold(FakeArchiveClient::new(HRSEVIRI), |client, id| {
                client.with_product(id, seviri_archive_bytes(id))
            });
        pipeline_with(client, reader)
    }

    fn pipeline_with(
        client: FakeArchiveClient,
        reader: Arc<FakeSceneReader>,
    ) -> Pipeline<FakeArchiveClient> {
        let mut registry = ReaderRegistry::with_default_collections();
        registry.register_reader(SEVIRI_NATIVE_READER, reader);
        let renderer = SceneRenderer::new(registry, Arc::new(BlockFace));
        Pipeline::new(client, renderer, AreaCatalog::builtin())
    }

    #[test]
    fn test_animation_path() {
        let params = params(Path::new("data"));
        assert_eq!(
            params.animation_path(),
            PathBuf::from("data").join(SCENARIO_ANIMATION)
        );
    }

    #[tokio::test]
    async fn test_scenario_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let reader = Arc::new(FakeSceneReader::new());
        let pipeline = pipeline(reader.clone());

        let summary = pipeline
            .run(&params(dir.path()), &CancellationToken::new())
            .await
            .unwrap();

        for id in SCENARIO_PRODUCTS {
            assert!(dir.path().join(format!("{}.zip", id)).is_file());
            assert!(dir.path().join(format!("{}.nat", id)).is_file());
            assert!(dir.path().join(format!("{}.png", id)).is_file());
        }
        assert_eq!(summary.animation, dir.path().join(SCENARIO_ANIMATION));

        let file = std::fs::File::open(&summary.animation).unwrap();
        let frames = GifDecoder::new(std::io::BufReader::new(file))
            .unwrap()
            .into_frames()
            .collect_frames()
            .unwrap();
        assert_eq!(frames.len(), 2);
        for frame in &frames {
            let (numer, denom) = frame.delay().numer_denom_ms();
            assert_eq!(numer / denom, 500);
            assert_eq!(frame.buffer().dimensions(), (720, 360));
        }
    }

    #[tokio::test]
    async fn test_rerun_reuses_everything() {
        let dir = tempfile::tempdir().unwrap();
        let reader = Arc::new(FakeSceneReader::new());
        let pipeline = pipeline(reader.clone());
        let params = params(dir.path());

        pipeline.run(&params, &CancellationToken::new()).await.unwrap();
        pipeline.acquirer.client().forbid_all_opens();
        let summary = pipeline.run(&params, &CancellationToken::new()).await.unwrap();

        assert_eq!(summary.acquired.cached, 2);
        assert_eq!(summary.rendered.cached, 2);
        assert_eq!(reader.load_count(), 2);
        assert!(summary.animation.is_file());
    }

    #[tokio::test]
    async fn test_unknown_area() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(Arc::new(FakeSceneReader::new()));
        let mut params = params(dir.path());
        params.area = "atlantis".to_string();

        let error = pipeline
            .run(&params, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(error.to_string().contains("atlantis"));
        assert!(pipeline.acquirer.client().opened().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(Arc::new(FakeSceneReader::new()));
        let mut params = params(dir.path());
        params.collection_id = "EO:EUM:DAT:MSG:NOPE".to_string();

        let error = pipeline
            .run(&params, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            error.downcast_ref::<RenderError>(),
            Some(RenderError::UnsupportedCollection(_))
        ));
        assert!(pipeline.acquirer.client().opened().is_empty());
    }

    #[tokio::test]
    async fn test_missing_reader_fails_before_download() {
        let dir = tempfile::tempdir().unwrap();
        let client = SCENARIO_PRODUCTS
            .iter()
            .fold(FakeArchiveClient::new(HRSEVIRI), |client, id| {
                client.with_product(id, seviri_archive_bytes(id))
            });
        let renderer = SceneRenderer::new(
            ReaderRegistry::with_default_collections(),
            Arc::new(BlockFace),
        );
        let pipeline = Pipeline::new(client, renderer, AreaCatalog::builtin());

        let error = pipeline
            .run(&params(dir.path()), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            error.downcast_ref::<RenderError>(),
            Some(RenderError::ReaderNotRegistered { .. })
        ));
        assert!(pipeline.acquirer.client().opened().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_run_writes_no_animation() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(Arc::new(FakeSceneReader::new()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(pipeline.run(&params(dir.path()), &cancel).await.is_err());
        assert!(!dir.path().join(SCENARIO_ANIMATION).exists());
    }

    #[tokio::test]
    async fn test_nothing_to_animate() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(
            FakeArchiveClient::new(HRSEVIRI),
            Arc::new(FakeSceneReader::new()),
        );

        let error = pipeline
            .run(&params(dir.path()), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            error.downcast_ref::<renderer::AnimationError>(),
            Some(renderer::AnimationError::EmptyFrameSequence)
        ));
        assert!(!dir.path().join(SCENARIO_ANIMATION).exists());
    }
}
