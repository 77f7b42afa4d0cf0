//! Rendering tests: unpacking, reader resolution, captions and caching.
//!
//! Decoding is done by a stand-in reader that produces a solid image sized
//! to the target area, so these tests exercise everything around the decoder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::Rgba;
use renderer::{
    unzip_scene_files, CancellationToken, RawScene, ReaderRegistry, RenderError, RenderResult,
    SceneReader, SceneRenderer, WarningScope, SEVIRI_NATIVE_READER,
};
use test_utils::{
    seviri_archive_bytes, small_area, write_zip, BlockFace, FakeSceneReader, FAKE_SCENE_COLOR,
    HRSEVIRI, NATURAL_COLOR, SCENARIO_PRODUCTS,
};

// ============================================================================
// Helper functions
// ============================================================================

fn renderer_with(reader: Arc<FakeSceneReader>) -> SceneRenderer {
    let mut registry = ReaderRegistry::with_default_collections();
    registry.register_reader(SEVIRI_NATIVE_READER, reader);
    SceneRenderer::new(registry, Arc::new(BlockFace))
}

/// Write the scenario archives into `dir`, in search order.
fn scenario_archives(dir: &Path) -> Vec<PathBuf> {
    SCENARIO_PRODUCTS
        .iter()
        .map(|id| {
            let path = dir.join(format!("{}.zip", id));
            std::fs::write(&path, seviri_archive_bytes(id)).unwrap();
            path
        })
        .collect()
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ============================================================================
// Scenario
// ============================================================================

#[test]
fn test_scenario_renders_one_image_per_archive() {
    let dir = tempfile::tempdir().unwrap();
    let archives = scenario_archives(dir.path());
    let reader = Arc::new(FakeSceneReader::new());
    let renderer = renderer_with(reader.clone());

    let outcome = renderer
        .render(&archives, HRSEVIRI, NATURAL_COLOR, &small_area(), &CancellationToken::new())
        .unwrap();

    let expected: Vec<PathBuf> = SCENARIO_PRODUCTS
        .iter()
        .map(|id| dir.path().join(format!("{}.png", id)))
        .collect();
    assert_eq!(outcome.images, expected);
    assert_eq!(outcome.rendered, 2);
    assert!(outcome.failed.is_empty());
    assert_eq!(reader.load_count(), 2);

    for path in &expected {
        let image = image::open(path).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (64, 32));
        // Caption box in the top-left corner
        assert_eq!(*image.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        // Attribution box in the bottom-left corner
        assert_eq!(*image.get_pixel(0, 31), Rgba([0, 0, 0, 255]));
        // Scene shows through on the right
        assert_eq!(*image.get_pixel(60, 14), Rgba(FAKE_SCENE_COLOR));
    }
}

#[test]
fn test_output_order_follows_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut archives = scenario_archives(dir.path());
    archives.reverse();
    let renderer = renderer_with(Arc::new(FakeSceneReader::new()));

    let outcome = renderer
        .render(&archives, HRSEVIRI, NATURAL_COLOR, &small_area(), &CancellationToken::new())
        .unwrap();

    let stems: Vec<String> = outcome
        .images
        .iter()
        .map(|p| p.file_stem().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(stems, vec![SCENARIO_PRODUCTS[1], SCENARIO_PRODUCTS[0]]);
}

#[test]
fn test_existing_images_skip_decoding() {
    let dir = tempfile::tempdir().unwrap();
    let archives = scenario_archives(dir.path());
    let reader = Arc::new(FakeSceneReader::new());
    let renderer = renderer_with(reader.clone());
    let area = small_area();

    let first = renderer
        .render(&archives, HRSEVIRI, NATURAL_COLOR, &area, &CancellationToken::new())
        .unwrap();
    let before: Vec<Vec<u8>> = first
        .images
        .iter()
        .map(|p| std::fs::read(p).unwrap())
        .collect();

    let second = renderer
        .render(&archives, HRSEVIRI, NATURAL_COLOR, &area, &CancellationToken::new())
        .unwrap();

    assert_eq!(second.images, first.images);
    assert_eq!(second.cached, 2);
    assert_eq!(second.rendered, 0);
    assert_eq!(reader.load_count(), 2);
    for (path, bytes) in second.images.iter().zip(before) {
        assert_eq!(std::fs::read(path).unwrap(), bytes);
    }
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_unsupported_collection_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let archives = scenario_archives(dir.path());
    let before = dir_entries(dir.path());
    let renderer = renderer_with(Arc::new(FakeSceneReader::new()));

    let result = renderer.render(
        &archives,
        "EO:EUM:DAT:MSG:CLM",
        NATURAL_COLOR,
        &small_area(),
        &CancellationToken::new(),
    );

    assert!(matches!(result, Err(RenderError::UnsupportedCollection(id)) if id == "EO:EUM:DAT:MSG:CLM"));
    assert_eq!(dir_entries(dir.path()), before);
}

#[test]
fn test_unregistered_reader_fails_run() {
    let dir = tempfile::tempdir().unwrap();
    let archives = scenario_archives(dir.path());
    let renderer = SceneRenderer::new(
        ReaderRegistry::with_default_collections(),
        Arc::new(BlockFace),
    );

    let result = renderer.render(
        &archives,
        HRSEVIRI,
        NATURAL_COLOR,
        &small_area(),
        &CancellationToken::new(),
    );

    assert!(matches!(result, Err(RenderError::ReaderNotRegistered { .. })));
}

#[test]
fn test_archive_without_payload_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut archives = scenario_archives(dir.path());
    let empty = dir.path().join("EMPTY.zip");
    write_zip(&empty, &[("manifest.xml", b"<manifest/>".as_slice())]);
    archives.insert(1, empty.clone());
    let renderer = renderer_with(Arc::new(FakeSceneReader::new()));

    let outcome = renderer
        .render(&archives, HRSEVIRI, NATURAL_COLOR, &small_area(), &CancellationToken::new())
        .unwrap();

    assert_eq!(outcome.images.len(), 2);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].archive, empty);
    assert!(matches!(
        &outcome.failed[0].error,
        RenderError::PayloadNotFound { extension, .. } if extension == "nat"
    ));
}

#[test]
fn test_decode_failure_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let archives = scenario_archives(dir.path());
    let reader = Arc::new(FakeSceneReader::new().failing_on(SCENARIO_PRODUCTS[0]));
    let renderer = renderer_with(reader.clone());

    let outcome = renderer
        .render(&archives, HRSEVIRI, NATURAL_COLOR, &small_area(), &CancellationToken::new())
        .unwrap();

    assert_eq!(
        outcome.images,
        vec![dir.path().join(format!("{}.png", SCENARIO_PRODUCTS[1]))]
    );
    assert_eq!(outcome.failed.len(), 1);
    assert!(matches!(outcome.failed[0].error, RenderError::Decode { .. }));
    assert!(!dir
        .path()
        .join(format!("{}.png", SCENARIO_PRODUCTS[0]))
        .exists());
}

#[test]
fn test_corrupt_archive_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut archives = scenario_archives(dir.path());
    let corrupt = dir.path().join("CORRUPT.zip");
    std::fs::write(&corrupt, b"PK but not really").unwrap();
    archives.push(corrupt);
    let renderer = renderer_with(Arc::new(FakeSceneReader::new()));

    let outcome = renderer
        .render(&archives, HRSEVIRI, NATURAL_COLOR, &small_area(), &CancellationToken::new())
        .unwrap();

    assert_eq!(outcome.images.len(), 2);
    assert!(matches!(outcome.failed[0].error, RenderError::Zip(_)));
}

// ============================================================================
// Unpacking
// ============================================================================

#[test]
fn test_unzip_writes_only_missing_members() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("scene.zip");
    write_zip(
        &archive,
        &[
            ("manifest.xml", b"<manifest/>".as_slice()),
            ("EOPMetadata/", b"".as_slice()),
            ("scene.nat", b"payload".as_slice()),
        ],
    );

    let members = unzip_scene_files(&archive).unwrap();
    assert_eq!(
        members,
        vec![dir.path().join("manifest.xml"), dir.path().join("scene.nat")]
    );

    // Local edits survive, deleted members come back
    std::fs::write(dir.path().join("manifest.xml"), b"edited").unwrap();
    std::fs::remove_file(dir.path().join("scene.nat")).unwrap();

    let again = unzip_scene_files(&archive).unwrap();
    assert_eq!(again, members);
    assert_eq!(std::fs::read(dir.path().join("manifest.xml")).unwrap(), b"edited");
    assert_eq!(std::fs::read(dir.path().join("scene.nat")).unwrap(), b"payload");
}

#[test]
fn test_unzip_nested_member() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("nested.zip");
    write_zip(&archive, &[("sub/dir/scene.nat", b"payload".as_slice())]);

    let members = unzip_scene_files(&archive).unwrap();

    assert_eq!(members, vec![dir.path().join("sub/dir/scene.nat")]);
    assert!(members[0].is_file());
}

#[test]
fn test_unzip_rejects_escaping_entry() {
    let dir = tempfile::tempdir().unwrap();
    let inner = dir.path().join("inner");
    std::fs::create_dir(&inner).unwrap();
    let archive = inner.join("evil.zip");
    write_zip(&archive, &[("../evil.nat", b"payload".as_slice())]);

    let result = unzip_scene_files(&archive);

    assert!(matches!(result, Err(RenderError::UnsafeArchiveEntry { .. })));
    assert!(!dir.path().join("evil.nat").exists());
}

// ============================================================================
// Cancellation
// ============================================================================

/// Cancels the token on the first load, then decodes as usual.
struct CancelOnLoad {
    inner: FakeSceneReader,
    cancel: CancellationToken,
}

impl SceneReader for CancelOnLoad {
    fn load(
        &self,
        source: &Path,
        product: &str,
        warnings: &mut WarningScope<'_>,
    ) -> RenderResult<Box<dyn RawScene>> {
        self.cancel.cancel();
        self.inner.load(source, product, warnings)
    }
}

#[test]
fn test_cancelled_before_start_renders_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let archives = scenario_archives(dir.path());
    let reader = Arc::new(FakeSceneReader::new());
    let renderer = renderer_with(reader.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = renderer.render(&archives, HRSEVIRI, NATURAL_COLOR, &small_area(), &cancel);

    assert!(matches!(result, Err(RenderError::Cancelled)));
    assert_eq!(reader.load_count(), 0);
    assert!(!dir_entries(dir.path()).iter().any(|n| n.ends_with(".png")));
}

#[test]
fn test_cancel_stops_between_archives() {
    let dir = tempfile::tempdir().unwrap();
    let archives = scenario_archives(dir.path());
    let cancel = CancellationToken::new();
    let mut registry = ReaderRegistry::with_default_collections();
    registry.register_reader(
        SEVIRI_NATIVE_READER,
        Arc::new(CancelOnLoad {
            inner: FakeSceneReader::new(),
            cancel: cancel.clone(),
        }),
    );
    let renderer = SceneRenderer::new(registry, Arc::new(BlockFace));

    let result = renderer.render(&archives, HRSEVIRI, NATURAL_COLOR, &small_area(), &cancel);

    assert!(matches!(result, Err(RenderError::Cancelled)));
    let first = dir.path().join(format!("{}.png", SCENARIO_PRODUCTS[0]));
    let second = dir.path().join(format!("{}.png", SCENARIO_PRODUCTS[1]));
    assert!(first.is_file());
    assert!(!second.exists());
}
