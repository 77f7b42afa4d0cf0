//! Path utilities for locating the workspace and fonts.

use std::path::PathBuf;

use renderer::caption::SYSTEM_FONT_PATHS;

/// Returns the workspace root directory.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// A TrueType font usable for caption tests.
///
/// Honours `TEST_FONT` before falling back to the system font locations.
pub fn find_system_font() -> Option<PathBuf> {
    if let Ok(font) = std::env::var("TEST_FONT") {
        let path = PathBuf::from(font);
        if path.is_file() {
            return Some(path);
        }
    }
    SYSTEM_FONT_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
}
