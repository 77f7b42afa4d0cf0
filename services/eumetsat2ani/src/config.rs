//! Configuration loading for areas and collection readers.
//!
//! Both files live in the config directory and are optional:
//! - `areas.yaml` adds to (or overrides) the built-in areas
//! - `collections.yaml` maps collections to readers and configures the
//!   helper program behind each reader

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use projection::AreaCatalog;
use renderer::{CollectionReader, CommandReader, CommandReaderConfig, ReaderRegistry, WarningFilter};
use serde::Deserialize;
use tracing::{debug, info, warn};

pub const AREAS_FILE: &str = "areas.yaml";
pub const COLLECTIONS_FILE: &str = "collections.yaml";

/// Reader configuration loaded from `collections.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionsConfig {
    /// Collection id → reader and payload extension
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionReader>,

    /// Reader id → helper program
    #[serde(default)]
    pub readers: BTreeMap<String, CommandReaderConfig>,

    /// Replaces the built-in list of benign decoder diagnostics
    #[serde(default)]
    pub benign_warnings: Option<Vec<String>>,
}

impl CollectionsConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: CollectionsConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!(
            path = %path.display(),
            collections = config.collections.len(),
            readers = config.readers.len(),
            "Loaded collections config"
        );
        Ok(config)
    }

    /// Load `collections.yaml` from `config_dir`, or an empty config if absent.
    pub fn load_from_dir(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(COLLECTIONS_FILE);
        if !path.exists() {
            warn!(path = %path.display(), "Collections config not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Registry with the default mappings, the configured mappings and a
    /// [`CommandReader`] for every configured reader.
    pub fn build_registry(&self) -> Result<ReaderRegistry> {
        let mut registry = ReaderRegistry::with_default_collections();

        for (collection, mapping) in &self.collections {
            registry
                .map_collection(collection.clone(), mapping.clone())
                .with_context(|| format!("Invalid mapping for collection {}", collection))?;
        }

        for (reader_id, reader) in &self.readers {
            info!(reader = %reader_id, command = %reader.command, "Registered reader");
            registry.register_reader(
                reader_id.clone(),
                Arc::new(CommandReader::new(reader_id.clone(), reader.clone())),
            );
        }

        Ok(registry)
    }

    pub fn warning_filter(&self) -> WarningFilter {
        match &self.benign_warnings {
            Some(patterns) => WarningFilter::new(patterns),
            None => WarningFilter::default(),
        }
    }
}

/// Built-in areas plus those in `areas.yaml`, if present.
pub fn load_area_catalog(config_dir: &Path) -> Result<AreaCatalog> {
    let mut catalog = AreaCatalog::builtin();

    let path = config_dir.join(AREAS_FILE);
    if path.exists() {
        let file = AreaCatalog::load(&path)
            .with_context(|| format!("Failed to load area catalog: {}", path.display()))?;
        catalog.extend(file);
    } else {
        debug!(path = %path.display(), "No area file, using built-in areas");
    }

    Ok(catalog)
}
