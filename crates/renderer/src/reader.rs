//! Decode capability and the collection → reader registry.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::RgbaImage;
use projection::AreaDefinition;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RenderError, RenderResult};
use crate::warnings::WarningScope;

/// High Rate SEVIRI Level 1.5 collection.
pub const SEVIRI_HRIT_COLLECTION: &str = "EO:EUM:DAT:MSG:HRSEVIRI";

/// Reader for SEVIRI native format files.
pub const SEVIRI_NATIVE_READER: &str = "seviri_l1b_native";

/// A decoded, resampled and enhanced scene ready for captioning.
#[derive(Debug, Clone)]
pub struct SceneImage {
    pub image: RgbaImage,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Loads a named product from a payload file.
pub trait SceneReader: Send + Sync {
    fn load(
        &self,
        source: &Path,
        product: &str,
        warnings: &mut WarningScope<'_>,
    ) -> RenderResult<Box<dyn RawScene>>;
}

/// A loaded product before it has been turned into an image.
pub trait RawScene: Send {
    /// Resample onto the target grid.
    fn resample(
        self: Box<Self>,
        area: &AreaDefinition,
        warnings: &mut WarningScope<'_>,
    ) -> RenderResult<Box<dyn RawScene>>;

    /// Apply the product's enhancement and produce a displayable image.
    fn enhance(self: Box<Self>, warnings: &mut WarningScope<'_>) -> RenderResult<SceneImage>;
}

/// How a collection's archives are decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionReader {
    /// Registered reader id
    pub reader: String,
    /// Extension of the payload member inside each archive, without the dot
    pub payload_extension: String,
}

impl CollectionReader {
    pub fn new(reader: impl Into<String>, payload_extension: impl Into<String>) -> Self {
        Self {
            reader: reader.into(),
            payload_extension: payload_extension.into(),
        }
    }
}

/// Reader resolved for one render run.
pub struct ResolvedReader<'a> {
    pub collection: &'a CollectionReader,
    pub reader: &'a dyn SceneReader,
}

/// Maps collections to reader ids and reader ids to decode capabilities.
#[derive(Default)]
pub struct ReaderRegistry {
    collections: HashMap<String, CollectionReader>,
    readers: HashMap<String, Arc<dyn SceneReader>>,
}

impl fmt::Debug for ReaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut readers: Vec<&String> = self.readers.keys().collect();
        readers.sort();
        f.debug_struct("ReaderRegistry")
            .field("collections", &self.collections)
            .field("readers", &readers)
            .finish()
    }
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the collections supported out of the box mapped, but no
    /// readers registered.
    pub fn with_default_collections() -> Self {
        let mut registry = Self::new();
        registry.collections.insert(
            SEVIRI_HRIT_COLLECTION.to_string(),
            CollectionReader::new(SEVIRI_NATIVE_READER, "nat"),
        );
        registry
    }

    /// Map a collection to a reader.
    ///
    /// Each collection has one reader and each reader serves one collection.
    /// Re-mapping a collection to the same reader is a no-op; mapping it to a
    /// different one, or mapping a second collection to a reader already in
    /// use, fails.
    pub fn map_collection(
        &mut self,
        collection_id: impl Into<String>,
        mapping: CollectionReader,
    ) -> RenderResult<()> {
        let collection_id = collection_id.into();
        match self.collections.get(&collection_id) {
            Some(existing) if existing == &mapping => Ok(()),
            Some(existing) => Err(RenderError::DuplicateCollection {
                collection: collection_id,
                existing: existing.reader.clone(),
                requested: mapping.reader,
            }),
            None => {
                if let Some((existing, _)) = self
                    .collections
                    .iter()
                    .find(|(_, mapped)| mapped.reader == mapping.reader)
                {
                    return Err(RenderError::ReaderAlreadyMapped {
                        reader: mapping.reader,
                        existing: existing.clone(),
                        requested: collection_id,
                    });
                }
                debug!(collection = %collection_id, reader = %mapping.reader, "Mapped collection");
                self.collections.insert(collection_id, mapping);
                Ok(())
            }
        }
    }

    /// Register the decode capability for a reader id, replacing any previous one.
    pub fn register_reader(&mut self, reader_id: impl Into<String>, reader: Arc<dyn SceneReader>) {
        self.readers.insert(reader_id.into(), reader);
    }

    pub fn collection(&self, collection_id: &str) -> Option<&CollectionReader> {
        self.collections.get(collection_id)
    }

    /// Reader for a collection; fails if the collection is unmapped or its
    /// reader has not been registered.
    pub fn resolve(&self, collection_id: &str) -> RenderResult<ResolvedReader<'_>> {
        let collection = self
            .collections
            .get(collection_id)
            .ok_or_else(|| RenderError::UnsupportedCollection(collection_id.to_string()))?;

        let reader = self.readers.get(&collection.reader).ok_or_else(|| {
            RenderError::ReaderNotRegistered {
                collection: collection_id.to_string(),
                reader: collection.reader.clone(),
            }
        })?;

        Ok(ResolvedReader {
            collection,
            reader: reader.as_ref(),
        })
    }
}
