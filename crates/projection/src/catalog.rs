//! Named area catalog.
//!
//! Areas are loaded from a YAML file keyed by area name:
//!
//! ```yaml
//! euro:
//!   description: Northern hemisphere Europe
//!   projection: { proj: stere, lat_0: 90.0, lon_0: 14.0, lat_ts: 60.0 }
//!   width: 1024
//!   height: 1024
//!   area_extent: [-2717181.73, -5571048.14, 1378818.27, -1475048.14]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use crate::area::{AreaDefinition, Projection};
use crate::error::{AreaError, AreaResult};
use crate::geostationary::Geostationary;
use crate::stereographic::PolarStereographic;

/// Area definitions looked up by name.
#[derive(Debug, Clone, Default)]
pub struct AreaCatalog {
    areas: BTreeMap<String, AreaDefinition>,
}

impl AreaCatalog {
    /// Catalog of the areas available without a config file.
    pub fn builtin() -> Self {
        let areas = [
            AreaDefinition {
                area_id: "euro".to_string(),
                description: "Europe, polar stereographic, 4 km".to_string(),
                projection: Projection::Stere(PolarStereographic::north(14.0, 60.0)),
                width: 1024,
                height: 1024,
                area_extent: [-2_717_181.73, -5_571_048.14, 1_378_818.27, -1_475_048.14].into(),
            },
            AreaDefinition {
                area_id: "seviri_europe_3km".to_string(),
                description: "Europe as seen by Meteosat at 0 degrees, 3 km".to_string(),
                projection: Projection::Geos(Geostationary::meteosat(0.0)),
                width: 1000,
                height: 833,
                area_extent: [-1_500_000.0, 2_500_000.0, 1_500_000.0, 5_000_000.0].into(),
            },
            AreaDefinition {
                area_id: "global_latlon".to_string(),
                description: "Global equirectangular, 0.5 degrees".to_string(),
                projection: Projection::Latlon,
                width: 720,
                height: 360,
                area_extent: [-180.0, -90.0, 180.0, 90.0].into(),
            },
        ];

        Self {
            areas: areas
                .into_iter()
                .map(|area| (area.area_id.clone(), area))
                .collect(),
        }
    }

    /// Load a catalog from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> AreaResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_yaml_str(&content)?;
        info!(
            path = %path.display(),
            areas = catalog.areas.len(),
            "Loaded area catalog"
        );
        Ok(catalog)
    }

    /// Parse a catalog, validating every entry.
    pub fn from_yaml_str(content: &str) -> AreaResult<Self> {
        let raw: BTreeMap<String, AreaDefinition> = serde_yaml::from_str(content)?;

        let mut areas = BTreeMap::new();
        for (name, mut area) in raw {
            area.area_id = name.clone();
            area.validate()?;
            debug!(area = %name, projection = area.projection.name(), "Registered area");
            areas.insert(name, area);
        }

        Ok(Self { areas })
    }

    /// Add the areas of `other`, replacing same-named ones.
    pub fn extend(&mut self, other: AreaCatalog) {
        for (name, area) in other.areas {
            if self.areas.insert(name.clone(), area).is_some() {
                debug!(area = %name, "Overriding area definition");
            }
        }
    }

    pub fn get(&self, name: &str) -> AreaResult<&AreaDefinition> {
        self.areas
            .get(name)
            .ok_or_else(|| AreaError::AreaNotFound(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.areas.keys().map(String::as_str)
    }

    pub fn areas(&self) -> impl Iterator<Item = &AreaDefinition> {
        self.areas.values()
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        let catalog = AreaCatalog::builtin();
        let names: Vec<&str> = catalog.names().collect();
        assert_eq!(names, vec!["euro", "global_latlon", "seviri_europe_3km"]);
        for area in catalog.areas() {
            area.validate().unwrap();
        }
    }

    #[test]
    fn test_unknown_area() {
        let catalog = AreaCatalog::builtin();
        match catalog.get("atlantis") {
            Err(AreaError::AreaNotFound(name)) => assert_eq!(name, "atlantis"),
            other => panic!("expected AreaNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_yaml_uses_key_as_area_id() {
        let yaml = r#"
alps:
  projection:
    proj: lcc
    lat_0: 46.0
    lon_0: 10.0
    lat_1: 44.0
    lat_2: 48.0
  width: 200
  height: 100
  area_extent: [-400000.0, -200000.0, 400000.0, 200000.0]
"#;
        let catalog = AreaCatalog::from_yaml_str(yaml).unwrap();
        let area = catalog.get("alps").unwrap();
        assert_eq!(area.area_id, "alps");
        assert_eq!(area.projection.name(), "lcc");
        assert_eq!(area.width, 200);
    }

    #[test]
    fn test_yaml_rejects_invalid_entry() {
        let yaml = r#"
broken:
  projection: { proj: latlon }
  width: 0
  height: 10
  area_extent: [0.0, 0.0, 1.0, 1.0]
"#;
        assert!(matches!(
            AreaCatalog::from_yaml_str(yaml),
            Err(AreaError::InvalidArea { .. })
        ));
    }

    #[test]
    fn test_extend_overrides_builtin() {
        let yaml = r#"
euro:
  projection: { proj: latlon }
  width: 10
  height: 10
  area_extent: [-10.0, 35.0, 30.0, 70.0]
"#;
        let mut catalog = AreaCatalog::builtin();
        catalog.extend(AreaCatalog::from_yaml_str(yaml).unwrap());
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get("euro").unwrap().width, 10);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AreaCatalog::load(dir.path().join("areas.yaml")),
            Err(AreaError::CatalogRead(_))
        ));
    }
}
