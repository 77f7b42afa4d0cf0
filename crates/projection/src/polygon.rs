//! Bounding polygon of an area, used as a search footprint.

use std::fmt;

use crate::area::{AreaDefinition, BoundaryContour};
use crate::error::AreaResult;

/// Closed ring of `(lon, lat)` vertices.
///
/// The ring is the bounding box of the area's boundary contour, so it
/// over-approximates the real footprint. Contours crossing the antimeridian
/// are not special-cased.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryPolygon {
    vertices: Vec<(f64, f64)>,
}

impl BoundaryPolygon {
    /// Build the polygon from every point of a contour.
    ///
    /// Corners are emitted as min/max longitude crossed with min/max
    /// latitude, longitude varying slowest, and the first corner is repeated
    /// to close the ring.
    pub fn from_contour(contour: &BoundaryContour) -> Self {
        let (min_lon, max_lon) = min_max(&contour.lons);
        let (min_lat, max_lat) = min_max(&contour.lats);

        let mut vertices: Vec<(f64, f64)> = [min_lon, max_lon]
            .iter()
            .flat_map(|&lon| [min_lat, max_lat].map(|lat| (lon, lat)))
            .collect();
        vertices.push(vertices[0]);

        Self { vertices }
    }

    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }

    /// Well-known text, e.g. `POLYGON ((-10 35, -10 60, 20 35, 20 60, -10 35))`.
    pub fn to_wkt(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BoundaryPolygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let coords: Vec<String> = self
            .vertices
            .iter()
            .map(|(lon, lat)| format!("{} {}", lon, lat))
            .collect();
        write!(f, "POLYGON (({}))", coords.join(", "))
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Boundary polygon for an area definition.
pub fn derive_boundary_polygon(area: &AreaDefinition) -> AreaResult<BoundaryPolygon> {
    let contour = area.boundary_contour()?;
    let polygon = BoundaryPolygon::from_contour(&contour);
    tracing::debug!(
        area = %area.area_id,
        contour_points = contour.len(),
        polygon = %polygon,
        "Derived boundary polygon"
    );
    Ok(polygon)
}
