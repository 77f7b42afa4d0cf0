//! Area definitions: a projected grid with a known extent.

use serde::{Deserialize, Serialize};

use crate::error::{AreaError, AreaResult};
use crate::geostationary::{normalize_lon, Geostationary};
use crate::lambert::LambertConformal;
use crate::stereographic::PolarStereographic;

/// Default spacing (in grid cells) between sampled boundary points.
pub const DEFAULT_CONTOUR_STRIDE: usize = 10;

/// Samples taken around the disc limb of a geostationary area.
const LIMB_POINTS: usize = 360;

/// Map projection of an area grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "proj", rename_all = "lowercase")]
pub enum Projection {
    /// Plate carrée; coordinates are already degrees.
    Latlon,
    Geos(Geostationary),
    Lcc(LambertConformal),
    Stere(PolarStereographic),
}

impl Projection {
    pub fn validate(&self) -> AreaResult<()> {
        match self {
            Projection::Latlon => Ok(()),
            Projection::Geos(p) => p.validate(),
            Projection::Lcc(p) => p.validate(),
            Projection::Stere(p) => p.validate(),
        }
    }

    /// Projection coordinates to geographic `(lon, lat)` degrees.
    ///
    /// None when the point does not lie on the globe.
    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let (lon, lat) = match self {
            Projection::Latlon => (x, y),
            Projection::Geos(p) => p.inverse(x, y)?,
            Projection::Lcc(p) => p.inverse(x, y),
            Projection::Stere(p) => p.inverse(x, y),
        };
        if lon.is_finite() && lat.is_finite() && lat.abs() <= 90.0 {
            let lon = match self {
                Projection::Latlon => lon,
                _ => normalize_lon(lon),
            };
            Some((lon, lat))
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Projection::Latlon => "latlon",
            Projection::Geos(_) => "geos",
            Projection::Lcc(_) => "lcc",
            Projection::Stere(_) => "stere",
        }
    }
}

/// Outer edges of the grid in projection coordinates.
///
/// Serialized as `[lower_left_x, lower_left_y, upper_right_x, upper_right_y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct AreaExtent {
    pub lower_left_x: f64,
    pub lower_left_y: f64,
    pub upper_right_x: f64,
    pub upper_right_y: f64,
}

impl From<[f64; 4]> for AreaExtent {
    fn from(v: [f64; 4]) -> Self {
        Self {
            lower_left_x: v[0],
            lower_left_y: v[1],
            upper_right_x: v[2],
            upper_right_y: v[3],
        }
    }
}

impl From<AreaExtent> for [f64; 4] {
    fn from(e: AreaExtent) -> Self {
        [e.lower_left_x, e.lower_left_y, e.upper_right_x, e.upper_right_y]
    }
}

impl AreaExtent {
    pub fn width(&self) -> f64 {
        self.upper_right_x - self.lower_left_x
    }

    pub fn height(&self) -> f64 {
        self.upper_right_y - self.lower_left_y
    }
}

/// A named grid in a given projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaDefinition {
    /// Catalog name; filled from the catalog key when loaded from YAML.
    #[serde(default)]
    pub area_id: String,
    #[serde(default)]
    pub description: String,
    pub projection: Projection,
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
    pub area_extent: AreaExtent,
}

/// Longitudes and latitudes sampled along an area's outer edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryContour {
    pub lons: Vec<f64>,
    pub lats: Vec<f64>,
}

impl BoundaryContour {
    pub fn len(&self) -> usize {
        self.lons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lons.is_empty()
    }
}

impl AreaDefinition {
    pub fn new(
        area_id: impl Into<String>,
        projection: Projection,
        width: usize,
        height: usize,
        area_extent: AreaExtent,
    ) -> AreaResult<Self> {
        let area = Self {
            area_id: area_id.into(),
            description: String::new(),
            projection,
            width,
            height,
            area_extent,
        };
        area.validate()?;
        Ok(area)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn validate(&self) -> AreaResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(AreaError::InvalidArea {
                area: self.area_id.clone(),
                message: format!("grid must be non-empty, got {}x{}", self.width, self.height),
            });
        }
        let extent = &self.area_extent;
        if !(extent.width() > 0.0 && extent.height() > 0.0) {
            return Err(AreaError::InvalidArea {
                area: self.area_id.clone(),
                message: format!(
                    "extent must have upper right above and right of lower left, got {:?}",
                    extent
                ),
            });
        }
        self.projection.validate()
    }

    /// Cell size in projection units `(dx, dy)`.
    pub fn pixel_size(&self) -> (f64, f64) {
        (
            self.area_extent.width() / self.width as f64,
            self.area_extent.height() / self.height as f64,
        )
    }

    /// Projection coordinates of the centre of cell `(col, row)`; row 0 is
    /// the top of the grid.
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        let (dx, dy) = self.pixel_size();
        (
            self.area_extent.lower_left_x + (col as f64 + 0.5) * dx,
            self.area_extent.upper_right_y - (row as f64 + 0.5) * dy,
        )
    }

    /// Sample the outer ring of cell centres with the default stride.
    pub fn boundary_contour(&self) -> AreaResult<BoundaryContour> {
        self.boundary_contour_with_stride(DEFAULT_CONTOUR_STRIDE)
    }

    /// Sample the outer ring of cell centres and convert them to lon/lat.
    ///
    /// Walks top (left to right), right (top to bottom), bottom (right to
    /// left) then left (bottom to top), taking every `stride`-th cell plus
    /// each corner. Points off the globe are dropped; for geostationary
    /// grids that reach into space, the part of the disc limb inside the
    /// extent is added instead.
    pub fn boundary_contour_with_stride(&self, stride: usize) -> AreaResult<BoundaryContour> {
        self.validate()?;
        let last_col = self.width - 1;
        let last_row = self.height - 1;
        let cols = edge_steps(self.width, stride);
        let rows = edge_steps(self.height, stride);

        let ring = cols
            .iter()
            .map(|&c| (c, 0))
            .chain(rows.iter().map(|&r| (last_col, r)))
            .chain(cols.iter().rev().map(|&c| (c, last_row)))
            .chain(rows.iter().rev().map(|&r| (0, r)));

        let mut contour = BoundaryContour::default();
        let mut off_globe = 0;
        for (col, row) in ring {
            let (x, y) = self.pixel_center(col, row);
            match self.projection.inverse(x, y) {
                Some((lon, lat)) => {
                    contour.lons.push(lon);
                    contour.lats.push(lat);
                }
                None => off_globe += 1,
            }
        }

        if let (Projection::Geos(geos), true) = (&self.projection, off_globe > 0) {
            let extent = &self.area_extent;
            let inside = |&(x, y): &(f64, f64)| {
                (extent.lower_left_x..=extent.upper_right_x).contains(&x)
                    && (extent.lower_left_y..=extent.upper_right_y).contains(&y)
            };
            let mut limb_points = 0;
            for (x, y) in geos.limb(LIMB_POINTS).into_iter().filter(inside) {
                if let Some((lon, lat)) = self.projection.inverse(x, y) {
                    contour.lons.push(lon);
                    contour.lats.push(lat);
                    limb_points += 1;
                }
            }
            tracing::debug!(
                area = %self.area_id,
                off_globe,
                limb_points,
                "Area edge reaches into space, sampled the disc limb"
            );
        }

        if contour.is_empty() {
            return Err(AreaError::EmptyContour(self.area_id.clone()));
        }

        Ok(contour)
    }
}

/// Indices `0, stride, 2*stride, ...` always ending with `n - 1`.
fn edge_steps(n: usize, stride: usize) -> Vec<usize> {
    let mut steps: Vec<usize> = (0..n).step_by(stride.max(1)).collect();
    if steps.last() != Some(&(n - 1)) {
        steps.push(n - 1);
    }
    steps
}
