//! Area definitions and map projections.
//!
//! An [`AreaDefinition`] is a projected grid. Its boundary can be sampled as
//! geographic coordinates and reduced to a [`BoundaryPolygon`] used to filter
//! archive searches. Projections are implemented directly; no PROJ binding
//! is needed for the handful of kinds in use.

pub mod area;
pub mod catalog;
pub mod error;
pub mod geostationary;
pub mod lambert;
pub mod polygon;
pub mod stereographic;

pub use area::{AreaDefinition, AreaExtent, BoundaryContour, Projection};
pub use catalog::AreaCatalog;
pub use error::{AreaError, AreaResult};
pub use geostationary::Geostationary;
pub use lambert::LambertConformal;
pub use polygon::{derive_boundary_polygon, BoundaryPolygon};
pub use stereographic::PolarStereographic;
