//! Polar stereographic projection (spherical form).
//!
//! Scale is true at `lat_ts`. Only the polar aspects (`lat_0` = ±90) are
//! supported; that covers the European and polar areas in use.

use std::f64::consts::FRAC_PI_4;

use serde::{Deserialize, Serialize};

use crate::error::{AreaError, AreaResult};
use crate::geostationary::normalize_lon;
use crate::lambert::DEFAULT_EARTH_RADIUS;

fn default_radius() -> f64 {
    DEFAULT_EARTH_RADIUS
}

/// Polar stereographic projection parameters (degrees, metres).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolarStereographic {
    /// Latitude of the projection pole, 90 or -90
    pub lat_0: f64,
    /// Straight vertical longitude
    pub lon_0: f64,
    /// Latitude of true scale
    pub lat_ts: f64,
    #[serde(default = "default_radius")]
    pub radius: f64,
}

impl PolarStereographic {
    pub fn north(lon_0: f64, lat_ts: f64) -> Self {
        Self {
            lat_0: 90.0,
            lon_0,
            lat_ts,
            radius: DEFAULT_EARTH_RADIUS,
        }
    }

    pub fn validate(&self) -> AreaResult<()> {
        if (self.lat_0.abs() - 90.0).abs() > 1e-9 {
            return Err(AreaError::InvalidProjection(format!(
                "only polar stereographic is supported, lat_0 must be 90 or -90 (got {})",
                self.lat_0
            )));
        }
        if self.radius <= 0.0 || self.lat_ts.abs() > 90.0 {
            return Err(AreaError::InvalidProjection(format!(
                "stere needs a positive radius and |lat_ts| <= 90 (radius={}, lat_ts={})",
                self.radius, self.lat_ts
            )));
        }
        Ok(())
    }

    fn is_south(&self) -> bool {
        self.lat_0 < 0.0
    }

    /// Radial scale `R (1 + sin |lat_ts|)`.
    fn k(&self) -> f64 {
        self.radius * (1.0 + self.lat_ts.abs().to_radians().sin())
    }

    /// Geographic `(lon, lat)` degrees to projection coordinates (metres).
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let dlon = (lon - self.lon_0).to_radians();
        if self.is_south() {
            let rho = self.k() * (FRAC_PI_4 + lat.to_radians() / 2.0).tan();
            (rho * dlon.sin(), rho * dlon.cos())
        } else {
            let rho = self.k() * (FRAC_PI_4 - lat.to_radians() / 2.0).tan();
            (rho * dlon.sin(), -rho * dlon.cos())
        }
    }

    /// Projection coordinates (metres) to geographic `(lon, lat)` degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let rho = x.hypot(y);
        if rho == 0.0 {
            let lat = if self.is_south() { -90.0 } else { 90.0 };
            return (normalize_lon(self.lon_0), lat);
        }
        let colat = 2.0 * (rho / self.k()).atan();

        if self.is_south() {
            let lon = self.lon_0 + x.atan2(y).to_degrees();
            (normalize_lon(lon), (colat - 2.0 * FRAC_PI_4).to_degrees())
        } else {
            let lon = self.lon_0 + x.atan2(-y).to_degrees();
            (normalize_lon(lon), (2.0 * FRAC_PI_4 - colat).to_degrees())
        }
    }
}
