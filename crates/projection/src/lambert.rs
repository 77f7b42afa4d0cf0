//! Lambert Conformal Conic projection (spherical form).
//!
//! Commonly used for regional weather grids. It maps a cone tangent or
//! secant to the Earth's surface onto a flat plane.
//!
//! The projection parameters include:
//! - Origin latitude (lat_0) and central meridian (lon_0)
//! - Standard parallel(s): lat_1 and lat_2 (equal for a tangent cone)
//! - Sphere radius
//!
//! Projection coordinates are metres from the origin.

use std::f64::consts::FRAC_PI_4;

use serde::{Deserialize, Serialize};

use crate::error::{AreaError, AreaResult};
use crate::geostationary::normalize_lon;

/// Mean Earth radius used when none is configured (metres).
pub const DEFAULT_EARTH_RADIUS: f64 = 6_371_229.0;

fn default_radius() -> f64 {
    DEFAULT_EARTH_RADIUS
}

/// Lambert Conformal Conic projection parameters (degrees, metres).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambertConformal {
    pub lat_0: f64,
    pub lon_0: f64,
    pub lat_1: f64,
    pub lat_2: f64,
    #[serde(default = "default_radius")]
    pub radius: f64,
}

/// Cone constant, F and rho at the origin latitude.
struct Cone {
    n: f64,
    f: f64,
    rho0: f64,
}

impl LambertConformal {
    pub fn new(lat_0: f64, lon_0: f64, lat_1: f64, lat_2: f64) -> Self {
        Self {
            lat_0,
            lon_0,
            lat_1,
            lat_2,
            radius: DEFAULT_EARTH_RADIUS,
        }
    }

    pub fn validate(&self) -> AreaResult<()> {
        let poles = [self.lat_1, self.lat_2]
            .iter()
            .any(|lat| lat.abs() >= 90.0);
        if poles || (self.lat_1 + self.lat_2).abs() < 1e-10 || self.radius <= 0.0 {
            return Err(AreaError::InvalidProjection(format!(
                "lcc standard parallels must be off the poles and not symmetric about the equator (lat_1={}, lat_2={})",
                self.lat_1, self.lat_2
            )));
        }
        Ok(())
    }

    fn cone(&self) -> Cone {
        let lat1 = self.lat_1.to_radians();
        let lat2 = self.lat_2.to_radians();
        let lat0 = self.lat_0.to_radians();

        let n = if (lat1 - lat2).abs() < 1e-10 {
            // Tangent cone (single standard parallel)
            lat1.sin()
        } else {
            // Secant cone (two standard parallels)
            let ln_ratio = (lat1.cos() / lat2.cos()).ln();
            let tan_ratio =
                ((FRAC_PI_4 + lat2 / 2.0).tan() / (FRAC_PI_4 + lat1 / 2.0).tan()).ln();
            ln_ratio / tan_ratio
        };

        let f = (lat1.cos() * (FRAC_PI_4 + lat1 / 2.0).tan().powf(n)) / n;
        let rho0 = self.radius * f / (FRAC_PI_4 + lat0 / 2.0).tan().powf(n);

        Cone { n, f, rho0 }
    }

    /// Geographic `(lon, lat)` degrees to projection coordinates (metres).
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let Cone { n, f, rho0 } = self.cone();

        let dlon = normalize_lon(lon - self.lon_0).to_radians();
        let rho = self.radius * f / (FRAC_PI_4 + lat.to_radians() / 2.0).tan().powf(n);
        let theta = n * dlon;

        (rho * theta.sin(), rho0 - rho * theta.cos())
    }

    /// Projection coordinates (metres) to geographic `(lon, lat)` degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let Cone { n, f, rho0 } = self.cone();

        let dy = rho0 - y;
        let (rho, theta) = if n < 0.0 {
            (-x.hypot(dy), (-x).atan2(-dy))
        } else {
            (x.hypot(dy), x.atan2(dy))
        };

        let lat = if rho == 0.0 {
            90.0_f64.copysign(n)
        } else {
            (2.0 * (self.radius * f / rho).powf(1.0 / n).atan() - 2.0 * FRAC_PI_4).to_degrees()
        };
        let lon = normalize_lon(self.lon_0 + (theta / n).to_degrees());

        (lon, lat)
    }
}
