//! Geostationary satellite projection.
//!
//! Used for Meteosat (SEVIRI) and GOES-R imagery. The satellite views Earth
//! from a fixed position above the equator; projection coordinates are scan
//! angles scaled by the satellite height, in metres.
//!
//! Reference: CGMS LRIT/HRIT Global Specification, section 4.4, and the
//! ellipsoidal `geos` formulation used by PROJ.

use serde::{Deserialize, Serialize};

use crate::error::{AreaError, AreaResult};

/// Axis the instrument sweeps along.
///
/// Meteosat and Himawari scan along `y`, GOES-R along `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sweep {
    X,
    #[default]
    Y,
}

/// Geostationary projection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geostationary {
    /// Longitude of the sub-satellite point (degrees)
    pub lon_0: f64,
    /// Perspective point height above the ellipsoid (metres)
    pub h: f64,
    /// Semi-major axis (metres)
    pub a: f64,
    /// Semi-minor axis (metres)
    pub b: f64,
    #[serde(default)]
    pub sweep: Sweep,
}

impl Geostationary {
    /// Meteosat Second Generation geometry at the given nominal longitude.
    pub fn meteosat(lon_0: f64) -> Self {
        Self {
            lon_0,
            h: 35_785_831.0,
            a: 6_378_169.0,
            b: 6_356_583.8,
            sweep: Sweep::Y,
        }
    }

    /// GOES-R series geometry (GRS80) at the given longitude.
    pub fn goes(lon_0: f64) -> Self {
        Self {
            lon_0,
            h: 35_786_023.0,
            a: 6_378_137.0,
            b: 6_356_752.31414,
            sweep: Sweep::X,
        }
    }

    pub fn validate(&self) -> AreaResult<()> {
        if !(self.h > 0.0 && self.a > 0.0 && self.b > 0.0 && self.b <= self.a) {
            return Err(AreaError::InvalidProjection(format!(
                "geos requires h > 0 and 0 < b <= a (h={}, a={}, b={})",
                self.h, self.a, self.b
            )));
        }
        Ok(())
    }

    /// Projection coordinates (metres) to geographic `(lon, lat)` degrees.
    ///
    /// Returns None when the line of sight misses the Earth.
    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let radius_g = 1.0 + self.h / self.a;
        let radius_p = self.b / self.a;
        let c = radius_g * radius_g - 1.0;

        // Scan angles
        let sx = x / self.h;
        let sy = y / self.h;

        let vx = -1.0;
        let (vy, vz) = match self.sweep {
            Sweep::X => {
                let vz = sy.tan();
                (sx.tan() * 1.0_f64.hypot(vz), vz)
            }
            Sweep::Y => {
                let vy = sx.tan();
                (vy, sy.tan() * 1.0_f64.hypot(vy))
            }
        };

        let qa = vy * vy + (vz / radius_p).powi(2) + vx * vx;
        let qb = 2.0 * radius_g * vx;
        let det = qb * qb - 4.0 * qa * c;
        if det < 0.0 {
            return None;
        }

        // Distance along the line of sight to the near surface
        let k = (-qb - det.sqrt()) / (2.0 * qa);
        let vx = radius_g + k * vx;
        let vy = vy * k;
        let vz = vz * k;

        let lam = vy.atan2(vx);
        let phi = (vz * lam.cos() / vx).atan();
        let phi = ((self.a / self.b).powi(2) * phi.tan()).atan();

        Some((normalize_lon(lam.to_degrees() + self.lon_0), phi.to_degrees()))
    }

    /// Geographic `(lon, lat)` degrees to projection coordinates (metres).
    ///
    /// Returns None when the point is hidden behind the limb.
    pub fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let radius_g = 1.0 + self.h / self.a;
        let radius_p = self.b / self.a;

        let lam = (lon - self.lon_0).to_radians();
        // Geocentric latitude
        let phi = (radius_p * radius_p * lat.to_radians().tan()).atan();
        let r = radius_p / (radius_p * phi.cos()).hypot(phi.sin());

        let vx = r * lam.cos() * phi.cos();
        let vy = r * lam.sin() * phi.cos();
        let vz = r * phi.sin();

        if (radius_g - vx) * vx - vy * vy - vz * vz / (radius_p * radius_p) < 0.0 {
            return None;
        }

        let tmp = radius_g - vx;
        let (sx, sy) = match self.sweep {
            Sweep::X => ((vy / vz.hypot(tmp)).atan(), (vz / tmp).atan()),
            Sweep::Y => ((vy / tmp).atan(), (vz / vy.hypot(tmp)).atan()),
        };

        Some((sx * self.h, sy * self.h))
    }

    /// Maximum scan angles `(x, y)` in radians at which the Earth is visible.
    pub fn max_scan_angles(&self) -> (f64, f64) {
        let distance = self.h + self.a;
        let x = (self.a / distance).asin();
        let y = (self.b / distance).asin();
        (x, y)
    }

    /// `points` samples of the visible disc edge in projection coordinates,
    /// pulled in slightly so each one still hits the Earth.
    pub fn limb(&self, points: usize) -> Vec<(f64, f64)> {
        let (x_max, y_max) = self.max_scan_angles();
        let scale = self.h * LIMB_SHRINK;
        (0..points)
            .map(|i| {
                let t = std::f64::consts::TAU * i as f64 / points as f64;
                (x_max * t.cos() * scale, y_max * t.sin() * scale)
            })
            .collect()
    }
}

/// Fraction of the maximum scan angle used when sampling the limb.
const LIMB_SHRINK: f64 = 0.9999;

/// Wrap a longitude into [-180, 180).
pub(crate) fn normalize_lon(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped.is_nan() {
        lon
    } else {
        wrapped
    }
}
