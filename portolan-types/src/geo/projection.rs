//! Conversions between geographic coordinates and world pixel coordinates.
//!
//! A projection maps `(lon, lat)` in degrees onto an infinite 2d pixel plane.
//! The `zoom` argument of every method is the number of pixels the whole
//! world spans at the current scale, so the same projection instance serves
//! all zoom levels. Forward and inverse methods are exact inverses of each
//! other up to floating point precision.
//!
//! There is no wraparound: longitudes outside of `(-180, 180)` simply map
//! outside of the `[0, zoom)` world square. Latitude must stay inside
//! `(-90, 90)`; Mercator diverges at the poles and callers are expected to
//! clamp their input.

use crate::geo::datum::Datum;

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Capability set required from a map projection.
///
/// Any type implementing these five methods can drive the map engine. All
/// methods are total over the documented domain and must not panic.
pub trait Projection: Send + Sync {
    /// Converts longitude in degrees into the world pixel X coordinate.
    fn lon_to_x(&self, lon: f64, zoom: f64) -> f64;

    /// Converts a world pixel X coordinate back into longitude in degrees.
    fn x_to_lon(&self, x: f64, zoom: f64) -> f64;

    /// Converts latitude in degrees into the world pixel Y coordinate.
    fn lat_to_y(&self, lat: f64, zoom: f64) -> f64;

    /// Converts a world pixel Y coordinate back into latitude in degrees.
    fn y_to_lat(&self, y: f64, zoom: f64) -> f64;

    /// Meters covered by one pixel at the given latitude.
    ///
    /// Used for auxiliary display only (scale rulers and alike), so the
    /// value is not required to be geodetically exact, only monotonically
    /// consistent with `zoom`.
    fn scale(&self, lat: f64, zoom: f64) -> f64;
}

/// Spherical Mercator projection, as used by most web tile services.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mercator {
    datum: Datum,
}

impl Mercator {
    /// Creates a projection over the given datum.
    pub fn new(datum: Datum) -> Self {
        Self { datum }
    }
}

impl Projection for Mercator {
    fn lon_to_x(&self, lon: f64, zoom: f64) -> f64 {
        (lon / 360.0 + 0.5) * zoom
    }

    fn x_to_lon(&self, x: f64, zoom: f64) -> f64 {
        (x / zoom - 0.5) * 360.0
    }

    fn lat_to_y(&self, lat: f64, zoom: f64) -> f64 {
        let y = (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
        (0.5 - y / (2.0 * PI)) * zoom
    }

    fn y_to_lat(&self, y: f64, zoom: f64) -> f64 {
        let y = (0.5 - y / zoom) * 2.0 * PI;
        (2.0 * y.exp().atan() - FRAC_PI_2).to_degrees()
    }

    fn scale(&self, lat: f64, zoom: f64) -> f64 {
        self.datum.equator_length() * lat.to_radians().cos() / zoom
    }
}

/// Mercator projection over the reference ellipsoid.
///
/// Differs from [`Mercator`] by accounting for the flattening of the Earth;
/// the inverse latitude conversion has no closed form and is computed by
/// fixed-point iteration.
#[derive(Debug, Clone, Copy, Default)]
pub struct EllipticalMercator {
    datum: Datum,
}

const INVERSE_TOLERANCE: f64 = 1e-14;
const INVERSE_MAX_ITERATIONS: usize = 20;

impl EllipticalMercator {
    /// Creates a projection over the given datum.
    pub fn new(datum: Datum) -> Self {
        Self { datum }
    }

    fn con(&self, sin_lat: f64) -> f64 {
        let e = self.datum.eccentricity();
        ((1.0 - e * sin_lat) / (1.0 + e * sin_lat)).powf(e / 2.0)
    }
}

impl Projection for EllipticalMercator {
    fn lon_to_x(&self, lon: f64, zoom: f64) -> f64 {
        (lon / 360.0 + 0.5) * zoom
    }

    fn x_to_lon(&self, x: f64, zoom: f64) -> f64 {
        (x / zoom - 0.5) * 360.0
    }

    fn lat_to_y(&self, lat: f64, zoom: f64) -> f64 {
        let phi = lat.to_radians();
        let y = ((FRAC_PI_4 + phi / 2.0).tan() * self.con(phi.sin())).ln();
        (0.5 - y / (2.0 * PI)) * zoom
    }

    fn y_to_lat(&self, y: f64, zoom: f64) -> f64 {
        let ts = (-(0.5 - y / zoom) * 2.0 * PI).exp();

        let mut phi = FRAC_PI_2 - 2.0 * ts.atan();
        for _ in 0..INVERSE_MAX_ITERATIONS {
            let next = FRAC_PI_2 - 2.0 * (ts * self.con(phi.sin())).atan();
            let delta = next - phi;
            phi = next;
            if delta.abs() < INVERSE_TOLERANCE {
                break;
            }
        }

        phi.to_degrees()
    }

    fn scale(&self, lat: f64, zoom: f64) -> f64 {
        let e = self.datum.eccentricity();
        let phi = lat.to_radians();
        let denominator = (1.0 - e * e * phi.sin() * phi.sin()).sqrt();
        self.datum.equator_length() * phi.cos() / denominator / zoom
    }
}

/// Equirectangular ("flat") projection on the square world grid.
///
/// Latitude maps linearly, so the world square covers latitudes in
/// `[-180, 180]` of which only the middle half is physical. Cheap and
/// distortion-free along parallels; used when Mercator pole stretching is
/// undesirable.
#[derive(Debug, Clone, Copy, Default)]
pub struct Equirectangular {
    datum: Datum,
}

impl Equirectangular {
    /// Creates a projection over the given datum.
    pub fn new(datum: Datum) -> Self {
        Self { datum }
    }
}

impl Projection for Equirectangular {
    fn lon_to_x(&self, lon: f64, zoom: f64) -> f64 {
        (lon / 360.0 + 0.5) * zoom
    }

    fn x_to_lon(&self, x: f64, zoom: f64) -> f64 {
        (x / zoom - 0.5) * 360.0
    }

    fn lat_to_y(&self, lat: f64, zoom: f64) -> f64 {
        (0.5 - lat / 360.0) * zoom
    }

    fn y_to_lat(&self, y: f64, zoom: f64) -> f64 {
        (0.5 - y / zoom) * 360.0
    }

    fn scale(&self, lat: f64, zoom: f64) -> f64 {
        self.datum.equator_length() * lat.to_radians().cos() / zoom
    }
}
