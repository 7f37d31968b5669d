//! Longitude/latitude points and great-circle helpers on the unit sphere.

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.009;

/// A point on the sphere in degrees of longitude and latitude.
///
/// Serialized as a `[lon, lat]` pair so feature files stay compact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LonLat {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Converts to a unit vector (z toward the north pole, x through lon=0).
    pub fn to_xyz(self) -> DVec3 {
        let (slon, clon) = self.lon.to_radians().sin_cos();
        let (slat, clat) = self.lat.to_radians().sin_cos();
        DVec3::new(clat * clon, clat * slon, slat)
    }

    /// Converts a (not necessarily normalized) vector back to lon/lat degrees.
    ///
    /// Longitude lands in (-180, 180].
    pub fn from_xyz(p: DVec3) -> Self {
        let p = p.normalize_or_zero();
        let lon = p.y.atan2(p.x).to_degrees();
        let lat = p.z.clamp(-1.0, 1.0).asin().to_degrees();
        Self { lon, lat }
    }

    /// Planar (lon, lat) view used once geometries leave the sphere.
    pub fn as_dvec2(self) -> DVec2 {
        DVec2::new(self.lon, self.lat)
    }

    pub fn is_finite(self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

impl From<[f64; 2]> for LonLat {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<LonLat> for [f64; 2] {
    fn from(p: LonLat) -> Self {
        [p.lon, p.lat]
    }
}

/// Wraps a longitude into [-180, 180).
pub fn wrap_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Computes the great circle distance between two points on a unit sphere.
pub fn great_circle_distance(a: DVec3, b: DVec3) -> f64 {
    let dot = a.dot(b).clamp(-1.0, 1.0);
    dot.acos()
}

/// Returns `(east, north)` tangent unit vectors at sphere point `p`.
///
/// Near the poles east is undefined; a fixed basis is used instead.
pub fn local_tangent_basis(p: DVec3) -> (DVec3, DVec3) {
    let up = DVec3::Z;
    let mut east = up.cross(p);
    let elen = east.length();
    if elen < 1e-12 {
        east = DVec3::Y;
    } else {
        east /= elen;
    }
    let north = p.cross(east).normalize_or_zero();
    (east, north)
}

/// Haversine distance between two lon/lat points, in metres.
pub fn haversine_distance(a: LonLat, b: LonLat) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xyz_round_trip_keeps_position() {
        let p = LonLat::new(-123.5, 48.25);
        let q = LonLat::from_xyz(p.to_xyz());
        assert!((p.lon - q.lon).abs() < 1e-9);
        assert!((p.lat - q.lat).abs() < 1e-9);
    }

    #[test]
    fn test_north_pole_is_z() {
        let p = LonLat::new(37.0, 90.0).to_xyz();
        assert!((p - DVec3::Z).length() < 1e-12);
    }

    #[test]
    fn test_wrap_longitude() {
        assert_eq!(wrap_longitude(190.0), -170.0);
        assert_eq!(wrap_longitude(-190.0), 170.0);
        assert_eq!(wrap_longitude(180.0), -180.0);
        assert_eq!(wrap_longitude(45.0), 45.0);
        assert_eq!(wrap_longitude(720.0 + 10.0), 10.0);
    }

    #[test]
    fn test_great_circle_distance() {
        let a = LonLat::new(0.0, 0.0).to_xyz();
        let b = LonLat::new(90.0, 0.0).to_xyz();
        assert!((great_circle_distance(a, b) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_haversine_quarter_meridian() {
        let d = haversine_distance(LonLat::new(0.0, 0.0), LonLat::new(0.0, 90.0));
        let expected = EARTH_RADIUS_KM * std::f64::consts::FRAC_PI_2 * 1000.0;
        assert!((d - expected).abs() < 1.0);
    }

    #[test]
    fn test_tangent_basis_on_equator() {
        let p = LonLat::new(0.0, 0.0).to_xyz();
        let (east, north) = local_tangent_basis(p);
        assert!((east - DVec3::Y).length() < 1e-12);
        assert!((north - DVec3::Z).length() < 1e-12);
    }

    #[test]
    fn test_serde_pair_format() {
        let p: LonLat = serde_json::from_str("[10.5, -20.0]").unwrap();
        assert_eq!(p, LonLat::new(10.5, -20.0));
        assert_eq!(serde_json::to_string(&p).unwrap(), "[10.5,-20.0]");
    }
}
