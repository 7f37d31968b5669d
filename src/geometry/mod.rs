//! Spherical and planar geometry.
//!
//! Reconstructed features live on the sphere as lon/lat vertex lists. Before
//! they can be drawn they are cut at the antimeridian ([`DateLineWrapper`])
//! and turned into planar rings and lines ([`planar`]).

mod lonlat;
pub mod dateline;
pub mod planar;

use serde::{Deserialize, Serialize};

pub use lonlat::{
    LonLat, EARTH_RADIUS_KM,
    wrap_longitude, great_circle_distance, local_tangent_basis, haversine_distance,
};
pub use dateline::DateLineWrapper;
pub use planar::{Ring, LineString, MultiGeometry};

/// A geometry on the sphere, in lon/lat degrees.
///
/// Polygons store only their exterior ring, open (first vertex not repeated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum SphericalGeometry {
    Point(LonLat),
    Polyline(Vec<LonLat>),
    Polygon(Vec<LonLat>),
}

impl SphericalGeometry {
    /// Returns the vertices of this geometry.
    pub fn points(&self) -> &[LonLat] {
        match self {
            SphericalGeometry::Point(p) => std::slice::from_ref(p),
            SphericalGeometry::Polyline(pts) | SphericalGeometry::Polygon(pts) => pts,
        }
    }

    /// Returns a geometry of the same kind with every vertex mapped by `f`.
    pub fn map_points<F: FnMut(LonLat) -> LonLat>(&self, mut f: F) -> Self {
        match self {
            SphericalGeometry::Point(p) => SphericalGeometry::Point(f(*p)),
            SphericalGeometry::Polyline(pts) => {
                SphericalGeometry::Polyline(pts.iter().map(|&p| f(p)).collect())
            }
            SphericalGeometry::Polygon(pts) => {
                SphericalGeometry::Polygon(pts.iter().map(|&p| f(p)).collect())
            }
        }
    }

    pub fn is_polygon(&self) -> bool {
        matches!(self, SphericalGeometry::Polygon(_))
    }

    pub fn is_polyline(&self) -> bool {
        matches!(self, SphericalGeometry::Polyline(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_json_shape() {
        let json = r#"{"type":"Polyline","coordinates":[[0.0,0.0],[10.0,5.0]]}"#;
        let g: SphericalGeometry = serde_json::from_str(json).unwrap();
        assert!(g.is_polyline());
        assert_eq!(g.points().len(), 2);
        assert_eq!(g.points()[1], LonLat::new(10.0, 5.0));
    }

    #[test]
    fn test_map_points_keeps_kind() {
        let g = SphericalGeometry::Polygon(vec![
            LonLat::new(0.0, 0.0),
            LonLat::new(1.0, 0.0),
            LonLat::new(1.0, 1.0),
        ]);
        let shifted = g.map_points(|p| LonLat::new(p.lon + 10.0, p.lat));
        assert!(shifted.is_polygon());
        assert_eq!(shifted.points()[2], LonLat::new(11.0, 1.0));
    }
}
