//! Turning reconstructed spherical features into renderable planar geometry.
//!
//! Every feature is cut at the antimeridian, its latitudes are clipped away
//! from the poles, and the resulting rings are oriented counter-clockwise
//! and repaired (or discarded) if they are not valid. Features that leave
//! nothing renderable are skipped and counted in [`WrapOutput::dropped`].

use log::debug;
use rayon::prelude::*;

use crate::feature::Feature;
use crate::geometry::planar::buffer_zero;
use crate::geometry::{DateLineWrapper, LineString, LonLat, MultiGeometry, Ring, SphericalGeometry};
use crate::reconstruct::ReconstructedGeometry;

/// Latitudes are clipped to +/- this value; anything closer to the poles
/// produces rendering artefacts.
pub const POLE_CLIP_LATITUDE: f64 = 89.0;

/// Access to the spherical geometry of something that can be wrapped.
pub trait HasGeometry {
    fn geometry(&self) -> &SphericalGeometry;
}

impl HasGeometry for SphericalGeometry {
    fn geometry(&self) -> &SphericalGeometry {
        self
    }
}

impl HasGeometry for Feature {
    fn geometry(&self) -> &SphericalGeometry {
        &self.geometry
    }
}

impl HasGeometry for ReconstructedGeometry {
    fn geometry(&self) -> &SphericalGeometry {
        &self.geometry
    }
}

/// Wrapped geometries, one per surviving input, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WrapOutput {
    pub geometries: Vec<MultiGeometry>,
    /// Inputs that produced nothing renderable.
    pub dropped: usize,
}

impl WrapOutput {
    fn collect(kind: &str, results: Vec<Option<MultiGeometry>>) -> Self {
        let mut out = WrapOutput::default();
        for (i, result) in results.into_iter().enumerate() {
            match result {
                Some(g) => out.geometries.push(g),
                None => {
                    debug!("dropped degenerate {} geometry at index {}", kind, i);
                    out.dropped += 1;
                }
            }
        }
        out
    }
}

/// Wraps polygon features into multi-polygons. Non-polygons are dropped.
pub fn wrap_polygons<G: HasGeometry + Sync>(items: &[G]) -> WrapOutput {
    let wrapper = DateLineWrapper::new();
    let results = items
        .par_iter()
        .map(|item| match item.geometry() {
            SphericalGeometry::Polygon(points) => wrap_polygon(&wrapper, points),
            _ => None,
        })
        .collect();
    WrapOutput::collect("polygon", results)
}

/// Wraps features into multi-lines.
///
/// Polygons are traced along their closed exterior; points are dropped.
pub fn wrap_lines<G: HasGeometry + Sync>(items: &[G]) -> WrapOutput {
    let wrapper = DateLineWrapper::new();
    let results = items
        .par_iter()
        .map(|item| match item.geometry() {
            SphericalGeometry::Polyline(points) => wrap_line(&wrapper, points),
            SphericalGeometry::Polygon(points) => {
                let mut closed = points.clone();
                if let Some(&first) = points.first() {
                    closed.push(first);
                }
                wrap_line(&wrapper, &closed)
            }
            SphericalGeometry::Point(_) => None,
        })
        .collect();
    WrapOutput::collect("line", results)
}

/// Wraps each geometry according to its kind: polygons become
/// multi-polygons, polylines multi-lines. Points are dropped.
pub fn wrap_and_validate<G: HasGeometry + Sync>(items: &[G]) -> WrapOutput {
    let wrapper = DateLineWrapper::new();
    let results = items
        .par_iter()
        .map(|item| match item.geometry() {
            SphericalGeometry::Polygon(points) => wrap_polygon(&wrapper, points),
            SphericalGeometry::Polyline(points) => wrap_line(&wrapper, points),
            SphericalGeometry::Point(_) => None,
        })
        .collect();
    WrapOutput::collect("feature", results)
}

fn finite_points(points: &[LonLat]) -> Vec<LonLat> {
    points.iter().copied().filter(|p| p.is_finite()).collect()
}

fn wrap_polygon(wrapper: &DateLineWrapper, points: &[LonLat]) -> Option<MultiGeometry> {
    let points = finite_points(points);
    if points.len() < 3 {
        return None;
    }

    let mut rings = Vec::new();
    for piece in wrapper.wrap_polygon(&points) {
        let mut ring = Ring::new(piece.into_iter().map(LonLat::as_dvec2).collect());
        ring.clip_latitudes(POLE_CLIP_LATITUDE);
        ring.make_ccw();
        if ring.is_valid() {
            rings.push(ring);
        } else {
            rings.extend(buffer_zero(ring.points()));
        }
    }

    if rings.is_empty() {
        None
    } else {
        Some(MultiGeometry::Polygons(rings))
    }
}

/// Pieces without two distinct vertices are discarded; the feature is kept
/// as long as one piece survives.
fn wrap_line(wrapper: &DateLineWrapper, points: &[LonLat]) -> Option<MultiGeometry> {
    let points = finite_points(points);
    if points.len() < 2 {
        return None;
    }

    let lines: Vec<LineString> = wrapper
        .wrap_polyline(&points)
        .into_iter()
        .map(|piece| {
            let mut line = LineString::new(piece.into_iter().map(LonLat::as_dvec2).collect());
            line.clip_latitudes(POLE_CLIP_LATITUDE);
            line
        })
        .filter(LineString::is_valid)
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(MultiGeometry::Lines(lines))
    }
}
