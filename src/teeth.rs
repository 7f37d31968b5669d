//! Subduction teeth.
//!
//! Walks each trench polyline, accumulating planar arc length in degrees,
//! and drops a triangular tooth every time the accumulated length reaches
//! the spacing threshold. The tooth points to the overriding plate side
//! chosen by the sign of the aspect ratio.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::geometry::{DateLineWrapper, SphericalGeometry};
use crate::wrap::HasGeometry;

/// Tooth spacing and shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeethParams {
    /// Spacing threshold in radians of arc.
    pub spacing: f64,
    /// Triangle base length in degrees.
    pub size: f64,
    /// Height-to-base ratio of each tooth.
    pub aspect: f64,
}

impl Default for TeethParams {
    fn default() -> Self {
        Self {
            spacing: 0.1,
            size: 2.0,
            aspect: 1.0,
        }
    }
}

impl TeethParams {
    /// Dense, small teeth for zoomed-in regional maps.
    pub fn regional() -> Self {
        Self {
            spacing: 0.02,
            size: 0.5,
            ..Default::default()
        }
    }
}

/// One tooth: base from `a` to `c`, tip at `d`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToothTriangle {
    pub a: DVec2,
    pub c: DVec2,
    pub d: DVec2,
}

/// Tooth vertices as parallel x and y rows, one row (A, C, D) per tooth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeethArrays {
    pub xs: Vec<[f64; 3]>,
    pub ys: Vec<[f64; 3]>,
}

impl TeethArrays {
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn push(&mut self, t: ToothTriangle) {
        self.xs.push([t.a.x, t.c.x, t.d.x]);
        self.ys.push([t.a.y, t.c.y, t.d.y]);
    }

    /// Appends the teeth of `other`.
    pub fn append(&mut self, other: &mut TeethArrays) {
        self.xs.append(&mut other.xs);
        self.ys.append(&mut other.ys);
    }

    pub fn triangles(&self) -> impl Iterator<Item = ToothTriangle> + '_ {
        self.xs.iter().zip(&self.ys).map(|(x, y)| ToothTriangle {
            a: DVec2::new(x[0], y[0]),
            c: DVec2::new(x[1], y[1]),
            d: DVec2::new(x[2], y[2]),
        })
    }
}

/// Places teeth along polylines.
///
/// # Arguments
/// * `features` - One entry per feature, each a list of planar pieces in
///   (lon, lat) degrees. Pieces of one feature share a length accumulator.
/// * `threshold_rad` - Spacing threshold in radians
/// * `base_length` - Tooth base length in degrees
/// * `aspect` - Tip offset as a fraction of the base; negative flips the side
///
/// # Returns
/// The teeth in feature and vertex order. A non-positive or non-finite
/// threshold yields no teeth.
pub fn tessellate_teeth(
    features: &[Vec<Vec<DVec2>>],
    threshold_rad: f64,
    base_length: f64,
    aspect: f64,
) -> TeethArrays {
    let mut teeth = TeethArrays::default();
    if !threshold_rad.is_finite() || threshold_rad <= 0.0 {
        return teeth;
    }
    let threshold = threshold_rad.to_degrees();

    for pieces in features {
        let mut distance = 0.0;

        for piece in pieces {
            for pair in piece.windows(2) {
                let a = pair[0];
                let ab = pair[1] - a;
                let len = ab.length();
                if !len.is_finite() || len == 0.0 {
                    continue;
                }

                let u = ab / len;
                distance += len;

                if distance >= threshold {
                    let normal = DVec2::new(u.y, -u.x);
                    teeth.push(ToothTriangle {
                        a,
                        c: a + base_length * u,
                        d: a + 0.5 * base_length * u + base_length * aspect * normal,
                    });
                    distance = 0.0;
                }
            }
        }
    }

    teeth
}

/// Wraps each feature at the dateline and tessellates its pieces.
///
/// Polygons are walked along their closed exterior; points contribute nothing.
pub fn tessellate_features<G: HasGeometry>(
    items: &[G],
    threshold_rad: f64,
    base_length: f64,
    aspect: f64,
) -> TeethArrays {
    let wrapper = DateLineWrapper::new();
    let features: Vec<Vec<Vec<DVec2>>> = items
        .iter()
        .map(|item| {
            let points = match item.geometry() {
                SphericalGeometry::Polyline(points) => points.clone(),
                SphericalGeometry::Polygon(points) => {
                    let mut closed = points.clone();
                    closed.extend(points.first().copied());
                    closed
                }
                SphericalGeometry::Point(_) => Vec::new(),
            };
            wrapper
                .wrap_polyline(&points)
                .into_iter()
                .map(|piece| piece.into_iter().map(|p| p.as_dvec2()).collect())
                .collect()
        })
        .collect();

    tessellate_teeth(&features, threshold_rad, base_length, aspect)
}
