//! Drawing targets and flat styles.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::MultiGeometry;
use crate::grid::{Extent, Grid};
use crate::teeth::TeethArrays;

/// Errors that can occur while drawing or saving.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid canvas dimensions {0}x{1}")]
    InvalidDimensions(u32, u32),
    #[error("Vector arrays differ in length: {0:?}")]
    VectorLength([usize; 4]),
}

pub type Rgba = [u8; 4];

/// Flat drawing style for lines, fills, teeth and vectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    /// Outline colour; `None` draws no outline.
    pub edge_color: Option<Rgba>,
    /// Fill colour for polygons and teeth; `None` leaves them hollow.
    pub face_color: Option<Rgba>,
    /// Line width in pixels.
    pub linewidth: f32,
    /// Opacity multiplier applied on top of the colours' own alpha.
    pub alpha: f32,
    /// Arrow length in degrees per unit of vector magnitude.
    pub vector_scale: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            edge_color: Some([0, 0, 0, 255]),
            face_color: None,
            linewidth: 1.0,
            alpha: 1.0,
            vector_scale: 1.0,
        }
    }
}

impl Style {
    /// Outline only.
    pub fn line(color: Rgba, linewidth: f32) -> Self {
        Self {
            edge_color: Some(color),
            linewidth,
            ..Default::default()
        }
    }

    /// Fill only.
    pub fn filled(color: Rgba) -> Self {
        Self {
            edge_color: None,
            face_color: Some(color),
            ..Default::default()
        }
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }
}

/// Linear colour ramp for rasters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterStyle {
    pub low: Rgba,
    pub high: Rgba,
    /// Value mapped to `low`; the grid minimum when unset.
    pub vmin: Option<f64>,
    /// Value mapped to `high`; the grid maximum when unset.
    pub vmax: Option<f64>,
    pub alpha: f32,
}

impl Default for RasterStyle {
    fn default() -> Self {
        Self {
            low: [48, 18, 59, 255],
            high: [250, 235, 80, 255],
            vmin: None,
            vmax: None,
            alpha: 1.0,
        }
    }
}

impl RasterStyle {
    /// Colour for `value` given the resolved range; NaN is transparent.
    pub fn color(&self, value: f64, vmin: f64, vmax: f64) -> Option<Rgba> {
        if !value.is_finite() {
            return None;
        }
        let t = if vmax > vmin {
            ((value - vmin) / (vmax - vmin)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Some([
            mix(self.low[0], self.high[0]),
            mix(self.low[1], self.high[1]),
            mix(self.low[2], self.high[2]),
            mix(self.low[3], self.high[3]),
        ])
    }
}

/// Something planar geometry can be drawn onto, in (lon, lat) degrees.
pub trait RenderSurface {
    fn draw_geometries(&mut self, geometries: &[MultiGeometry], style: &Style) -> Result<(), RenderError>;

    /// Draws a grid stretched over `extent`, row 0 at the bottom.
    fn draw_raster(&mut self, grid: &Grid, extent: Extent, style: &RasterStyle) -> Result<(), RenderError>;

    /// Draws one arrow per `(x, y)` position with components `(u, v)`.
    fn draw_vectors(
        &mut self,
        x: &[f64],
        y: &[f64],
        u: &[f64],
        v: &[f64],
        style: &Style,
    ) -> Result<(), RenderError>;

    fn draw_triangles(&mut self, teeth: &TeethArrays, style: &Style) -> Result<(), RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_endpoints() {
        let s = RasterStyle::default();
        assert_eq!(s.color(0.0, 0.0, 10.0), Some(s.low));
        assert_eq!(s.color(10.0, 0.0, 10.0), Some(s.high));
        assert_eq!(s.color(99.0, 0.0, 10.0), Some(s.high));
        assert_eq!(s.color(f64::NAN, 0.0, 10.0), None);
    }

    #[test]
    fn test_flat_range_uses_low() {
        let s = RasterStyle::default();
        assert_eq!(s.color(3.0, 3.0, 3.0), Some(s.low));
    }

    #[test]
    fn test_style_serde_defaults() {
        let s: Style = serde_json::from_str(r#"{"linewidth": 2.5}"#).unwrap();
        assert_eq!(s.linewidth, 2.5);
        assert_eq!(s.edge_color, Some([0, 0, 0, 255]));
        assert_eq!(s.face_color, None);
    }
}
