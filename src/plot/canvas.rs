//! Plate Carree PNG canvas.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use glam::DVec2;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageEncoder, Rgba as Pixel, RgbaImage};
use rayon::prelude::*;

use super::surface::{RasterStyle, RenderError, RenderSurface, Rgba, Style};
use crate::config::CanvasConfig;
use crate::geometry::MultiGeometry;
use crate::grid::{Extent, Grid};
use crate::teeth::TeethArrays;

/// Arrow head half-angle.
const HEAD_ANGLE: f64 = 25.0;

/// An RGBA image covering a lon/lat extent with equirectangular pixels.
pub struct PngCanvas {
    image: RgbaImage,
    extent: Extent,
}

impl PngCanvas {
    pub fn new(width: u32, height: u32, extent: Extent, background: Rgba) -> Result<Self, RenderError> {
        if width == 0 || height == 0 || !extent.is_valid() {
            return Err(RenderError::InvalidDimensions(width, height));
        }
        Ok(Self {
            image: RgbaImage::from_pixel(width, height, Pixel(background)),
            extent,
        })
    }

    pub fn from_config(config: &CanvasConfig) -> Result<Self, RenderError> {
        Self::new(config.width, config.height, config.extent, config.background)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        self.image.get_pixel(x, y).0
    }

    /// Maps (lon, lat) degrees to continuous pixel coordinates, y down.
    pub fn to_pixel(&self, p: DVec2) -> DVec2 {
        let e = &self.extent;
        DVec2::new(
            (p.x - e.min_lon) / e.width() * self.width() as f64,
            (e.max_lat - p.y) / e.height() * self.height() as f64,
        )
    }

    fn blend(&mut self, x: i64, y: i64, color: Rgba, alpha: f32) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        let px = self.image.get_pixel_mut(x as u32, y as u32);
        blend_into(&mut px.0, color, alpha);
    }

    /// Even-odd scanline fill of pixel-space rings.
    fn fill_rings(&mut self, rings: &[Vec<DVec2>], color: Rgba, alpha: f32) {
        let height = self.height() as i64;
        let (min_y, max_y) = rings
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
        if !min_y.is_finite() || !max_y.is_finite() {
            return;
        }

        let first = (min_y.floor() as i64).max(0);
        let last = (max_y.ceil() as i64).min(height - 1);
        let mut xs = Vec::new();

        for y in first..=last {
            let yc = y as f64 + 0.5;
            xs.clear();
            for ring in rings {
                let n = ring.len();
                for i in 0..n {
                    let (p, q) = (ring[i], ring[(i + 1) % n]);
                    if (p.y <= yc) != (q.y <= yc) {
                        xs.push(p.x + (yc - p.y) * (q.x - p.x) / (q.y - p.y));
                    }
                }
            }
            xs.sort_by(f64::total_cmp);

            for span in xs.chunks_exact(2) {
                let start = (span[0] - 0.5).ceil() as i64;
                let end = (span[1] - 0.5).floor() as i64;
                for x in start..=end {
                    self.blend(x, y, color, alpha);
                }
            }
        }
    }

    /// Strokes a pixel-space path with square pen stamps.
    fn stroke(&mut self, points: &[DVec2], color: Rgba, width: f32, alpha: f32) {
        let r = (width as f64 * 0.5).max(0.5);
        for seg in points.windows(2) {
            let (a, b) = (seg[0], seg[1]);
            let steps = ((b - a).length().ceil() as usize).max(1);
            for i in 0..=steps {
                let p = a.lerp(b, i as f64 / steps as f64);
                let (x0, x1) = ((p.x - r).floor() as i64, (p.x + r - 1e-9).floor() as i64);
                let (y0, y1) = ((p.y - r).floor() as i64, (p.y + r - 1e-9).floor() as i64);
                for y in y0..=y1 {
                    for x in x0..=x1 {
                        self.blend(x, y, color, alpha);
                    }
                }
            }
        }
    }

    fn project(&self, points: &[DVec2]) -> Vec<DVec2> {
        points.iter().map(|&p| self.to_pixel(p)).collect()
    }

    /// Writes the canvas as an 8-bit RGBA PNG.
    pub fn save(&self, path: &Path) -> Result<(), RenderError> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        let encoder = PngEncoder::new_with_quality(writer, CompressionType::Default, FilterType::Adaptive);

        encoder.write_image(
            self.image.as_raw(),
            self.width(),
            self.height(),
            image::ExtendedColorType::Rgba8,
        )?;

        Ok(())
    }
}

/// Source-over blend of `color` at `alpha` into an RGBA pixel.
fn blend_into(dst: &mut [u8], color: Rgba, alpha: f32) {
    let a = (color[3] as f32 / 255.0 * alpha).clamp(0.0, 1.0);
    for c in 0..3 {
        dst[c] = (color[c] as f32 * a + dst[c] as f32 * (1.0 - a)).round() as u8;
    }
    let da = dst[3] as f32 / 255.0;
    dst[3] = ((a + da * (1.0 - a)) * 255.0).round() as u8;
}

impl RenderSurface for PngCanvas {
    fn draw_geometries(&mut self, geometries: &[MultiGeometry], style: &Style) -> Result<(), RenderError> {
        for geometry in geometries {
            match geometry {
                MultiGeometry::Polygons(rings) => {
                    for ring in rings {
                        let mut px = self.project(ring.points());
                        if let Some(fill) = style.face_color {
                            self.fill_rings(std::slice::from_ref(&px), fill, style.alpha);
                        }
                        if let Some(edge) = style.edge_color {
                            if let Some(&first) = px.first() {
                                px.push(first);
                            }
                            self.stroke(&px, edge, style.linewidth, style.alpha);
                        }
                    }
                }
                MultiGeometry::Lines(lines) => {
                    let Some(edge) = style.edge_color else { continue };
                    for line in lines {
                        let px = self.project(line.points());
                        self.stroke(&px, edge, style.linewidth, style.alpha);
                    }
                }
            }
        }
        Ok(())
    }

    fn draw_raster(&mut self, grid: &Grid, extent: Extent, style: &RasterStyle) -> Result<(), RenderError> {
        if !extent.is_valid() {
            return Err(RenderError::InvalidDimensions(grid.cols() as u32, grid.rows() as u32));
        }
        let (lo, hi) = grid.value_range().unwrap_or((0.0, 0.0));
        let vmin = style.vmin.unwrap_or(lo);
        let vmax = style.vmax.unwrap_or(hi);

        let (width, height) = (self.width() as usize, self.height() as usize);
        let canvas = self.extent;
        let (rows, cols) = (grid.rows(), grid.cols());
        let buf: &mut [u8] = &mut self.image;

        buf.par_chunks_mut(width * 4).enumerate().for_each(|(py, row)| {
            let lat = canvas.max_lat - (py as f64 + 0.5) / height as f64 * canvas.height();
            if lat < extent.min_lat || lat > extent.max_lat {
                return;
            }
            let gr = (((lat - extent.min_lat) / extent.height() * rows as f64) as usize).min(rows - 1);

            for (px, pixel) in row.chunks_exact_mut(4).enumerate() {
                let lon = canvas.min_lon + (px as f64 + 0.5) / width as f64 * canvas.width();
                if lon < extent.min_lon || lon > extent.max_lon {
                    continue;
                }
                let gc = (((lon - extent.min_lon) / extent.width() * cols as f64) as usize).min(cols - 1);
                let value = grid.get(gr, gc).unwrap_or(f64::NAN);
                if let Some(color) = style.color(value, vmin, vmax) {
                    blend_into(pixel, color, style.alpha);
                }
            }
        });
        Ok(())
    }

    fn draw_vectors(
        &mut self,
        x: &[f64],
        y: &[f64],
        u: &[f64],
        v: &[f64],
        style: &Style,
    ) -> Result<(), RenderError> {
        let n = x.len();
        if y.len() != n || u.len() != n || v.len() != n {
            return Err(RenderError::VectorLength([x.len(), y.len(), u.len(), v.len()]));
        }
        let Some(color) = style.edge_color.or(style.face_color) else {
            return Ok(());
        };

        for i in 0..n {
            let start = DVec2::new(x[i], y[i]);
            let end = start + DVec2::new(u[i], v[i]) * style.vector_scale;
            let (a, b) = (self.to_pixel(start), self.to_pixel(end));
            let shaft = b - a;
            let len = shaft.length();
            if !len.is_finite() || len < 1e-9 {
                continue;
            }

            self.stroke(&[a, b], color, style.linewidth, style.alpha);

            let back = -shaft / len * (0.3 * len).max(3.0);
            let (s, c) = HEAD_ANGLE.to_radians().sin_cos();
            let left = DVec2::new(back.x * c - back.y * s, back.x * s + back.y * c);
            let right = DVec2::new(back.x * c + back.y * s, -back.x * s + back.y * c);
            self.stroke(&[b, b + left], color, style.linewidth, style.alpha);
            self.stroke(&[b, b + right], color, style.linewidth, style.alpha);
        }
        Ok(())
    }

    fn draw_triangles(&mut self, teeth: &TeethArrays, style: &Style) -> Result<(), RenderError> {
        let fill = style.face_color.or(style.edge_color);
        for t in teeth.triangles() {
            let px = vec![self.to_pixel(t.a), self.to_pixel(t.c), self.to_pixel(t.d)];
            if let Some(color) = fill {
                self.fill_rings(std::slice::from_ref(&px), color, style.alpha);
            }
        }
        Ok(())
    }
}
