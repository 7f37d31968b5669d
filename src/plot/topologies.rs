//! Render adapters from the topology cache to a surface.

use std::path::Path;

use log::debug;

use super::palette::plate_colors;
use super::surface::{RasterStyle, RenderSurface, Style};
use super::PlotError;
use crate::feature::Feature;
use crate::geometry::LonLat;
use crate::grid::{Extent, Grid, GridError, GridReader};
use crate::reconstruct::{ReconstructionEngine, TopologyResolver};
use crate::teeth::{tessellate_features, TeethParams};
use crate::topology::{BoundaryClass, TopologyCache};
use crate::wrap::{wrap_lines, wrap_polygons, WrapOutput};

/// Time step (Myr) of the stage rotations behind plate motion vectors.
pub const VELOCITY_DELTA_TIME: f64 = 5.0;

/// What a plot call sent to the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlotReport {
    /// Geometries, teeth, rasters or arrows drawn.
    pub drawn: usize,
    /// Features skipped as degenerate.
    pub dropped: usize,
}

impl PlotReport {
    fn from_wrap(out: &WrapOutput) -> Self {
        Self {
            drawn: out.geometries.len(),
            dropped: out.dropped,
        }
    }

    pub fn merge(self, other: PlotReport) -> Self {
        Self {
            drawn: self.drawn + other.drawn,
            dropped: self.dropped + other.dropped,
        }
    }
}

/// Plots the features of a [`TopologyCache`] at its current time.
pub struct PlotTopologies<'a, E, R> {
    cache: TopologyCache<'a, E, R>,
    palette_seed: u64,
}

impl<'a, E, R> PlotTopologies<'a, E, R>
where
    E: ReconstructionEngine,
    R: TopologyResolver,
{
    pub fn new(cache: TopologyCache<'a, E, R>) -> Self {
        Self {
            cache,
            palette_seed: 12345,
        }
    }

    /// Seed for the plate polygon palette.
    pub fn with_palette_seed(mut self, seed: u64) -> Self {
        self.palette_seed = seed;
        self
    }

    pub fn cache(&self) -> &TopologyCache<'a, E, R> {
        &self.cache
    }

    pub fn into_cache(self) -> TopologyCache<'a, E, R> {
        self.cache
    }

    /// Re-resolves the cache at `time`.
    pub fn set_time(&mut self, time: f64) -> Result<(), PlotError> {
        self.cache.set_time(time)
    }

    pub fn time(&self) -> Option<f64> {
        self.cache.time()
    }

    fn draw<S: RenderSurface>(
        surface: &mut S,
        out: WrapOutput,
        style: &Style,
    ) -> Result<PlotReport, PlotError> {
        let report = PlotReport::from_wrap(&out);
        if report.dropped > 0 {
            debug!("{} degenerate geometries skipped", report.dropped);
        }
        surface.draw_geometries(&out.geometries, style)?;
        Ok(report)
    }

    fn plot_bucket_lines<S: RenderSurface>(
        &self,
        surface: &mut S,
        class: BoundaryClass,
        style: &Style,
    ) -> Result<PlotReport, PlotError> {
        let features = self.cache.get_bucket(class)?;
        let style = Style { face_color: None, ..*style };
        Self::draw(surface, wrap_lines(features), &style)
    }

    /// Reconstructed coastline polygons. Needs a coastline source.
    pub fn plot_coastlines<S: RenderSurface>(
        &self,
        surface: &mut S,
        style: &Style,
    ) -> Result<PlotReport, PlotError> {
        Self::draw(surface, wrap_polygons(self.cache.coastlines()?), style)
    }

    /// Reconstructed continental polygons. Needs a continent source.
    pub fn plot_continents<S: RenderSurface>(
        &self,
        surface: &mut S,
        style: &Style,
    ) -> Result<PlotReport, PlotError> {
        Self::draw(surface, wrap_polygons(self.cache.continents()?), style)
    }

    /// Continent-ocean boundaries, drawn as unfilled lines.
    pub fn plot_continent_ocean_boundaries<S: RenderSurface>(
        &self,
        surface: &mut S,
        style: &Style,
    ) -> Result<PlotReport, PlotError> {
        let style = Style { face_color: None, ..*style };
        Self::draw(surface, wrap_lines(self.cache.cobs()?), &style)
    }

    pub fn plot_ridges<S: RenderSurface>(
        &self,
        surface: &mut S,
        style: &Style,
    ) -> Result<PlotReport, PlotError> {
        self.plot_bucket_lines(surface, BoundaryClass::Ridge, style)
    }

    pub fn plot_ridges_and_transforms<S: RenderSurface>(
        &self,
        surface: &mut S,
        style: &Style,
    ) -> Result<PlotReport, PlotError> {
        self.plot_bucket_lines(surface, BoundaryClass::RidgeTransform, style)
    }

    pub fn plot_transforms<S: RenderSurface>(
        &self,
        surface: &mut S,
        style: &Style,
    ) -> Result<PlotReport, PlotError> {
        self.plot_bucket_lines(surface, BoundaryClass::Transform, style)
    }

    pub fn plot_trenches<S: RenderSurface>(
        &self,
        surface: &mut S,
        style: &Style,
    ) -> Result<PlotReport, PlotError> {
        self.plot_bucket_lines(surface, BoundaryClass::Trench, style)
    }

    /// Resolved plate polygons, each filled with its plate's colour.
    pub fn plot_plate_polygons<S: RenderSurface>(
        &self,
        surface: &mut S,
        style: &Style,
    ) -> Result<PlotReport, PlotError> {
        let features = self.cache.get_bucket(BoundaryClass::Topologies)?;
        let colors = plate_colors(features.iter().filter_map(|f| f.plate_id), self.palette_seed);

        let mut report = PlotReport::default();
        for feature in features {
            let face_color = feature
                .plate_id
                .and_then(|id| colors.get(&id).copied())
                .or(style.face_color);
            let plate_style = Style { face_color, ..*style };
            let out = wrap_polygons(std::slice::from_ref(feature));
            report = report.merge(Self::draw(surface, out, &plate_style)?);
        }
        Ok(report)
    }

    /// Teeth along both sides of every subduction zone.
    ///
    /// Left sides point one way (negated aspect), right sides the other.
    pub fn plot_subduction_teeth<S: RenderSurface>(
        &self,
        surface: &mut S,
        params: &TeethParams,
        style: &Style,
    ) -> Result<PlotReport, PlotError> {
        let left = self.cache.get_bucket(BoundaryClass::TrenchLeft)?;
        let right = self.cache.get_bucket(BoundaryClass::TrenchRight)?;

        let mut teeth = tessellate_features(left, params.spacing, params.size, -params.aspect);
        let mut right_teeth =
            tessellate_features(right, params.spacing, params.size, params.aspect);
        teeth.append(&mut right_teeth);

        surface.draw_triangles(&teeth, style)?;
        Ok(PlotReport {
            drawn: teeth.len(),
            dropped: 0,
        })
    }

    /// Draws a grid over `extent` (the whole globe when `None`).
    pub fn plot_grid<S: RenderSurface>(
        &self,
        surface: &mut S,
        grid: &Grid,
        extent: Option<Extent>,
        style: &RasterStyle,
    ) -> Result<PlotReport, PlotError> {
        let extent = extent.unwrap_or_default();
        if !extent.is_valid() {
            return Err(GridError::Shape(format!("invalid extent {:?}", extent)).into());
        }
        surface.draw_raster(grid, extent, style)?;
        Ok(PlotReport { drawn: 1, dropped: 0 })
    }

    /// Reads a grid and draws it over the extent of its coordinate axes.
    pub fn plot_grid_from_file<S: RenderSurface, G: GridReader>(
        &self,
        surface: &mut S,
        reader: &G,
        path: &Path,
        style: &RasterStyle,
    ) -> Result<PlotReport, PlotError> {
        let grid = reader.read_grid(path)?;
        let extent = grid
            .axes_extent()
            .ok_or_else(|| GridError::Shape("grid has no coordinate axes".to_string()))?;
        self.plot_grid(surface, &grid, Some(extent), style)
    }

    /// Plate velocities on a regular lon/lat mesh.
    ///
    /// With `normalise` every non-zero arrow gets unit length.
    pub fn plot_plate_motion_vectors<S: RenderSurface>(
        &self,
        surface: &mut S,
        spacing_x: f64,
        spacing_y: f64,
        normalise: bool,
        style: &Style,
    ) -> Result<PlotReport, PlotError> {
        let lons = mesh_axis(-180.0, 180.0, spacing_x)?;
        let lats = mesh_axis(-90.0, 90.0, spacing_y)?;

        let mut x = Vec::with_capacity(lons.len() * lats.len());
        let mut y = Vec::with_capacity(x.capacity());
        for &lat in &lats {
            for &lon in &lons {
                x.push(lon);
                y.push(lat);
            }
        }
        let points: Vec<LonLat> =
            x.iter().zip(&y).map(|(&lon, &lat)| LonLat::new(lon, lat)).collect();

        let topologies: &[Feature] = self.cache.get_bucket(BoundaryClass::Topologies)?;
        let time = self.cache.time().ok_or(PlotError::Unresolved)?;
        let velocities = self.cache.resolver().plate_velocities(
            &points,
            topologies,
            time,
            VELOCITY_DELTA_TIME,
            self.cache.sources().anchor_plate_id,
        )?;

        let (mut u, mut v): (Vec<f64>, Vec<f64>) =
            velocities.iter().map(|w| (w.x, w.y)).unzip();
        if normalise {
            for (ui, vi) in u.iter_mut().zip(v.iter_mut()) {
                let mag = ui.hypot(*vi);
                if mag > 0.0 {
                    *ui /= mag;
                    *vi /= mag;
                }
            }
        }

        surface.draw_vectors(&x, &y, &u, &v, style)?;
        Ok(PlotReport {
            drawn: x.len(),
            dropped: 0,
        })
    }
}

/// `start, start + step, ...` up to and including `stop`.
fn mesh_axis(start: f64, stop: f64, step: f64) -> Result<Vec<f64>, PlotError> {
    if !step.is_finite() || step <= 0.0 {
        return Err(PlotError::InvalidSpacing(step));
    }
    let n = ((stop - start) / step + 1e-9).floor() as usize;
    Ok((0..=n).map(|i| start + i as f64 * step).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{FeatureType, SubductionPolarity};
    use crate::geometry::{MultiGeometry, SphericalGeometry};
    use crate::plot::RenderError;
    use crate::reconstruct::{FiniteRotation, RotationModel, RotationReconstructor};
    use crate::teeth::TeethArrays;
    use crate::topology::LayerSources;

    #[derive(Default)]
    struct Recorder {
        geometries: Vec<MultiGeometry>,
        styles: Vec<Style>,
        teeth: TeethArrays,
        rasters: Vec<Extent>,
        vectors: Vec<(f64, f64, f64, f64)>,
    }

    impl RenderSurface for Recorder {
        fn draw_geometries(
            &mut self,
            geometries: &[MultiGeometry],
            style: &Style,
        ) -> Result<(), RenderError> {
            self.geometries.extend_from_slice(geometries);
            self.styles.push(*style);
            Ok(())
        }

        fn draw_raster(
            &mut self,
            _grid: &Grid,
            extent: Extent,
            _style: &RasterStyle,
        ) -> Result<(), RenderError> {
            self.rasters.push(extent);
            Ok(())
        }

        fn draw_vectors(
            &mut self,
            x: &[f64],
            y: &[f64],
            u: &[f64],
            v: &[f64],
            _style: &Style,
        ) -> Result<(), RenderError> {
            for i in 0..x.len() {
                self.vectors.push((x[i], y[i], u[i], v[i]));
            }
            Ok(())
        }

        fn draw_triangles(
            &mut self,
            teeth: &TeethArrays,
            _style: &Style,
        ) -> Result<(), RenderError> {
            self.teeth.xs.extend_from_slice(&teeth.xs);
            self.teeth.ys.extend_from_slice(&teeth.ys);
            Ok(())
        }
    }

    fn engine() -> RotationReconstructor {
        let record = |time: f64, angle: f64| FiniteRotation {
            plate_id: 101,
            time,
            fixed_plate: 0,
            pole_lat: 90.0,
            pole_lon: 0.0,
            angle_deg: angle,
        };
        RotationReconstructor::new(
            RotationModel::new(vec![record(0.0, 0.0), record(100.0, 100.0)]).unwrap(),
        )
    }

    fn trench(polarity: SubductionPolarity) -> Feature {
        Feature::new(
            SphericalGeometry::Polyline(vec![LonLat::new(0.0, -10.0), LonLat::new(0.0, 10.0)]),
            FeatureType::SubductionZone,
        )
        .with_plate_id(101)
        .with_polarity(polarity)
    }

    fn plate() -> Feature {
        Feature::new(
            SphericalGeometry::Polygon(vec![
                LonLat::new(-40.0, -40.0),
                LonLat::new(40.0, -40.0),
                LonLat::new(40.0, 40.0),
                LonLat::new(-40.0, 40.0),
            ]),
            FeatureType::TopologicalClosedPlateBoundary,
        )
        .with_plate_id(101)
    }

    fn sources() -> LayerSources {
        LayerSources::new(vec![
            plate(),
            trench(SubductionPolarity::Left),
            trench(SubductionPolarity::Right),
        ])
    }

    #[test]
    fn test_trenches_drawn_as_lines() {
        let e = engine();
        let plot = PlotTopologies::new(TopologyCache::with_time(&e, &e, sources(), 0.0).unwrap());
        let mut surface = Recorder::default();

        let style = Style { face_color: Some([1, 2, 3, 255]), ..Style::default() };
        let report = plot.plot_trenches(&mut surface, &style).unwrap();
        assert_eq!(report, PlotReport { drawn: 2, dropped: 0 });
        assert!(surface.geometries.iter().all(|g| matches!(g, MultiGeometry::Lines(_))));
        assert_eq!(surface.styles[0].face_color, None);
    }

    #[test]
    fn test_teeth_point_opposite_ways() {
        let e = engine();
        let plot = PlotTopologies::new(TopologyCache::with_time(&e, &e, sources(), 0.0).unwrap());
        let mut surface = Recorder::default();

        let params = TeethParams { spacing: 5f64.to_radians(), size: 2.0, aspect: 1.0 };
        let report = plot.plot_subduction_teeth(&mut surface, &params, &Style::default()).unwrap();
        // One twenty degree segment per trench, one tooth each.
        assert_eq!(report.drawn, 2);

        // Line runs north along lon 0: left teeth come first and tip west.
        let tips: Vec<f64> = surface.teeth.xs.iter().map(|row| row[2]).collect();
        assert!((tips[0] + 2.0).abs() < 1e-9);
        assert!((tips[1] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_coastlines() {
        let e = engine();
        let plot = PlotTopologies::new(TopologyCache::with_time(&e, &e, sources(), 0.0).unwrap());
        let mut surface = Recorder::default();
        assert!(matches!(
            plot.plot_coastlines(&mut surface, &Style::default()),
            Err(PlotError::MissingSource("coastline"))
        ));
        assert!(surface.geometries.is_empty());
    }

    #[test]
    fn test_plate_polygons_coloured_by_plate() {
        let e = engine();
        let plot = PlotTopologies::new(TopologyCache::with_time(&e, &e, sources(), 0.0).unwrap());
        let mut surface = Recorder::default();
        let report = plot.plot_plate_polygons(&mut surface, &Style::default()).unwrap();
        assert_eq!(report.drawn, 1);
        let expected = plate_colors([101], 12345)[&101];
        assert_eq!(surface.styles[0].face_color, Some(expected));
    }

    #[test]
    fn test_grid_default_extent() {
        let e = engine();
        let plot = PlotTopologies::new(TopologyCache::new(&e, &e, sources()));
        let mut surface = Recorder::default();
        let grid = Grid::new(vec![0.0; 4], 2, 2).unwrap();
        plot.plot_grid(&mut surface, &grid, None, &RasterStyle::default()).unwrap();
        assert_eq!(surface.rasters, vec![Extent::GLOBAL]);

        let bad = Extent::new(10.0, 0.0, 0.0, 10.0);
        assert!(matches!(
            plot.plot_grid(&mut surface, &grid, Some(bad), &RasterStyle::default()),
            Err(PlotError::Grid(_))
        ));
    }

    #[test]
    fn test_motion_vectors_mesh_and_normalise() {
        let e = engine();
        let plot = PlotTopologies::new(TopologyCache::with_time(&e, &e, sources(), 10.0).unwrap());
        let mut surface = Recorder::default();

        let report = plot
            .plot_plate_motion_vectors(&mut surface, 90.0, 45.0, true, &Style::default())
            .unwrap();
        // 5 longitudes x 5 latitudes
        assert_eq!(report.drawn, 25);
        assert_eq!(surface.vectors[0], (-180.0, -90.0, 0.0, 0.0));

        let inside: Vec<_> = surface.vectors.iter().filter(|v| v.0 == 0.0 && v.1 == 0.0).collect();
        assert_eq!(inside.len(), 1);
        let (_, _, u, v) = *inside[0];
        assert!((u.hypot(v) - 1.0).abs() < 1e-9);
        assert!(u < 0.0);
    }

    #[test]
    fn test_motion_vectors_reject_bad_spacing() {
        let e = engine();
        let plot = PlotTopologies::new(TopologyCache::with_time(&e, &e, sources(), 0.0).unwrap());
        let mut surface = Recorder::default();
        assert!(matches!(
            plot.plot_plate_motion_vectors(&mut surface, 0.0, 10.0, false, &Style::default()),
            Err(PlotError::InvalidSpacing(_))
        ));
    }

    #[test]
    fn test_mesh_axis_includes_stop() {
        assert_eq!(mesh_axis(-90.0, 90.0, 60.0).unwrap(), vec![-90.0, -30.0, 30.0, 90.0]);
        assert_eq!(mesh_axis(-180.0, 180.0, 100.0).unwrap().len(), 4);
    }
}
