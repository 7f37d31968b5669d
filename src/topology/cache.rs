//! Topology cache state machine.
//!
//! The cache starts uninitialized. Every call to [`TopologyCache::set_time`]
//! resolves topologies and reconstructs the base layers for that time into
//! a fresh [`TopologySnapshot`], which replaces the previous one only when
//! everything succeeded.

use log::{debug, info};

use crate::config::PlotConfig;
use crate::feature::{Feature, FeatureError, FeatureSource};
use crate::plot::PlotError;
use crate::reconstruct::{
    ReconstructedGeometry, ReconstructionEngine, ResolvedTopologies, TopologyResolver,
};

/// Classes of resolved boundary features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryClass {
    /// Plate polygons and deforming networks.
    Topologies,
    /// Ridges and transforms together.
    RidgeTransform,
    Ridge,
    Transform,
    /// All subduction zones.
    Trench,
    /// Subduction zones with the overriding plate on the left.
    TrenchLeft,
    /// Subduction zones with the overriding plate on the right.
    TrenchRight,
    Other,
}

impl BoundaryClass {
    pub const ALL: [BoundaryClass; 8] = [
        BoundaryClass::Topologies,
        BoundaryClass::RidgeTransform,
        BoundaryClass::Ridge,
        BoundaryClass::Transform,
        BoundaryClass::Trench,
        BoundaryClass::TrenchLeft,
        BoundaryClass::TrenchRight,
        BoundaryClass::Other,
    ];

    /// Returns the name of the class.
    pub fn label(&self) -> &'static str {
        match self {
            BoundaryClass::Topologies => "topologies",
            BoundaryClass::RidgeTransform => "ridge_transforms",
            BoundaryClass::Ridge => "ridges",
            BoundaryClass::Transform => "transforms",
            BoundaryClass::Trench => "trenches",
            BoundaryClass::TrenchLeft => "trench_left",
            BoundaryClass::TrenchRight => "trench_right",
            BoundaryClass::Other => "other",
        }
    }
}

/// Everything resolved for one reconstruction time.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologySnapshot {
    pub time: f64,
    pub resolved: ResolvedTopologies,
    /// `None` when no coastline source is configured.
    pub coastlines: Option<Vec<ReconstructedGeometry>>,
    pub continents: Option<Vec<ReconstructedGeometry>>,
    pub cobs: Option<Vec<ReconstructedGeometry>>,
}

impl TopologySnapshot {
    pub fn bucket(&self, class: BoundaryClass) -> &[Feature] {
        let r = &self.resolved;
        match class {
            BoundaryClass::Topologies => &r.topologies,
            BoundaryClass::RidgeTransform => &r.ridge_transforms,
            BoundaryClass::Ridge => &r.ridges,
            BoundaryClass::Transform => &r.transforms,
            BoundaryClass::Trench => &r.trenches,
            BoundaryClass::TrenchLeft => &r.trench_left,
            BoundaryClass::TrenchRight => &r.trench_right,
            BoundaryClass::Other => &r.other,
        }
    }
}

/// Whether the cache holds a snapshot, and for which time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheState {
    Uninitialized,
    Resolved(f64),
}

/// Present-day inputs the cache reconstructs at every time.
#[derive(Debug, Clone, Default)]
pub struct LayerSources {
    pub topology_features: Vec<Feature>,
    pub coastlines: Option<Vec<Feature>>,
    pub continents: Option<Vec<Feature>>,
    pub cobs: Option<Vec<Feature>>,
    pub anchor_plate_id: u32,
}

impl LayerSources {
    pub fn new(topology_features: Vec<Feature>) -> Self {
        Self {
            topology_features,
            ..Default::default()
        }
    }

    /// Reads every source the configuration names.
    pub fn from_config(config: &PlotConfig) -> Result<Self, FeatureError> {
        let load = |path: &Option<std::path::PathBuf>| -> Result<Option<Vec<Feature>>, FeatureError> {
            path.as_ref()
                .map(|p| FeatureSource::Path(p.clone()).normalize())
                .transpose()
        };

        Ok(Self {
            topology_features: load(&config.topology_features)?.unwrap_or_default(),
            coastlines: load(&config.coastline_filename)?,
            continents: load(&config.continent_filename)?,
            cobs: load(&config.cob_filename)?,
            anchor_plate_id: config.anchor_plate_id,
        })
    }

    pub fn with_coastlines(mut self, source: impl Into<FeatureSource>) -> Result<Self, FeatureError> {
        self.coastlines = Some(source.into().normalize()?);
        Ok(self)
    }

    pub fn with_continents(mut self, source: impl Into<FeatureSource>) -> Result<Self, FeatureError> {
        self.continents = Some(source.into().normalize()?);
        Ok(self)
    }

    pub fn with_cobs(mut self, source: impl Into<FeatureSource>) -> Result<Self, FeatureError> {
        self.cobs = Some(source.into().normalize()?);
        Ok(self)
    }
}

/// Resolved topologies and reconstructed layers at the current time.
///
/// Not internally synchronised; callers sharing a cache across threads
/// wrap it in their own lock.
pub struct TopologyCache<'a, E, R> {
    engine: &'a E,
    resolver: &'a R,
    sources: LayerSources,
    snapshot: Option<TopologySnapshot>,
}

impl<'a, E, R> TopologyCache<'a, E, R>
where
    E: ReconstructionEngine,
    R: TopologyResolver,
{
    /// Creates an uninitialized cache.
    pub fn new(engine: &'a E, resolver: &'a R, sources: LayerSources) -> Self {
        Self {
            engine,
            resolver,
            sources,
            snapshot: None,
        }
    }

    /// Creates a cache and resolves it at `time`.
    pub fn with_time(
        engine: &'a E,
        resolver: &'a R,
        sources: LayerSources,
        time: f64,
    ) -> Result<Self, PlotError> {
        let mut cache = Self::new(engine, resolver, sources);
        cache.set_time(time)?;
        Ok(cache)
    }

    pub fn state(&self) -> CacheState {
        match &self.snapshot {
            Some(s) => CacheState::Resolved(s.time),
            None => CacheState::Uninitialized,
        }
    }

    pub fn time(&self) -> Option<f64> {
        self.snapshot.as_ref().map(|s| s.time)
    }

    pub fn snapshot(&self) -> Option<&TopologySnapshot> {
        self.snapshot.as_ref()
    }

    pub fn sources(&self) -> &LayerSources {
        &self.sources
    }

    pub fn resolver(&self) -> &'a R {
        self.resolver
    }

    pub fn engine(&self) -> &'a E {
        self.engine
    }

    /// Resolves everything at `time` (Ma).
    ///
    /// Always re-resolves, even for the current time. Negative or NaN times
    /// are rejected before anything is touched; on any failure the previous
    /// snapshot stays in place.
    pub fn set_time(&mut self, time: f64) -> Result<(), PlotError> {
        if time.is_nan() || time < 0.0 {
            return Err(PlotError::InvalidTime(time));
        }

        let snapshot = self.resolve(time)?;
        debug!("topology cache {:?} -> Resolved({})", self.state(), time);
        self.snapshot = Some(snapshot);
        info!("reconstruction time set to {} Ma", time);
        Ok(())
    }

    fn resolve(&self, time: f64) -> Result<TopologySnapshot, PlotError> {
        let anchor = self.sources.anchor_plate_id;
        let resolved = self
            .resolver
            .resolve_topologies(&self.sources.topology_features, time, anchor)?;

        let reconstruct = |layer: &Option<Vec<Feature>>| {
            layer
                .as_ref()
                .map(|features| self.engine.reconstruct(features, time, anchor, true))
                .transpose()
        };

        Ok(TopologySnapshot {
            time,
            resolved,
            coastlines: reconstruct(&self.sources.coastlines)?,
            continents: reconstruct(&self.sources.continents)?,
            cobs: reconstruct(&self.sources.cobs)?,
        })
    }

    fn resolved(&self) -> Result<&TopologySnapshot, PlotError> {
        self.snapshot.as_ref().ok_or(PlotError::Unresolved)
    }

    /// Features of one boundary class at the current time.
    pub fn get_bucket(&self, class: BoundaryClass) -> Result<&[Feature], PlotError> {
        Ok(self.resolved()?.bucket(class))
    }

    pub fn coastlines(&self) -> Result<&[ReconstructedGeometry], PlotError> {
        self.resolved()?
            .coastlines
            .as_deref()
            .ok_or(PlotError::MissingSource("coastline"))
    }

    pub fn continents(&self) -> Result<&[ReconstructedGeometry], PlotError> {
        self.resolved()?
            .continents
            .as_deref()
            .ok_or(PlotError::MissingSource("continent"))
    }

    pub fn cobs(&self) -> Result<&[ReconstructedGeometry], PlotError> {
        self.resolved()?
            .cobs
            .as_deref()
            .ok_or(PlotError::MissingSource("continent-ocean boundary"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureType;
    use crate::geometry::{LonLat, SphericalGeometry};
    use crate::reconstruct::{FiniteRotation, RotationModel, RotationReconstructor};

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
            RotationModel::new(vec![record(0.0, 0.0), record(100.0, 50.0)]).unwrap(),
        )
    }

    fn sources() -> LayerSources {
        let ridge = Feature::new(
            SphericalGeometry::Polyline(vec![LonLat::new(0.0, 0.0), LonLat::new(0.0, 20.0)]),
            FeatureType::MidOceanRidge,
        )
        .with_plate_id(101);
        LayerSources::new(vec![ridge])
    }

    #[test]
    fn test_starts_uninitialized() {
        let e = engine();
        let cache = TopologyCache::new(&e, &e, sources());
        assert_eq!(cache.state(), CacheState::Uninitialized);
        assert_eq!(cache.time(), None);
        assert!(matches!(cache.get_bucket(BoundaryClass::Ridge), Err(PlotError::Unresolved)));
    }

    #[test]
    fn test_set_time_resolves_buckets() {
        let e = engine();
        let cache = TopologyCache::with_time(&e, &e, sources(), 20.0).unwrap();
        assert_eq!(cache.state(), CacheState::Resolved(20.0));
        assert_eq!(cache.get_bucket(BoundaryClass::Ridge).unwrap().len(), 1);
        assert_eq!(cache.get_bucket(BoundaryClass::RidgeTransform).unwrap().len(), 1);
        assert!(cache.get_bucket(BoundaryClass::Trench).unwrap().is_empty());

        let ridge = &cache.get_bucket(BoundaryClass::Ridge).unwrap()[0];
        assert!((ridge.geometry.points()[0].lon - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_time_leaves_snapshot() {
        let e = engine();
        let mut cache = TopologyCache::with_time(&e, &e, sources(), 20.0).unwrap();
        let before = cache.snapshot().cloned();

        assert!(matches!(cache.set_time(-5.0), Err(PlotError::InvalidTime(t)) if t == -5.0));
        assert!(matches!(cache.set_time(f64::NAN), Err(PlotError::InvalidTime(_))));
        assert_eq!(cache.snapshot().cloned(), before);
        assert_eq!(cache.time(), Some(20.0));
    }

    #[test]
    fn test_same_time_re_resolves() {
        let e = engine();
        let mut cache = TopologyCache::with_time(&e, &e, sources(), 20.0).unwrap();
        cache.set_time(20.0).unwrap();
        assert_eq!(cache.state(), CacheState::Resolved(20.0));
    }

    #[test]
    fn test_missing_layers() {
        let e = engine();
        let cache = TopologyCache::with_time(&e, &e, sources(), 0.0).unwrap();
        assert!(matches!(cache.coastlines(), Err(PlotError::MissingSource("coastline"))));
        assert!(matches!(cache.continents(), Err(PlotError::MissingSource(_))));
        assert!(matches!(cache.cobs(), Err(PlotError::MissingSource(_))));
    }

    #[test]
    fn test_configured_coastlines_reconstructed() {
        let e = engine();
        let coast = Feature::new(
            SphericalGeometry::Polygon(vec![
                LonLat::new(0.0, 0.0),
                LonLat::new(10.0, 0.0),
                LonLat::new(10.0, 10.0),
            ]),
            FeatureType::Coastline,
        )
        .with_plate_id(101);
        let sources = sources().with_coastlines(coast).unwrap();

        let cache = TopologyCache::with_time(&e, &e, sources, 100.0).unwrap();
        let coastlines = cache.coastlines().unwrap();
        assert_eq!(coastlines.len(), 1);
        assert!((coastlines[0].geometry.points()[1].lon - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_labels_are_unique() {
        let mut labels: Vec<&str> = BoundaryClass::ALL.iter().map(|c| c.label()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), 8);
    }
}
