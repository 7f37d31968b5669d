//! Per-time reconstructed boundary layers on disk.
//!
//! Resolved buckets can be exported once per reconstruction time and read
//! back later without a rotation model.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use super::PlotError;
use crate::feature::{Feature, FeatureCollection, FeatureError, FeatureSource};
use crate::reconstruct::{ReconstructionEngine, TopologyResolver};
use crate::topology::{BoundaryClass, TopologyCache};

/// Boundary layers written for each reconstruction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerCategory {
    RidgeTransformBoundaries,
    SubductionBoundaries,
    /// Subduction zones with the overriding plate on the left.
    SubductionBoundariesLeft,
    /// Subduction zones with the overriding plate on the right.
    SubductionBoundariesRight,
}

impl LayerCategory {
    pub const ALL: [LayerCategory; 4] = [
        LayerCategory::RidgeTransformBoundaries,
        LayerCategory::SubductionBoundaries,
        LayerCategory::SubductionBoundariesLeft,
        LayerCategory::SubductionBoundariesRight,
    ];

    pub fn file_stem(&self) -> &'static str {
        match self {
            LayerCategory::RidgeTransformBoundaries => "ridge_transform_boundaries",
            LayerCategory::SubductionBoundaries => "subduction_boundaries",
            LayerCategory::SubductionBoundariesLeft => "subduction_boundaries_sL",
            LayerCategory::SubductionBoundariesRight => "subduction_boundaries_sR",
        }
    }

    /// The cache bucket holding this layer's features.
    pub fn boundary_class(&self) -> BoundaryClass {
        match self {
            LayerCategory::RidgeTransformBoundaries => BoundaryClass::RidgeTransform,
            LayerCategory::SubductionBoundaries => BoundaryClass::Trench,
            LayerCategory::SubductionBoundariesLeft => BoundaryClass::TrenchLeft,
            LayerCategory::SubductionBoundariesRight => BoundaryClass::TrenchRight,
        }
    }
}

/// `{dir}/reconstructed_topologies/{category}_{time:.2}Ma.shp`
pub fn reconstructed_layer_path(dir: &Path, category: LayerCategory, time: f64) -> PathBuf {
    dir.join("reconstructed_topologies")
        .join(format!("{}_{:.2}Ma.shp", category.file_stem(), time))
}

/// The JSON feature collection stored next to the shapefile name.
fn layer_file(dir: &Path, category: LayerCategory, time: f64) -> PathBuf {
    reconstructed_layer_path(dir, category, time).with_extension("json")
}

/// Writes every layer category at the cache's current time under `dir`,
/// one JSON feature collection per category.
///
/// Returns the written paths in [`LayerCategory::ALL`] order.
pub fn export_reconstructed_layers<E, R>(
    cache: &TopologyCache<'_, E, R>,
    dir: &Path,
) -> Result<Vec<PathBuf>, PlotError>
where
    E: ReconstructionEngine,
    R: TopologyResolver,
{
    let time = cache.time().ok_or(PlotError::Unresolved)?;
    fs::create_dir_all(dir.join("reconstructed_topologies")).map_err(FeatureError::from)?;

    let mut written = Vec::with_capacity(LayerCategory::ALL.len());
    for category in LayerCategory::ALL {
        let path = layer_file(dir, category, time);
        let features = cache.get_bucket(category.boundary_class())?;
        FeatureCollection::new(features.to_vec()).write_json_file(&path)?;
        written.push(path);
    }
    info!("exported {} boundary layers at {} Ma to {}", written.len(), time, dir.display());
    Ok(written)
}

/// Reads one previously exported layer.
pub fn load_reconstructed_layer(
    dir: &Path,
    category: LayerCategory,
    time: f64,
) -> Result<Vec<Feature>, PlotError> {
    let path = layer_file(dir, category, time);
    Ok(FeatureSource::Path(path).normalize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use crate::feature::{FeatureType, SubductionPolarity};
    use crate::geometry::{LonLat, SphericalGeometry};
    use crate::reconstruct::{FiniteRotation, RotationModel, RotationReconstructor};
    use crate::topology::LayerSources;

    /// Plate 101 drifts one degree of longitude per Myr.
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

    fn boundaries() -> Vec<Feature> {
        let section = |feature_type: FeatureType| {
            Feature::new(
                SphericalGeometry::Polyline(vec![LonLat::new(0.0, 0.0), LonLat::new(0.0, 10.0)]),
                feature_type,
            )
            .with_plate_id(101)
        };
        vec![
            section(FeatureType::MidOceanRidge),
            section(FeatureType::SubductionZone).with_polarity(SubductionPolarity::Left),
        ]
    }

    #[test]
    fn test_layer_path_format() {
        let dir = Path::new("/data");
        let p = reconstructed_layer_path(dir, LayerCategory::SubductionBoundariesLeft, 100.0);
        assert_eq!(
            p,
            PathBuf::from("/data/reconstructed_topologies/subduction_boundaries_sL_100.00Ma.shp")
        );

        let dir = Path::new("out");
        let p = reconstructed_layer_path(dir, LayerCategory::RidgeTransformBoundaries, 12.345);
        assert_eq!(
            p,
            PathBuf::from("out/reconstructed_topologies/ridge_transform_boundaries_12.35Ma.shp")
        );
    }

    #[test]
    fn test_categories_map_to_buckets() {
        use LayerCategory::*;
        assert_eq!(SubductionBoundaries.boundary_class(), BoundaryClass::Trench);
        assert_eq!(SubductionBoundariesRight.boundary_class(), BoundaryClass::TrenchRight);
    }

    #[test]
    fn test_export_then_load_layers() {
        let e = engine();
        let sources = LayerSources::new(boundaries());
        let cache = TopologyCache::with_time(&e, &e, sources, 20.0).unwrap();
        let dir = tempdir().unwrap();

        let written = export_reconstructed_layers(&cache, dir.path()).unwrap();
        assert_eq!(written.len(), 4);
        assert!(written.iter().all(|p| p.exists()));
        assert!(written[1].ends_with("subduction_boundaries_20.00Ma.json"));

        let load = |category| load_reconstructed_layer(dir.path(), category, 20.0).unwrap();
        let left = load(LayerCategory::SubductionBoundariesLeft);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].polarity, SubductionPolarity::Left);
        assert!((left[0].geometry.points()[0].lon - 20.0).abs() < 1e-9);

        assert_eq!(load(LayerCategory::RidgeTransformBoundaries).len(), 1);
        assert!(load(LayerCategory::SubductionBoundariesRight).is_empty());
    }

    #[test]
    fn test_export_needs_resolved_cache() {
        let e = engine();
        let cache = TopologyCache::new(&e, &e, LayerSources::new(boundaries()));
        let dir = tempdir().unwrap();
        let result = export_reconstructed_layers(&cache, dir.path());
        assert!(matches!(result, Err(PlotError::Unresolved)));
    }

    #[test]
    fn test_missing_layer_is_an_error() {
        let dir = tempdir().unwrap();
        let err = load_reconstructed_layer(dir.path(), LayerCategory::SubductionBoundaries, 0.0)
            .unwrap_err();
        assert!(matches!(err, PlotError::Feature(FeatureError::Io(_))));
    }
}
