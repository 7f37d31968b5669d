//! Features: geometries tagged with a plate id and a feature type.
//!
//! Feature collections are read from JSON documents. Callers may hand the
//! plotting layer a path, a single feature, a list, a collection or any
//! nesting of those; [`FeatureSource::normalize`] flattens them once.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{LonLat, SphericalGeometry};
use crate::wrap::HasGeometry;

/// Errors that can occur while loading or building features.
#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Length mismatch: {lons} longitudes, {lats} latitudes, {plate_ids} plate ids")]
    LengthMismatch { lons: usize, lats: usize, plate_ids: usize },
    #[error("No points given")]
    Empty,
}

/// Kind of geological feature, as far as plotting cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FeatureType {
    Coastline,
    ContinentalPolygon,
    ContinentOceanBoundary,
    MidOceanRidge,
    Transform,
    SubductionZone,
    /// A rigid plate polygon assembled from boundary sections.
    TopologicalClosedPlateBoundary,
    /// A deforming network.
    TopologicalNetwork,
    MeshNode,
    #[default]
    Unclassified,
}

impl FeatureType {
    /// True for features that outline a plate or network.
    pub fn is_topological(self) -> bool {
        matches!(
            self,
            FeatureType::TopologicalClosedPlateBoundary | FeatureType::TopologicalNetwork
        )
    }
}

/// Which side of a subduction zone the overriding plate sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SubductionPolarity {
    Left,
    Right,
    #[default]
    Unknown,
}

/// A single feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub geometry: SphericalGeometry,
    #[serde(default)]
    pub plate_id: Option<u32>,
    #[serde(default)]
    pub feature_type: FeatureType,
    #[serde(default)]
    pub name: Option<String>,
    /// Only meaningful for subduction zones.
    #[serde(default)]
    pub polarity: SubductionPolarity,
}

impl Feature {
    pub fn new(geometry: SphericalGeometry, feature_type: FeatureType) -> Self {
        Self {
            geometry,
            plate_id: None,
            feature_type,
            name: None,
            polarity: SubductionPolarity::Unknown,
        }
    }

    pub fn with_plate_id(mut self, plate_id: u32) -> Self {
        self.plate_id = Some(plate_id);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_polarity(mut self, polarity: SubductionPolarity) -> Self {
        self.polarity = polarity;
        self
    }

    /// Returns a copy of this feature carrying a different geometry.
    pub fn with_geometry(&self, geometry: SphericalGeometry) -> Self {
        Self {
            geometry,
            ..self.clone()
        }
    }
}

/// An ordered set of features, the JSON on-disk form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Loads a collection from a JSON file.
    ///
    /// Accepts a `{"features": [...]}` object, a bare array of features or a
    /// single feature object.
    pub fn from_json_file(path: &Path) -> Result<Self, FeatureError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FeatureError> {
        let document: Document = serde_json::from_reader(reader)?;
        Ok(document.into())
    }

    pub fn write_json_file(&self, path: &Path) -> Result<(), FeatureError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    Collection(FeatureCollection),
    Features(Vec<Feature>),
    Feature(Feature),
}

impl From<Document> for FeatureCollection {
    fn from(document: Document) -> Self {
        match document {
            Document::Collection(c) => c,
            Document::Features(features) => FeatureCollection::new(features),
            Document::Feature(feature) => FeatureCollection::new(vec![feature]),
        }
    }
}

/// Anything that can be turned into a list of features.
#[derive(Debug, Clone)]
pub enum FeatureSource {
    Path(PathBuf),
    Feature(Feature),
    Features(Vec<Feature>),
    Collection(FeatureCollection),
    Many(Vec<FeatureSource>),
}

impl FeatureSource {
    /// Flattens the source into features, reading any files it names.
    pub fn normalize(&self) -> Result<Vec<Feature>, FeatureError> {
        let mut out = Vec::new();
        self.collect_into(&mut out)?;
        Ok(out)
    }

    fn collect_into(&self, out: &mut Vec<Feature>) -> Result<(), FeatureError> {
        match self {
            FeatureSource::Path(path) => {
                out.extend(FeatureCollection::from_json_file(path)?.features);
            }
            FeatureSource::Feature(f) => out.push(f.clone()),
            FeatureSource::Features(fs) => out.extend_from_slice(fs),
            FeatureSource::Collection(c) => out.extend_from_slice(&c.features),
            FeatureSource::Many(sources) => {
                for source in sources {
                    source.collect_into(out)?;
                }
            }
        }
        Ok(())
    }
}

impl From<PathBuf> for FeatureSource {
    fn from(path: PathBuf) -> Self {
        FeatureSource::Path(path)
    }
}

impl From<&Path> for FeatureSource {
    fn from(path: &Path) -> Self {
        FeatureSource::Path(path.to_path_buf())
    }
}

impl From<Feature> for FeatureSource {
    fn from(feature: Feature) -> Self {
        FeatureSource::Feature(feature)
    }
}

impl From<Vec<Feature>> for FeatureSource {
    fn from(features: Vec<Feature>) -> Self {
        FeatureSource::Features(features)
    }
}

impl From<FeatureCollection> for FeatureSource {
    fn from(collection: FeatureCollection) -> Self {
        FeatureSource::Collection(collection)
    }
}

/// Builds one point feature per coordinate.
///
/// `plate_ids` may be empty (no plate assigned) or match the coordinates
/// in length.
pub fn points_to_features(
    lons: &[f64],
    lats: &[f64],
    plate_ids: &[u32],
) -> Result<Vec<Feature>, FeatureError> {
    if lons.len() != lats.len() || (!plate_ids.is_empty() && plate_ids.len() != lons.len()) {
        return Err(FeatureError::LengthMismatch {
            lons: lons.len(),
            lats: lats.len(),
            plate_ids: plate_ids.len(),
        });
    }
    if lons.is_empty() {
        return Err(FeatureError::Empty);
    }

    Ok(lons
        .iter()
        .zip(lats)
        .enumerate()
        .map(|(i, (&lon, &lat))| {
            let mut feature = Feature::new(
                SphericalGeometry::Point(LonLat::new(lon, lat)),
                FeatureType::MeshNode,
            );
            feature.plate_id = plate_ids.get(i).copied();
            feature
        })
        .collect())
}

/// Splits features back into longitude and latitude columns.
///
/// One entry per feature: a point's coordinate, or the first vertex of a
/// line or polygon. Empty geometries give NaN.
pub fn extract_feature_lonlat<G: HasGeometry>(features: &[G]) -> (Vec<f64>, Vec<f64>) {
    features
        .iter()
        .map(|f| {
            f.geometry()
                .points()
                .first()
                .map_or((f64::NAN, f64::NAN), |p| (p.lon, p.lat))
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ridge() -> Feature {
        Feature::new(
            SphericalGeometry::Polyline(vec![LonLat::new(0.0, 0.0), LonLat::new(0.0, 10.0)]),
            FeatureType::MidOceanRidge,
        )
        .with_plate_id(201)
    }

    #[test]
    fn test_feature_defaults_from_json() {
        let json = r#"{"geometry":{"type":"Point","coordinates":[1.0,2.0]}}"#;
        let f: Feature = serde_json::from_str(json).unwrap();
        assert_eq!(f.plate_id, None);
        assert_eq!(f.feature_type, FeatureType::Unclassified);
        assert_eq!(f.polarity, SubductionPolarity::Unknown);
    }

    #[test]
    fn test_collection_document_shapes() {
        let one = serde_json::to_string(&ridge()).unwrap();
        let list = format!("[{one},{one}]");
        let obj = format!(r#"{{"features":[{one}]}}"#);

        assert_eq!(FeatureCollection::from_reader(one.as_bytes()).unwrap().len(), 1);
        assert_eq!(FeatureCollection::from_reader(list.as_bytes()).unwrap().len(), 2);
        assert_eq!(FeatureCollection::from_reader(obj.as_bytes()).unwrap().len(), 1);
    }

    #[test]
    fn test_normalize_flattens_nested_sources() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ridges.json");
        FeatureCollection::new(vec![ridge(), ridge()])
            .write_json_file(&path)
            .unwrap();

        let source = FeatureSource::Many(vec![
            FeatureSource::Path(path),
            FeatureSource::Feature(ridge()),
            FeatureSource::Many(vec![FeatureSource::Features(vec![ridge()])]),
        ]);

        let features = source.normalize().unwrap();
        assert_eq!(features.len(), 4);
        assert!(features.iter().all(|f| f.plate_id == Some(201)));
    }

    #[test]
    fn test_normalize_missing_file() {
        let source = FeatureSource::Path(PathBuf::from("/nonexistent/features.json"));
        assert!(matches!(source.normalize(), Err(FeatureError::Io(_))));
    }

    #[test]
    fn test_points_to_features() {
        let features = points_to_features(&[0.0, 10.0], &[5.0, -5.0], &[101, 801]).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[1].plate_id, Some(801));
        assert_eq!(features[1].geometry, SphericalGeometry::Point(LonLat::new(10.0, -5.0)));

        let unassigned = points_to_features(&[0.0], &[0.0], &[]).unwrap();
        assert_eq!(unassigned[0].plate_id, None);
    }

    #[test]
    fn test_extract_feature_lonlat() {
        let mut features = points_to_features(&[0.0, 10.0], &[5.0, -5.0], &[]).unwrap();
        features.push(ridge());
        features.push(Feature::new(SphericalGeometry::Polyline(vec![]), FeatureType::Coastline));

        let (lons, lats) = extract_feature_lonlat(&features);
        assert_eq!(lons[..3], [0.0, 10.0, 0.0]);
        assert_eq!(lats[..3], [5.0, -5.0, 0.0]);
        assert!(lons[3].is_nan() && lats[3].is_nan());
    }

    #[test]
    fn test_points_to_features_errors() {
        assert!(matches!(
            points_to_features(&[0.0, 1.0], &[0.0], &[]),
            Err(FeatureError::LengthMismatch { .. })
        ));
        assert!(matches!(
            points_to_features(&[], &[], &[]),
            Err(FeatureError::Empty)
        ));
    }
}
