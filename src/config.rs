//! Configuration for map rendering.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::Extent;
use crate::plot::{Rgba, Style};
use crate::teeth::TeethParams;

/// Errors that can occur while loading or saving a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Output image size and map window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    pub background: Rgba,
    /// Lon/lat window mapped onto the image.
    pub extent: Extent,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1440,
            height: 720,
            background: [255, 255, 255, 255],
            extent: Extent::GLOBAL,
        }
    }
}

/// Styles for each map layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerStyles {
    pub plate_polygons: Style,
    pub continents: Style,
    pub coastlines: Style,
    pub cobs: Style,
    pub ridges: Style,
    pub transforms: Style,
    pub trenches: Style,
    pub teeth: Style,
    pub vectors: Style,
}

impl Default for LayerStyles {
    fn default() -> Self {
        Self {
            plate_polygons: Style { edge_color: Some([90, 90, 90, 255]), ..Default::default() }.with_alpha(0.5),
            continents: Style::filled([205, 205, 205, 255]),
            coastlines: Style { edge_color: None, face_color: Some([140, 140, 140, 255]), ..Default::default() },
            cobs: Style::line([60, 60, 160, 255], 1.0),
            ridges: Style::line([200, 30, 30, 255], 1.5),
            transforms: Style::line([200, 30, 30, 255], 1.0),
            trenches: Style::line([0, 0, 0, 255], 1.5),
            teeth: Style { edge_color: None, face_color: Some([0, 0, 0, 255]), ..Default::default() },
            vectors: Style { vector_scale: 2.0, ..Style::line([20, 20, 120, 255], 1.0) },
        }
    }
}

/// Everything needed to render a reconstruction map.
///
/// Missing layer files simply leave their layer out of the render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// Rotation model JSON (`{"rotations": [...]}`).
    pub rotation_model: Option<PathBuf>,
    /// Plate polygons and boundary sections.
    pub topology_features: Option<PathBuf>,
    pub coastline_filename: Option<PathBuf>,
    pub continent_filename: Option<PathBuf>,
    /// Continent-ocean boundaries.
    pub cob_filename: Option<PathBuf>,
    /// Background raster in the JSON grid format.
    pub grid_filename: Option<PathBuf>,

    /// Plate held fixed during reconstruction.
    pub anchor_plate_id: u32,
    /// Reconstruction time in Ma.
    pub time: f64,

    pub teeth: TeethParams,
    /// Motion vector mesh spacing in degrees; `None` skips the vectors.
    pub velocity_spacing: Option<f64>,
    /// Draw all motion vectors with unit length.
    pub normalise_vectors: bool,

    pub canvas: CanvasConfig,
    pub styles: LayerStyles,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            rotation_model: None,
            topology_features: None,
            coastline_filename: None,
            continent_filename: None,
            cob_filename: None,
            grid_filename: None,
            anchor_plate_id: 0,
            time: 0.0,
            teeth: TeethParams::default(),
            velocity_spacing: None,
            normalise_vectors: false,
            canvas: CanvasConfig::default(),
            styles: LayerStyles::default(),
        }
    }
}

impl PlotConfig {
    /// Whole-globe map at `time` with motion vectors every ten degrees.
    pub fn global(time: f64) -> Self {
        Self {
            time,
            velocity_spacing: Some(10.0),
            ..Default::default()
        }
    }

    /// Zoomed map of `extent` with denser, smaller teeth.
    pub fn regional(time: f64, extent: Extent) -> Self {
        Self {
            time,
            teeth: TeethParams::regional(),
            canvas: CanvasConfig {
                extent,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn write_json_file(&self, path: &Path) -> Result<(), ConfigError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_document_is_default() {
        let config = PlotConfig::from_reader("{}".as_bytes()).unwrap();
        assert_eq!(config, PlotConfig::default());
        assert_eq!(config.canvas.extent, Extent::GLOBAL);
    }

    #[test]
    fn test_partial_document() {
        let json = r#"{
            "time": 140.0,
            "coastline_filename": "coast.json",
            "teeth": {"spacing": 0.05},
            "canvas": {"width": 800, "extent": [-30, 60, -40, 40]}
        }"#;
        let config = PlotConfig::from_reader(json.as_bytes()).unwrap();
        assert_eq!(config.time, 140.0);
        assert_eq!(config.coastline_filename, Some(PathBuf::from("coast.json")));
        assert_eq!(config.teeth.spacing, 0.05);
        assert_eq!(config.teeth.size, 2.0);
        assert_eq!(config.canvas.width, 800);
        assert_eq!(config.canvas.height, 720);
        assert_eq!(config.canvas.extent, Extent::new(-30.0, 60.0, -40.0, 40.0));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plot.json");

        let config = PlotConfig::regional(50.0, Extent::new(100.0, 160.0, -20.0, 20.0));
        config.write_json_file(&path).unwrap();
        assert_eq!(PlotConfig::from_json_file(&path).unwrap(), config);
    }

    #[test]
    fn test_presets() {
        assert_eq!(PlotConfig::global(10.0).velocity_spacing, Some(10.0));
        let regional = PlotConfig::regional(0.0, Extent::new(0.0, 10.0, 0.0, 10.0));
        assert!(regional.teeth.spacing < TeethParams::default().spacing);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            PlotConfig::from_json_file(Path::new("/nonexistent/plot.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
