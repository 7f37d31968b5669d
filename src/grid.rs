//! Regular lon/lat raster grids.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while reading or building a grid.
#[derive(Error, Debug)]
pub enum GridError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Grid shape mismatch: {0}")]
    Shape(String),
}

/// Geographic bounds `[min lon, max lon, min lat, max lat]` in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Extent {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl Default for Extent {
    fn default() -> Self {
        Self::GLOBAL
    }
}

impl Extent {
    pub const GLOBAL: Extent = Extent {
        min_lon: -180.0,
        max_lon: 180.0,
        min_lat: -90.0,
        max_lat: 90.0,
    };

    pub fn new(min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) -> Self {
        Self { min_lon, max_lon, min_lat, max_lat }
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn is_valid(&self) -> bool {
        [self.min_lon, self.max_lon, self.min_lat, self.max_lat]
            .iter()
            .all(|v| v.is_finite())
            && self.width() > 0.0
            && self.height() > 0.0
    }
}

impl From<[f64; 4]> for Extent {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Extent> for [f64; 4] {
    fn from(e: Extent) -> Self {
        [e.min_lon, e.max_lon, e.min_lat, e.max_lat]
    }
}

/// A row-major 2D grid. Row 0 is the southernmost row.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    values: Vec<f64>,
    rows: usize,
    cols: usize,
    lons: Vec<f64>,
    lats: Vec<f64>,
}

impl Grid {
    /// Creates a grid without coordinate axes.
    pub fn new(values: Vec<f64>, rows: usize, cols: usize) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 || values.len() != rows * cols {
            return Err(GridError::Shape(format!(
                "{} values do not fill {} x {}",
                values.len(),
                rows,
                cols
            )));
        }
        Ok(Self { values, rows, cols, lons: Vec::new(), lats: Vec::new() })
    }

    /// Creates a grid whose columns follow `lons` and rows follow `lats`.
    pub fn with_axes(values: Vec<f64>, lons: Vec<f64>, lats: Vec<f64>) -> Result<Self, GridError> {
        let mut grid = Self::new(values, lats.len(), lons.len())?;
        grid.lons = lons;
        grid.lats = lats;
        Ok(grid)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.values[row * self.cols + col])
        } else {
            None
        }
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    /// Minimum and maximum of the finite values, if any.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Extent spanned by the coordinate axes, from their minima and maxima.
    pub fn axes_extent(&self) -> Option<Extent> {
        let range = |axis: &[f64]| {
            axis.iter().copied().filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
            })
        };
        let (min_lon, max_lon) = range(&self.lons)?;
        let (min_lat, max_lat) = range(&self.lats)?;
        Some(Extent::new(min_lon, max_lon, min_lat, max_lat))
    }
}

/// Reads a grid and its coordinate axes from a file.
pub trait GridReader {
    fn read_grid(&self, path: &Path) -> Result<Grid, GridError>;
}

#[derive(Deserialize, Serialize)]
struct GridFile {
    lons: Vec<f64>,
    lats: Vec<f64>,
    /// One inner list per latitude row.
    values: Vec<Vec<Option<f64>>>,
}

/// Reads `{"lons": [...], "lats": [...], "values": [[...], ...]}` documents.
///
/// `null` cells become NaN.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonGridReader;

impl JsonGridReader {
    pub fn from_reader<R: Read>(&self, reader: R) -> Result<Grid, GridError> {
        let file: GridFile = serde_json::from_reader(reader)?;
        if file.values.len() != file.lats.len() {
            return Err(GridError::Shape(format!(
                "{} rows for {} latitudes",
                file.values.len(),
                file.lats.len()
            )));
        }
        if let Some((i, row)) = file.values.iter().enumerate().find(|(_, r)| r.len() != file.lons.len()) {
            return Err(GridError::Shape(format!(
                "row {} has {} values for {} longitudes",
                i,
                row.len(),
                file.lons.len()
            )));
        }

        let values = file
            .values
            .into_iter()
            .flatten()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        Grid::with_axes(values, file.lons, file.lats)
    }
}

impl GridReader for JsonGridReader {
    fn read_grid(&self, path: &Path) -> Result<Grid, GridError> {
        let file = File::open(path)?;
        self.from_reader(BufReader::new(file))
    }
}
