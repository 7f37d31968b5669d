//! Rendering reconstructed topologies onto Plate Carree maps.
//!
//! [`PlotTopologies`] turns cached features into draw calls on any
//! [`RenderSurface`]; [`PngCanvas`] is the bundled surface.

mod canvas;
mod layers;
mod palette;
mod surface;
mod topologies;

use thiserror::Error;

use crate::feature::FeatureError;
use crate::grid::GridError;
use crate::reconstruct::ReconstructionError;

pub use canvas::PngCanvas;
pub use layers::{
    export_reconstructed_layers, load_reconstructed_layer, reconstructed_layer_path, LayerCategory,
};
pub use palette::plate_colors;
pub use surface::{RasterStyle, RenderError, RenderSurface, Rgba, Style};
pub use topologies::{PlotReport, PlotTopologies, VELOCITY_DELTA_TIME};

/// Errors surfaced by the plotting layer.
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Invalid reconstruction time {0}: enter a time >= 0")]
    InvalidTime(f64),
    #[error("Reconstruction failed: {0}")]
    Reconstruction(#[from] ReconstructionError),
    #[error("No {0} source configured")]
    MissingSource(&'static str),
    #[error("Topologies have not been resolved; set a reconstruction time first")]
    Unresolved,
    #[error("Invalid mesh spacing {0}")]
    InvalidSpacing(f64),
    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}
