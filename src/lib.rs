//! Plate-tectonic reconstruction maps.
//!
//! Features (coastlines, plate boundaries, subduction zones) are moved to a
//! geological time by a [`ReconstructionEngine`], cached per time in a
//! [`TopologyCache`], cut at the antimeridian and drawn onto a Plate Carree
//! [`RenderSurface`] such as [`PngCanvas`].

pub mod geometry;
pub mod feature;
pub mod wrap;
pub mod teeth;
pub mod reconstruct;
pub mod topology;
pub mod grid;
pub mod plot;
pub mod thermal;
pub mod config;

pub use geometry::{LonLat, SphericalGeometry, DateLineWrapper, MultiGeometry};
pub use feature::{
    extract_feature_lonlat, points_to_features, Feature, FeatureCollection, FeatureSource, FeatureType,
    SubductionPolarity,
};
pub use wrap::{wrap_polygons, wrap_lines, wrap_and_validate, WrapOutput};
pub use teeth::{tessellate_teeth, TeethArrays, TeethParams};
pub use reconstruct::{ReconstructionEngine, TopologyResolver, RotationModel, RotationReconstructor};
pub use topology::{BoundaryClass, LayerSources, TopologyCache};
pub use grid::{Extent, Grid, GridReader, JsonGridReader};
pub use plot::{PlotError, PlotTopologies, PngCanvas, RenderSurface, Style};
pub use thermal::{plate_isotherm_depth, plate_temp, PlateModel};
pub use config::{CanvasConfig, PlotConfig};
