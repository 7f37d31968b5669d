//! Plate reconstruction.
//!
//! The plotting layer talks to reconstruction through two traits:
//! [`ReconstructionEngine`] moves features to a geological time and
//! [`TopologyResolver`] assembles plate boundaries at that time. The
//! [`RotationReconstructor`] implements both from a [`RotationModel`].

pub mod rotation;
mod engine;

use glam::DVec2;
use thiserror::Error;

use crate::feature::{Feature, FeatureType};
use crate::geometry::{LonLat, SphericalGeometry};

pub use engine::RotationReconstructor;
pub use rotation::{FiniteRotation, RotationModel};

/// Errors raised by reconstruction and topology resolution.
#[derive(Error, Debug)]
pub enum ReconstructionError {
    #[error("Plate {0} has no rotation to anchor plate {1}")]
    UnknownPlate(u32, u32),
    #[error("Invalid rotation: {0}")]
    InvalidRotation(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Topology resolution failed: {0}")]
    Resolver(String),
}

/// A feature geometry moved to a reconstruction time.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedGeometry {
    pub geometry: SphericalGeometry,
    pub plate_id: Option<u32>,
    pub feature_type: FeatureType,
    pub name: Option<String>,
}

impl ReconstructedGeometry {
    /// Pairs a reconstructed geometry with the metadata of its source feature.
    pub fn from_feature(feature: &Feature, geometry: SphericalGeometry) -> Self {
        Self {
            geometry,
            plate_id: feature.plate_id,
            feature_type: feature.feature_type,
            name: feature.name.clone(),
        }
    }
}

/// Boundary sections and plates resolved at one time, in resolver order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedTopologies {
    /// Plate polygons and deforming networks.
    pub topologies: Vec<Feature>,
    pub ridge_transforms: Vec<Feature>,
    pub ridges: Vec<Feature>,
    pub transforms: Vec<Feature>,
    pub trenches: Vec<Feature>,
    pub trench_left: Vec<Feature>,
    pub trench_right: Vec<Feature>,
    /// Boundary sections that are neither ridges, transforms nor trenches.
    pub other: Vec<Feature>,
}

/// Moves features to a reconstruction time.
pub trait ReconstructionEngine {
    /// Reconstructs present-day `features` to `time` (Ma) relative to
    /// `anchor_plate_id`.
    ///
    /// With `wrap_to_dateline` every longitude lands in [-180, 180).
    fn reconstruct(
        &self,
        features: &[Feature],
        time: f64,
        anchor_plate_id: u32,
        wrap_to_dateline: bool,
    ) -> Result<Vec<ReconstructedGeometry>, ReconstructionError>;
}

/// Resolves plate topologies and the velocities they imply.
pub trait TopologyResolver {
    fn resolve_topologies(
        &self,
        topology_features: &[Feature],
        time: f64,
        anchor_plate_id: u32,
    ) -> Result<ResolvedTopologies, ReconstructionError>;

    /// Plate velocities at `points` as (east, north) in cm/yr.
    ///
    /// `topologies` are the resolved plate polygons used to assign each point
    /// to a plate; points outside every plate get a zero vector.
    fn plate_velocities(
        &self,
        points: &[LonLat],
        topologies: &[Feature],
        time: f64,
        delta_time: f64,
        anchor_plate_id: u32,
    ) -> Result<Vec<DVec2>, ReconstructionError>;
}
