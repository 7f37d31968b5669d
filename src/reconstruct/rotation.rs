//! Finite rotations and plate circuits.
//!
//! Each moving plate has a time-ordered sequence of total reconstruction
//! poles relative to a fixed plate. Rotations between records are
//! interpolated with quaternion slerp and chained through fixed plates
//! until a root plate (one with no sequence of its own) is reached.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use glam::DQuat;
use log::debug;
use serde::{Deserialize, Serialize};

use super::ReconstructionError;
use crate::geometry::LonLat;

/// One total reconstruction pole: the rotation that carries `plate_id`
/// from its present-day position to its position at `time` (Ma), relative
/// to `fixed_plate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiniteRotation {
    pub plate_id: u32,
    pub time: f64,
    pub fixed_plate: u32,
    pub pole_lat: f64,
    pub pole_lon: f64,
    pub angle_deg: f64,
}

impl FiniteRotation {
    pub fn to_quat(&self) -> DQuat {
        if self.angle_deg == 0.0 {
            return DQuat::IDENTITY;
        }
        let axis = LonLat::new(self.pole_lon, self.pole_lat).to_xyz();
        DQuat::from_axis_angle(axis, self.angle_deg.to_radians())
    }

    fn validate(&self) -> Result<(), ReconstructionError> {
        let finite = self.time.is_finite()
            && self.pole_lat.is_finite()
            && self.pole_lon.is_finite()
            && self.angle_deg.is_finite();
        if !finite {
            return Err(ReconstructionError::InvalidRotation(format!(
                "plate {} at {} Ma has non-finite values",
                self.plate_id, self.time
            )));
        }
        if !(-90.0..=90.0).contains(&self.pole_lat) {
            return Err(ReconstructionError::InvalidRotation(format!(
                "plate {} at {} Ma has pole latitude {}",
                self.plate_id, self.time, self.pole_lat
            )));
        }
        if self.plate_id == self.fixed_plate {
            return Err(ReconstructionError::InvalidRotation(format!(
                "plate {} is fixed to itself",
                self.plate_id
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize, Serialize)]
struct RotationFile {
    rotations: Vec<FiniteRotation>,
}

/// All rotation sequences, keyed by moving plate.
#[derive(Debug, Clone, Default)]
pub struct RotationModel {
    sequences: BTreeMap<u32, Vec<FiniteRotation>>,
}

impl RotationModel {
    /// Builds a model, sorting each plate's records by time.
    pub fn new(rotations: Vec<FiniteRotation>) -> Result<Self, ReconstructionError> {
        let mut sequences: BTreeMap<u32, Vec<FiniteRotation>> = BTreeMap::new();
        for r in rotations {
            r.validate()?;
            sequences.entry(r.plate_id).or_default().push(r);
        }
        for records in sequences.values_mut() {
            records.sort_by(|a, b| a.time.total_cmp(&b.time));
        }
        Ok(Self { sequences })
    }

    /// Loads a `{"rotations": [...]}` JSON document.
    pub fn from_json_file(path: &Path) -> Result<Self, ReconstructionError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReconstructionError> {
        let file: RotationFile = serde_json::from_reader(reader)?;
        Self::new(file.rotations)
    }

    /// Moving plates with at least one record.
    pub fn plate_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.sequences.keys().copied()
    }

    /// True if the plate moves in this model or is referenced as a fixed plate.
    pub fn knows_plate(&self, plate_id: u32) -> bool {
        self.sequences.contains_key(&plate_id)
            || self
                .sequences
                .values()
                .flatten()
                .any(|r| r.fixed_plate == plate_id)
    }

    /// Rotation of `plate_id` relative to its fixed plate at `time`.
    ///
    /// Returns `None` for plates without records. Times outside the record
    /// span are clamped to the first or last record.
    fn relative_rotation(&self, plate_id: u32, time: f64) -> Option<(DQuat, u32)> {
        let records = self.sequences.get(&plate_id)?;
        let first = records.first()?;
        let last = records.last()?;

        if time <= first.time {
            return Some((first.to_quat(), first.fixed_plate));
        }

        for w in records.windows(2) {
            let (a, b) = (&w[0], &w[1]);
            if a.fixed_plate != b.fixed_plate || time < a.time || time > b.time {
                continue;
            }
            let span = b.time - a.time;
            let f = if span > 0.0 { (time - a.time) / span } else { 0.0 };
            return Some((a.to_quat().slerp(b.to_quat(), f), a.fixed_plate));
        }

        // Past the last record, or a gap at a fixed-plate crossover.
        let nearest = records.iter().rev().find(|r| r.time <= time).unwrap_or(last);
        Some((nearest.to_quat(), nearest.fixed_plate))
    }

    /// Rotation of `plate_id` relative to the root of its plate circuit.
    fn rotation_to_root(&self, plate_id: u32, time: f64) -> Result<DQuat, ReconstructionError> {
        let mut total = DQuat::IDENTITY;
        let mut plate = plate_id;
        let mut visited = HashSet::new();

        while let Some((q, fixed)) = self.relative_rotation(plate, time) {
            if !visited.insert(plate) {
                return Err(ReconstructionError::InvalidRotation(format!(
                    "plate circuit of {} loops through plate {}",
                    plate_id, plate
                )));
            }
            total = q * total;
            plate = fixed;
        }
        Ok(total)
    }

    /// Total rotation of `plate_id` at `time` relative to `anchor_plate_id`.
    ///
    /// Plates with no records do not move relative to the root; the anchor
    /// must be known to the model (plate 0 always is).
    pub fn rotation(
        &self,
        plate_id: u32,
        time: f64,
        anchor_plate_id: u32,
    ) -> Result<DQuat, ReconstructionError> {
        if anchor_plate_id != 0 && !self.knows_plate(anchor_plate_id) {
            return Err(ReconstructionError::UnknownPlate(plate_id, anchor_plate_id));
        }
        if anchor_plate_id == plate_id {
            return Ok(DQuat::IDENTITY);
        }
        if !self.sequences.contains_key(&plate_id) {
            debug!("plate {} has no rotation sequence, using identity", plate_id);
        }

        let moving = self.rotation_to_root(plate_id, time)?;
        let anchor = self.rotation_to_root(anchor_plate_id, time)?;
        Ok((anchor.inverse() * moving).normalize())
    }

    /// Stage rotation carrying positions at `from_time` to `to_time`.
    pub fn stage_rotation(
        &self,
        plate_id: u32,
        from_time: f64,
        to_time: f64,
        anchor_plate_id: u32,
    ) -> Result<DQuat, ReconstructionError> {
        let from = self.rotation(plate_id, from_time, anchor_plate_id)?;
        let to = self.rotation(plate_id, to_time, anchor_plate_id)?;
        Ok((to * from.inverse()).normalize())
    }
}
