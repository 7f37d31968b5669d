//! Reconstruction and topology resolution driven by a rotation model.

use glam::DVec2;
use log::debug;

use super::{
    ReconstructedGeometry, ReconstructionEngine, ReconstructionError, ResolvedTopologies,
    RotationModel, TopologyResolver,
};
use crate::feature::{Feature, FeatureType, SubductionPolarity};
use crate::geometry::{
    great_circle_distance, local_tangent_basis, wrap_longitude, DateLineWrapper, LonLat, Ring,
    SphericalGeometry, EARTH_RADIUS_KM,
};

/// 1 km/Myr expressed in cm/yr.
const KM_PER_MYR_TO_CM_PER_YR: f64 = 0.1;

/// Rigid-plate reconstruction of present-day features.
#[derive(Debug, Clone, Default)]
pub struct RotationReconstructor {
    model: RotationModel,
}

impl RotationReconstructor {
    pub fn new(model: RotationModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &RotationModel {
        &self.model
    }

    fn check_time(time: f64) -> Result<(), ReconstructionError> {
        if time.is_finite() {
            Ok(())
        } else {
            Err(ReconstructionError::InvalidRotation(format!("time {} is not finite", time)))
        }
    }

    fn rotate(
        &self,
        geometry: &SphericalGeometry,
        plate_id: Option<u32>,
        time: f64,
        anchor_plate_id: u32,
        wrap_to_dateline: bool,
    ) -> Result<SphericalGeometry, ReconstructionError> {
        let q = self.model.rotation(plate_id.unwrap_or(0), time, anchor_plate_id)?;

        let mut previous: Option<f64> = None;
        Ok(geometry.map_points(|p| {
            let moved = LonLat::from_xyz(q * p.to_xyz());
            let lon = if wrap_to_dateline {
                wrap_longitude(moved.lon)
            } else {
                // Keep consecutive longitudes within 180 degrees of each other.
                let lon = match previous {
                    Some(prev) => prev + wrap_longitude(moved.lon - prev),
                    None => moved.lon,
                };
                previous = Some(lon);
                lon
            };
            LonLat::new(lon, moved.lat)
        }))
    }

    fn reconstruct_feature(
        &self,
        feature: &Feature,
        time: f64,
        anchor_plate_id: u32,
    ) -> Result<Feature, ReconstructionError> {
        let geometry = self.rotate(&feature.geometry, feature.plate_id, time, anchor_plate_id, true)?;
        Ok(feature.with_geometry(geometry))
    }
}

impl ReconstructionEngine for RotationReconstructor {
    fn reconstruct(
        &self,
        features: &[Feature],
        time: f64,
        anchor_plate_id: u32,
        wrap_to_dateline: bool,
    ) -> Result<Vec<ReconstructedGeometry>, ReconstructionError> {
        Self::check_time(time)?;
        features
            .iter()
            .map(|f| {
                let geometry =
                    self.rotate(&f.geometry, f.plate_id, time, anchor_plate_id, wrap_to_dateline)?;
                Ok(ReconstructedGeometry::from_feature(f, geometry))
            })
            .collect()
    }
}

impl TopologyResolver for RotationReconstructor {
    fn resolve_topologies(
        &self,
        topology_features: &[Feature],
        time: f64,
        anchor_plate_id: u32,
    ) -> Result<ResolvedTopologies, ReconstructionError> {
        Self::check_time(time)?;
        let mut resolved = ResolvedTopologies::default();

        for feature in topology_features {
            let f = self.reconstruct_feature(feature, time, anchor_plate_id)?;
            match f.feature_type {
                FeatureType::MidOceanRidge => {
                    resolved.ridges.push(f.clone());
                    resolved.ridge_transforms.push(f);
                }
                FeatureType::Transform => {
                    resolved.transforms.push(f.clone());
                    resolved.ridge_transforms.push(f);
                }
                FeatureType::SubductionZone => {
                    match f.polarity {
                        SubductionPolarity::Left => resolved.trench_left.push(f.clone()),
                        SubductionPolarity::Right => resolved.trench_right.push(f.clone()),
                        SubductionPolarity::Unknown => {}
                    }
                    resolved.trenches.push(f);
                }
                t if t.is_topological() => resolved.topologies.push(f),
                _ => resolved.other.push(f),
            }
        }

        debug!(
            "resolved {} topologies, {} ridges, {} transforms, {} trenches at {} Ma",
            resolved.topologies.len(),
            resolved.ridges.len(),
            resolved.transforms.len(),
            resolved.trenches.len(),
            time
        );
        Ok(resolved)
    }

    fn plate_velocities(
        &self,
        points: &[LonLat],
        topologies: &[Feature],
        time: f64,
        delta_time: f64,
        anchor_plate_id: u32,
    ) -> Result<Vec<DVec2>, ReconstructionError> {
        Self::check_time(time)?;
        if !delta_time.is_finite() || delta_time <= 0.0 {
            return Err(ReconstructionError::InvalidRotation(format!(
                "velocity time step {} must be positive",
                delta_time
            )));
        }

        let plates = plate_rings(topologies);

        points
            .iter()
            .map(|&p| {
                let planar = LonLat::new(wrap_longitude(p.lon), p.lat).as_dvec2();
                let plate_id = plates
                    .iter()
                    .find(|(_, rings)| rings.iter().any(|r| r.contains(planar)))
                    .map(|(id, _)| *id);

                let Some(plate_id) = plate_id else {
                    return Ok(DVec2::ZERO);
                };

                // Where the point was delta_time earlier, then displacement over that span.
                let stage = self
                    .model
                    .stage_rotation(plate_id, time, time + delta_time, anchor_plate_id)?;
                let x = p.to_xyz();
                let older = stage * x;
                let d = x - older;
                let direction = (d - x * d.dot(x)).normalize_or_zero();
                let speed = great_circle_distance(x, older) * EARTH_RADIUS_KM / delta_time
                    * KM_PER_MYR_TO_CM_PER_YR;
                let velocity = direction * speed;

                let (east, north) = local_tangent_basis(x);
                Ok(DVec2::new(velocity.dot(east), velocity.dot(north)))
            })
            .collect()
    }
}

/// Plate polygons split at the dateline, paired with their plate id.
fn plate_rings(topologies: &[Feature]) -> Vec<(u32, Vec<Ring>)> {
    let wrapper = DateLineWrapper::new();
    topologies
        .iter()
        .filter_map(|f| {
            let plate_id = f.plate_id?;
            let SphericalGeometry::Polygon(points) = &f.geometry else {
                return None;
            };
            let rings = wrapper
                .wrap_polygon(points)
                .into_iter()
                .map(|piece| Ring::new(piece.into_iter().map(LonLat::as_dvec2).collect()))
                .collect();
            Some((plate_id, rings))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruct::FiniteRotation;

    /// Plate 101 drifts one degree of longitude per Myr about the north pole.
    fn reconstructor() -> RotationReconstructor {
        let record = |time: f64, angle: f64| FiniteRotation {
            plate_id: 101,
            time,
            fixed_plate: 0,
            pole_lat: 90.0,
            pole_lon: 0.0,
            angle_deg: angle,
        };
        RotationReconstructor::new(
            RotationModel::new(vec![record(0.0, 0.0), record(200.0, 200.0)]).unwrap(),
        )
    }

    fn section(feature_type: FeatureType) -> Feature {
        Feature::new(
            SphericalGeometry::Polyline(vec![LonLat::new(0.0, 0.0), LonLat::new(0.0, 10.0)]),
            feature_type,
        )
        .with_plate_id(101)
    }

    fn plate_polygon() -> Feature {
        Feature::new(
            SphericalGeometry::Polygon(vec![
                LonLat::new(-30.0, -30.0),
                LonLat::new(30.0, -30.0),
                LonLat::new(30.0, 30.0),
                LonLat::new(-30.0, 30.0),
            ]),
            FeatureType::TopologicalClosedPlateBoundary,
        )
        .with_plate_id(101)
    }

    #[test]
    fn test_reconstruct_moves_by_plate() {
        let r = reconstructor();
        let out = r.reconstruct(&[section(FeatureType::Coastline)], 10.0, 0, true).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].plate_id, Some(101));
        let p = out[0].geometry.points()[0];
        assert!((p.lon - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_unassigned_feature_stays_put() {
        let r = reconstructor();
        let mut f = section(FeatureType::Coastline);
        f.plate_id = None;
        let out = r.reconstruct(&[f], 50.0, 0, true).unwrap();
        assert!(out[0].geometry.points()[0].lon.abs() < 1e-9);
    }

    #[test]
    fn test_wrap_to_dateline_flag() {
        let r = reconstructor();
        let f = Feature::new(
            SphericalGeometry::Polyline(vec![LonLat::new(170.0, 0.0), LonLat::new(175.0, 0.0)]),
            FeatureType::Coastline,
        )
        .with_plate_id(101);

        let wrapped = r.reconstruct(std::slice::from_ref(&f), 10.0, 0, true).unwrap();
        let lon = wrapped[0].geometry.points()[1].lon;
        assert!((lon + 175.0).abs() < 1e-9);

        let continuous = r.reconstruct(&[f], 10.0, 0, false).unwrap();
        let pts = continuous[0].geometry.points();
        assert!((pts[1].lon - pts[0].lon - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_resolve_buckets() {
        let r = reconstructor();
        let features = vec![
            plate_polygon(),
            section(FeatureType::MidOceanRidge),
            section(FeatureType::Transform),
            section(FeatureType::SubductionZone).with_polarity(SubductionPolarity::Left),
            section(FeatureType::SubductionZone).with_polarity(SubductionPolarity::Right),
            section(FeatureType::SubductionZone),
            section(FeatureType::Coastline),
        ];
        let resolved = r.resolve_topologies(&features, 0.0, 0).unwrap();

        assert_eq!(resolved.topologies.len(), 1);
        assert_eq!(resolved.ridges.len(), 1);
        assert_eq!(resolved.transforms.len(), 1);
        assert_eq!(resolved.ridge_transforms.len(), 2);
        assert_eq!(resolved.trenches.len(), 3);
        assert_eq!(resolved.trench_left.len(), 1);
        assert_eq!(resolved.trench_right.len(), 1);
        assert_eq!(resolved.other.len(), 1);
    }

    #[test]
    fn test_non_finite_time_rejected() {
        let r = reconstructor();
        assert!(r.resolve_topologies(&[], f64::NAN, 0).is_err());
    }

    #[test]
    fn test_plate_velocity_at_equator() {
        let r = reconstructor();
        let points = [LonLat::new(0.0, 0.0), LonLat::new(120.0, 0.0)];
        let v = r.plate_velocities(&points, &[plate_polygon()], 0.0, 5.0, 0).unwrap();

        // One degree per Myr westward as time runs forward.
        let expected = -EARTH_RADIUS_KM * 1f64.to_radians() * KM_PER_MYR_TO_CM_PER_YR;
        assert!((v[0].x - expected).abs() < 1e-3, "east component {}", v[0].x);
        assert!(v[0].y.abs() < 1e-9);

        // Outside every plate.
        assert_eq!(v[1], DVec2::ZERO);
    }

    #[test]
    fn test_plate_velocity_rejects_bad_step() {
        let r = reconstructor();
        assert!(r.plate_velocities(&[], &[], 0.0, 0.0, 0).is_err());
    }
}
