//! Cooling-plate thermal model for oceanic lithosphere.

use log::warn;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seconds in one million years.
pub const SECONDS_PER_MYR: f64 = 3.15576e13;

/// Number of terms kept in the series solution.
const SERIES_TERMS: u32 = 19;

#[derive(Error, Debug, PartialEq)]
pub enum ThermalError {
    #[error("Iteration count must be greater than zero")]
    ZeroIterations,
}

/// Parameters of the plate cooling model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateModel {
    /// Plate thickness in metres.
    pub plate_thickness: f64,
    /// Thermal diffusivity in m^2/s.
    pub kappa: f64,
    /// Mantle temperature in degrees C.
    pub t_mantle: f64,
    /// Surface temperature in degrees C.
    pub t_surface: f64,
}

impl Default for PlateModel {
    fn default() -> Self {
        Self {
            plate_thickness: 125.0e3,
            kappa: 8.04e-7,
            t_mantle: 1350.0,
            t_surface: 0.0,
        }
    }
}

impl PlateModel {
    /// Parsons & Sclater style plate with a custom thickness.
    pub fn with_thickness(plate_thickness: f64) -> Self {
        Self {
            plate_thickness,
            ..Default::default()
        }
    }
}

/// Temperature at depth `z` (m) in a plate of the given age (Ma).
pub fn plate_temp(age: f64, z: f64, model: &PlateModel) -> f64 {
    let seconds = age * SECONDS_PER_MYR;
    let l = model.plate_thickness;
    let dt = model.t_mantle - model.t_surface;

    let sine_arg = std::f64::consts::PI * z / l;
    let exp_arg = -model.kappa * std::f64::consts::PI.powi(2) * seconds / (l * l);

    let sum: f64 = (1..=SERIES_TERMS)
        .map(|k| {
            let k = k as f64;
            (k * sine_arg).sin() * (k * k * exp_arg).exp() / k
        })
        .sum();

    model.t_surface + 2.0 * sum * dt / std::f64::consts::PI + dt * z / l
}

/// Bisects for the depth of `temp`, returning the depth and the final
/// temperature residual.
fn bisect_isotherm(age: f64, temp: f64, model: &PlateModel, n: usize, rtol: f64) -> (f64, f64) {
    if age <= 0.0 {
        return (0.0, 0.0);
    }

    let mut too_small = 0.0;
    let mut too_big = model.plate_thickness;
    let mut z = 0.0;
    let mut residual = f64::INFINITY;

    for _ in 0..n {
        z = 0.5 * (too_small + too_big);
        residual = temp - plate_temp(age, z, model);
        if residual < -rtol {
            too_big = z;
        } else if residual > rtol {
            too_small = z;
        } else {
            break;
        }
    }
    (z, residual)
}

/// Depth (m) of the `temp` isotherm in a plate of the given age (Ma).
///
/// Uses `n` bisection steps, stopping early once the temperature is within
/// `rtol`. Ages of zero or less give zero depth.
pub fn plate_isotherm_depth(
    age: f64,
    temp: f64,
    model: &PlateModel,
    n: usize,
    rtol: f64,
) -> Result<f64, ThermalError> {
    if n == 0 {
        return Err(ThermalError::ZeroIterations);
    }
    let (z, residual) = bisect_isotherm(age, temp, model, n, rtol);
    if residual.abs() > rtol {
        warn!("isotherm iteration did not converge below rtol={} (residual {})", rtol, residual);
    }
    Ok(z)
}

/// [`plate_isotherm_depth`] over many ages, in parallel.
pub fn plate_isotherm_depths(
    ages: &[f64],
    temp: f64,
    model: &PlateModel,
    n: usize,
    rtol: f64,
) -> Result<Vec<f64>, ThermalError> {
    if n == 0 {
        return Err(ThermalError::ZeroIterations);
    }
    let results: Vec<(f64, f64)> = ages
        .par_iter()
        .map(|&age| bisect_isotherm(age, temp, model, n, rtol))
        .collect();

    let unconverged = results.iter().filter(|(_, r)| r.abs() > rtol).count();
    if unconverged > 0 {
        warn!(
            "isotherm iteration did not converge below rtol={} for {} of {} ages",
            rtol,
            unconverged,
            ages.len()
        );
    }
    Ok(results.into_iter().map(|(z, _)| z).collect())
}
