//! Deterministic colours for plates.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::surface::Rgba;

const GOLDEN_RATIO_CONJUGATE: f32 = 0.618_034;

/// Assigns visually distinct colours to plate ids.
///
/// Ids are sorted first so a given set of plates always gets the same
/// colours for the same seed, whatever order they arrive in.
pub fn plate_colors<I: IntoIterator<Item = u32>>(plate_ids: I, seed: u64) -> BTreeMap<u32, Rgba> {
    let mut ids: Vec<u32> = plate_ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut hue = rng.random::<f32>();

    ids.into_iter()
        .map(|id| {
            // Golden ratio steps spread hues evenly around the wheel.
            hue = (hue + GOLDEN_RATIO_CONJUGATE) % 1.0;
            let saturation = 0.5 + rng.random::<f32>() * 0.4;
            let value = 0.6 + rng.random::<f32>() * 0.3;
            (id, hsv_to_rgba(hue, saturation, value, 255))
        })
        .collect()
}

/// Opaque or translucent colour from hue (in turns), saturation and value.
fn hsv_to_rgba(hue: f32, saturation: f32, value: f32, alpha: u8) -> Rgba {
    let chroma = value * saturation;
    let sector = hue.rem_euclid(1.0) * 6.0;
    let second = chroma * (1.0 - (sector % 2.0 - 1.0).abs());

    let (r, g, b) = match sector as u32 {
        0 => (chroma, second, 0.0),
        1 => (second, chroma, 0.0),
        2 => (0.0, chroma, second),
        3 => (0.0, second, chroma),
        4 => (second, 0.0, chroma),
        _ => (chroma, 0.0, second),
    };

    let floor = value - chroma;
    let channel = |c: f32| ((c + floor) * 255.0).round().clamp(0.0, 255.0) as u8;
    [channel(r), channel(g), channel(b), alpha]
}
