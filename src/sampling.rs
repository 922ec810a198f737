//! Position sampling by inversion of the cumulative mass profiles.

use std::f64::consts::TAU;
use rand::Rng;
use rand::distributions::Open01;
use crate::numerics::RootError;
use crate::profiles::{Dehnen, ExponentialDisk};




/// Spherical components are truncated at this many scale radii.
pub static SPHERICAL_RADIUS_LIMIT: f64 = 200.0;




// ============================================================================
/**
 * Draw `count` positions from a spherical Dehnen profile, truncated at
 * [`SPHERICAL_RADIUS_LIMIT`] scale radii, with isotropic directions.
 */
pub fn spherical_positions<R: Rng>(profile: &Dehnen, count: usize, rng: &mut R) -> Vec<[f64; 3]> {
    let truncated_mass = profile.cumulative_mass(SPHERICAL_RADIUS_LIMIT * profile.scale_radius);

    (0..count)
        .map(|_| {
            let radius = profile.inverse_cumulative_mass(rng.gen::<f64>() * truncated_mass);
            let theta = (2.0 * rng.gen::<f64>() - 1.0).acos();
            let phi = TAU * rng.gen::<f64>();
            [
                radius * theta.sin() * phi.cos(),
                radius * theta.sin() * phi.sin(),
                radius * theta.cos(),
            ]
        })
        .collect()
}

/**
 * Draw `count` positions from an exponential-sech^2 disk truncated at the
 * cylindrical radius `max_radius`. Each radius is a separate root search,
 * and a failed search aborts the whole draw.
 */
pub fn disk_positions<R: Rng>(profile: &ExponentialDisk, count: usize, max_radius: f64, rng: &mut R) -> Result<Vec<[f64; 3]>, RootError> {
    let truncated_fraction = profile.radial_cumulative(max_radius);

    (0..count)
        .map(|_| -> Result<[f64; 3], RootError> {
            let radius = profile.radial_inverse_cumulative(rng.gen::<f64>() * truncated_fraction)?;
            let height = profile.height_inverse_cumulative(rng.sample(Open01));
            let phi = TAU * rng.gen::<f64>();
            Ok([radius * phi.cos(), radius * phi.sin(), height])
        })
        .collect()
}
