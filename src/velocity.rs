//! Velocity assignment from the dispersion grids and the thermal profile.

use std::collections::HashMap;
use std::f64::consts::TAU;
use ndarray::Array1;
use rand::Rng;
use rand_distr::StandardNormal;
use crate::dispersion::DispersionGrids;
use crate::mesh::GridAxes;
use crate::numerics;
use crate::particles::Component;
use crate::potential::PotentialGrid;
use crate::profiles::ExponentialDisk;
use crate::thermal::GasThermalProfile;




// ============================================================================
/**
 * The azimuthal angle of (x, y), in [0, 2 pi).
 */
pub fn azimuth(x: f64, y: f64) -> f64 {
    let phi = y.atan2(x);

    if phi < 0.0 {
        phi + TAU
    } else {
        phi
    }
}

/**
 * Rotate a velocity from cylindrical components at azimuth `phi` to
 * Cartesian components.
 */
pub fn to_cartesian(v_rho: f64, v_phi: f64, v_z: f64, phi: f64) -> [f64; 3] {
    let (sin, cos) = phi.sin_cos();
    [v_rho * cos - v_phi * sin, v_rho * sin + v_phi * cos, v_z]
}

fn gaussian<R: Rng>(rng: &mut R, variance: f64) -> f64 {
    rng.sample::<f64, _>(StandardNormal) * variance.sqrt()
}




// ============================================================================
/**
 * Radial derivatives of the potential at each height index, from a cubic
 * spline through that row of the grid. Built on first use of each height
 * index and kept for the rest of the run.
 */
pub struct DriftCache<'a> {
    axes: &'a GridAxes,
    grid: &'a PotentialGrid,
    slopes: HashMap<usize, Array1<f64>>,
}

impl<'a> DriftCache<'a> {
    pub fn new(axes: &'a GridAxes, grid: &'a PotentialGrid) -> Self {
        Self { axes, grid, slopes: HashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.slopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slopes.is_empty()
    }

    /**
     * dPhi/drho at radius `rho` and height index `j`, linearly interpolated
     * between the spline knots.
     */
    pub fn slope(&mut self, j: usize, rho: f64) -> f64 {
        let (axes, grid) = (self.axes, self.grid);
        let slopes = self.slopes
            .entry(j)
            .or_insert_with(|| numerics::spline_slopes(axes.rho.view(), grid.radial_profile(j)));
        axes.rho.interpolate(slopes.view(), rho)
    }
}




// ============================================================================
/**
 * Draws particle velocities for each component
 */
pub struct VelocitySampler<'a> {
    axes: &'a GridAxes,
    grid: &'a PotentialGrid,
    dispersion: &'a DispersionGrids,
    thermal: Option<&'a GasThermalProfile>,
    gas: &'a ExponentialDisk,
    velocity_factor: f64,
    drift: DriftCache<'a>,
}

impl<'a> VelocitySampler<'a> {
    pub fn new(
        axes: &'a GridAxes,
        grid: &'a PotentialGrid,
        dispersion: &'a DispersionGrids,
        thermal: Option<&'a GasThermalProfile>,
        gas: &'a ExponentialDisk,
        velocity_factor: f64) -> Self
    {
        Self {
            axes,
            grid,
            dispersion,
            thermal,
            gas,
            velocity_factor,
            drift: DriftCache::new(axes, grid),
        }
    }

    pub fn drift_cache(&self) -> &DriftCache<'a> {
        &self.drift
    }

    /**
     * Return the velocity of a particle of the given component at
     * `position`. The grid only covers z > 0, so |z| is used throughout.
     */
    pub fn sample<R: Rng>(&mut self, component: Component, position: [f64; 3], rng: &mut R) -> [f64; 3] {
        let [x, y, z] = position;
        let z = z.abs();
        let rho = x.hypot(y);
        let phi = azimuth(x, y);
        let i = self.axes.rho.locate(rho);
        let j = self.axes.z.locate(z);

        let (v_rho, v_phi, v_z) = match component {
            Component::Gas => {
                (0.0, self.gas_rotation(i, j, rho, z), 0.0)
            }
            Component::Halo | Component::Bulge => {
                let grids = if component == Component::Halo { &self.dispersion.halo } else { &self.dispersion.bulge };
                let sz = grids.vertical[[i, j]];
                let sphi = grids.azimuthal[[i, j]];
                let v_z = gaussian(rng, sz);
                let v_rho = gaussian(rng, sz);
                let v_phi = gaussian(rng, sphi);
                (v_rho, v_phi, v_z)
            }
            Component::Disk => {
                let f = self.velocity_factor;
                let sz = self.dispersion.disk.vertical[[i, j]];
                let sphi = self.dispersion.disk.azimuthal[[i, 0]];
                let v_z = gaussian(rng, sz);
                let v_rho = f * gaussian(rng, sz);
                let mut v_phi = f * gaussian(rng, sphi);
                let slope = self.drift.slope(j, rho);

                if slope > 0.0 {
                    v_phi += (rho * slope).sqrt();
                }
                (v_rho, v_phi, v_z)
            }
        };
        to_cartesian(v_rho, v_phi, v_z, phi)
    }

    /**
     * Circular speed of gas at cell (i, j), balancing gravity and the radial
     * pressure gradient against the centrifugal force.
     */
    fn gas_rotation(&self, i: usize, j: usize, rho: f64, z: f64) -> f64 {
        let drho = self.axes.rho.spacing(i);
        let dphi = self.grid.at(i + 1, j) - self.grid.at(i, j);
        let local_density = self.gas.density(rho, z);

        let pressure_term = match self.thermal {
            Some(thermal) if local_density > 0.0 => {
                let p0 = self.gas.density(self.axes.rho[i], z) * thermal.pressure_over_density[[i, j]];
                let p1 = self.gas.density(self.axes.rho[i + 1], z) * thermal.pressure_over_density[[i + 1, j]];
                (p1 - p0) / drho / local_density
            }
            _ => 0.0,
        };
        let v2 = rho * (dphi / drho + pressure_term);
        v2.abs().sqrt()
    }
}




// ============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use crate::dispersion::ComponentDispersion;
    use crate::mesh::Axis;
    use crate::profiles::Dehnen;
    use crate::units::GRAVITATIONAL_CONSTANT;

    fn hernquist_grid() -> (GridAxes, PotentialGrid, Dehnen) {
        let halo = Dehnen::new(100.0, 10.0, false);
        let axes = GridAxes::new(Axis::logspace(0.01, 3000.0, 300), Axis::logspace(0.01, 30000.0, 100));
        let grid = PotentialGrid::from_array(Array2::from_shape_fn(axes.shape(), |(i, j)| {
            halo.potential(axes.spherical_radius(i, j))
        }));
        (axes, grid, halo)
    }

    fn uniform_dispersion(axes: &GridAxes, vertical: f64, azimuthal: f64) -> DispersionGrids {
        let d = ComponentDispersion {
            vertical: Array2::from_elem(axes.shape(), vertical),
            azimuthal: Array2::from_elem(axes.shape(), azimuthal),
        };
        DispersionGrids { halo: d.clone(), disk: d.clone(), bulge: d }
    }

    #[test]
    fn azimuth_round_trips_in_every_quadrant_and_on_the_axes() {
        let points = [
            (3.0, 4.0), (-3.0, 4.0), (-3.0, -4.0), (3.0, -4.0),
            (2.0, 0.0), (0.0, 2.0), (-2.0, 0.0), (0.0, -2.0),
            (1.0, 1e-12), (1.0, -1e-12),
        ];
        for &(x, y) in &points {
            let phi = azimuth(x, y);
            assert!((0.0..TAU).contains(&phi));
            let r = f64::hypot(x, y);
            let [xr, yr, _] = to_cartesian(r, 0.0, 0.0, phi);
            assert!(f64::abs(xr - x) < 1e-12 && f64::abs(yr - y) < 1e-12, "({}, {})", x, y);
        }
    }

    #[test]
    fn rotation_is_tangential_for_pure_azimuthal_velocity() {
        let phi = azimuth(0.0, 5.0);
        let [vx, vy, vz] = to_cartesian(0.0, 1.0, 0.0, phi);
        assert!(f64::abs(vx + 1.0) < 1e-12);
        assert!(vy.abs() < 1e-12);
        assert_eq!(vz, 0.0);
    }

    #[test]
    fn drift_cache_builds_each_height_once() {
        let (axes, grid, halo) = hernquist_grid();
        let mut cache = DriftCache::new(&axes, &grid);
        assert!(cache.is_empty());

        let s1 = cache.slope(0, 10.0);
        let s2 = cache.slope(0, 20.0);
        cache.slope(5, 10.0);
        assert_eq!(cache.len(), 2);

        let exact = |r: f64| GRAVITATIONAL_CONSTANT * halo.mass / (r + halo.scale_radius).powi(2);
        assert!(f64::abs(s1 / exact(10.0) - 1.0) < 1e-2);
        assert!(f64::abs(s2 / exact(20.0) - 1.0) < 1e-2);
    }

    #[test]
    fn halo_velocities_have_the_grid_dispersion() {
        let (axes, grid, _) = hernquist_grid();
        let dispersion = uniform_dispersion(&axes, 400.0, 900.0);
        let gas = ExponentialDisk::new(0.0, 3.5, 0.7);
        let mut sampler = VelocitySampler::new(&axes, &grid, &dispersion, None, &gas, 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let n = 20000;
        let velocities: Vec<[f64; 3]> = (0..n).map(|_| sampler.sample(Component::Halo, [0.0, 7.0, 1.0], &mut rng)).collect();
        let mean_square = |k: usize| velocities.iter().map(|v| v[k] * v[k]).sum::<f64>() / n as f64;

        // at phi = pi / 2 the x axis is anti-parallel to the azimuthal direction
        assert!(f64::abs(mean_square(0) / 900.0 - 1.0) < 0.05);
        assert!(f64::abs(mean_square(1) / 400.0 - 1.0) < 0.05);
        assert!(f64::abs(mean_square(2) / 400.0 - 1.0) < 0.05);
    }

    #[test]
    fn cold_disk_rotates_near_the_circular_speed() {
        let (axes, grid, halo) = hernquist_grid();
        let dispersion = uniform_dispersion(&axes, 1e-10, 1e-10);
        let gas = ExponentialDisk::new(0.0, 3.5, 0.7);
        let mut sampler = VelocitySampler::new(&axes, &grid, &dispersion, None, &gas, 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(10);

        let rho = 8.0;
        let v = sampler.sample(Component::Disk, [rho, 0.0, 0.01], &mut rng);
        let circular = (GRAVITATIONAL_CONSTANT * halo.mass * rho).sqrt() / (rho + halo.scale_radius);
        assert!(f64::abs(v[1] / circular - 1.0) < 0.02);
        assert!(v[0].abs() < 1e-3);
        assert_eq!(sampler.drift_cache().len(), 1);
    }

    #[test]
    fn gas_without_pressure_follows_the_potential_gradient() {
        let (axes, grid, halo) = hernquist_grid();
        let dispersion = uniform_dispersion(&axes, 1.0, 1.0);
        let gas = ExponentialDisk::new(0.5, 3.5, 0.7);
        let mut sampler = VelocitySampler::new(&axes, &grid, &dispersion, None, &gas, 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let rho = 5.0;
        let v = sampler.sample(Component::Gas, [0.0, -rho, -0.01], &mut rng);
        let circular = (GRAVITATIONAL_CONSTANT * halo.mass * rho).sqrt() / (rho + halo.scale_radius);
        assert!(f64::abs(v[0] / circular - 1.0) < 0.02);
        assert!(v[1].abs() < 1e-9);
        assert_eq!(v[2], 0.0);
    }

    #[test]
    fn velocity_factor_scales_only_the_in_plane_disk_dispersion() {
        let (axes, grid, _) = hernquist_grid();
        let dispersion = uniform_dispersion(&axes, 400.0, 900.0);
        let gas = ExponentialDisk::new(0.0, 3.5, 0.7);
        let mut sampler = VelocitySampler::new(&axes, &grid, &dispersion, None, &gas, 0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(12);

        let n = 20000;
        let velocities: Vec<[f64; 3]> = (0..n).map(|_| sampler.sample(Component::Disk, [7.0, 0.0, 1.0], &mut rng)).collect();
        let variance = |k: usize| {
            let mean = velocities.iter().map(|v| v[k]).sum::<f64>() / n as f64;
            velocities.iter().map(|v| (v[k] - mean).powi(2)).sum::<f64>() / n as f64
        };

        // at phi = 0 the x axis is radial and the y axis azimuthal
        assert!(f64::abs(variance(0) / (0.25 * 400.0) - 1.0) < 0.05);
        assert!(f64::abs(variance(1) / (0.25 * 900.0) - 1.0) < 0.05);
        assert!(f64::abs(variance(2) / 400.0 - 1.0) < 0.05);
    }

    #[test]
    fn no_drift_is_added_where_the_potential_falls_outward() {
        let axes = GridAxes::new(Axis::logspace(0.01, 3000.0, 300), Axis::logspace(0.01, 30000.0, 100));
        let grid = PotentialGrid::from_array(Array2::from_shape_fn(axes.shape(), |(i, _)| -100.0 * axes.rho[i]));
        let dispersion = uniform_dispersion(&axes, 1e-10, 1e-10);
        let gas = ExponentialDisk::new(0.0, 3.5, 0.7);
        let mut sampler = VelocitySampler::new(&axes, &grid, &dispersion, None, &gas, 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(13);

        let rho = 8.0;
        assert!(DriftCache::new(&axes, &grid).slope(axes.z.locate(0.01), rho) < 0.0);

        let n = 100;
        let mean_v_phi = (0..n)
            .map(|_| sampler.sample(Component::Disk, [rho, 0.0, 0.01], &mut rng)[1])
            .sum::<f64>() / n as f64;
        assert!(mean_v_phi.abs() < 1e-4);
    }

    #[test]
    fn isothermal_gas_rotates_slower_by_the_pressure_gradient() {
        let (axes, grid, _) = hernquist_grid();
        let dispersion = uniform_dispersion(&axes, 1.0, 1.0);
        let gas = ExponentialDisk::new(0.5, 3.5, 0.7);
        let isothermal = 2000.0;
        let thermal = GasThermalProfile {
            internal_energy: Array2::zeros(axes.shape()),
            pressure_over_density: Array2::from_elem(axes.shape(), isothermal),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(14);

        let rho = 5.0;
        let position = [rho, 0.0, 0.01];
        let cold = VelocitySampler::new(&axes, &grid, &dispersion, None, &gas, 1.0).sample(Component::Gas, position, &mut rng);
        let warm = VelocitySampler::new(&axes, &grid, &dispersion, Some(&thermal), &gas, 1.0).sample(Component::Gas, position, &mut rng);

        // for P = c rho_gas with rho_gas ~ exp(-R / R_d), v_c^2 drops by c R / R_d
        let expected = isothermal * rho / gas.scale_length;
        let found = cold[1].powi(2) - warm[1].powi(2);
        assert!(f64::abs(found / expected - 1.0) < 0.05, "{} vs {}", found, expected);
        assert_eq!(warm[0], 0.0);
        assert_eq!(warm[2], 0.0);
    }
}
