//! Velocity dispersion fields from the Jeans equations.
//!
//! The vertical dispersion of each component follows from integrating the
//! vertical Jeans equation down from the top of the grid, in the manner of
//! Springel & White (1999). The azimuthal dispersion of the spherical
//! components comes from the radial Jeans equation; that of the disk from the
//! epicyclic approximation, which is only evaluated in the midplane.

use ndarray::{Array1, Array2};
use crate::mesh::GridAxes;
use crate::numerics;
use crate::particles::Component;
use crate::potential::PotentialGrid;
use crate::profiles::{Dehnen, ExponentialDisk};
use crate::traits::DensityField;




/// Replacement for dispersion values that are not finite and positive.
pub static DISPERSION_FLOOR: f64 = 1e-5;




// ============================================================================
/**
 * Squared velocity dispersions of one component on the (rho, z) grid
 */
#[derive(Clone, Debug)]
pub struct ComponentDispersion {
    pub vertical: Array2<f64>,
    pub azimuthal: Array2<f64>,
}


/**
 * The dispersion grids of the collisionless components
 */
#[derive(Clone, Debug)]
pub struct DispersionGrids {
    pub halo: ComponentDispersion,
    pub disk: ComponentDispersion,
    pub bulge: ComponentDispersion,
}




// ============================================================================
fn radial_gradient(grid: &PotentialGrid, axes: &GridAxes, i: usize, j: usize) -> f64 {
    (grid.at(i + 1, j) - grid.at(i, j)) / axes.rho.spacing(i)
}

fn radial_curvature(grid: &PotentialGrid, axes: &GridAxes, i: usize, j: usize) -> f64 {
    numerics::second_derivative(
        [axes.rho[i - 1], axes.rho[i], axes.rho[i + 1]],
        [grid.at(i - 1, j), grid.at(i, j), grid.at(i + 1, j)])
}

/**
 * Replace every entry that is not finite and positive with
 * [`DISPERSION_FLOOR`], and return the number of entries replaced.
 */
pub fn sanitize(values: &mut Array2<f64>) -> usize {
    let mut count = 0;

    for x in values.iter_mut() {
        if !x.is_finite() || *x <= 0.0 {
            *x = DISPERSION_FLOOR;
            count += 1;
        }
    }
    count
}

/**
 * Solve the vertical Jeans equation for a component with the given density.
 * Entry (i, j) is the integral of density times dPhi/dz from z_j to the top
 * of the grid, divided by the density at (rho_i, z_j). The top row, and any
 * cell where the density vanishes, is left non-finite or zero for
 * [`sanitize`] to handle.
 */
pub fn vertical_dispersion<D: DensityField>(density: &D, grid: &PotentialGrid, axes: &GridAxes) -> Array2<f64> {
    let (n_rho, n_z) = axes.shape();
    let mut result = Array2::zeros((n_rho, n_z));

    for i in 0..n_rho {
        let rho = axes.rho[i];
        let phi = grid.vertical_profile(i);
        let mut integrand = Array1::<f64>::zeros(n_z);

        for j in 0..n_z - 1 {
            let dphi_dz = (phi[j + 1] - phi[j]) / axes.z.spacing(j);
            integrand[j] = density.density_at(rho, axes.z[j]) * dphi_dz;
        }
        let tail = numerics::trapezoid_from_end(integrand.view(), axes.z.view());

        for j in 0..n_z - 1 {
            result[[i, j]] = tail[j] / density.density_at(rho, axes.z[j]);
        }
    }
    result
}

/**
 * Azimuthal dispersion of a spherical component from the radial Jeans
 * equation, given its vertical dispersion. The innermost radius copies its
 * neighbour and the outermost is left for [`sanitize`].
 */
pub fn spherical_azimuthal_dispersion<D: DensityField>(density: &D, vertical: &Array2<f64>, grid: &PotentialGrid, axes: &GridAxes) -> Array2<f64> {
    let (n_rho, n_z) = axes.shape();
    let mut result = Array2::zeros((n_rho, n_z));

    for i in 1..n_rho - 1 {
        let (rho, drho) = (axes.rho[i], axes.rho.spacing(i));

        for j in 0..n_z {
            let d0 = density.density_at(rho, axes.z[j]);
            let d1 = density.density_at(axes.rho[i + 1], axes.z[j]);
            let pressure_gradient = (d1 * vertical[[i + 1, j]] - d0 * vertical[[i, j]]) / drho;
            result[[i, j]] = vertical[[i, j]] + rho / d0 * pressure_gradient + rho * radial_gradient(grid, axes, i, j);
        }
    }
    for j in 0..n_z {
        result[[0, j]] = result[[1, j]];
    }
    result
}

/**
 * Azimuthal dispersion of the disk from the epicyclic ratio of the vertical
 * dispersion, evaluated at the lowest height and copied to every other.
 */
pub fn disk_azimuthal_dispersion(vertical: &Array2<f64>, grid: &PotentialGrid, axes: &GridAxes) -> Array2<f64> {
    let (n_rho, n_z) = axes.shape();
    let mut midplane = Array1::<f64>::zeros(n_rho);

    for i in 1..n_rho - 1 {
        let rho = axes.rho[i];
        let dphi_drho = radial_gradient(grid, axes, i, 0);
        let kappa2 = 3.0 / rho * dphi_drho + radial_curvature(grid, axes, i, 0);
        let gamma2 = 4.0 / (kappa2 * rho) * dphi_drho;
        midplane[i] = vertical[[i, 0]] / gamma2;
    }
    midplane[0] = midplane[1];

    Array2::from_shape_fn((n_rho, n_z), |(i, _)| midplane[i])
}




// ============================================================================
impl ComponentDispersion {
    fn sanitized(mut vertical: Array2<f64>, mut azimuthal: Array2<f64>, label: &str) -> Self {
        let nz = sanitize(&mut vertical);
        let nphi = sanitize(&mut azimuthal);
        log::debug!("{}: floored {} vertical and {} azimuthal dispersion cells", label, nz, nphi);
        Self { vertical, azimuthal }
    }

    pub fn spherical(profile: &Dehnen, grid: &PotentialGrid, axes: &GridAxes, label: &str) -> Self {
        let vertical = vertical_dispersion(profile, grid, axes);
        let azimuthal = spherical_azimuthal_dispersion(profile, &vertical, grid, axes);
        Self::sanitized(vertical, azimuthal, label)
    }

    pub fn disk(profile: &ExponentialDisk, grid: &PotentialGrid, axes: &GridAxes) -> Self {
        let vertical = vertical_dispersion(profile, grid, axes);
        let azimuthal = disk_azimuthal_dispersion(&vertical, grid, axes);
        Self::sanitized(vertical, azimuthal, "disk")
    }
}

impl DispersionGrids {
    pub fn solve(halo: &Dehnen, disk: &ExponentialDisk, bulge: &Dehnen, grid: &PotentialGrid, axes: &GridAxes) -> Self {
        Self {
            halo: ComponentDispersion::spherical(halo, grid, axes, "halo"),
            disk: ComponentDispersion::disk(disk, grid, axes),
            bulge: ComponentDispersion::spherical(bulge, grid, axes, "bulge"),
        }
    }

    /**
     * The grids of a collisionless component; the gas has none.
     */
    pub fn get(&self, component: Component) -> Option<&ComponentDispersion> {
        match component {
            Component::Gas   => None,
            Component::Halo  => Some(&self.halo),
            Component::Disk  => Some(&self.disk),
            Component::Bulge => Some(&self.bulge),
        }
    }
}




// ============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Axis;

    fn setup() -> (GridAxes, PotentialGrid, Dehnen, ExponentialDisk) {
        let halo = Dehnen::new(100.0, 10.0, false);
        let disk = ExponentialDisk::new(5.0, 3.5, 0.7);
        let axes = GridAxes::new(Axis::logspace(0.01, 3000.0, 200), Axis::logspace(0.01, 30000.0, 200));
        let grid = PotentialGrid::from_array(Array2::from_shape_fn(axes.shape(), |(i, j)| {
            halo.potential(axes.spherical_radius(i, j))
        }));
        (axes, grid, halo, disk)
    }

    #[test]
    fn sanitize_replaces_bad_values_with_the_floor() {
        let mut values = Array2::from_shape_vec((2, 3), vec![1.0, f64::NAN, -2.0, 0.0, f64::INFINITY, 3.0]).unwrap();
        assert_eq!(sanitize(&mut values), 4);
        assert_eq!(values.into_raw_vec(), vec![1.0, DISPERSION_FLOOR, DISPERSION_FLOOR, DISPERSION_FLOOR, DISPERSION_FLOOR, 3.0]);
    }

    #[test]
    fn solved_dispersions_are_finite_and_above_the_floor() {
        let (axes, grid, halo, disk) = setup();
        let mut corrupted = grid.values().clone();
        corrupted[[50, 50]] = f64::NAN;
        corrupted[[10, 3]] = -1e30;
        let corrupted = PotentialGrid::from_array(corrupted);

        for grid in &[grid, corrupted] {
            let grids = DispersionGrids::solve(&halo, &disk, &halo, grid, &axes);

            for component in &[Component::Halo, Component::Disk, Component::Bulge] {
                let d = grids.get(*component).unwrap();
                assert!(d.vertical.iter().all(|&x| x.is_finite() && x >= DISPERSION_FLOOR));
                assert!(d.azimuthal.iter().all(|&x| x.is_finite() && x >= DISPERSION_FLOOR));
            }
            assert!(grids.get(Component::Gas).is_none());
        }
    }

    #[test]
    fn disk_vertical_dispersion_decreases_with_radius() {
        let (axes, grid, _, disk) = setup();
        let sz = ComponentDispersion::disk(&disk, &grid, &axes).vertical;
        let j = axes.z.locate(0.1);
        let profile: Vec<f64> = [1.0, 4.0, 16.0, 64.0].iter().map(|&rho| sz[[axes.rho.locate(rho), j]]).collect();
        assert!(profile.windows(2).all(|w| w[0] > w[1]), "{:?}", profile);
    }

    #[test]
    fn halo_vertical_dispersion_matches_the_isotropic_spherical_solution() {
        let halo = Dehnen::new(100.0, 10.0, false);
        let axes = GridAxes::new(Axis::logspace(0.01, 3000.0, 50), Axis::logspace(0.01, 30000.0, 1000));
        let grid = PotentialGrid::from_array(Array2::from_shape_fn(axes.shape(), |(i, j)| {
            halo.potential(axes.spherical_radius(i, j))
        }));
        let sz = vertical_dispersion(&halo, &grid, &axes);
        let i = axes.rho.locate(10.0);
        let r = axes.spherical_radius(i, 0);

        let n = 200000;
        let (l0, l1) = (r.ln(), axes.z.last().ln());
        let dl = (l1 - l0) / n as f64;
        let mut integral = 0.0;

        for k in 0..n {
            let s = (l0 + (k as f64 + 0.5) * dl).exp();
            let g = crate::units::GRAVITATIONAL_CONSTANT * halo.cumulative_mass(s) / (s * s);
            integral += halo.density(s) * g * s * dl;
        }
        let expected = integral / halo.density(r);
        assert!(f64::abs(sz[[i, 0]] / expected - 1.0) < 0.05, "{} vs {}", sz[[i, 0]], expected);
    }

    #[test]
    fn disk_azimuthal_dispersion_is_uniform_in_height() {
        let (axes, grid, _, disk) = setup();
        let d = ComponentDispersion::disk(&disk, &grid, &axes);
        let i = axes.rho.locate(8.0);
        assert!(d.azimuthal.row(i).iter().all(|&x| x == d.azimuthal[[i, 0]]));
        assert_eq!(d.azimuthal.row(0), d.azimuthal.row(1));
    }

    #[test]
    fn innermost_radius_copies_its_neighbour() {
        let (axes, grid, halo, _) = setup();
        let sz = vertical_dispersion(&halo, &grid, &axes);
        let sphi = spherical_azimuthal_dispersion(&halo, &sz, &grid, &axes);
        assert_eq!(sphi.row(0), sphi.row(1));
    }
}
