use ndarray::{Array1, Array2};
use crate::mesh::GridAxes;
use crate::numerics;
use crate::potential::PotentialGrid;
use crate::profiles::ExponentialDisk;
use crate::units::{self, IONIZATION_TEMPERATURE, PROTON_MASS_OVER_BOLTZMANN};




/**
 * Vertical hydrostatic equilibrium of the gas disk on the (rho, z) grid.
 * `pressure_over_density` is P / rho_gas in (km/s)^2, the temperature up to
 * the factor k / (mu m_p); `internal_energy` is the specific internal energy
 * of gas at the corresponding physical temperature.
 */
#[derive(Clone, Debug)]
pub struct GasThermalProfile {
    pub internal_energy: Array2<f64>,
    pub pressure_over_density: Array2<f64>,
}




// ============================================================================
/**
 * Convert P / rho to a specific internal energy, treating the gas as ionized
 * if the temperature it implies for ionized gas exceeds the ionization
 * threshold, and as neutral otherwise.
 */
fn internal_energy_of(pressure_over_density: f64) -> f64 {
    let ionized = PROTON_MASS_OVER_BOLTZMANN * units::ionized_mean_weight() * pressure_over_density;
    let neutral = PROTON_MASS_OVER_BOLTZMANN * units::neutral_mean_weight() * pressure_over_density;

    if ionized > IONIZATION_TEMPERATURE {
        units::temperature_to_internal_energy(ionized)
    } else {
        units::temperature_to_internal_energy(neutral)
    }
}




// ============================================================================
impl GasThermalProfile {

    /**
     * Integrate the gas density times dPhi/dz from each height to the top of
     * the grid. The potential gradient is a backward difference, so the
     * lowest height borrows the integrand of the one above it, and the top
     * height copies the one below.
     */
    pub fn solve(gas: &ExponentialDisk, grid: &PotentialGrid, axes: &GridAxes) -> Self {
        let (n_rho, n_z) = axes.shape();
        let mut internal_energy = Array2::zeros((n_rho, n_z));
        let mut pressure_over_density = Array2::zeros((n_rho, n_z));

        for i in 0..n_rho {
            let rho = axes.rho[i];
            let phi = grid.vertical_profile(i);
            let mut integrand = Array1::<f64>::zeros(n_z);

            for j in 1..n_z {
                let dphi_dz = (phi[j] - phi[j - 1]) / axes.z.spacing(j - 1);
                integrand[j] = gas.density(rho, axes.z[j]) * dphi_dz;
            }
            integrand[0] = integrand[1];

            let tail = numerics::trapezoid_from_end(integrand.view(), axes.z.view());

            for j in 0..n_z - 1 {
                let p = tail[j] / gas.density(rho, axes.z[j]);
                pressure_over_density[[i, j]] = p;
                internal_energy[[i, j]] = internal_energy_of(p);
            }
            pressure_over_density[[i, n_z - 1]] = pressure_over_density[[i, n_z - 2]];
            internal_energy[[i, n_z - 1]] = internal_energy[[i, n_z - 2]];
        }
        Self { internal_energy, pressure_over_density }
    }

    /**
     * The internal energy of the grid cell at or below (rho, |z|).
     */
    pub fn internal_energy_at(&self, axes: &GridAxes, rho: f64, z: f64) -> f64 {
        self.internal_energy[[axes.rho.locate(rho), axes.z.locate(z.abs())]]
    }
}
