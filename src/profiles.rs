//! Closed-form density, potential and inverse cumulative profiles of the
//! galaxy components. The halo and bulge follow the Dehnen family, in its
//! cored (gamma = 0) or cuspy (gamma = 1, Hernquist) variant. The stellar and
//! gaseous disks are exponential in radius and sech^2 in height.

use std::f64::consts::PI;
use crate::numerics::{self, RootError};
use crate::traits::DensityField;
use crate::units::GRAVITATIONAL_CONSTANT;




/**
 * A spherical Dehnen profile with total mass `mass` and scale radius
 * `scale_radius`
 */
#[derive(Clone, Debug, PartialEq)]
pub struct Dehnen {
    pub mass: f64,
    pub scale_radius: f64,
    pub core: bool,
}


/**
 * A disk with exponential radial and sech^2 vertical structure
 */
#[derive(Clone, Debug, PartialEq)]
pub struct ExponentialDisk {
    pub mass: f64,
    pub scale_length: f64,
    pub scale_height: f64,
}




// ============================================================================
impl Dehnen {
    pub fn new(mass: f64, scale_radius: f64, core: bool) -> Self {
        Self { mass, scale_radius, core }
    }

    pub fn density(&self, r: f64) -> f64 {
        let (m, a) = (self.mass, self.scale_radius);

        if self.core {
            3.0 * m / (4.0 * PI) * a / (r + a).powi(4)
        } else {
            m / (2.0 * PI) * a / (r * (r + a).powi(3))
        }
    }

    pub fn potential(&self, r: f64) -> f64 {
        let (m, a) = (self.mass, self.scale_radius);
        let s = r / (r + a);

        if self.core {
            GRAVITATIONAL_CONSTANT * m / (2.0 * a) * (s * s - 1.0)
        } else {
            GRAVITATIONAL_CONSTANT * m / a * (s - 1.0)
        }
    }

    /**
     * Return the mass enclosed within the spherical radius `r`.
     */
    pub fn cumulative_mass(&self, r: f64) -> f64 {
        let s = r / (r + self.scale_radius);

        if self.core {
            self.mass * s.powi(3)
        } else {
            self.mass * s.powi(2)
        }
    }

    /**
     * Return the radius enclosing the mass `mc`. Defined for 0 <= mc < M; the
     * radius diverges as mc approaches the total mass.
     */
    pub fn inverse_cumulative_mass(&self, mc: f64) -> f64 {
        let s = if self.core {
            (mc / self.mass).cbrt()
        } else {
            (mc / self.mass).sqrt()
        };
        self.scale_radius * s / (1.0 - s)
    }
}

impl DensityField for Dehnen {
    fn density_at(&self, rho: f64, z: f64) -> f64 {
        self.density(rho.hypot(z))
    }
}




// ============================================================================
impl ExponentialDisk {
    pub fn new(mass: f64, scale_length: f64, scale_height: f64) -> Self {
        Self { mass, scale_length, scale_height }
    }

    pub fn density(&self, rho: f64, z: f64) -> f64 {
        let (rd, z0) = (self.scale_length, self.scale_height);
        let sech = 1.0 / (z / z0).cosh();
        self.mass / (4.0 * PI * z0 * rd * rd) * sech * sech * (-rho / rd).exp()
    }

    /**
     * Return the fraction of the disk mass inside the cylindrical radius `r`.
     */
    pub fn radial_cumulative(&self, r: f64) -> f64 {
        let x = r / self.scale_length;
        1.0 - (1.0 + x) * (-x).exp()
    }

    /**
     * Return the cylindrical radius enclosing the mass fraction `frac`, for
     * 0 <= frac < 1.
     */
    pub fn radial_inverse_cumulative(&self, frac: f64) -> Result<f64, RootError> {
        numerics::brent_widening(|r| self.radial_cumulative(r) - frac, 0.0, 1.0e10)
    }

    /**
     * Return the height below which the mass fraction `frac` lies. Requires
     * 0 < frac < 1; the end points map to -inf and +inf.
     */
    pub fn height_inverse_cumulative(&self, frac: f64) -> f64 {
        0.5 * self.scale_height * (frac / (1.0 - frac)).ln()
    }
}

impl DensityField for ExponentialDisk {
    fn density_at(&self, rho: f64, z: f64) -> f64 {
        self.density(rho, z)
    }
}




// ============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        f64::abs(a - b) <= tol * f64::max(1.0, f64::abs(b))
    }

    #[test]
    fn dehnen_inverse_cumulative_mass_round_trips() {
        for &core in &[false, true] {
            let halo = Dehnen::new(100.0, 30.0, core);
            let mc_max = halo.cumulative_mass(200.0 * halo.scale_radius);

            for k in 1..100 {
                let mc = mc_max * k as f64 / 100.0;
                let r = halo.inverse_cumulative_mass(mc);
                assert!(close(halo.cumulative_mass(r), mc, 1e-10), "core={} mc={}", core, mc);
            }
        }
    }

    #[test]
    fn cuspy_truncation_matches_two_hundred_scale_radii() {
        let bulge = Dehnen::new(1.0, 1.5, false);
        let r = bulge.inverse_cumulative_mass(bulge.mass * 40000.0 / 40401.0);
        assert!(close(r, 200.0 * 1.5, 1e-9));
    }

    #[test]
    fn dehnen_potential_is_negative_and_increases_outward() {
        for &core in &[false, true] {
            let halo = Dehnen::new(100.0, 30.0, core);
            let phi: Vec<f64> = [0.1, 1.0, 10.0, 100.0, 1000.0].iter().map(|&r| halo.potential(r)).collect();
            assert!(phi.iter().all(|&p| p < 0.0));
            assert!(phi.windows(2).all(|w| w[1] > w[0]));
        }
    }

    #[test]
    fn cored_and_cuspy_central_potentials_differ_by_a_factor_of_two() {
        let cored = Dehnen::new(10.0, 2.0, true);
        let cuspy = Dehnen::new(10.0, 2.0, false);
        assert!(close(cuspy.potential(0.0), 2.0 * cored.potential(0.0), 1e-12));
        assert!(close(cuspy.potential(0.0), -GRAVITATIONAL_CONSTANT * 10.0 / 2.0, 1e-12));
    }

    #[test]
    fn disk_radial_inverse_cumulative_round_trips() {
        let disk = ExponentialDisk::new(5.0, 3.5, 0.7);
        for k in 0..100 {
            let frac = k as f64 / 100.0;
            let r = disk.radial_inverse_cumulative(frac).unwrap();
            assert!(close(disk.radial_cumulative(r), frac, 1e-9), "frac={}", frac);
        }
        assert!(close(disk.radial_inverse_cumulative(0.999999).map(|r| disk.radial_cumulative(r)).unwrap(), 0.999999, 1e-9));
    }

    #[test]
    fn disk_height_inverse_cumulative_is_antisymmetric() {
        let disk = ExponentialDisk::new(5.0, 3.5, 0.7);
        assert_eq!(disk.height_inverse_cumulative(0.5), 0.0);
        assert!(close(disk.height_inverse_cumulative(0.9), -disk.height_inverse_cumulative(0.1), 1e-12));
        assert!(close(disk.height_inverse_cumulative(0.5 * (1.0 + 1f64.tanh())), 0.7, 1e-12));
    }

    #[test]
    fn disk_density_integrates_to_the_disk_mass() {
        let disk = ExponentialDisk::new(5.0, 3.5, 0.7);
        let (n, rmax, zmax) = (800, 80.0, 20.0);
        let (dr, dz) = (rmax / n as f64, 2.0 * zmax / n as f64);
        let mut total = 0.0;

        for i in 0..n {
            let rho = (i as f64 + 0.5) * dr;
            for j in 0..n {
                let z = -zmax + (j as f64 + 0.5) * dz;
                total += 2.0 * PI * rho * disk.density(rho, z) * dr * dz;
            }
        }
        assert!(close(total, 5.0, 1e-3));
    }
}
