//! Physical constants in the internal unit system (kpc, km/s, 1e10 solar
//! masses) and the temperature to specific internal energy conversion.




// ============================================================================
/// Gravitational constant in kpc (km/s)^2 / 1e10 solar masses
pub static GRAVITATIONAL_CONSTANT: f64 = 43007.1;

/// Proton mass over the Boltzmann constant, in K / (km/s)^2
pub static PROTON_MASS_OVER_BOLTZMANN: f64 = 121.148;

/// Primordial hydrogen mass fraction
pub static HYDROGEN_MASS_FRACTION: f64 = 0.76;

/// Ratio of specific heats for a monatomic ideal gas
pub static ADIABATIC_INDEX: f64 = 5.0 / 3.0;

/// Temperature (K) above which the gas is treated as fully ionized
pub static IONIZATION_TEMPERATURE: f64 = 1.0e4;




// ============================================================================
/**
 * Mean molecular weight of neutral primordial gas.
 */
pub fn neutral_mean_weight() -> f64 {
    4.0 / (1.0 + 3.0 * HYDROGEN_MASS_FRACTION)
}

/**
 * Mean molecular weight of fully ionized primordial gas.
 */
pub fn ionized_mean_weight() -> f64 {
    4.0 / (3.0 + 5.0 * HYDROGEN_MASS_FRACTION)
}

/**
 * Mean molecular weight appropriate for gas at the given temperature.
 */
pub fn mean_weight(temperature: f64) -> f64 {
    if temperature > IONIZATION_TEMPERATURE {
        ionized_mean_weight()
    } else {
        neutral_mean_weight()
    }
}

/**
 * Convert a temperature in K to a specific internal energy in (km/s)^2.
 */
pub fn temperature_to_internal_energy(temperature: f64) -> f64 {
    temperature / (PROTON_MASS_OVER_BOLTZMANN * mean_weight(temperature) * (ADIABATIC_INDEX - 1.0))
}




// ============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ionized_gas_is_lighter_than_neutral_gas() {
        assert!(ionized_mean_weight() < neutral_mean_weight());
        assert!(f64::abs(neutral_mean_weight() - 1.2195) < 1e-3);
        assert!(f64::abs(ionized_mean_weight() - 0.5882) < 1e-3);
    }

    #[test]
    fn internal_energy_switches_weight_at_ionization_temperature() {
        let t = 2.0e4;
        let u = temperature_to_internal_energy(t);
        assert!(f64::abs(u - 1.5 * t / (PROTON_MASS_OVER_BOLTZMANN * ionized_mean_weight())) < 1e-9);

        let t = 5.0e3;
        let u = temperature_to_internal_energy(t);
        assert!(f64::abs(u - 1.5 * t / (PROTON_MASS_OVER_BOLTZMANN * neutral_mean_weight())) < 1e-9);
    }
}
