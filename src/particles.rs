use std::ops::Range;
use serde::{Serialize, Deserialize};




/// Number of per-type count slots in the output; the last two are reserved.
pub const NUM_PARTICLE_TYPES: usize = 6;




/**
 * The galaxy components, in the order their particles are stored
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Gas,
    Halo,
    Disk,
    Bulge,
}


/**
 * Positions, velocities and masses of every particle, stored contiguously by
 * component in the order gas, halo, disk, bulge. The per-gas-particle
 * arrays (internal energy, density, smoothing length) have one entry for each
 * gas particle.
 */
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParticleSet {
    pub counts: [usize; NUM_PARTICLE_TYPES],
    pub ids: Vec<u64>,
    pub positions: Vec<[f64; 3]>,
    pub velocities: Vec<[f64; 3]>,
    pub masses: Vec<f64>,
    pub internal_energy: Vec<f64>,
    pub density: Vec<f64>,
    pub smoothing_length: Vec<f64>,
}




// ============================================================================
impl Component {
    pub const ALL: [Component; 4] = [
        Component::Gas,
        Component::Halo,
        Component::Disk,
        Component::Bulge,
    ];

    /**
     * Return the slot of this component in the output type counts.
     */
    pub fn slot(self) -> usize {
        match self {
            Component::Gas   => 0,
            Component::Halo  => 1,
            Component::Disk  => 2,
            Component::Bulge => 3,
        }
    }
}




// ============================================================================
impl ParticleSet {

    /**
     * Concatenate the per-component positions in storage order. Each
     * particle of a component gets the mass `mass / count` for that
     * component; ids start at one. Velocities are zero until sampled.
     */
    pub fn assemble(components: [(Vec<[f64; 3]>, f64); 4]) -> Self {
        let mut counts = [0; NUM_PARTICLE_TYPES];
        let mut positions = Vec::new();
        let mut masses = Vec::new();

        for (component, (coordinates, mass)) in Component::ALL.iter().zip(components) {
            let count = coordinates.len();
            let particle_mass = if count > 0 { mass / count as f64 } else { 0.0 };
            counts[component.slot()] = count;
            masses.extend(std::iter::repeat(particle_mass).take(count));
            positions.extend(coordinates);
        }

        let total = positions.len();
        let num_gas = counts[Component::Gas.slot()];

        Self {
            counts,
            ids: (1..=total as u64).collect(),
            positions,
            velocities: vec![[0.0; 3]; total],
            masses,
            internal_energy: vec![0.0; num_gas],
            density: vec![0.0; num_gas],
            smoothing_length: vec![0.0; num_gas],
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn count(&self, component: Component) -> usize {
        self.counts[component.slot()]
    }

    /**
     * Return the index range occupied by the given component.
     */
    pub fn range(&self, component: Component) -> Range<usize> {
        let start: usize = self.counts[..component.slot()].iter().sum();
        start..start + self.count(component)
    }

    pub fn component_mass(&self, component: Component) -> f64 {
        self.masses[self.range(component)].iter().sum()
    }

    pub fn total_mass(&self) -> f64 {
        self.masses.iter().sum()
    }

    pub fn center_of_mass(&self) -> [f64; 3] {
        let total = self.total_mass();
        let mut com = [0.0; 3];

        if total == 0.0 {
            return com
        }
        for (p, m) in self.positions.iter().zip(&self.masses) {
            for k in 0..3 {
                com[k] += m * p[k];
            }
        }
        com.map(|c| c / total)
    }
}




// ============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn points(n: usize, x: f64) -> Vec<[f64; 3]> {
        vec![[x, 0.0, 0.0]; n]
    }

    #[test]
    fn assemble_orders_components_and_counts() {
        let set = ParticleSet::assemble([
            (points(2, 1.0), 0.5),
            (points(3, 2.0), 30.0),
            (points(4, 3.0), 4.0),
            (points(1, 4.0), 1.0),
        ]);
        assert_eq!(set.len(), 10);
        assert_eq!(set.counts, [2, 3, 4, 1, 0, 0]);
        assert_eq!(set.range(Component::Halo), 2..5);
        assert_eq!(set.range(Component::Bulge), 9..10);
        assert_eq!(set.range(Component::Gas), 0..2);
        assert_eq!(set.range(Component::Disk), 5..9);
        assert_eq!(set.positions[5], [3.0, 0.0, 0.0]);
        assert_eq!(set.ids.first(), Some(&1));
        assert_eq!(set.ids.last(), Some(&10));
        assert_eq!(set.internal_energy.len(), 2);
    }

    #[test]
    fn component_masses_sum_to_the_configured_mass() {
        let set = ParticleSet::assemble([
            (points(0, 0.0), 0.0),
            (points(1000, 1.0), 100.0),
            (points(1000, 1.0), 5.0),
            (points(1000, 1.0), 1.0),
        ]);
        assert!(f64::abs(set.component_mass(Component::Halo) - 100.0) < 1e-9);
        assert!(f64::abs(set.component_mass(Component::Disk) - 5.0) < 1e-12);
        assert_eq!(set.component_mass(Component::Gas), 0.0);
        assert_eq!(set.count(Component::Gas), 0);
        assert!(set.internal_energy.is_empty());
    }

    #[test]
    fn center_of_mass_is_mass_weighted() {
        let set = ParticleSet::assemble([
            (points(1, -1.0), 1.0),
            (points(1, 2.0), 2.0),
            (points(0, 0.0), 0.0),
            (points(0, 0.0), 0.0),
        ]);
        assert!(f64::abs(set.center_of_mass()[0] - 1.0) < 1e-12);
    }
}
