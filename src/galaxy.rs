//! The generation pipeline: positions, potential grid, thermal profile,
//! dispersion grids, and finally velocities and gas properties.

use std::future::Future;
use std::io::BufRead;
use std::sync::Arc;
use futures::future::{FutureExt, Shared};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::runtime::Runtime;
use crate::app::Configuration;
use crate::dispersion::DispersionGrids;
use crate::numerics::RootError;
use crate::particles::{Component, ParticleSet};
use crate::potential::{self, GridBuilder, GridCache, PotentialGrid};
use crate::sampling::{self, SPHERICAL_RADIUS_LIMIT};
use crate::thermal::GasThermalProfile;
use crate::tree::Octree;
use crate::velocity::VelocitySampler;




// ============================================================================
#[derive(thiserror::Error, Debug)]
pub enum Error {

    #[error("{0}")]
    Root(#[from] RootError),

    #[error("{0}")]
    Potential(#[from] potential::Error),
}


/**
 * A generated galaxy, together with the grids it was derived from
 */
pub struct Galaxy {
    pub particles: ParticleSet,
    pub potential: PotentialGrid,
    pub dispersion: DispersionGrids,
    pub thermal: Option<GasThermalProfile>,
}




// ============================================================================
fn sample_positions(config: &Configuration, rng: &mut ChaCha8Rng) -> Result<ParticleSet, RootError> {
    log::info!("setting positions...");
    let max_radius = config.disk.max_radius;

    let halo = sampling::spherical_positions(&config.halo.profile(), config.halo.count, rng);
    let disk = sampling::disk_positions(&config.disk.profile(), config.disk.count, max_radius, rng)?;
    let bulge = sampling::spherical_positions(&config.bulge.profile(), config.bulge.count, rng);
    let gas = sampling::disk_positions(&config.gas_profile(), config.gas.count, max_radius, rng)?;

    Ok(ParticleSet::assemble([
        (gas, config.gas.mass),
        (halo, config.halo.mass),
        (disk, config.disk.mass),
        (bulge, config.bulge.mass),
    ]))
}

/**
 * Build the gravity tree from the gas and disk particles and tabulate the
 * total potential on the grid in parallel.
 */
fn compute_potential<I>(config: &Configuration, particles: &ParticleSet, runtime: &Runtime, interrupt: I) -> Result<PotentialGrid, potential::Error>
where
    I: Future<Output = ()>
{
    let pooled: Vec<usize> = particles.range(Component::Gas).chain(particles.range(Component::Disk)).collect();
    let positions: Vec<[f64; 3]> = pooled.iter().map(|&n| particles.positions[n]).collect();
    let masses: Vec<f64> = pooled.iter().map(|&n| particles.masses[n]).collect();

    let extent = positions
        .iter()
        .flat_map(|p| p.iter().map(|x| x.abs()))
        .fold(SPHERICAL_RADIUS_LIMIT * config.halo.scale_radius, f64::max);

    log::info!("building gravity tree...");
    let mut tree = Octree::new(extent * (1.0 + 1e-6), config.tree.opening_angle, config.tree.softening);
    potential::populate_tree(&mut tree, &positions, &masses);
    log::info!("gravity tree has {} nodes holding mass {:.6}", tree.node_count(), tree.total_mass());

    let builder = Arc::new(GridBuilder::new(config.grid_axes(), config.halo.profile(), config.bulge.profile(), tree));
    let mut rng = ChaCha8Rng::seed_from_u64(config.control.seed);
    rng.set_stream(1);
    let cells = potential::shuffled_cells(builder.axes(), &mut rng);
    let num_workers = config.num_workers();

    log::info!("filling potential grid with {} workers...", num_workers);
    builder.fill(runtime, num_workers, cells, interrupt)
}

/**
 * Load the persisted grid if there is one and the operator agrees (or
 * `force_yes` is set); otherwise compute it and persist it.
 */
fn obtain_potential<P, I>(config: &Configuration, particles: &ParticleSet, runtime: &Runtime, prompt: P, interrupt: I) -> Result<PotentialGrid, potential::Error>
where
    P: BufRead,
    I: Future<Output = ()>
{
    let cache = GridCache::new(&config.control.potential_file, config.grid_fingerprint());

    if cache.exists() {
        let warning = cache.staleness_warning();

        let reuse = if config.control.force_yes {
            if let Some(warning) = &warning {
                log::warn!("{}; reusing it anyway", warning);
            }
            true
        } else {
            potential::ask_reuse(prompt, cache.path(), warning.as_deref())?
        };

        if reuse {
            return cache.load(config.grid_axes().shape())
        }
        cache.remove()?;
    }
    let grid = compute_potential(config, particles, runtime, interrupt)?;
    cache.store(&grid)?;
    Ok(grid)
}

/**
 * Fail with [`potential::Error::Cancelled`] if the interrupt has resolved.
 * The poll runs inside the runtime context, which signal futures require.
 */
fn check_interrupt<I>(runtime: &Runtime, interrupt: &Shared<I>) -> Result<(), potential::Error>
where
    I: Future<Output = ()>
{
    let _guard = runtime.enter();

    match interrupt.clone().now_or_never() {
        Some(()) => Err(potential::Error::Cancelled),
        None => Ok(()),
    }
}

fn log_summary(particles: &ParticleSet) {
    for component in Component::ALL.iter() {
        log::info!("{:?}: {} particles, mass {:.6}", component, particles.count(*component), particles.component_mass(*component));
    }
    let com = particles.center_of_mass();
    log::info!("total: {} particles, mass {:.6}", particles.len(), particles.total_mass());
    log::info!("center of mass: ({:.4}, {:.4}, {:.4})", com[0], com[1], com[2]);
}




// ============================================================================
/**
 * Generate a galaxy from a validated, normalized configuration. `prompt`
 * supplies the answer to the grid reuse question. `interrupt` is watched for
 * the whole run: it stops the grid workers if it resolves during the grid
 * computation, and is checked between the later stages, in both cases
 * returning [`potential::Error::Cancelled`].
 */
pub fn generate<P, I>(config: &Configuration, runtime: &Runtime, prompt: P, interrupt: I) -> Result<Galaxy, Error>
where
    P: BufRead,
    I: Future<Output = ()>
{
    let interrupt = interrupt.shared();
    let mut rng = ChaCha8Rng::seed_from_u64(config.control.seed);
    let mut particles = sample_positions(config, &mut rng)?;
    let potential = obtain_potential(config, &particles, runtime, prompt, interrupt.clone())?;
    check_interrupt(runtime, &interrupt)?;

    let axes = config.grid_axes();
    let gas = config.gas_profile();

    let thermal = if particles.count(Component::Gas) > 0 {
        log::info!("setting temperatures...");
        Some(GasThermalProfile::solve(&gas, &potential, &axes))
    } else {
        None
    };
    check_interrupt(runtime, &interrupt)?;

    log::info!("solving the Jeans equations...");
    let dispersion = DispersionGrids::solve(
        &config.halo.profile(),
        &config.disk.profile(),
        &config.bulge.profile(),
        &potential,
        &axes);
    check_interrupt(runtime, &interrupt)?;

    if let Some(thermal) = &thermal {
        log::info!("setting densities...");
        for (k, n) in particles.range(Component::Gas).enumerate() {
            let [x, y, z] = particles.positions[n];
            let rho = x.hypot(y);
            particles.density[k] = gas.density(rho, z.abs());
            particles.internal_energy[k] = thermal.internal_energy_at(&axes, rho, z);
        }
    }

    log::info!("setting velocities...");
    let mut sampler = VelocitySampler::new(&axes, &potential, &dispersion, thermal.as_ref(), &gas, config.disk.velocity_factor);

    for component in Component::ALL.iter().copied() {
        check_interrupt(runtime, &interrupt)?;

        for n in particles.range(component) {
            particles.velocities[n] = sampler.sample(component, particles.positions[n], &mut rng);
        }
    }
    log::debug!("asymmetric drift splines built for {} heights", sampler.drift_cache().len());

    log_summary(&particles);

    Ok(Galaxy { particles, potential, dispersion, thermal })
}
