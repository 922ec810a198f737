//! Tabulation of the total gravitational potential on the (rho, z) grid.
//!
//! The spherical halo and bulge contribute their closed-form potentials; the
//! disk and gas contribute through a force tree built from their particles.
//! Tree evaluation dominates the cost, so the cells are filled in parallel by
//! blocking tasks on a tokio runtime, each owning a disjoint chunk of a
//! shuffled cell list. Results are merged into the grid only after every
//! worker has returned.

use std::future::Future;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use futures::future::join_all;
use ndarray::{Array2, ArrayView1};
use rand::Rng;
use rand::seq::SliceRandom;
use tokio::runtime::Runtime;
use crate::io;
use crate::mesh::GridAxes;
use crate::profiles::Dehnen;
use crate::tasks::{PercentReporter, WorkerProgress};
use crate::traits::ForceTree;




/// Interval between progress reports while the grid is being filled.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);




// ============================================================================
#[derive(thiserror::Error, Debug)]
pub enum Error {

    #[error("{workers} workers do not evenly divide the {cells} grid cells")]
    UnevenPartition { workers: usize, cells: usize },

    #[error("process cancelled")]
    Cancelled,

    #[error("{0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("{0}")]
    IO(#[from] io::Error),

    #[error("{0}")]
    StdIO(#[from] std::io::Error),

    #[error("no answer was given to the reuse prompt")]
    NoAnswer,
}




// ============================================================================
/**
 * The total potential at every (rho, z) grid point, indexed as [i_rho, i_z]
 */
#[derive(Clone, Debug, PartialEq)]
pub struct PotentialGrid {
    values: Array2<f64>,
}


/**
 * Everything needed to evaluate the potential at a grid cell
 */
pub struct GridBuilder<T> {
    axes: GridAxes,
    halo: Dehnen,
    bulge: Dehnen,
    tree: T,
}


/**
 * A persisted potential grid together with a fingerprint of the parameters
 * it was computed from
 */
pub struct GridCache {
    path: String,
    fingerprint: String,
}




// ============================================================================
impl PotentialGrid {
    pub fn from_array(values: Array2<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.values[[i, j]]
    }

    /**
     * The potential along the rho axis at the height index `j`.
     */
    pub fn radial_profile(&self, j: usize) -> ArrayView1<f64> {
        self.values.column(j)
    }

    /**
     * The potential along the z axis at the radius index `i`.
     */
    pub fn vertical_profile(&self, i: usize) -> ArrayView1<f64> {
        self.values.row(i)
    }
}




// ============================================================================
/**
 * Insert every body into the force tree, logging progress as it goes.
 */
pub fn populate_tree<T: ForceTree>(tree: &mut T, positions: &[[f64; 3]], masses: &[f64]) {
    let mut reporter = PercentReporter::new("building gravity tree", positions.len());

    for (n, (&position, &mass)) in positions.iter().zip(masses).enumerate() {
        reporter.update(n);
        tree.insert(position, mass);
    }
}

/**
 * Return every (i_rho, i_z) index pair of the grid in a random order.
 */
pub fn shuffled_cells<R: Rng>(axes: &GridAxes, rng: &mut R) -> Vec<(usize, usize)> {
    let (n_rho, n_z) = axes.shape();
    let mut cells: Vec<_> = (0..n_rho)
        .flat_map(|i| (0..n_z).map(move |j| (i, j)))
        .collect();
    cells.shuffle(rng);
    cells
}




// ============================================================================
impl<T: ForceTree + 'static> GridBuilder<T> {
    pub fn new(axes: GridAxes, halo: Dehnen, bulge: Dehnen, tree: T) -> Self {
        Self { axes, halo, bulge, tree }
    }

    pub fn axes(&self) -> &GridAxes {
        &self.axes
    }

    /**
     * The total potential at grid point (i, j). The tree is sampled in the
     * y = 0 plane.
     */
    pub fn cell_potential(&self, i: usize, j: usize) -> f64 {
        let (rho, z) = (self.axes.rho[i], self.axes.z[j]);
        let r = self.axes.spherical_radius(i, j);
        self.halo.potential(r) + self.tree.potential([rho, 0.0, z]) + self.bulge.potential(r)
    }

    fn fill_chunk(&self, worker: usize, cells: &[(usize, usize)], progress: &WorkerProgress, cancel: &AtomicBool) -> Vec<f64> {
        let mut values = Vec::with_capacity(cells.len());

        for &(i, j) in cells {
            if cancel.load(Ordering::Relaxed) {
                break
            }
            values.push(self.cell_potential(i, j));
            progress.advance(worker);
        }
        values
    }

    /**
     * Fill the grid using `num_workers` blocking tasks on `runtime`. The
     * cells are taken in the order given by `cells` (normally from
     * [`shuffled_cells`]) and split into equal contiguous chunks, one per
     * worker, so `num_workers` must divide the number of cells. If
     * `interrupt` resolves before the workers finish, they are told to stop,
     * awaited, and [`Error::Cancelled`] is returned.
     */
    pub fn fill<I>(self: &Arc<Self>, runtime: &Runtime, num_workers: usize, cells: Vec<(usize, usize)>, interrupt: I) -> Result<PotentialGrid, Error>
    where
        I: Future<Output = ()>
    {
        let num_cells = self.axes.num_cells();

        if num_workers == 0 || num_cells % num_workers != 0 || cells.len() != num_cells {
            return Err(Error::UnevenPartition { workers: num_workers, cells: num_cells })
        }
        let chunk_size = num_cells / num_workers;
        let cells = Arc::new(cells);
        let progress = Arc::new(WorkerProgress::new(num_workers, chunk_size));
        let cancel = Arc::new(AtomicBool::new(false));

        let workers = (0..num_workers).map(|n| {
            let builder = self.clone();
            let cells = cells.clone();
            let progress = progress.clone();
            let cancel = cancel.clone();
            runtime.spawn_blocking(move || {
                builder.fill_chunk(n, &cells[n * chunk_size..(n + 1) * chunk_size], &progress, &cancel)
            })
        });
        let results = join_all(workers);

        let chunks = runtime.block_on(async {
            tokio::pin!(interrupt);
            tokio::pin!(results);
            let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut interrupt => {
                        cancel.store(true, Ordering::Relaxed);
                        (&mut results).await;
                        return Err(Error::Cancelled)
                    }
                    chunks = &mut results => {
                        return chunks.into_iter().collect::<Result<Vec<_>, _>>().map_err(Error::from)
                    }
                    _ = ticker.tick() => {
                        progress.report()
                    }
                }
            }
        })?;

        let mut values = Array2::zeros(self.axes.shape());

        for (cell_chunk, chunk) in cells.chunks(chunk_size).zip(chunks) {
            for (&(i, j), value) in cell_chunk.iter().zip(chunk) {
                values[[i, j]] = value;
            }
        }
        Ok(PotentialGrid::from_array(values))
    }
}




// ============================================================================
impl GridCache {
    pub fn new(path: &str, fingerprint: String) -> Self {
        Self { path: path.to_string(), fingerprint }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn fingerprint_path(&self) -> String {
        format!("{}.fingerprint", self.path)
    }

    pub fn exists(&self) -> bool {
        Path::new(&self.path).is_file()
    }

    /**
     * Return a warning if the stored fingerprint is absent or differs from
     * the current one.
     */
    pub fn staleness_warning(&self) -> Option<String> {
        match std::fs::read_to_string(self.fingerprint_path()) {
            Ok(stored) if stored == self.fingerprint => None,
            Ok(_) => Some(format!("{} was computed with different parameters", self.path)),
            Err(_) => Some(format!("{} has no parameter fingerprint", self.path)),
        }
    }

    pub fn load(&self, shape: (usize, usize)) -> Result<PotentialGrid, Error> {
        log::info!("read {}", self.path);
        Ok(PotentialGrid::from_array(io::read_grid_text(&self.path, shape)?))
    }

    pub fn store(&self, grid: &PotentialGrid) -> Result<(), Error> {
        io::write_grid_text(grid.values(), &self.path)?;
        std::fs::write(self.fingerprint_path(), &self.fingerprint)?;
        Ok(())
    }

    pub fn remove(&self) -> Result<(), Error> {
        std::fs::remove_file(&self.path)?;

        if Path::new(&self.fingerprint_path()).is_file() {
            std::fs::remove_file(self.fingerprint_path())?;
        }
        Ok(())
    }
}

/**
 * Ask on standard output whether to reuse the grid file at `path`, reading
 * answers from `reader` until one of "y" or "n" is given.
 */
pub fn ask_reuse<R: BufRead>(mut reader: R, path: &str, warning: Option<&str>) -> Result<bool, Error> {
    if let Some(warning) = warning {
        println!("warning: {}", warning);
    }
    println!("Use existing potential tabulation in {}? Make sure it refers to the current parameters. (y/n)", path);

    loop {
        let mut answer = String::new();

        if reader.read_line(&mut answer)? == 0 {
            return Err(Error::NoAnswer)
        }
        match answer.trim() {
            "y" => return Ok(true),
            "n" => return Ok(false),
            _ => println!("Please give a proper answer. (y/n)"),
        }
    }
}
