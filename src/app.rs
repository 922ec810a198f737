pub static DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
pub static VERSION_AND_BUILD: &str = git_version::git_version!(prefix=concat!("v", env!("CARGO_PKG_VERSION"), " "), fallback="unknown");


use std::{
    ffi::OsStr,
    fs::read_to_string,
    path::Path,
};
use serde::{
    Serialize,
    Deserialize,
};
use crate::patch::{self, Patch};
use crate::mesh::{Axis, GridAxes};
use crate::profiles::{Dehnen, ExponentialDisk};


// ============================================================================
#[derive(thiserror::Error, Debug)]
pub enum Error {

    #[error("{0}")]
    IO(#[from] std::io::Error),

    #[error("{0}")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Patch(#[from] patch::Error),

    #[error("unknown input file type '{0}'")]
    UnknownInputType(String),
}


/**
 * A spherical Dehnen component: the halo or the bulge
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Spherical {
    pub mass: f64,
    pub count: usize,
    pub scale_radius: f64,
    #[serde(default)]
    pub core: bool,
}


/**
 * The stellar disk
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Disk {
    pub mass: f64,
    pub count: usize,
    pub scale_length: f64,
    pub scale_height: f64,

    /// Cylindrical radius at which disk and gas sampling is truncated
    #[serde(default = "Disk::default_max_radius")]
    pub max_radius: f64,

    /// Scales the radial and azimuthal velocity dispersion of the stars
    pub velocity_factor: f64,
}


/**
 * The gaseous disk, sharing the stellar disk's scale length
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Gas {
    pub enabled: bool,
    pub mass: f64,
    pub count: usize,

    /// Gas scale height in units of the stellar disk scale height
    pub scale_height_ratio: f64,
}


/**
 * Extent and resolution of the (rho, z) tabulation grid. The outer edges
 * are given in units of the halo scale radius.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Grid {
    pub num_rho: usize,
    pub num_z: usize,
    pub min: f64,
    pub rho_max_halo_radii: f64,
    pub z_max_halo_radii: f64,
}


/**
 * Accuracy parameters of the gravity tree
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Tree {
    pub opening_angle: f64,
    pub softening: f64,
}


/**
 * Run control: parallelism, random seed, and file names
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Control {
    pub num_threads: Option<usize>,
    pub seed: u64,
    pub potential_file: String,
    pub force_yes: bool,
    pub output: String,
}


/**
 * User configuration
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    pub halo: Spherical,
    pub bulge: Spherical,
    pub disk: Disk,
    #[serde(default)]
    pub gas: Gas,
    #[serde(default)]
    pub grid: Grid,
    #[serde(default)]
    pub tree: Tree,
    #[serde(default)]
    pub control: Control,
}


/**
 * The parameters that determine the potential grid, used to fingerprint a
 * persisted grid file
 */
#[derive(Serialize)]
struct GridParameters<'a> {
    halo: &'a Spherical,
    bulge: &'a Spherical,
    disk: DiskGeometry,
    gas: &'a Gas,
    grid: &'a Grid,
    tree: &'a Tree,
    seed: u64,
}


/**
 * The disk parameters that shape its particle realization, leaving out the
 * purely kinematic ones
 */
#[derive(Serialize)]
struct DiskGeometry {
    mass: f64,
    count: usize,
    scale_length: f64,
    scale_height: f64,
    max_radius: f64,
}


/**
 * App state
 */
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct App {
    pub config: Configuration,
    pub version: String,
}




// ============================================================================
impl Default for Gas {
    fn default() -> Self {
        Self {
            enabled: false,
            mass: 0.0,
            count: 0,
            scale_height_ratio: 1.0,
        }
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            num_rho: 2000,
            num_z: 2000,
            min: 0.01,
            rho_max_halo_radii: 300.0,
            z_max_halo_radii: 3000.0,
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self {
            opening_angle: 0.5,
            softening: 1e-4,
        }
    }
}

impl Default for Control {
    fn default() -> Self {
        Self {
            num_threads: None,
            seed: 0,
            potential_file: "potential_data.txt".into(),
            force_yes: false,
            output: "init.cbor".into(),
        }
    }
}

impl Disk {
    fn default_max_radius() -> f64 {
        60.0
    }
}




// ============================================================================
fn validate_mass_and_count(name: &str, mass: f64, count: usize) -> anyhow::Result<()> {
    if !mass.is_finite() || mass < 0.0 {
        anyhow::bail!("{}.mass must be finite and >= 0", name)
    }
    if count > 0 && mass == 0.0 {
        anyhow::bail!("{}.mass must be > 0 when {}.count > 0", name, name)
    }
    Ok(())
}

impl Spherical {
    pub fn validate(&self, name: &str) -> anyhow::Result<()> {
        validate_mass_and_count(name, self.mass, self.count)?;

        if self.scale_radius <= 0.0 {
            anyhow::bail!("{}.scale_radius must be > 0", name)
        }
        Ok(())
    }

    pub fn profile(&self) -> Dehnen {
        Dehnen::new(self.mass, self.scale_radius, self.core)
    }
}

impl Disk {
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_mass_and_count("disk", self.mass, self.count)?;

        if self.scale_length <= 0.0 || self.scale_height <= 0.0 {
            anyhow::bail!("disk.scale_length and disk.scale_height must be > 0")
        }
        if self.max_radius <= 0.0 {
            anyhow::bail!("disk.max_radius must be > 0")
        }
        if self.velocity_factor < 0.0 {
            anyhow::bail!("disk.velocity_factor must be >= 0")
        }
        Ok(())
    }

    pub fn profile(&self) -> ExponentialDisk {
        ExponentialDisk::new(self.mass, self.scale_length, self.scale_height)
    }
}

impl Gas {
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_mass_and_count("gas", self.mass, self.count)?;

        if self.scale_height_ratio <= 0.0 {
            anyhow::bail!("gas.scale_height_ratio must be > 0")
        }
        Ok(())
    }
}

impl Grid {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.num_rho < 3 || self.num_z < 3 {
            anyhow::bail!("grid.num_rho and grid.num_z must be >= 3")
        }
        if self.min <= 0.0 {
            anyhow::bail!("grid.min must be > 0")
        }
        Ok(())
    }

    pub fn num_cells(&self) -> usize {
        self.num_rho * self.num_z
    }
}

impl Tree {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.opening_angle < 0.0 {
            anyhow::bail!("tree.opening_angle must be >= 0")
        }
        if self.softening < 0.0 {
            anyhow::bail!("tree.softening must be >= 0")
        }
        Ok(())
    }
}

impl Control {
    pub fn validate(&self, num_cells: usize) -> anyhow::Result<()> {
        if let Some(num_threads) = self.num_threads {
            if num_threads == 0 || num_threads >= 1024 {
                anyhow::bail!("num_threads must be > 0 and < 1024")
            }
            if num_cells % num_threads != 0 {
                anyhow::bail!("num_threads = {} must be a factor of the {} grid cells", num_threads, num_cells)
            }
        }
        if self.potential_file.is_empty() || self.output.is_empty() {
            anyhow::bail!("control.potential_file and control.output must not be empty")
        }
        Ok(())
    }
}




// ============================================================================
/**
 * The largest divisor of `n` that does not exceed `limit`.
 */
fn largest_divisor_at_most(n: usize, limit: usize) -> usize {
    (1..=limit.max(1)).rev().find(|d| n % d == 0).unwrap_or(1)
}

impl Configuration {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.halo.validate("halo")?;
        self.bulge.validate("bulge")?;
        self.disk.validate()?;
        self.gas.validate()?;
        self.grid.validate()?;
        self.tree.validate()?;
        self.control.validate(self.grid.num_cells())?;

        let axes_max = self.halo.scale_radius * f64::min(self.grid.rho_max_halo_radii, self.grid.z_max_halo_radii);

        if axes_max <= self.grid.min {
            anyhow::bail!("the grid must extend beyond grid.min = {}", self.grid.min)
        }
        Ok(())
    }

    /**
     * Force the gas mass and count to zero when the gas is disabled.
     */
    pub fn normalize(mut self) -> Self {
        if !self.gas.enabled {
            self.gas.mass = 0.0;
            self.gas.count = 0;
        }
        self
    }

    pub fn gas_profile(&self) -> ExponentialDisk {
        ExponentialDisk::new(self.gas.mass, self.disk.scale_length, self.gas.scale_height_ratio * self.disk.scale_height)
    }

    pub fn grid_axes(&self) -> GridAxes {
        let a = self.halo.scale_radius;
        let g = &self.grid;
        GridAxes::new(
            Axis::logspace(g.min, g.rho_max_halo_radii * a, g.num_rho),
            Axis::logspace(g.min, g.z_max_halo_radii * a, g.num_z))
    }

    /**
     * The number of grid workers: the configured value, or else the largest
     * factor of the number of grid cells not exceeding the number of CPUs.
     */
    pub fn num_workers(&self) -> usize {
        self.control.num_threads.unwrap_or_else(|| largest_divisor_at_most(self.grid.num_cells(), num_cpus::get()))
    }

    /**
     * A canonical rendering of every parameter that affects the potential
     * grid.
     */
    pub fn grid_fingerprint(&self) -> String {
        let parameters = GridParameters {
            halo: &self.halo,
            bulge: &self.bulge,
            disk: DiskGeometry {
                mass: self.disk.mass,
                count: self.disk.count,
                scale_length: self.disk.scale_length,
                scale_height: self.disk.scale_height,
                max_radius: self.disk.max_radius,
            },
            gas: &self.gas,
            grid: &self.grid,
            tree: &self.tree,
            seed: self.control.seed,
        };
        serde_yaml::to_string(&parameters).unwrap_or_default()
    }
}




// ============================================================================
impl App {

    /**
     * Return self as a result, which will be in an error state if any of the
     * configuration items did not pass validation.
     */
    pub fn validate(self) -> anyhow::Result<Self> {
        self.config.validate()?;
        Ok(self)
    }

    /**
     * Construct a new App instance from a user configuration, after applying
     * the `key.path=value` overrides in order.
     */
    pub fn from_config(mut config: Configuration, overrides: &[String]) -> Result<Self, Error> {
        for extra_config_str in overrides {
            config.patch_from_key_val(extra_config_str)?
        }
        Ok(Self { config: config.normalize(), version: VERSION_AND_BUILD.to_string() })
    }

    /**
     * Construct a new App instance from a config.yaml file.
     */
    pub fn from_file(filename: &str, overrides: &[String]) -> Result<Self, Error> {
        match Path::new(&filename).extension().and_then(OsStr::to_str) {
            Some("yaml") | Some("yml") => Self::from_config(serde_yaml::from_str(&read_to_string(filename)?)?, overrides),
            _ => Err(Error::UnknownInputType(filename.to_string())),
        }
    }

    /**
     * Construct a new App instance from a preset (hard-coded) configuration
     * name, or otherwise an input file if no matching preset is found.
     */
    pub fn from_preset_or_file(input: &str, overrides: &[String]) -> Result<Self, Error> {
        match input {
            "milky_way" => Self::from_config(serde_yaml::from_str(std::include_str!("../setups/milky_way.yaml"))?, overrides),
            _ => Self::from_file(input, overrides),
        }
    }
}




// ============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn milky_way(overrides: &[&str]) -> App {
        let overrides: Vec<String> = overrides.iter().map(|s| s.to_string()).collect();
        App::from_preset_or_file("milky_way", &overrides).unwrap()
    }

    #[test]
    fn preset_is_valid() {
        let app = milky_way(&[]).validate().unwrap();
        assert!(app.config.gas.enabled);
        assert!(app.config.gas.count > 0);
        assert_eq!(app.config.grid.num_rho, 2000);
        assert_eq!(app.config.disk.max_radius, 60.0);
    }

    #[test]
    fn disabled_gas_has_no_mass_or_particles() {
        let app = milky_way(&["gas.enabled=false"]);
        assert_eq!(app.config.gas.mass, 0.0);
        assert_eq!(app.config.gas.count, 0);
    }

    #[test]
    fn overrides_change_only_the_addressed_field() {
        let base = milky_way(&[]).config;
        let patched = milky_way(&["disk.velocity_factor=0.5"]).config;
        assert_eq!(patched.disk.velocity_factor, 0.5);
        assert_eq!(Configuration { disk: base.disk.clone(), ..patched.clone() }, base);
    }

    #[test]
    fn thread_count_must_divide_the_grid() {
        assert!(milky_way(&["control.num_threads=8"]).validate().is_ok());
        assert!(milky_way(&["control.num_threads=7"]).validate().is_err());
        assert!(milky_way(&["control.num_threads=0"]).validate().is_err());
        assert!(milky_way(&["control.num_threads=2000"]).validate().is_err());
    }

    #[test]
    fn default_worker_count_divides_the_grid() {
        let config = milky_way(&["grid.num_rho=30", "grid.num_z=7"]).config;
        let workers = config.num_workers();
        assert!(workers >= 1 && workers <= num_cpus::get());
        assert_eq!(210 % workers, 0);
        assert_eq!(largest_divisor_at_most(210, 8), 7);
        assert_eq!(largest_divisor_at_most(13, 4), 1);
    }

    #[test]
    fn invalid_masses_are_rejected() {
        assert!(milky_way(&["halo.mass=-1"]).validate().is_err());
        assert!(milky_way(&["bulge.mass=0"]).validate().is_err());
        assert!(milky_way(&["bulge.mass=0", "bulge.count=0"]).validate().is_ok());
        assert!(milky_way(&["disk.scale_height=0"]).validate().is_err());
    }

    #[test]
    fn grid_axes_follow_the_halo_scale_radius() {
        let config = milky_way(&["grid.num_rho=10", "grid.num_z=20"]).config;
        let axes = config.grid_axes();
        assert_eq!(axes.shape(), (10, 20));
        assert!(f64::abs(axes.rho.last() / (300.0 * config.halo.scale_radius) - 1.0) < 1e-12);
        assert!(f64::abs(axes.z.last() / (3000.0 * config.halo.scale_radius) - 1.0) < 1e-12);
        assert!(f64::abs(axes.rho.first() - 0.01) < 1e-15);
    }

    #[test]
    fn fingerprint_tracks_grid_parameters_only() {
        let base = milky_way(&[]).config;
        assert_eq!(base.grid_fingerprint(), milky_way(&["control.output=other.cbor"]).config.grid_fingerprint());
        assert_ne!(base.grid_fingerprint(), milky_way(&["halo.mass=50"]).config.grid_fingerprint());
        assert_ne!(base.grid_fingerprint(), milky_way(&["control.seed=9"]).config.grid_fingerprint());
        assert_ne!(base.grid_fingerprint(), milky_way(&["disk.scale_height=0.5"]).config.grid_fingerprint());
    }

    #[test]
    fn disk_velocity_factor_does_not_change_the_fingerprint() {
        let base = milky_way(&[]).config;
        let cooler = milky_way(&["disk.velocity_factor=0.3"]).config;
        assert_ne!(base.disk, cooler.disk);
        assert_eq!(base.grid_fingerprint(), cooler.grid_fingerprint());
    }

    #[test]
    fn unknown_input_types_are_rejected() {
        assert!(matches!(App::from_file("galaxy.toml", &[]), Err(Error::UnknownInputType(_))));
    }
}
