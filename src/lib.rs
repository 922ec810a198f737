//! Initial conditions for a galaxy with a dark matter halo, stellar disk,
//! bulge, and gaseous disk.




// ============================================================================
pub mod app;
pub mod dispersion;
pub mod galaxy;
pub mod io;
pub mod mesh;
pub mod numerics;
pub mod particles;
pub mod patch;
pub mod potential;
pub mod profiles;
pub mod sampling;
pub mod tasks;
pub mod thermal;
pub mod traits;
pub mod tree;
pub mod units;
pub mod velocity;
