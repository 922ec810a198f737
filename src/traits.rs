/**
 * Implemented by mass components whose density can be evaluated at any
 * cylindrical radius and height
 */
pub trait DensityField {

    /**
     * Return the mass density at cylindrical radius `rho` and height `z`.
     */
    fn density_at(&self, rho: f64, z: f64) -> f64;
}




/**
 * Capability interface to a gravitational force tree: point masses are
 * accumulated with `insert`, then the (approximate) potential of all inserted
 * masses can be evaluated anywhere with `potential`. The potential includes
 * the gravitational constant and is negative for positive masses.
 */
pub trait ForceTree: Send + Sync {

    /**
     * Add a point mass at the given position.
     */
    fn insert(&mut self, position: [f64; 3], mass: f64);

    /**
     * Return the gravitational potential at the given position, due to all
     * masses inserted so far.
     */
    fn potential(&self, position: [f64; 3]) -> f64;
}
