use std::ops::Index;
use ndarray::{Array1, ArrayView1};
use serde::{Serialize, Deserialize};




/**
 * A strictly increasing, logarithmically spaced sequence of sample
 * coordinates
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    values: Array1<f64>,
}


/**
 * The cylindrical radius and height axes shared by every tabulated grid
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridAxes {
    pub rho: Axis,
    pub z: Axis,
}




// ============================================================================
impl Axis {

    /**
     * Return `num_points` points evenly spaced in log10 between `min` and
     * `max`, inclusive. Requires 0 < min < max and at least two points.
     */
    pub fn logspace(min: f64, max: f64, num_points: usize) -> Self {
        debug_assert!(min > 0.0 && max > min && num_points >= 2);
        let (y0, y1) = (min.log10(), max.log10());
        let dy = (y1 - y0) / (num_points - 1) as f64;
        let values = (0..num_points)
            .map(|i| 10f64.powf(y0 + dy * i as f64))
            .collect();
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn view(&self) -> ArrayView1<f64> {
        self.values.view()
    }

    pub fn first(&self) -> f64 {
        self.values[0]
    }

    pub fn last(&self) -> f64 {
        self.values[self.len() - 1]
    }

    /**
     * Return the distance between the sample at `i` and the one after it.
     */
    pub fn spacing(&self, i: usize) -> f64 {
        self.values[i + 1] - self.values[i]
    }

    /**
     * Return the index of the nearest sample at or below `x`, clamped to
     * the range [0, len - 2] so that the pair (i, i + 1) always exists.
     * Values below the first sample (and NaN) map to zero.
     */
    pub fn locate(&self, x: f64) -> usize {
        let (mut lo, mut hi) = (0, self.len());

        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.values[mid] <= x {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo.saturating_sub(1).min(self.len() - 2)
    }

    /**
     * Linearly interpolate the samples `ys`, tabulated on this axis, at `x`.
     * Outside the axis range the end values are returned.
     */
    pub fn interpolate(&self, ys: ArrayView1<f64>, x: f64) -> f64 {
        if x <= self.first() {
            return ys[0]
        }
        if x >= self.last() {
            return ys[self.len() - 1]
        }
        let i = self.locate(x);
        let (x0, x1) = (self.values[i], self.values[i + 1]);
        ys[i] + (x - x0) * (ys[i + 1] - ys[i]) / (x1 - x0)
    }
}

impl Index<usize> for Axis {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.values[i]
    }
}




// ============================================================================
impl GridAxes {
    pub fn new(rho: Axis, z: Axis) -> Self {
        Self { rho, z }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rho.len(), self.z.len())
    }

    pub fn num_cells(&self) -> usize {
        self.rho.len() * self.z.len()
    }

    /**
     * Return the spherical radius of the grid point (i, j).
     */
    pub fn spherical_radius(&self, i: usize, j: usize) -> f64 {
        self.rho[i].hypot(self.z[j])
    }
}
