//! Numerical building blocks: bracketed root finding, quadrature on unevenly
//! spaced samples, finite differences, and cubic spline slopes.

use ndarray::{Array1, ArrayView1};




// ============================================================================
/// An error type for failed root searches
#[derive(thiserror::Error, Debug, Clone)]
pub enum RootError {

    #[error("the root is not bracketed by [{0:.4e}, {1:.4e}]")]
    NoBracket(f64, f64),

    #[error("the root finder failed to converge in {0} iterations")]
    NoConvergence(usize),
}




// ============================================================================
const BRENT_XTOL: f64 = 2e-12;
const BRENT_RTOL: f64 = 4.0 * f64::EPSILON;
const BRENT_MAX_ITER: usize = 200;

/**
 * Find a root of `f` on [a, b] using Brent's method (inverse quadratic
 * extrapolation with bisection fallback). The function values at the two
 * ends must have opposite signs, or one of them must be zero.
 */
pub fn brent<F>(f: F, a: f64, b: f64) -> Result<f64, RootError>
where
    F: Fn(f64) -> f64
{
    let (mut xpre, mut xcur) = (a, b);
    let (mut fpre, mut fcur) = (f(xpre), f(xcur));
    let (mut xblk, mut fblk) = (0.0, 0.0);
    let (mut spre, mut scur) = (0.0, 0.0);

    if fpre * fcur > 0.0 || fpre.is_nan() || fcur.is_nan() {
        return Err(RootError::NoBracket(a, b))
    }
    if fpre == 0.0 {
        return Ok(xpre)
    }
    if fcur == 0.0 {
        return Ok(xcur)
    }

    for _ in 0..BRENT_MAX_ITER {
        if fpre * fcur < 0.0 {
            xblk = xpre;
            fblk = fpre;
            spre = xcur - xpre;
            scur = spre;
        }
        if fblk.abs() < fcur.abs() {
            xpre = xcur;
            xcur = xblk;
            xblk = xpre;
            fpre = fcur;
            fcur = fblk;
            fblk = fpre;
        }

        let delta = 0.5 * (BRENT_XTOL + BRENT_RTOL * xcur.abs());
        let sbis = 0.5 * (xblk - xcur);

        if fcur == 0.0 || sbis.abs() < delta {
            return Ok(xcur)
        }

        if spre.abs() > delta && fcur.abs() < fpre.abs() {
            let stry = if xpre == xblk {
                -fcur * (xcur - xpre) / (fcur - fpre)
            } else {
                let dpre = (fpre - fcur) / (xpre - xcur);
                let dblk = (fblk - fcur) / (xblk - xcur);
                -fcur * (fblk * dblk - fpre * dpre) / (dblk * dpre * (fblk - fpre))
            };
            if 2.0 * stry.abs() < spre.abs().min(3.0 * sbis.abs() - delta) {
                spre = scur;
                scur = stry;
            } else {
                spre = sbis;
                scur = sbis;
            }
        } else {
            spre = sbis;
            scur = sbis;
        }

        xpre = xcur;
        fpre = fcur;

        if scur.abs() > delta {
            xcur += scur;
        } else {
            xcur += if sbis > 0.0 { delta } else { -delta };
        }
        fcur = f(xcur);
    }
    Err(RootError::NoConvergence(BRENT_MAX_ITER))
}

/**
 * Like [`brent`], but if the root is not bracketed by [a, b] the upper end
 * is pushed outward geometrically a bounded number of times before giving
 * up.
 */
pub fn brent_widening<F>(f: F, a: f64, mut b: f64) -> Result<f64, RootError>
where
    F: Fn(f64) -> f64
{
    for _ in 0..8 {
        match brent(&f, a, b) {
            Err(RootError::NoBracket(..)) => b = a + 10.0 * (b - a),
            result => return result,
        }
    }
    brent(&f, a, b)
}




// ============================================================================
/**
 * Return the trapezoid-rule integral of `ys` from each sample out to the last
 * one, on the (possibly unevenly spaced) abscissae `xs`. Entry `j` of the
 * result equals the integral over `xs[j..]`; the last entry is zero.
 */
pub fn trapezoid_from_end(ys: ArrayView1<f64>, xs: ArrayView1<f64>) -> Array1<f64> {
    let n = ys.len();
    let mut result = Array1::zeros(n);

    for j in (0..n.saturating_sub(1)).rev() {
        result[j] = result[j + 1] + 0.5 * (ys[j] + ys[j + 1]) * (xs[j + 1] - xs[j]);
    }
    result
}

/**
 * Second derivative at the middle of three unevenly spaced points.
 */
pub fn second_derivative(x: [f64; 3], y: [f64; 3]) -> f64 {
    let [x1, x2, x3] = x;
    let [y1, y2, y3] = y;
    2.0 * y1 / ((x2 - x1) * (x3 - x1))
  - 2.0 * y2 / ((x3 - x2) * (x2 - x1))
  + 2.0 * y3 / ((x3 - x2) * (x3 - x1))
}

/**
 * Solve a tridiagonal system with sub-diagonal `a`, diagonal `b`,
 * super-diagonal `c` and right hand side `d` (Thomas algorithm).
 */
fn solve_tridiagonal(a: &[f64], b: &[f64], c: &[f64], d: &[f64]) -> Vec<f64> {
    let n = d.len();
    let mut cp = vec![0.0; n];
    let mut dp = vec![0.0; n];
    let mut x = vec![0.0; n];

    cp[0] = c[0] / b[0];
    dp[0] = d[0] / b[0];

    for i in 1..n {
        let denom = b[i] - a[i] * cp[i - 1];
        cp[i] = c[i] / denom;
        dp[i] = (d[i] - a[i] * dp[i - 1]) / denom;
    }

    x[n - 1] = dp[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = dp[i] - cp[i] * x[i + 1];
    }
    x
}

/**
 * Return the first derivative, at each knot, of the natural cubic spline
 * interpolating (xs, ys). At least three knots are required; with fewer the
 * one-sided finite difference is returned.
 */
pub fn spline_slopes(xs: ArrayView1<f64>, ys: ArrayView1<f64>) -> Array1<f64> {
    let n = xs.len();

    if n < 3 {
        let slope = if n == 2 { (ys[1] - ys[0]) / (xs[1] - xs[0]) } else { 0.0 };
        return Array1::from_elem(n, slope)
    }

    let h: Vec<f64> = (0..n - 1).map(|k| xs[k + 1] - xs[k]).collect();
    let mut a = vec![0.0; n];
    let mut b = vec![1.0; n];
    let mut c = vec![0.0; n];
    let mut d = vec![0.0; n];

    for k in 1..n - 1 {
        a[k] = h[k - 1];
        b[k] = 2.0 * (h[k - 1] + h[k]);
        c[k] = h[k];
        d[k] = 6.0 * ((ys[k + 1] - ys[k]) / h[k] - (ys[k] - ys[k - 1]) / h[k - 1]);
    }

    // m holds the spline's second derivative at each knot
    let m = solve_tridiagonal(&a, &b, &c, &d);

    let mut slopes = Array1::zeros(n);
    for k in 0..n - 1 {
        slopes[k] = (ys[k + 1] - ys[k]) / h[k] - h[k] * (2.0 * m[k] + m[k + 1]) / 6.0;
    }
    let k = n - 1;
    slopes[k] = (ys[k] - ys[k - 1]) / h[k - 1] + h[k - 1] * (m[k - 1] + 2.0 * m[k]) / 6.0;
    slopes
}
