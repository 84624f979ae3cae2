//! Interpolation of sampled 1-D profiles.
//!
//! Height profiles (figure error, roughness realizations) are given at a fixed native step which in general
//! differs from the sampling of the mirror surface. A natural cubic spline passes exactly through every
//! native sample and is smooth (continuous first and second derivative) in between.
use crate::error::{WiseError, WiseResult};

/// A natural cubic spline interpolator for real-valued data.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// second derivatives at each knot
    y2s: Vec<f64>,
}

impl CubicSpline {
    /// Construct a natural cubic spline from data points.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - `xs` and `ys` have different lengths.
    ///   - less than two points are given.
    ///   - `xs` is not strictly increasing or contains non-finite values.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> WiseResult<Self> {
        if xs.len() != ys.len() {
            return Err(WiseError::Other(
                "spline abscissas and ordinates must have equal length".into(),
            ));
        }
        if xs.len() < 2 {
            return Err(WiseError::Other(
                "spline needs at least two data points".into(),
            ));
        }
        if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
            return Err(WiseError::Other("spline data must be finite".into()));
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(WiseError::Other(
                "spline abscissas must be strictly increasing".into(),
            ));
        }
        let n = xs.len();
        let mut y2s = vec![0.0; n];
        let mut u = vec![0.0; n - 1];
        // tridiagonal forward sweep
        for i in 1..n - 1 {
            let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
            let p = sig.mul_add(y2s[i - 1], 2.0);
            y2s[i] = (sig - 1.0) / p;
            u[i] = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i])
                - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
            u[i] = (6.0 * u[i] / (xs[i + 1] - xs[i - 1]) - sig * u[i - 1]) / p;
        }
        for k in (0..n - 2).rev() {
            y2s[k + 1] = y2s[k + 1].mul_add(y2s[k + 2], u[k + 1]);
        }
        Ok(Self { xs, ys, y2s })
    }
    /// Lower and upper bound of the data range.
    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }
    /// Evaluate the spline at `x`.
    ///
    /// Outside of the data range the value of the nearest end point is returned.
    #[must_use]
    pub fn evaluate(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[n - 1] {
            return self.ys[n - 1];
        }
        let hi = self.xs.partition_point(|v| *v <= x).min(n - 1);
        let lo = hi - 1;
        let h = self.xs[hi] - self.xs[lo];
        let a = (self.xs[hi] - x) / h;
        let b = (x - self.xs[lo]) / h;
        a * self.ys[lo]
            + b * self.ys[hi]
            + ((a * a).mul_add(a, -a) * self.y2s[lo] + (b * b).mul_add(b, -b) * self.y2s[hi]) * h
                * h
                / 6.0
    }
    /// Evaluate the spline at all given positions.
    #[must_use]
    pub fn evaluate_all(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|x| self.evaluate(*x)).collect()
    }
}

/// Piecewise linear interpolation of `(xs, ys)` at `x` with constant extrapolation.
///
/// `xs` must be sorted in increasing order and must not be empty.
#[must_use]
pub fn interp_linear(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len();
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    let hi = xs.partition_point(|v| *v <= x).min(n - 1);
    let lo = hi - 1;
    let t = (x - xs[lo]) / (xs[hi] - xs[lo]);
    t.mul_add(ys[hi] - ys[lo], ys[lo])
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    #[test]
    fn new_wrong() {
        assert!(CubicSpline::new(vec![0.0, 1.0], vec![0.0]).is_err());
        assert!(CubicSpline::new(vec![0.0], vec![0.0]).is_err());
        assert!(CubicSpline::new(vec![0.0, 0.0], vec![0.0, 1.0]).is_err());
        assert!(CubicSpline::new(vec![0.0, f64::NAN], vec![0.0, 1.0]).is_err());
    }
    #[test]
    fn passes_through_data_points() {
        let xs = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = vec![2.0, 3.0, 5.0, 4.0, 1.0];
        let spline = CubicSpline::new(xs.clone(), ys.clone()).unwrap();
        for (x, y) in xs.iter().zip(ys.iter()) {
            assert_abs_diff_eq!(spline.evaluate(*x), *y, epsilon = 1e-12);
        }
    }
    #[test]
    fn reproduces_straight_line() {
        let xs: Vec<f64> = (0..6).map(f64::from).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0f64.mul_add(*x, 1.0)).collect();
        let spline = CubicSpline::new(xs, ys).unwrap();
        assert_abs_diff_eq!(spline.evaluate(2.5), 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(spline.evaluate(0.1), 1.2, epsilon = 1e-12);
    }
    #[test]
    fn constant_extrapolation() {
        let spline = CubicSpline::new(vec![0.0, 1.0, 2.0], vec![1.0, 3.0, 2.0]).unwrap();
        assert_eq!(spline.evaluate(-1.0), 1.0);
        assert_eq!(spline.evaluate(5.0), 2.0);
        assert_eq!(spline.range(), (0.0, 2.0));
    }
    #[test]
    fn linear() {
        let xs = [0.0, 1.0, 3.0];
        let ys = [0.0, 2.0, 0.0];
        assert_abs_diff_eq!(interp_linear(&xs, &ys, 0.5), 1.0);
        assert_abs_diff_eq!(interp_linear(&xs, &ys, 2.0), 1.0);
        assert_abs_diff_eq!(interp_linear(&xs, &ys, -1.0), 0.0);
        assert_abs_diff_eq!(interp_linear(&xs, &ys, 4.0), 0.0);
    }
}
