//! Cubic spline interpolation over complex-valued data.
//!
//! Lagged Hankel transforms produce a field response at a geometric ladder
//! of offsets. A natural cubic spline through those samples gives a smooth,
//! continuous response at any offset in between. The tridiagonal system
//! has real coefficients, so real and imaginary parts are interpolated in a
//! single pass.

use num_complex::Complex64;
use thiserror::Error;

/// Errors raised when building a spline.
#[derive(Debug, Error)]
pub enum SplineError {
    #[error("Knots and values must have equal length ({knots} vs {values})")]
    LengthMismatch { knots: usize, values: usize },

    #[error("Need at least 2 data points, got {0}")]
    TooFewPoints(usize),

    #[error("Knots must be strictly increasing at index {0}")]
    NotIncreasing(usize),
}

/// A natural cubic spline interpolator for complex-valued data.
///
/// Given $n$ data points $(x_i, y_i)$, constructs piecewise cubic polynomials
/// with continuous first and second derivatives and zero curvature at the
/// end knots.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    /// Sorted x values (knots).
    xs: Vec<f64>,
    /// Corresponding y values.
    ys: Vec<Complex64>,
    /// Second derivatives at each knot (computed during construction).
    y2s: Vec<Complex64>,
}

impl CubicSpline {
    /// Construct a natural cubic spline from data points.
    ///
    /// # Arguments
    /// * `xs` - Strictly increasing x values.
    /// * `ys` - Corresponding y values (same length as `xs`).
    pub fn new(xs: Vec<f64>, ys: Vec<Complex64>) -> Result<Self, SplineError> {
        if xs.len() != ys.len() {
            return Err(SplineError::LengthMismatch {
                knots: xs.len(),
                values: ys.len(),
            });
        }
        if xs.len() < 2 {
            return Err(SplineError::TooFewPoints(xs.len()));
        }
        if let Some(i) = (1..xs.len()).find(|&i| xs[i] <= xs[i - 1]) {
            return Err(SplineError::NotIncreasing(i));
        }

        let n = xs.len();
        let zero = Complex64::new(0.0, 0.0);
        let mut y2s = vec![zero; n];
        let mut diag = vec![0.0; n];
        let mut u = vec![zero; n - 1];

        // Forward sweep (tridiagonal system for natural spline)
        for i in 1..n - 1 {
            let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
            let p = sig * diag[i - 1] + 2.0;
            diag[i] = (sig - 1.0) / p;
            let slope = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i])
                - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
            u[i] = (6.0 * slope / (xs[i + 1] - xs[i - 1]) - sig * u[i - 1]) / p;
        }

        // Back substitution
        for k in (0..n - 2).rev() {
            y2s[k + 1] = diag[k + 1] * y2s[k + 2] + u[k + 1];
        }

        Ok(Self { xs, ys, y2s })
    }

    /// Range of knots covered by the spline.
    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Evaluate the spline at a given x value.
    ///
    /// Extrapolation beyond the data range uses the boundary polynomial.
    pub fn evaluate(&self, x: f64) -> Complex64 {
        let n = self.xs.len();

        // Binary search for the enclosing interval
        let mut lo = 0;
        let mut hi = n - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.xs[mid] > x {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        let h = self.xs[hi] - self.xs[lo];
        let a = (self.xs[hi] - x) / h;
        let b = (x - self.xs[lo]) / h;

        a * self.ys[lo]
            + b * self.ys[hi]
            + ((a * a * a - a) * self.y2s[lo] + (b * b * b - b) * self.y2s[hi]) * (h * h / 6.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_spline_passes_through_data_points() {
        let xs = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let ys: Vec<Complex64> = [2.0, 3.0, 5.0, 4.0, 1.0]
            .iter()
            .map(|&y| Complex64::new(y, -0.5 * y))
            .collect();
        let spline = CubicSpline::new(xs.clone(), ys.clone()).unwrap();

        for (x, y) in xs.iter().zip(ys.iter()) {
            let result = spline.evaluate(*x);
            assert!(
                (result - y).norm() < 1e-10,
                "Spline({}) = {} but expected {}",
                x,
                result,
                y
            );
        }
    }

    #[test]
    fn test_smooth_function_between_knots() {
        let xs: Vec<f64> = (0..41).map(|i| i as f64 * 0.1).collect();
        let ys: Vec<Complex64> = xs.iter().map(|&x| Complex64::new(x.sin(), x.cos())).collect();
        let spline = CubicSpline::new(xs, ys).unwrap();

        for &x in &[0.55, 1.23, 2.71, 3.33] {
            let v = spline.evaluate(x);
            assert_relative_eq!(v.re, f64::sin(x), epsilon = 1e-4);
            assert_relative_eq!(v.im, f64::cos(x), epsilon = 1e-4);
        }
    }

    #[test]
    fn test_rejects_bad_input() {
        let one = Complex64::new(1.0, 0.0);
        assert!(matches!(
            CubicSpline::new(vec![0.0, 1.0], vec![one]),
            Err(SplineError::LengthMismatch { .. })
        ));
        assert!(matches!(
            CubicSpline::new(vec![0.0], vec![one]),
            Err(SplineError::TooFewPoints(1))
        ));
        assert!(matches!(
            CubicSpline::new(vec![0.0, 1.0, 1.0], vec![one, one, one]),
            Err(SplineError::NotIncreasing(2))
        ));
    }
}
