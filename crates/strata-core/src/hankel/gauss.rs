//! Gauss-Legendre quadrature rules.
//!
//! Nodes and weights on $[-1, 1]$ come from the Golub-Welsch eigenproblem:
//! the nodes are the eigenvalues of the symmetric Jacobi matrix of the
//! Legendre recurrence, and each weight is $2 v_0^2$ where $v_0$ is the
//! first component of the matching normalised eigenvector.

use faer::{Mat, Side};

/// A Gauss-Legendre rule on $[-1, 1]$, nodes ascending.
#[derive(Debug, Clone)]
pub struct GaussLegendre {
    pub nodes: Vec<f64>,
    pub weights: Vec<f64>,
}

impl GaussLegendre {
    /// The `n`-point rule, exact for polynomials of degree `2n - 1`.
    pub fn new(n: usize) -> Self {
        if n == 0 {
            return Self { nodes: Vec::new(), weights: Vec::new() };
        }
        let jacobi = Mat::<f64>::from_fn(n, n, |i, j| {
            let k = i.max(j);
            if i.abs_diff(j) == 1 {
                let k = k as f64;
                k / (4.0 * k * k - 1.0).sqrt()
            } else {
                0.0
            }
        });
        let evd = jacobi.selfadjoint_eigendecomposition(Side::Lower);
        let s = evd.s().column_vector();
        let u = evd.u();

        let mut pairs: Vec<(f64, f64)> = (0..n)
            .map(|j| {
                let v0 = u.read(0, j);
                (s.read(j), 2.0 * v0 * v0)
            })
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        Self {
            nodes: pairs.iter().map(|p| p.0).collect(),
            weights: pairs.iter().map(|p| p.1).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes and weights mapped onto `[a, b]`.
    pub fn on_interval(&self, a: f64, b: f64) -> impl Iterator<Item = (f64, f64)> + '_ {
        let mid = 0.5 * (a + b);
        let half = 0.5 * (b - a);
        self.nodes
            .iter()
            .zip(&self.weights)
            .map(move |(&x, &w)| (mid + half * x, half * w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_weights_sum_to_interval_length() {
        for n in [1, 2, 5, 9, 16] {
            let gl = GaussLegendre::new(n);
            let total: f64 = gl.weights.iter().sum();
            assert_relative_eq!(total, 2.0, max_relative = 1e-13);
        }
    }

    #[test]
    fn test_three_point_rule() {
        let gl = GaussLegendre::new(3);
        assert_relative_eq!(gl.nodes[0], -(0.6f64).sqrt(), epsilon = 1e-14);
        assert_relative_eq!(gl.nodes[1], 0.0, epsilon = 1e-14);
        assert_relative_eq!(gl.weights[1], 8.0 / 9.0, epsilon = 1e-14);
        assert_relative_eq!(gl.weights[2], 5.0 / 9.0, epsilon = 1e-14);
    }

    #[test]
    fn test_exact_for_high_degree_polynomial() {
        let gl = GaussLegendre::new(9);
        // x^16 on [0, 2] = 2^17 / 17
        let integral: f64 = gl.on_interval(0.0, 2.0).map(|(x, w)| w * x.powi(16)).sum();
        assert_relative_eq!(integral, 2f64.powi(17) / 17.0, max_relative = 1e-12);
    }
}
