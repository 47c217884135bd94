//! Quadrature with extrapolation (QWE).
//!
//! The half-line is split at the zeros of a Bessel function scaled by
//! $1/\rho$. Each piece is integrated with a fixed Gauss-Legendre rule and
//! the running partial sums, an alternating and slowly convergent series,
//! are accelerated with Wynn's $\varepsilon$ algorithm (the Shanks
//! transformation). Iteration stops when successive extrapolations agree
//! for every kernel or when the interval cap is reached.
//!
//! The first interval, $[0, x_1/\rho]$, grows without bound as $\rho \to 0$
//! while the kernel keeps its own decay scale, so a single fixed rule
//! under-resolves it. It is integrated on a composite rule whose panel
//! count doubles until two successive sums agree to the same tolerance.
//!
//! Key, K., 2012, Is the fast Hankel transform faster than quadrature?
//! Geophysics 77(3), F21-F30.

use std::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use spec_math::Bessel;

use super::gauss::GaussLegendre;
use super::{ConvergenceReport, HankelTransform, KernelSet};
use crate::solver::EmError;

/// Where the integration intervals are split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Breakpoints {
    J0Zeros,
    #[default]
    J1Zeros,
    /// Regular spacing of $\pi$.
    Pi,
}

/// Tolerances and limits for [`QweTransform`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QweConfig {
    #[serde(default = "default_rel_tol")]
    pub rel_tol: f64,
    #[serde(default = "default_abs_tol")]
    pub abs_tol: f64,
    /// Gauss-Legendre points per interval.
    #[serde(default = "default_order")]
    pub order: usize,
    /// Intervals summed before extrapolation starts.
    #[serde(default = "default_delay")]
    pub delay: usize,
    #[serde(default = "default_max_intervals")]
    pub max_intervals: usize,
    /// Panel doublings allowed on the first interval.
    #[serde(default = "default_max_subdivisions")]
    pub max_subdivisions: usize,
    #[serde(default)]
    pub breakpoints: Breakpoints,
    /// Fail with [`EmError::NotConverged`] instead of returning the best
    /// estimate when the interval cap is hit.
    #[serde(default)]
    pub strict: bool,
}

fn default_rel_tol() -> f64 {
    1e-12
}
fn default_abs_tol() -> f64 {
    1e-32
}
fn default_order() -> usize {
    61
}
fn default_delay() -> usize {
    1
}
fn default_max_intervals() -> usize {
    40
}
fn default_max_subdivisions() -> usize {
    10
}

impl Default for QweConfig {
    fn default() -> Self {
        Self {
            rel_tol: default_rel_tol(),
            abs_tol: default_abs_tol(),
            order: default_order(),
            delay: default_delay(),
            max_intervals: default_max_intervals(),
            max_subdivisions: default_max_subdivisions(),
            breakpoints: Breakpoints::default(),
            strict: false,
        }
    }
}

/// A QWE transform instance, owned by one worker.
#[derive(Debug, Clone)]
pub struct QweTransform {
    config: QweConfig,
    rule: GaussLegendre,
    /// Unit breakpoints, starting at 0.
    breaks: Vec<f64>,
    zans: Vec<Complex64>,
    report: ConvergenceReport,
}

impl QweTransform {
    pub fn new(config: QweConfig) -> Self {
        let rule = GaussLegendre::new(config.order.max(1));
        let max = config.max_intervals.max(1);
        let mut breaks = Vec::with_capacity(max + 1);
        breaks.push(0.0);
        breaks.extend((1..=max).map(|m| match config.breakpoints {
            Breakpoints::J0Zeros => bessel_zero(0, m),
            Breakpoints::J1Zeros => bessel_zero(1, m),
            Breakpoints::Pi => m as f64 * PI,
        }));
        Self {
            config,
            rule,
            breaks,
            zans: Vec::new(),
            report: ConvergenceReport::default(),
        }
    }

    pub fn config(&self) -> &QweConfig {
        &self.config
    }

    fn tolerance(&self, value: Complex64) -> f64 {
        self.config.rel_tol * value.norm() + self.config.abs_tol
    }

    /// Integral over the first interval, with a flag per kernel saying
    /// whether panel doubling settled.
    fn first_interval(
        &self,
        rho: f64,
        orders: &[u8],
        kernels: &mut dyn KernelSet,
        work: &mut [Complex64],
    ) -> (Vec<Complex64>, Vec<bool>) {
        let zero = Complex64::new(0.0, 0.0);
        let nk = orders.len();
        let b = self.breaks[1] / rho;
        let mut coarse = vec![zero; nk];
        integrate_panels(&self.rule, 0.0, b, 1, rho, orders, kernels, work, &mut coarse);

        let mut resolved = vec![self.config.max_subdivisions == 0; nk];
        let mut panels = 1;
        for _ in 0..self.config.max_subdivisions {
            panels *= 2;
            let mut fine = vec![zero; nk];
            integrate_panels(&self.rule, 0.0, b, panels, rho, orders, kernels, work, &mut fine);
            for (k, flag) in resolved.iter_mut().enumerate() {
                *flag = (fine[k] - coarse[k]).norm() <= self.tolerance(fine[k]);
            }
            coarse = fine;
            if resolved.iter().all(|&r| r) {
                break;
            }
        }
        if panels > 2 {
            log::debug!("QWE at rho = {rho:.4e} m: first interval split into {panels} panels");
        }
        (coarse, resolved)
    }
}

/// Add $\int_a^b K_k(\lambda) J_{n_k}(\lambda\rho)\,d\lambda$ over `panels`
/// equal Gauss-Legendre panels into `out`.
#[allow(clippy::too_many_arguments)]
fn integrate_panels(
    rule: &GaussLegendre,
    a: f64,
    b: f64,
    panels: usize,
    rho: f64,
    orders: &[u8],
    kernels: &mut dyn KernelSet,
    work: &mut [Complex64],
    out: &mut [Complex64],
) {
    let width = (b - a) / panels as f64;
    for p in 0..panels {
        let lo = a + p as f64 * width;
        for (lambda, w) in rule.on_interval(lo, lo + width) {
            kernels.evaluate(lambda, work);
            let x = lambda * rho;
            let j0 = x.bessel_jv(0.0);
            let j1 = x.bessel_jv(1.0);
            for ((o, &k), &order) in out.iter_mut().zip(work.iter()).zip(orders) {
                let j = if order == 0 { j0 } else { j1 };
                *o += k * (w * j);
            }
        }
    }
}

impl HankelTransform for QweTransform {
    fn name(&self) -> &'static str {
        "qwe"
    }

    fn compute_related(&mut self, rho: f64, kernels: &mut dyn KernelSet) -> Result<(), EmError> {
        let nk = kernels.len();
        let zero = Complex64::new(0.0, 0.0);
        let orders: Vec<u8> = (0..nk).map(|k| kernels.bessel_order(k)).collect();
        let max = self.breaks.len() - 1;
        let delay = self.config.delay.min(max.saturating_sub(1));

        let mut work = vec![zero; nk];
        let (mut sums, resolved) = self.first_interval(rho, &orders, kernels, &mut work);
        let mut partials: Vec<Vec<Complex64>> = vec![Vec::with_capacity(max); nk];
        let mut estimate = vec![zero; nk];
        let mut previous: Option<Vec<Complex64>> = None;
        let mut settled = vec![false; nk];
        let mut intervals = 0;

        for i in 0..max {
            if i > 0 {
                let (a, b) = (self.breaks[i] / rho, self.breaks[i + 1] / rho);
                integrate_panels(&self.rule, a, b, 1, rho, &orders, kernels, &mut work, &mut sums);
            }
            intervals = i + 1;
            for (seq, &s) in partials.iter_mut().zip(&sums) {
                seq.push(s);
            }

            if i < delay {
                estimate.copy_from_slice(&sums);
                continue;
            }
            for (est, seq) in estimate.iter_mut().zip(&partials) {
                *est = wynn_epsilon(&seq[delay..]);
            }
            if let Some(prev) = &previous {
                for k in 0..nk {
                    settled[k] = (estimate[k] - prev[k]).norm() <= self.tolerance(estimate[k]);
                }
                if settled.iter().all(|&s| s) {
                    break;
                }
            }
            previous = Some(estimate.clone());
        }

        let failed: Vec<usize> = (0..nk).filter(|&k| !(settled[k] && resolved[k])).collect();
        if let Some(&kernel) = failed.first() {
            if self.config.strict {
                return Err(EmError::NotConverged { kernel, intervals });
            }
            log::warn!(
                "QWE at rho = {rho:.4e} m: {} of {nk} kernels unconverged after {intervals} intervals",
                failed.len()
            );
        }
        self.report = ConvergenceReport { intervals, failed };
        self.zans = estimate;
        Ok(())
    }

    fn zgauss(&self, index: usize) -> Complex64 {
        self.zans[index]
    }

    fn convergence(&self) -> Option<&ConvergenceReport> {
        Some(&self.report)
    }
}

/// Limit of a sequence of partial sums by Wynn's epsilon algorithm.
///
/// Builds the table column by column,
/// $\varepsilon^{(n)}_{k+1} = \varepsilon^{(n+1)}_{k-1} + 1/(\varepsilon^{(n+1)}_k - \varepsilon^{(n)}_k)$,
/// and returns the last entry of the highest even column reached. A
/// vanishing difference means the column has already converged and stops
/// the table there.
pub(crate) fn wynn_epsilon(seq: &[Complex64]) -> Complex64 {
    let zero = Complex64::new(0.0, 0.0);
    let Some(&last) = seq.last() else {
        return zero;
    };
    let mut best = last;
    let mut prev = vec![zero; seq.len()];
    let mut cur = seq.to_vec();
    let mut column = 0usize;

    while cur.len() > 1 {
        let mut next = Vec::with_capacity(cur.len() - 1);
        for j in 0..cur.len() - 1 {
            let diff = cur[j + 1] - cur[j];
            let scale = cur[j].norm().max(cur[j + 1].norm());
            if diff.norm() <= 4.0 * f64::EPSILON * scale {
                return best;
            }
            next.push(prev[j + 1] + 1.0 / diff);
        }
        column += 1;
        prev = cur;
        cur = next;
        if column % 2 == 0 {
            if let Some(&v) = cur.last() {
                best = v;
            }
        }
    }
    best
}

/// The `m`-th positive zero of $J_n$, $n \in \{0, 1\}$.
///
/// McMahon's asymptotic expansion, polished by Newton iteration.
pub(crate) fn bessel_zero(order: u8, m: usize) -> f64 {
    let mu = 4.0 * (order as f64).powi(2);
    let beta = (m as f64 + 0.5 * order as f64 - 0.25) * PI;
    let e = 8.0 * beta;
    let mut x = beta - (mu - 1.0) / e - 4.0 * (mu - 1.0) * (7.0 * mu - 31.0) / (3.0 * e.powi(3));

    let n = order as f64;
    for _ in 0..8 {
        let j = x.bessel_jv(n);
        // J0' = -J1, J1' = J0 - J1 / x
        let dj = if order == 0 {
            -x.bessel_jv(1.0)
        } else {
            x.bessel_jv(0.0) - j / x
        };
        let step = j / dj;
        x -= step;
        if step.abs() <= 1e-15 * x {
            break;
        }
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct Exponential;

    impl KernelSet for Exponential {
        fn len(&self) -> usize {
            2
        }

        fn bessel_order(&self, index: usize) -> u8 {
            index as u8
        }

        fn evaluate(&mut self, lambda: f64, out: &mut [Complex64]) {
            let v = Complex64::new(lambda * (-lambda).exp(), 0.0);
            out[0] = v;
            out[1] = v;
        }
    }

    /// `exp(-0.01 lam)`, slowly decaying so the series oscillates.
    struct SlowDecay;

    impl KernelSet for SlowDecay {
        fn len(&self) -> usize {
            1
        }

        fn bessel_order(&self, _: usize) -> u8 {
            0
        }

        fn evaluate(&mut self, lambda: f64, out: &mut [Complex64]) {
            out[0] = Complex64::new((-0.01 * lambda).exp(), 0.0);
        }
    }

    #[test]
    fn test_bessel_zeros() {
        assert_relative_eq!(bessel_zero(0, 1), 2.404825557695773, epsilon = 1e-12);
        assert_relative_eq!(bessel_zero(0, 2), 5.520078110286311, epsilon = 1e-12);
        assert_relative_eq!(bessel_zero(1, 1), 3.831705970207512, epsilon = 1e-12);
        assert_relative_eq!(bessel_zero(1, 3), 10.17346813506272, epsilon = 1e-11);
    }

    #[test]
    fn test_wynn_accelerates_alternating_series() {
        // ln 2 = 1 - 1/2 + 1/3 - ...
        let mut s = 0.0;
        let seq: Vec<Complex64> = (1..=12)
            .map(|k| {
                s += if k % 2 == 1 { 1.0 } else { -1.0 } / k as f64;
                Complex64::new(s, 0.0)
            })
            .collect();
        let est = wynn_epsilon(&seq);
        assert_relative_eq!(est.re, 2f64.ln(), max_relative = 1e-8);
    }

    #[test]
    fn test_exponential_kernel() {
        let mut t = QweTransform::new(QweConfig::default());
        for rho in [1e-3, 0.01, 0.1, 0.5, 1.0, 2.0, 4.0, 10.0] {
            t.compute_related(rho, &mut Exponential).unwrap();
            let d = (1.0 + rho * rho).powf(-1.5);
            assert_relative_eq!(t.zgauss(0).re, d, max_relative = 1e-10);
            assert_relative_eq!(t.zgauss(1).re, rho * d, max_relative = 1e-10);
            assert!(t.convergence().unwrap().is_converged());
        }
    }

    #[test]
    fn test_slow_kernel_extrapolates() {
        // int exp(-a lam) J0(lam rho) = 1 / sqrt(a^2 + rho^2)
        let mut t = QweTransform::new(QweConfig {
            breakpoints: Breakpoints::J0Zeros,
            ..QweConfig::default()
        });
        t.compute_related(1.0, &mut SlowDecay).unwrap();
        assert_relative_eq!(t.zgauss(0).re, 1.0 / (1e-4f64 + 1.0).sqrt(), max_relative = 1e-10);
    }

    #[test]
    fn test_unresolved_first_interval_is_reported() {
        // at rho = 1e-3 the first interval spans [0, 3832] against a decay
        // length of one, which one doubling cannot resolve
        let mut t = QweTransform::new(QweConfig {
            max_subdivisions: 1,
            ..QweConfig::default()
        });
        t.compute_related(1e-3, &mut Exponential).unwrap();
        assert!(!t.convergence().unwrap().is_converged());

        let mut t = QweTransform::new(QweConfig::default());
        t.compute_related(1e-3, &mut Exponential).unwrap();
        assert!(t.convergence().unwrap().is_converged());
    }

    #[test]
    fn test_cap_is_reported_or_strict() {
        let config = QweConfig {
            max_intervals: 3,
            rel_tol: 1e-15,
            abs_tol: 0.0,
            ..QweConfig::default()
        };
        let mut lenient = QweTransform::new(config.clone());
        lenient.compute_related(1.0, &mut SlowDecay).unwrap();
        let report = lenient.convergence().unwrap();
        assert_eq!(report.intervals, 3);
        assert_eq!(report.failed, vec![0]);

        let mut strict = QweTransform::new(QweConfig { strict: true, ..config });
        assert!(matches!(
            strict.compute_related(1.0, &mut SlowDecay),
            Err(EmError::NotConverged { kernel: 0, intervals: 3 })
        ));
    }
}
