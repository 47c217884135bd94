//! Analytic design of log-spaced Hankel filters.
//!
//! With $\lambda = e^{s}/\rho$ the transform becomes a correlation of the
//! sampled kernel with $h_n(s) = e^{s} J_n(e^{s})$. Band-limited
//! interpolation of samples spaced $\Delta$ apart gives the weights
//!
//! $$
//! W_n(t) = \frac{\Delta}{\pi} \int_0^{\pi/\Delta} \sigma(\omega)
//!          \cos\bigl(\omega t + \phi_n(\omega)\bigr)\, d\omega,
//! \qquad
//! \phi_n(\omega) = -\omega \ln 2 - 2\,\mathrm{Im}\,\ln\Gamma\!\left(\tfrac{n + 1 + i\omega}{2}\right)
//! $$
//!
//! where $\phi_n$ is the phase of the Mellin transform of $J_n$ (its modulus
//! is exactly one) and $\sigma$ is a tanh taper that rolls off just below
//! the Nyquist frequency to suppress Gibbs ringing.

use std::f64::consts::{LN_2, PI};

use num_complex::Complex64;

use super::filter::DigitalFilter;
use super::gauss::GaussLegendre;

const NODES_PER_PANEL: usize = 16;

/// Taper centre, in taper widths below the Nyquist frequency.
const TAPER_OFFSET: f64 = 6.0;

/// Parameters of one generated filter.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FilterDesign {
    pub points: usize,
    /// Log-spacing $\Delta$ between abscissae.
    pub spacing: f64,
    /// Log of the first abscissa.
    pub first: f64,
    /// Width of the tanh taper (in $\omega$).
    pub taper_width: f64,
}

pub(crate) const DESIGN_101: FilterDesign = FilterDesign {
    points: 101,
    spacing: 0.19,
    first: -11.4,
    taper_width: 0.6,
};

pub(crate) const DESIGN_201: FilterDesign = FilterDesign {
    points: 201,
    spacing: 0.14,
    first: -16.0,
    taper_width: 1.2,
};

pub(crate) const DESIGN_801: FilterDesign = FilterDesign {
    points: 801,
    spacing: 0.04,
    first: -18.0,
    taper_width: 3.0,
};

impl FilterDesign {
    fn log_abscissa(&self, k: usize) -> f64 {
        self.first + k as f64 * self.spacing
    }

    /// Compute abscissae and J0/J1 weights.
    pub fn build(&self, name: &'static str) -> DigitalFilter {
        let nyquist = PI / self.spacing;
        let centre = nyquist - TAPER_OFFSET * self.taper_width;
        let last = self.log_abscissa(self.points.saturating_sub(1));
        let extent = self.first.abs().max(last.abs()) + nyquist.ln().max(0.0) + 1.0;

        // About one oscillation of the integrand per panel.
        let panels = (nyquist * extent / (2.0 * PI)).ceil() as usize + 16;
        let width = nyquist / panels as f64;
        let gl = GaussLegendre::new(NODES_PER_PANEL);

        // (omega, weight * taper, phase J0, phase J1)
        let mut samples = Vec::with_capacity(panels * NODES_PER_PANEL);
        for p in 0..panels {
            let a = p as f64 * width;
            for (omega, w) in gl.on_interval(a, a + width) {
                let taper = 0.5 * (1.0 - ((omega - centre) / self.taper_width).tanh());
                samples.push((omega, w * taper, bessel_phase(0, omega), bessel_phase(1, omega)));
            }
        }

        let scale = self.spacing / PI;
        let mut abscissae = Vec::with_capacity(self.points);
        let mut j0 = Vec::with_capacity(self.points);
        let mut j1 = Vec::with_capacity(self.points);
        for k in 0..self.points {
            let t = self.log_abscissa(k);
            let (mut w0, mut w1) = (0.0, 0.0);
            for &(omega, w, phi0, phi1) in &samples {
                w0 += w * (omega * t + phi0).cos();
                w1 += w * (omega * t + phi1).cos();
            }
            abscissae.push(t.exp());
            j0.push(scale * w0);
            j1.push(scale * w1);
        }

        log::debug!(
            "Designed {name}: {} points, spacing {}, {} quadrature nodes",
            self.points,
            self.spacing,
            samples.len()
        );
        DigitalFilter::new(name, abscissae, j0, j1)
    }
}

/// Phase of $\int_0^\infty J_n(u)\, u^{-i\omega}\, du$.
fn bessel_phase(order: u32, omega: f64) -> f64 {
    let z = Complex64::new((order as f64 + 1.0) / 2.0, omega / 2.0);
    -omega * LN_2 - 2.0 * ln_gamma(z).im
}

/// Continuous branch of $\ln\Gamma(z)$ for $\mathrm{Re}\,z > 0$.
///
/// Stirling's series at $z + 10$, shifted back with the recurrence.
pub(crate) fn ln_gamma(z: Complex64) -> Complex64 {
    const SHIFT: usize = 10;
    let w = z + SHIFT as f64;
    let inv = w.inv();
    let inv2 = inv * inv;
    let series = inv
        * (1.0 / 12.0
            - inv2 * (1.0 / 360.0 - inv2 * (1.0 / 1260.0 - inv2 * (1.0 / 1680.0 - inv2 / 1188.0))));
    let mut result = (w - 0.5) * w.ln() - w + 0.5 * (2.0 * PI).ln() + series;
    for k in 0..SHIFT {
        result -= (z + k as f64).ln();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ln_gamma_real_values() {
        assert_relative_eq!(ln_gamma(Complex64::new(1.0, 0.0)).re, 0.0, epsilon = 1e-13);
        assert_relative_eq!(ln_gamma(Complex64::new(2.0, 0.0)).re, 0.0, epsilon = 1e-13);
        assert_relative_eq!(
            ln_gamma(Complex64::new(0.5, 0.0)).re,
            0.5 * PI.ln(),
            epsilon = 1e-13
        );
        assert_relative_eq!(
            ln_gamma(Complex64::new(5.0, 0.0)).re,
            24f64.ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_ln_gamma_modulus_on_half_line() {
        // |Gamma(1/2 + iy)|^2 = pi / cosh(pi y)
        for y in [0.3, 2.0, 7.5] {
            let g = ln_gamma(Complex64::new(0.5, y));
            assert_relative_eq!(
                2.0 * g.re,
                (PI / (PI * y).cosh()).ln(),
                epsilon = 1e-11
            );
        }
    }

    #[test]
    fn test_ln_gamma_is_continuous_in_imaginary_part() {
        let mut prev = ln_gamma(Complex64::new(0.5, 0.0)).im;
        for i in 1..400 {
            let cur = ln_gamma(Complex64::new(0.5, i as f64 * 0.1)).im;
            assert!((cur - prev).abs() < 1.0, "branch jump at {i}");
            prev = cur;
        }
    }

    #[test]
    fn test_phase_vanishes_at_zero_frequency() {
        assert_eq!(bessel_phase(0, 0.0), 0.0);
        assert_eq!(bessel_phase(1, 0.0), 0.0);
    }

    #[test]
    fn test_designed_filter_integrates_exponential() {
        // int_0^inf lam exp(-lam) J0(lam rho) dlam = (1 + rho^2)^(-3/2)
        let filter = DESIGN_101.build("test101");
        for rho in [0.1, 0.5, 1.0, 2.0, 10.0] {
            let sum: f64 = filter
                .abscissae()
                .iter()
                .zip(filter.weights(0))
                .map(|(&a, &w)| {
                    let lam = a / rho;
                    lam * (-lam).exp() * w
                })
                .sum();
            assert_relative_eq!(sum / rho, (1.0 + rho * rho).powf(-1.5), max_relative = 1e-6);
        }
    }
}
