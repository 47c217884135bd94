//! Digital-filter Hankel transforms.
//!
//! A filter is a set of log-spaced abscissae $a_i$ with J0 and J1 weights.
//! At offset $\rho$ the transform is the dot product
//!
//! $$
//! Z(\rho) = \frac{1}{\rho} \sum_i K(a_i / \rho)\, w_{n,i}
//! $$
//!
//! which costs one kernel evaluation per abscissa and no convergence test.
//!
//! Because the abscissae are geometric, the sample $a_{i}/\rho$ at one
//! offset is the sample $a_{i+\ell}/\rho'$ at $\rho' = \rho\,r^{\ell}$.
//! The lagged mode exploits this: kernels evaluated once on an extended
//! grid serve a whole ladder of offsets, and a cubic spline in $\ln\rho$
//! fills the gaps between rungs.

use std::sync::OnceLock;

use num_complex::Complex64;
use strata_earth::CubicSpline;

use super::design::{DESIGN_101, DESIGN_201, DESIGN_801};
use super::weights::KEY_51;
use super::{HankelMethod, HankelTransform, KernelSet, LaggedTransform};
use crate::solver::EmError;

/// Extra rungs computed beyond each end of a lagged span, keeping spline
/// end effects away from every requested offset.
const GUARD_LAGS: usize = 6;

/// Relative slack when testing an offset against the lagged span.
const SPAN_SLACK: f64 = 1e-9;

/// A fixed set of filter abscissae and J0/J1 weights.
#[derive(Debug, Clone)]
pub struct DigitalFilter {
    name: &'static str,
    abscissae: Vec<f64>,
    j0: Vec<f64>,
    j1: Vec<f64>,
}

static KEY51: OnceLock<DigitalFilter> = OnceLock::new();
static FILTER101: OnceLock<DigitalFilter> = OnceLock::new();
static FILTER201: OnceLock<DigitalFilter> = OnceLock::new();
static FILTER801: OnceLock<DigitalFilter> = OnceLock::new();

impl DigitalFilter {
    pub fn new(name: &'static str, abscissae: Vec<f64>, j0: Vec<f64>, j1: Vec<f64>) -> Self {
        Self { name, abscissae, j0, j1 }
    }

    /// The process-wide filter for `method`.
    ///
    /// Generated filters are designed on first use. QWE has no filter and
    /// falls back to the 801-point one.
    pub fn for_method(method: HankelMethod) -> &'static DigitalFilter {
        match method {
            HankelMethod::Key51 => KEY51.get_or_init(|| {
                DigitalFilter::new(
                    "key51",
                    KEY_51.iter().map(|r| r[0]).collect(),
                    KEY_51.iter().map(|r| r[1]).collect(),
                    KEY_51.iter().map(|r| r[2]).collect(),
                )
            }),
            HankelMethod::Filter101 => FILTER101.get_or_init(|| DESIGN_101.build("filter101")),
            HankelMethod::Filter201 => FILTER201.get_or_init(|| DESIGN_201.build("filter201")),
            HankelMethod::Filter801 | HankelMethod::Qwe => {
                FILTER801.get_or_init(|| DESIGN_801.build("filter801"))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.abscissae.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abscissae.is_empty()
    }

    pub fn abscissae(&self) -> &[f64] {
        &self.abscissae
    }

    /// Weights for Bessel order `order` (0 or 1).
    pub fn weights(&self, order: u8) -> &[f64] {
        if order == 0 {
            &self.j0
        } else {
            &self.j1
        }
    }

    /// Spacing ratio $a_{i+1}/a_i$, above one.
    pub fn spacing_ratio(&self) -> f64 {
        self.abscissae[1] / self.abscissae[0]
    }
}

/// Responses on a ladder of offsets, interpolated in $\ln\rho$.
#[derive(Debug, Clone)]
struct LaggedResponse {
    splines: Vec<CubicSpline>,
    log_span: (f64, f64),
}

/// A digital-filter transform instance.
///
/// Holds per-call scratch, so each worker owns one.
#[derive(Debug, Clone)]
pub struct FilterTransform {
    filter: &'static DigitalFilter,
    zans: Vec<Complex64>,
    work: Vec<Complex64>,
    lagged: Option<LaggedResponse>,
}

impl FilterTransform {
    pub fn new(filter: &'static DigitalFilter) -> Self {
        Self {
            filter,
            zans: Vec::new(),
            work: Vec::new(),
            lagged: None,
        }
    }

    pub fn filter(&self) -> &DigitalFilter {
        self.filter
    }

    /// Offsets covered by the last lagged computation.
    pub fn lagged_span(&self) -> Option<(f64, f64)> {
        self.lagged
            .as_ref()
            .map(|l| (l.log_span.0.exp(), l.log_span.1.exp()))
    }
}

impl HankelTransform for FilterTransform {
    fn name(&self) -> &'static str {
        self.filter.name
    }

    fn compute_related(&mut self, rho: f64, kernels: &mut dyn KernelSet) -> Result<(), EmError> {
        let n = kernels.len();
        let zero = Complex64::new(0.0, 0.0);
        self.zans.clear();
        self.zans.resize(n, zero);
        self.work.resize(n, zero);

        let orders: Vec<u8> = (0..n).map(|k| kernels.bessel_order(k)).collect();
        for (i, &a) in self.filter.abscissae.iter().enumerate() {
            kernels.evaluate(a / rho, &mut self.work);
            for (k, z) in self.zans.iter_mut().enumerate() {
                *z += self.work[k] * self.filter.weights(orders[k])[i];
            }
        }
        for z in &mut self.zans {
            *z /= rho;
        }
        Ok(())
    }

    fn zgauss(&self, index: usize) -> Complex64 {
        self.zans[index]
    }
}

impl LaggedTransform for FilterTransform {
    fn abscissa_ratio(&self) -> f64 {
        1.0 / self.filter.spacing_ratio()
    }

    fn compute_lagged_related(
        &mut self,
        rho_max: f64,
        n_lag: usize,
        kernels: &mut dyn KernelSet,
    ) -> Result<(), EmError> {
        let nk = kernels.len();
        let nf = self.filter.len();
        let ratio = self.filter.spacing_ratio();
        let lags = n_lag.max(1) + 2 * GUARD_LAGS;
        let rho_top = rho_max * ratio.powi(GUARD_LAGS as i32);

        // Kernel values on the extended grid lambda_j = a_j / rho_top.
        let last = self.filter.abscissae[nf - 1];
        let zero = Complex64::new(0.0, 0.0);
        let mut samples = vec![zero; (nf + lags - 1) * nk];
        let mut work = vec![zero; nk];
        for j in 0..nf + lags - 1 {
            let a = if j < nf {
                self.filter.abscissae[j]
            } else {
                last * ratio.powi((j + 1 - nf) as i32)
            };
            kernels.evaluate(a / rho_top, &mut work);
            samples[j * nk..(j + 1) * nk].copy_from_slice(&work);
        }

        // Rung l sits at rho_top / ratio^l; knots run in increasing ln(rho).
        let orders: Vec<u8> = (0..nk).map(|k| kernels.bessel_order(k)).collect();
        let mut knots = Vec::with_capacity(lags);
        let mut values = vec![Vec::with_capacity(lags); nk];
        for l in (0..lags).rev() {
            let rho = rho_top / ratio.powi(l as i32);
            knots.push(rho.ln());
            for (k, column) in values.iter_mut().enumerate() {
                let w = self.filter.weights(orders[k]);
                let sum: Complex64 = (0..nf).map(|m| samples[(l + m) * nk + k] * w[m]).sum();
                column.push(sum / rho);
            }
        }

        let log_span = (knots[0], knots[lags - 1]);
        let splines = values
            .into_iter()
            .map(|column| CubicSpline::new(knots.clone(), column))
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!(
            "Lagged {} over [{:.4e}, {:.4e}] m with {} rungs",
            self.filter.name,
            log_span.0.exp(),
            log_span.1.exp(),
            lags
        );
        self.lagged = Some(LaggedResponse { splines, log_span });
        self.zans.clear();
        self.zans.resize(nk, zero);
        Ok(())
    }

    fn set_lagged_arg(&mut self, rho: f64) -> Result<(), EmError> {
        let (splines, (lo, hi)) = match &self.lagged {
            Some(l) => (&l.splines, l.log_span),
            None => {
                return Err(EmError::LaggedOutOfRange { rho, min: 0.0, max: 0.0 });
            }
        };
        let x = rho.ln();
        let slack = SPAN_SLACK * (hi - lo).abs().max(1.0);
        if !(x >= lo - slack && x <= hi + slack) {
            return Err(EmError::LaggedOutOfRange {
                rho,
                min: lo.exp(),
                max: hi.exp(),
            });
        }
        let x = x.clamp(lo, hi);
        self.zans.clear();
        self.zans.extend(splines.iter().map(|s| s.evaluate(x)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// `lam * exp(-lam)` paired with J0 and J1.
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

    fn exact(rho: f64) -> (f64, f64) {
        let d = (1.0 + rho * rho).powf(-1.5);
        (d, rho * d)
    }

    #[test]
    fn test_key51_table_is_geometric() {
        let f = DigitalFilter::for_method(HankelMethod::Key51);
        assert_eq!(f.len(), 51);
        let r = f.spacing_ratio();
        for w in f.abscissae().windows(2) {
            assert_relative_eq!(w[1] / w[0], r, max_relative = 1e-12);
        }
        assert_relative_eq!(f.abscissae()[25], 1.0);
    }

    #[test]
    fn test_key51_exponential_kernel() {
        let mut t = FilterTransform::new(DigitalFilter::for_method(HankelMethod::Key51));
        for rho in [0.5, 1.0, 2.0, 4.0] {
            t.compute_related(rho, &mut Exponential).unwrap();
            let (j0, j1) = exact(rho);
            assert_relative_eq!(t.zgauss(0).re, j0, max_relative = 1e-4);
            assert_relative_eq!(t.zgauss(1).re, j1, max_relative = 1e-4);
        }
    }

    #[test]
    fn test_lagged_matches_direct_at_rungs_and_between() {
        let mut direct = FilterTransform::new(DigitalFilter::for_method(HankelMethod::Key51));
        let mut lagged = direct.clone();
        let n_lag = lagged.lags_for_span(0.8, 5.0);
        lagged.compute_lagged_related(5.0, n_lag, &mut Exponential).unwrap();

        for rho in [5.0, 3.3, 2.0, 1.1, 0.8] {
            direct.compute_related(rho, &mut Exponential).unwrap();
            lagged.set_lagged_arg(rho).unwrap();
            for k in 0..2 {
                assert_relative_eq!(
                    lagged.zgauss(k).re,
                    direct.zgauss(k).re,
                    max_relative = 1e-3
                );
            }
        }
    }

    #[test]
    fn test_lagged_out_of_range() {
        let mut t = FilterTransform::new(DigitalFilter::for_method(HankelMethod::Key51));
        assert!(t.set_lagged_arg(1.0).is_err());
        let n_lag = t.lags_for_span(1.0, 2.0);
        t.compute_lagged_related(2.0, n_lag, &mut Exponential).unwrap();
        let (lo, hi) = t.lagged_span().unwrap();
        assert!(lo < 1.0 && hi > 2.0);
        assert!(matches!(
            t.set_lagged_arg(hi * 2.0),
            Err(EmError::LaggedOutOfRange { .. })
        ));
    }

    #[test]
    fn test_lag_count_covers_span() {
        let t = FilterTransform::new(DigitalFilter::for_method(HankelMethod::Key51));
        let n = t.lags_for_span(1.0, 10.0);
        let reach = 10.0 * t.abscissa_ratio().powi(n as i32 - 1);
        assert!(reach <= 1.0);
        assert!(10.0 * t.abscissa_ratio().powi(n as i32 - 2) > 1.0);
    }
}
