//! Hankel transform strategies.
//!
//! Every layered-earth field is a sum of integrals
//!
//! $$
//! Z_k(\rho) = \int_0^\infty K_k(\lambda)\, J_{n_k}(\lambda \rho)\, d\lambda
//! $$
//!
//! over a small set of kernels $K_k$ that share one reflection calculation
//! per $\lambda$. A [`HankelTransform`] evaluates the whole set at once
//! through the [`KernelSet`] seam: digital filters ([`filter`]) sample the
//! kernels on a fixed log-spaced grid, while QWE ([`qwe`]) integrates
//! between Bessel zeros and extrapolates the partial sums.

mod design;
pub mod filter;
pub mod gauss;
pub mod qwe;
mod weights;

use std::fmt;
use std::str::FromStr;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::solver::EmError;

pub use filter::{DigitalFilter, FilterTransform};
pub use qwe::{Breakpoints, QweConfig, QweTransform};

/// A set of kernels evaluated together at shared wavenumbers.
pub trait KernelSet {
    /// Number of kernels in the set.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bessel order (0 or 1) kernel `index` is paired with.
    fn bessel_order(&self, index: usize) -> u8;

    /// Evaluate every kernel at `lambda`, writing into `out` (length `len()`).
    fn evaluate(&mut self, lambda: f64, out: &mut [Complex64]);
}

/// Per-kernel convergence of the last transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvergenceReport {
    /// Intervals integrated before stopping.
    pub intervals: usize,
    /// Indices of kernels that hit the interval cap without converging.
    pub failed: Vec<usize>,
}

impl ConvergenceReport {
    pub fn is_converged(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A numerical strategy for the Hankel integrals of a [`KernelSet`].
pub trait HankelTransform: Send {
    /// Short identifier, e.g. `"key51"`.
    fn name(&self) -> &'static str;

    /// Transform every kernel of `kernels` at offset `rho`.
    ///
    /// Results are held until the next call and read with
    /// [`HankelTransform::zgauss`].
    fn compute_related(&mut self, rho: f64, kernels: &mut dyn KernelSet) -> Result<(), EmError>;

    /// The transform of kernel `index` from the last computation.
    fn zgauss(&self, index: usize) -> Complex64;

    /// Convergence of the last call, for strategies that iterate.
    fn convergence(&self) -> Option<&ConvergenceReport> {
        None
    }
}

/// A transform that can evaluate one kernel set at many offsets at once.
///
/// One evaluation on an extended abscissa grid yields the response at a
/// geometric ladder of offsets; any offset in between is interpolated.
pub trait LaggedTransform: HankelTransform {
    /// Ratio of consecutive lagged offsets, below one.
    fn abscissa_ratio(&self) -> f64;

    /// Compute `n_lag` responses at `rho_max * ratio^l`, `l = 0..n_lag`.
    fn compute_lagged_related(
        &mut self,
        rho_max: f64,
        n_lag: usize,
        kernels: &mut dyn KernelSet,
    ) -> Result<(), EmError>;

    /// Select offset `rho` for subsequent [`HankelTransform::zgauss`] calls.
    fn set_lagged_arg(&mut self, rho: f64) -> Result<(), EmError>;

    /// Number of lags needed to span `[rho_min, rho_max]`.
    fn lags_for_span(&self, rho_min: f64, rho_max: f64) -> usize {
        let ratio = self.abscissa_ratio();
        let mut n_lag = 1;
        let mut rho = rho_max;
        while rho > rho_min {
            n_lag += 1;
            rho *= ratio;
        }
        n_lag
    }
}

/// The available Hankel strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HankelMethod {
    /// Key's published 51-point filter.
    Key51,
    /// Generated 101-point filter.
    Filter101,
    /// Generated 201-point filter.
    Filter201,
    /// Generated 801-point filter.
    #[default]
    Filter801,
    /// Quadrature with Wynn-epsilon extrapolation.
    Qwe,
}

impl HankelMethod {
    pub const ALL: [HankelMethod; 5] = [
        HankelMethod::Key51,
        HankelMethod::Filter101,
        HankelMethod::Filter201,
        HankelMethod::Filter801,
        HankelMethod::Qwe,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HankelMethod::Key51 => "key51",
            HankelMethod::Filter101 => "filter101",
            HankelMethod::Filter201 => "filter201",
            HankelMethod::Filter801 => "filter801",
            HankelMethod::Qwe => "qwe",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            HankelMethod::Key51 => "51-point digital filter (Key 2012)",
            HankelMethod::Filter101 => "101-point log-spaced filter, designed at first use",
            HankelMethod::Filter201 => "201-point log-spaced filter, designed at first use",
            HankelMethod::Filter801 => "801-point log-spaced filter, designed at first use",
            HankelMethod::Qwe => "Gauss-Legendre quadrature with Wynn-epsilon extrapolation",
        }
    }

    /// Whether the method is a fixed digital filter, and so can be lagged.
    pub fn is_filter(self) -> bool {
        !matches!(self, HankelMethod::Qwe)
    }

    /// A fresh transform instance, owned by one worker.
    pub fn build(self, qwe: &QweConfig) -> Box<dyn HankelTransform> {
        match self {
            HankelMethod::Qwe => Box::new(QweTransform::new(qwe.clone())),
            _ => Box::new(FilterTransform::new(DigitalFilter::for_method(self))),
        }
    }

    /// A fresh lagged transform.
    ///
    /// # Errors
    /// [`EmError::LaggedUnsupported`] for QWE.
    pub fn build_lagged(self) -> Result<FilterTransform, EmError> {
        if !self.is_filter() {
            return Err(EmError::LaggedUnsupported(self.name()));
        }
        Ok(FilterTransform::new(DigitalFilter::for_method(self)))
    }
}

impl fmt::Display for HankelMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HankelMethod {
    type Err = EmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "key51" | "fhtkey51" | "51" => Ok(HankelMethod::Key51),
            "filter101" | "101" => Ok(HankelMethod::Filter101),
            "filter201" | "201" => Ok(HankelMethod::Filter201),
            "filter801" | "801" => Ok(HankelMethod::Filter801),
            "qwe" | "qwekey" => Ok(HankelMethod::Qwe),
            _ => Err(EmError::UnknownHankelMethod(s.to_string())),
        }
    }
}

impl TryFrom<String> for HankelMethod {
    type Error = EmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HankelMethod> for String {
    fn from(method: HankelMethod) -> Self {
        method.name().to_string()
    }
}
