//! Forward solvers and their error type.
//!
//! The 1D layered-earth solver ([`em1d`]) is the only method today. Every
//! failure it can meet, from a missing collaborator to a Hankel strategy
//! that would not converge, is reported through [`EmError`] so callers can
//! recover instead of the process exiting.

pub mod em1d;

use strata_compute::ComputeError;
use strata_earth::{EarthError, SplineError};
use strata_geometry::AntennaError;
use thiserror::Error;

/// Errors that can occur during a forward calculation.
#[derive(Debug, Error)]
pub enum EmError {
    #[error("No layered earth attached")]
    MissingEarth,

    #[error("No field points attached")]
    MissingFieldPoints,

    #[error("No dipole source attached")]
    MissingDipole,

    #[error("No wire antenna attached")]
    MissingAntenna,

    #[error("A dipole source is attached; detach it before a wire antenna calculation")]
    DipoleSpecifiedForAntennaCalc,

    #[error("Polarisation vector must have nonzero length")]
    ZeroPolarisation,

    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Unknown Hankel transform method '{0}'")]
    UnknownHankelMethod(String),

    #[error("Hankel method '{0}' has no lagged variant")]
    LaggedUnsupported(&'static str),

    #[error("Offset {rho:.4e} m lies outside the lagged span [{min:.4e}, {max:.4e}] m")]
    LaggedOutOfRange { rho: f64, min: f64, max: f64 },

    #[error("QWE failed to converge for kernel {kernel} after {intervals} intervals")]
    NotConverged { kernel: usize, intervals: usize },

    #[error("Invalid solver setting: {0}")]
    InvalidSetting(String),

    #[error("Earth model error: {0}")]
    Earth(#[from] EarthError),

    #[error("Spline error: {0}")]
    Spline(#[from] SplineError),

    #[error("Antenna error: {0}")]
    Antenna(#[from] AntennaError),

    #[error("Compute backend error: {0}")]
    Compute(#[from] ComputeError),
}
