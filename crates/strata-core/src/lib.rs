//! # Strata Core
//!
//! The numerical backbone of the Strata framework: frequency-domain
//! electromagnetic fields of dipoles and wire loops over a horizontally
//! layered earth.
//!
//! ## Architecture
//!
//! A forward run flows through four layers:
//!
//! 1. The reflection engine turns the layer stack into TE/TM reflection
//!    coefficients at one radial wavenumber $\lambda$.
//! 2. The kernel catalog combines those coefficients into the 13 closed-form
//!    integrands a dipole can need.
//! 3. A Hankel strategy ([`hankel`]) integrates
//!    $\int_0^\infty K(\lambda) J_n(\lambda\rho)\,d\lambda$.
//! 4. The dipole assembler combines the transforms into E and H vectors and
//!    the driver ([`solver::em1d::EmEarth1D`]) spreads the work over a
//!    [`strata_compute::ComputeBackend`].
//!
//! ## Modules
//!
//! - [`types`]: Constants, mode enums and the dipole source.
//! - [`fields`]: Receiver locations and field accumulators.
//! - [`hankel`]: Digital-filter and quadrature Hankel transforms.
//! - [`solver`]: The layered-earth solver and its error type.

pub mod fields;
pub mod hankel;
pub mod solver;
pub mod types;

pub use fields::FieldPoints;
pub use hankel::{HankelMethod, HankelTransform, KernelSet, QweConfig};
pub use solver::em1d::EmEarth1D;
pub use solver::EmError;
pub use types::{DipoleSource, DipoleType, EmMode, FieldsWanted, PolarisationAxis};
