//! # Strata Earth
//!
//! Horizontally layered conductive earth models for the Strata framework.
//! A [`LayeredEarth`](earth::LayeredEarth) is an ordered stack of layers,
//! with layer 0 the air halfspace and the last layer the basement halfspace.
//! Every layer carries a complex conductivity plus Cole-Cole dispersion
//! models for magnetic susceptibility and dielectric permittivity.
//!
//! ## Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`earth`] | Layer stack, depth lookup, validation |
//! | [`dispersion`] | Cole-Cole relaxation model |
//! | [`spline`] | Natural cubic splines over complex ordinates |
//!
//! ## Conventions
//!
//! Depth $z$ is positive downward and the air/earth interface sits at
//! $z = 0$, so any point with $z \le 0$ lies in the air layer.

pub mod dispersion;
pub mod earth;
pub mod spline;

pub use dispersion::ColeCole;
pub use earth::{EarthError, LayeredEarth};
pub use spline::{CubicSpline, SplineError};
