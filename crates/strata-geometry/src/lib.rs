//! # Strata Geometry
//!
//! Transmitter geometry for the Strata framework. This crate provides:
//!
//! - **Wire antennas** ([`antenna`]): Closed polygonal loops carrying a
//!   current, with their frequency list and decomposition controls.
//! - **Decomposition** ([`discretise`]): Splits each wire segment into
//!   short electric dipoles, refined towards a given receiver.
//! - **Transformations** ([`transform`]): Translate, scale and rotate
//!   antennas into survey position.

pub mod antenna;
pub mod discretise;
pub mod transform;

pub use antenna::{AntennaError, PolygonalWireAntenna};
pub use discretise::DipoleElement;
pub use transform::Transform;
