//! Core types shared across the Strata framework.
//!
//! Physical constants, the enums that select modes and field components, and
//! the [`DipoleSource`] value type that every forward calculation starts from.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use num_complex::Complex64;
use strata_geometry::DipoleElement;

use crate::solver::EmError;

/// Magnetic permeability of free space (H/m).
pub const MU0: f64 = 4.0 * PI * 1e-7;

/// Electric permittivity of free space (F/m).
pub const EPSILON0: f64 = 8.854187817e-12;

/// Polarisation mode of a layered-earth potential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmMode {
    /// Transverse electric.
    Te,
    /// Transverse magnetic.
    Tm,
}

impl EmMode {
    pub const ALL: [EmMode; 2] = [EmMode::Te, EmMode::Tm];

    /// Dense index, used to key per-mode storage.
    pub fn index(self) -> usize {
        match self {
            EmMode::Te => 0,
            EmMode::Tm => 1,
        }
    }
}

/// Which field components a calculation should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldsWanted {
    E,
    H,
    #[default]
    Both,
}

impl FieldsWanted {
    pub fn wants_e(self) -> bool {
        matches!(self, FieldsWanted::E | FieldsWanted::Both)
    }

    pub fn wants_h(self) -> bool {
        matches!(self, FieldsWanted::H | FieldsWanted::Both)
    }
}

/// Physical kind of a point dipole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DipoleType {
    /// Electric dipole whose ends are in galvanic contact with the ground.
    GroundedElectric,
    /// Electric dipole element of a closed wire; no galvanic terms.
    UngroundedElectric,
    /// Magnetic dipole, i.e. a small current loop.
    Magnetic,
}

/// Coarse placement of a source or receiver: in the air or in the ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerClass {
    Air,
    Ground,
}

impl LayerClass {
    /// Class of layer `index`; only layer 0 is air.
    pub fn of_layer(index: usize) -> Self {
        if index == 0 {
            LayerClass::Air
        } else {
            LayerClass::Ground
        }
    }
}

/// A named polarisation along one coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolarisationAxis {
    X,
    Y,
    Z,
}

impl PolarisationAxis {
    pub fn unit_vector(self) -> [f64; 3] {
        match self {
            PolarisationAxis::X => [1.0, 0.0, 0.0],
            PolarisationAxis::Y => [0.0, 1.0, 0.0],
            PolarisationAxis::Z => [0.0, 0.0, 1.0],
        }
    }
}

/// A point dipole source driven at one or more frequencies.
///
/// This is a plain value: geometry relative to a receiver lives in a
/// per-call context, never here, so a source can be shared across workers
/// by reference.
#[derive(Debug, Clone, Serialize)]
pub struct DipoleSource {
    /// Position (m), $z$ positive down.
    pub location: [f64; 3],
    /// Unit polarisation vector.
    polarisation: [f64; 3],
    pub dipole_type: DipoleType,
    /// Moment magnitude (A·m for electric, A·m² for magnetic).
    pub moment: f64,
    /// Phase of the moment (radians).
    pub phase: f64,
    /// Transmitter frequencies (Hz).
    pub frequencies: Vec<f64>,
}

impl DipoleSource {
    /// Create a dipole, normalising `polarisation` to unit length.
    ///
    /// # Errors
    /// [`EmError::ZeroPolarisation`] if `polarisation` has no length.
    pub fn new(
        dipole_type: DipoleType,
        location: [f64; 3],
        polarisation: [f64; 3],
        moment: f64,
        frequencies: Vec<f64>,
    ) -> Result<Self, EmError> {
        let mut dipole = Self {
            location,
            polarisation: [0.0, 0.0, 1.0],
            dipole_type,
            moment,
            phase: 0.0,
            frequencies,
        };
        dipole.set_polarisation(polarisation)?;
        Ok(dipole)
    }

    /// Create a dipole polarised along a coordinate axis.
    pub fn along(
        dipole_type: DipoleType,
        location: [f64; 3],
        axis: PolarisationAxis,
        moment: f64,
        frequencies: Vec<f64>,
    ) -> Self {
        Self {
            location,
            polarisation: axis.unit_vector(),
            dipole_type,
            moment,
            phase: 0.0,
            frequencies,
        }
    }

    /// Ungrounded electric dipole for one element of a decomposed wire.
    pub fn from_element(element: &DipoleElement, frequencies: &[f64]) -> Self {
        Self {
            location: element.location,
            polarisation: element.direction,
            dipole_type: DipoleType::UngroundedElectric,
            moment: element.moment,
            phase: 0.0,
            frequencies: frequencies.to_vec(),
        }
    }

    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase;
        self
    }

    pub fn polarisation(&self) -> [f64; 3] {
        self.polarisation
    }

    pub fn set_polarisation(&mut self, polarisation: [f64; 3]) -> Result<(), EmError> {
        let norm = polarisation.iter().map(|p| p * p).sum::<f64>().sqrt();
        if !(norm > 0.0 && norm.is_finite()) {
            return Err(EmError::ZeroPolarisation);
        }
        self.polarisation = polarisation.map(|p| p / norm);
        Ok(())
    }

    pub fn number_of_frequencies(&self) -> usize {
        self.frequencies.len()
    }

    /// Angular frequency $2\pi f$ of bin `i` (rad/s).
    pub fn angular_frequency(&self, i: usize) -> f64 {
        2.0 * PI * self.frequencies[i]
    }

    /// Complex moment $M e^{i\phi}$.
    pub fn complex_moment(&self) -> Complex64 {
        Complex64::from_polar(self.moment, self.phase)
    }
}
