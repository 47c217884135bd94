//! Polygonal wire loop antennas.
//!
//! A loop is described by its vertices in order; the closing segment from
//! the last vertex back to the first is implicit. Current flows from each
//! vertex to the next.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::discretise::{approximate_segment, DipoleElement};
use crate::transform::Transform;

/// Tolerance (m) on the summed vertex depths of a horizontally planar loop.
pub const PLANARITY_TOLERANCE: f64 = 1e-5;

/// Errors from antenna construction.
#[derive(Debug, Error)]
pub enum AntennaError {
    #[error("A loop antenna needs at least 3 vertices, got {0}")]
    TooFewPoints(usize),

    #[error("Segment {0} has zero length")]
    DegenerateSegment(usize),

    #[error("Invalid decomposition setting '{name}': {value}")]
    InvalidSetting { name: &'static str, value: f64 },
}

/// A closed polygonal wire loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonalWireAntenna {
    /// Loop vertices (m), in current-flow order.
    pub points: Vec<[f64; 3]>,
    /// Loop current (A).
    #[serde(default = "default_current")]
    pub current: f64,
    /// Number of turns of wire.
    #[serde(default = "default_turns")]
    pub turns: u32,
    /// Transmitter frequencies (Hz).
    #[serde(default)]
    pub frequencies: Vec<f64>,
    /// Dipole length as a fraction of its distance to the receiver.
    #[serde(default = "default_min_dipole_ratio")]
    pub min_dipole_ratio: f64,
    /// Shortest dipole length (m); shorter remainders are absorbed.
    #[serde(default = "default_min_dipole_moment")]
    pub min_dipole_moment: f64,
    /// Longest dipole length (m).
    #[serde(default = "default_max_dipole_moment")]
    pub max_dipole_moment: f64,
}

fn default_current() -> f64 {
    1.0
}
fn default_turns() -> u32 {
    1
}
fn default_min_dipole_ratio() -> f64 {
    0.15
}
fn default_min_dipole_moment() -> f64 {
    1e-6
}
fn default_max_dipole_moment() -> f64 {
    10.0
}

impl PolygonalWireAntenna {
    /// Create a loop from its vertices with unit current and a single turn.
    pub fn new(points: Vec<[f64; 3]>) -> Result<Self, AntennaError> {
        let antenna = Self {
            points,
            current: default_current(),
            turns: default_turns(),
            frequencies: Vec::new(),
            min_dipole_ratio: default_min_dipole_ratio(),
            min_dipole_moment: default_min_dipole_moment(),
            max_dipole_moment: default_max_dipole_moment(),
        };
        antenna.validate()?;
        Ok(antenna)
    }

    /// A regular polygon of `sides` vertices on a horizontal circle.
    ///
    /// The first vertex sits at azimuth zero and vertices proceed
    /// counter-clockwise when viewed from above ($+z$ down).
    pub fn regular_polygon(centre: [f64; 3], radius: f64, sides: usize) -> Result<Self, AntennaError> {
        if !(radius > 0.0) {
            return Err(AntennaError::InvalidSetting {
                name: "radius",
                value: radius,
            });
        }
        let points = (0..sides)
            .map(|i| {
                let phi = 2.0 * std::f64::consts::PI * i as f64 / sides as f64;
                [
                    centre[0] + radius * phi.cos(),
                    centre[1] + radius * phi.sin(),
                    centre[2],
                ]
            })
            .collect();
        Self::new(points)
    }

    pub fn with_current(mut self, current: f64) -> Self {
        self.current = current;
        self
    }

    pub fn with_turns(mut self, turns: u32) -> Self {
        self.turns = turns;
        self
    }

    pub fn with_frequencies(mut self, frequencies: Vec<f64>) -> Self {
        self.frequencies = frequencies;
        self
    }

    /// Check vertex count, segment lengths and decomposition settings.
    pub fn validate(&self) -> Result<(), AntennaError> {
        if self.points.len() < 3 {
            return Err(AntennaError::TooFewPoints(self.points.len()));
        }
        for (i, (p1, p2)) in self.segments().enumerate() {
            if (p2 - p1).norm() == 0.0 {
                return Err(AntennaError::DegenerateSegment(i));
            }
        }
        if !(self.min_dipole_ratio > 0.0) {
            return Err(AntennaError::InvalidSetting {
                name: "min_dipole_ratio",
                value: self.min_dipole_ratio,
            });
        }
        if !(self.max_dipole_moment > 0.0) || self.max_dipole_moment < self.min_dipole_moment {
            return Err(AntennaError::InvalidSetting {
                name: "max_dipole_moment",
                value: self.max_dipole_moment,
            });
        }
        Ok(())
    }

    pub fn number_of_points(&self) -> usize {
        self.points.len()
    }

    pub fn number_of_frequencies(&self) -> usize {
        self.frequencies.len()
    }

    /// Iterate over the wire segments, including the closing one.
    pub fn segments(&self) -> impl Iterator<Item = (Vector3<f64>, Vector3<f64>)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            (Vector3::new(a[0], a[1], a[2]), Vector3::new(b[0], b[1], b[2]))
        })
    }

    /// Total wire length of one turn (m).
    pub fn perimeter(&self) -> f64 {
        self.segments().map(|(a, b)| (b - a).norm()).sum()
    }

    /// Whether the vertex depths sum to `n` times the first depth.
    pub fn is_horizontally_planar(&self) -> bool {
        match self.points.first() {
            Some(first) => {
                let sum: f64 = self.points.iter().map(|p| p[2]).sum();
                (sum - self.points.len() as f64 * first[2]).abs() < PLANARITY_TOLERANCE
            }
            None => false,
        }
    }

    /// Split the loop into ungrounded electric dipoles, refined towards
    /// `receiver`.
    ///
    /// Elements are emitted segment by segment; within a segment the part
    /// before the point closest to the receiver comes first.
    pub fn approximate_with_electric_dipoles(&self, receiver: [f64; 3]) -> Vec<DipoleElement> {
        let rx = Vector3::new(receiver[0], receiver[1], receiver[2]);
        let scale = self.turns as f64 * self.current;
        let mut elements = Vec::new();
        for (p1, p2) in self.segments() {
            approximate_segment(
                &p1,
                &p2,
                &rx,
                scale,
                self.min_dipole_ratio,
                self.min_dipole_moment,
                self.max_dipole_moment,
                &mut elements,
            );
        }
        log::trace!(
            "Loop of {} vertices split into {} dipoles for receiver {:?}",
            self.points.len(),
            elements.len(),
            receiver
        );
        elements
    }

    /// A copy of this antenna with every vertex mapped through `transform`.
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self {
            points: self.points.iter().map(|p| transform.apply(p)).collect(),
            ..self.clone()
        }
    }
}
