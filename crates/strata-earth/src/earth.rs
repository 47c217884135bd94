//! The layered earth model.
//!
//! Layers are indexed from the top: layer 0 is the air halfspace, layers
//! `1..n-1` are the interior layers with finite thickness, and layer `n-1` is
//! the basement halfspace. Only interior layers carry a thickness, so a model
//! with $n$ layers stores $n - 2$ thicknesses.
//!
//! ```text
//!   z <= 0            layer 0        (air, semi-infinite)
//!   ---------------- z = 0
//!                     layer 1        h_1
//!   ---------------- z = D_1
//!                     ...
//!   ---------------- z = D_{n-2}
//!                     layer n-1      (basement, semi-infinite)
//! ```

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispersion::ColeCole;

/// Thickness reported for the two semi-infinite layers.
///
/// Kernel recursions never propagate through a boundary layer, so the value
/// only has to be finite.
pub const NOMINAL_HALFSPACE_THICKNESS: f64 = 1000.0;

/// Errors raised while building or querying a layered earth.
#[derive(Debug, Error)]
pub enum EarthError {
    #[error("A layered earth needs at least 2 layers (air and basement), got {0}")]
    TooFewLayers(usize),

    #[error("Expected {expected} interior thicknesses for {layers} layers, got {got}")]
    ThicknessMismatch {
        layers: usize,
        expected: usize,
        got: usize,
    },

    #[error("Layer {layer} thickness must be positive and finite, got {thickness}")]
    NonPositiveThickness { layer: usize, thickness: f64 },

    #[error("Layer index {index} out of range for a {layers}-layer earth")]
    LayerOutOfRange { index: usize, layers: usize },

    #[error("Layer {0} is semi-infinite and has no thickness")]
    SemiInfiniteLayer(usize),

    #[error("Property array '{name}' has {got} entries, expected {expected}")]
    PropertyMismatch {
        name: &'static str,
        expected: usize,
        got: usize,
    },
}

/// A horizontally layered earth with complex conductivity and Cole-Cole
/// dispersion in every layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayeredEarth {
    /// Complex conductivity per layer (S/m). Layer 0 is normally zero.
    conductivity: Vec<Complex64>,
    /// Interior layer thicknesses (m), `layers - 2` entries.
    thickness: Vec<f64>,
    /// Relative magnetic permeability model per layer.
    #[serde(default)]
    susceptibility: Vec<ColeCole>,
    /// Relative dielectric permittivity model per layer.
    #[serde(default)]
    permittivity: Vec<ColeCole>,
}

impl LayeredEarth {
    /// Build a layered earth from conductivities and interior thicknesses.
    ///
    /// All layers start non-magnetic ($\mu_r = 1$) with unit relative
    /// permittivity.
    ///
    /// # Arguments
    /// * `conductivity` - One complex conductivity per layer, air first.
    /// * `thickness` - Thickness of each interior layer, top to bottom.
    pub fn new(conductivity: Vec<Complex64>, thickness: Vec<f64>) -> Result<Self, EarthError> {
        let n = conductivity.len();
        let earth = Self {
            susceptibility: vec![ColeCole::default(); n],
            permittivity: vec![ColeCole::default(); n],
            conductivity,
            thickness,
        };
        earth.validate()?;
        Ok(earth)
    }

    /// Build from real conductivities, the common resistivity-sounding case.
    pub fn from_real(conductivity: &[f64], thickness: Vec<f64>) -> Result<Self, EarthError> {
        Self::new(
            conductivity.iter().map(|&s| Complex64::new(s, 0.0)).collect(),
            thickness,
        )
    }

    /// An air layer over a uniform halfspace of conductivity `sigma`.
    pub fn halfspace(sigma: f64) -> Self {
        Self {
            conductivity: vec![Complex64::new(0.0, 0.0), Complex64::new(sigma, 0.0)],
            thickness: Vec::new(),
            susceptibility: vec![ColeCole::default(); 2],
            permittivity: vec![ColeCole::default(); 2],
        }
    }

    /// Check the structural invariants of the model.
    ///
    /// Deserialised models bypass [`LayeredEarth::new`], so consumers should
    /// call this before trusting one.
    pub fn validate(&self) -> Result<(), EarthError> {
        let n = self.conductivity.len();
        if n < 2 {
            return Err(EarthError::TooFewLayers(n));
        }
        if self.thickness.len() != n - 2 {
            return Err(EarthError::ThicknessMismatch {
                layers: n,
                expected: n - 2,
                got: self.thickness.len(),
            });
        }
        for (i, &h) in self.thickness.iter().enumerate() {
            if !(h > 0.0 && h.is_finite()) {
                return Err(EarthError::NonPositiveThickness {
                    layer: i + 1,
                    thickness: h,
                });
            }
        }
        for (name, models) in [
            ("susceptibility", &self.susceptibility),
            ("permittivity", &self.permittivity),
        ] {
            if models.len() != n {
                return Err(EarthError::PropertyMismatch {
                    name,
                    expected: n,
                    got: models.len(),
                });
            }
        }
        log::debug!(
            "Layered earth: {n} layers, basement at {:.2} m",
            self.thickness.iter().sum::<f64>()
        );
        Ok(())
    }

    /// Total number of layers, including air and basement.
    pub fn number_of_layers(&self) -> usize {
        self.conductivity.len()
    }

    /// Complex conductivity of layer `i` (S/m).
    pub fn layer_conductivity(&self, i: usize) -> Complex64 {
        self.conductivity[i]
    }

    /// Thickness of layer `i` (m).
    ///
    /// The two semi-infinite layers report [`NOMINAL_HALFSPACE_THICKNESS`].
    pub fn layer_thickness(&self, i: usize) -> f64 {
        if i == 0 || i + 1 >= self.number_of_layers() {
            NOMINAL_HALFSPACE_THICKNESS
        } else {
            self.thickness[i - 1]
        }
    }

    /// Depth of the bottom of layer `i` (m). Layer 0 ends at the surface.
    pub fn layer_depth(&self, i: usize) -> f64 {
        (1..=i).map(|k| self.layer_thickness(k)).sum()
    }

    /// Index of the layer containing depth `z`, with interfaces belonging
    /// to the layer above them.
    ///
    /// Any `z <= 0` is in the air; anything below the last interface is in
    /// the basement.
    pub fn layer_at_depth(&self, z: f64) -> usize {
        let n = self.number_of_layers();
        if z <= 0.0 || n < 2 {
            return 0;
        }
        let mut depth = 0.0;
        for (ilay, &h) in self.thickness.iter().enumerate() {
            depth += h;
            if depth >= z {
                return ilay + 1;
            }
        }
        n - 1
    }

    /// Index of the layer containing a source or receiver at depth `z`.
    ///
    /// This is the rule the reflection recursion is built on: the last layer
    /// `i >= 1` whose top lies strictly above `z`. It agrees with
    /// [`LayeredEarth::layer_at_depth`] everywhere except exactly on an
    /// interface.
    pub fn layer_of_point(&self, z: f64) -> usize {
        let mut layer = 0;
        let mut depth = 0.0;
        for ilay in 1..self.number_of_layers() {
            if z > depth {
                layer = ilay;
            }
            depth += self.layer_thickness(ilay);
        }
        layer
    }

    /// Relative magnetic permeability of layer `i` at angular frequency `omega`.
    pub fn layer_susceptibility(&self, i: usize, omega: f64) -> Complex64 {
        self.susceptibility[i].evaluate(omega)
    }

    /// Relative dielectric permittivity of layer `i` at angular frequency `omega`.
    pub fn layer_permittivity(&self, i: usize, omega: f64) -> Complex64 {
        self.permittivity[i].evaluate(omega)
    }

    /// Cole-Cole model for the susceptibility of layer `i`.
    pub fn susceptibility_model(&self, i: usize) -> &ColeCole {
        &self.susceptibility[i]
    }

    /// Cole-Cole model for the permittivity of layer `i`.
    pub fn permittivity_model(&self, i: usize) -> &ColeCole {
        &self.permittivity[i]
    }

    pub fn set_layer_conductivity(&mut self, i: usize, sigma: Complex64) -> Result<(), EarthError> {
        self.check_index(i)?;
        self.conductivity[i] = sigma;
        Ok(())
    }

    /// Set the thickness of interior layer `i`.
    pub fn set_layer_thickness(&mut self, i: usize, thickness: f64) -> Result<(), EarthError> {
        self.check_index(i)?;
        if i == 0 || i + 1 == self.number_of_layers() {
            return Err(EarthError::SemiInfiniteLayer(i));
        }
        if !(thickness > 0.0 && thickness.is_finite()) {
            return Err(EarthError::NonPositiveThickness { layer: i, thickness });
        }
        self.thickness[i - 1] = thickness;
        Ok(())
    }

    pub fn set_layer_susceptibility(&mut self, i: usize, model: ColeCole) -> Result<(), EarthError> {
        self.check_index(i)?;
        self.susceptibility[i] = model;
        Ok(())
    }

    pub fn set_layer_permittivity(&mut self, i: usize, model: ColeCole) -> Result<(), EarthError> {
        self.check_index(i)?;
        self.permittivity[i] = model;
        Ok(())
    }

    fn check_index(&self, i: usize) -> Result<(), EarthError> {
        let layers = self.number_of_layers();
        if i >= layers {
            return Err(EarthError::LayerOutOfRange { index: i, layers });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn four_layer() -> LayeredEarth {
        LayeredEarth::from_real(&[0.0, 0.1, 0.01, 1.0], vec![10.0, 25.0]).unwrap()
    }

    #[test]
    fn test_rejects_malformed_models() {
        assert!(matches!(
            LayeredEarth::from_real(&[0.0], vec![]),
            Err(EarthError::TooFewLayers(1))
        ));
        assert!(matches!(
            LayeredEarth::from_real(&[0.0, 0.1, 0.2], vec![]),
            Err(EarthError::ThicknessMismatch { .. })
        ));
        assert!(matches!(
            LayeredEarth::from_real(&[0.0, 0.1, 0.2], vec![-5.0]),
            Err(EarthError::NonPositiveThickness { layer: 1, .. })
        ));
    }

    #[test]
    fn test_thickness_and_depth() {
        let earth = four_layer();
        assert_eq!(earth.layer_thickness(0), NOMINAL_HALFSPACE_THICKNESS);
        assert_eq!(earth.layer_thickness(1), 10.0);
        assert_eq!(earth.layer_thickness(2), 25.0);
        assert_eq!(earth.layer_thickness(3), NOMINAL_HALFSPACE_THICKNESS);
        assert_relative_eq!(earth.layer_depth(0), 0.0);
        assert_relative_eq!(earth.layer_depth(1), 10.0);
        assert_relative_eq!(earth.layer_depth(2), 35.0);
    }

    #[test]
    fn test_layer_lookup() {
        let earth = four_layer();
        assert_eq!(earth.layer_at_depth(-30.0), 0);
        assert_eq!(earth.layer_at_depth(0.0), 0);
        assert_eq!(earth.layer_at_depth(5.0), 1);
        assert_eq!(earth.layer_at_depth(10.0), 1);
        assert_eq!(earth.layer_at_depth(10.5), 2);
        assert_eq!(earth.layer_at_depth(35.0), 2);
        assert_eq!(earth.layer_at_depth(500.0), 3);

        assert_eq!(earth.layer_of_point(-1.0), 0);
        assert_eq!(earth.layer_of_point(0.0), 0);
        assert_eq!(earth.layer_of_point(5.0), 1);
        assert_eq!(earth.layer_of_point(10.5), 2);
        assert_eq!(earth.layer_of_point(500.0), 3);
    }

    #[test]
    fn test_halfspace_lookup() {
        let earth = LayeredEarth::halfspace(0.01);
        assert!(earth.validate().is_ok());
        assert_eq!(earth.layer_at_depth(-1.0), 0);
        assert_eq!(earth.layer_at_depth(1.0), 1);
        assert_eq!(earth.layer_of_point(1.0), 1);
    }

    #[test]
    fn test_setters_are_index_checked() {
        let mut earth = four_layer();
        assert!(earth.set_layer_thickness(0, 5.0).is_err());
        assert!(earth.set_layer_thickness(3, 5.0).is_err());
        assert!(earth.set_layer_conductivity(7, Complex64::new(1.0, 0.0)).is_err());
        earth.set_layer_thickness(2, 40.0).unwrap();
        assert_relative_eq!(earth.layer_depth(2), 50.0);
    }

    #[test]
    fn test_round_trips_through_json() {
        let earth = four_layer();
        let json = serde_json::to_string(&earth).unwrap();
        let back: LayeredEarth = serde_json::from_str(&json).unwrap();
        assert!(back.validate().is_ok());
        assert_eq!(back.number_of_layers(), 4);
        assert_relative_eq!(back.layer_conductivity(3).re, 1.0);
    }
}
