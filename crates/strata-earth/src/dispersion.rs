//! Cole-Cole relaxation model for frequency-dependent layer properties.
//!
//! A dispersive relative property (permeability or permittivity) follows
//!
//! $$
//! \chi(\omega) = \chi_\infty + \frac{\chi_0 - \chi_\infty}{1 + (i\omega\tau)^c}
//! $$
//!
//! where $\chi_0$ is the low-frequency limit, $\chi_\infty$ the
//! high-frequency limit, $\tau$ the relaxation time and $c$ the breadth.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Relaxation times at or below this are treated as non-dispersive.
pub const MIN_RELAXATION_TIME: f64 = 1e-10;

/// Parameters of a single Cole-Cole relaxation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColeCole {
    /// Low-frequency (static) limit.
    pub low_freq: f64,
    /// High-frequency (optical) limit.
    pub high_freq: f64,
    /// Relaxation time constant (s).
    pub tau: f64,
    /// Breadth exponent, $0 < c \le 1$.
    pub breadth: f64,
}

impl Default for ColeCole {
    fn default() -> Self {
        Self::constant(1.0)
    }
}

impl ColeCole {
    /// A non-dispersive property with the same value at every frequency.
    pub fn constant(value: f64) -> Self {
        Self {
            low_freq: value,
            high_freq: value,
            tau: 0.0,
            breadth: 0.0,
        }
    }

    /// Whether this model varies with frequency at all.
    pub fn is_dispersive(&self) -> bool {
        self.tau > MIN_RELAXATION_TIME
    }

    /// Evaluate the complex relative property at angular frequency `omega` (rad/s).
    pub fn evaluate(&self, omega: f64) -> Complex64 {
        if !self.is_dispersive() {
            return Complex64::new(self.low_freq, 0.0);
        }
        let iwt = Complex64::new(0.0, omega * self.tau).powf(self.breadth);
        Complex64::new(self.high_freq, 0.0) + (self.low_freq - self.high_freq) / (1.0 + iwt)
    }
}
