//! Receiver locations and their field accumulators.
//!
//! A [`FieldPoints`] set is shared by every worker of a forward run. The
//! locations and mask are read-only once the run starts; the E and H
//! accumulators, shape (bins, points, 3), are the only mutable shared state
//! and every write goes through a lock. Fields are accumulated rather than
//! overwritten, so a loop antenna is the sum of its dipole elements.

use std::sync::{Mutex, MutexGuard, PoisonError};

use ndarray::{s, Array3};
use num_complex::Complex64;

use crate::solver::EmError;

/// A set of receivers with per-frequency E and H accumulators.
#[derive(Debug)]
pub struct FieldPoints {
    locations: Vec<[f64; 3]>,
    /// `true` marks a receiver to skip.
    mask: Vec<bool>,
    efield: Mutex<Array3<Complex64>>,
    hfield: Mutex<Array3<Complex64>>,
}

impl Clone for FieldPoints {
    fn clone(&self) -> Self {
        Self {
            locations: self.locations.clone(),
            mask: self.mask.clone(),
            efield: Mutex::new(lock(&self.efield).clone()),
            hfield: Mutex::new(lock(&self.hfield).clone()),
        }
    }
}

// A poisoned lock still guards consistent data: each append is a single
// in-place addition that either happened or did not.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FieldPoints {
    /// Receivers at the given locations, unmasked, with no bins allocated.
    pub fn new(locations: Vec<[f64; 3]>) -> Self {
        let n = locations.len();
        Self {
            mask: vec![false; n],
            efield: Mutex::new(Array3::zeros((0, n, 3))),
            hfield: Mutex::new(Array3::zeros((0, n, 3))),
            locations,
        }
    }

    /// `n` receivers evenly spaced from `start` to `end` inclusive.
    pub fn profile(start: [f64; 3], end: [f64; 3], n: usize) -> Self {
        let locations = (0..n)
            .map(|i| {
                let t = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
                [
                    start[0] + t * (end[0] - start[0]),
                    start[1] + t * (end[1] - start[1]),
                    start[2] + t * (end[2] - start[2]),
                ]
            })
            .collect();
        Self::new(locations)
    }

    pub fn number_of_points(&self) -> usize {
        self.locations.len()
    }

    pub fn location(&self, i: usize) -> [f64; 3] {
        self.locations[i]
    }

    pub fn locations(&self) -> &[[f64; 3]] {
        &self.locations
    }

    pub fn mask(&self, i: usize) -> bool {
        self.mask[i]
    }

    pub fn set_mask(&mut self, i: usize, masked: bool) -> Result<(), EmError> {
        let len = self.mask.len();
        let slot = self
            .mask
            .get_mut(i)
            .ok_or(EmError::IndexOutOfRange { what: "receiver", index: i, len })?;
        *slot = masked;
        Ok(())
    }

    /// Resize the E accumulator to `n` frequency bins and zero it.
    pub fn set_number_of_bins_e(&self, n: usize) {
        *lock(&self.efield) = Array3::zeros((n, self.locations.len(), 3));
    }

    /// Resize the H accumulator to `n` frequency bins and zero it.
    pub fn set_number_of_bins_h(&self, n: usize) {
        *lock(&self.hfield) = Array3::zeros((n, self.locations.len(), 3));
    }

    pub fn number_of_bins_e(&self) -> usize {
        lock(&self.efield).dim().0
    }

    pub fn number_of_bins_h(&self) -> usize {
        lock(&self.hfield).dim().0
    }

    /// Add `value` into the E field of receiver `point` at bin `bin`.
    pub fn append_efield(&self, bin: usize, point: usize, value: [Complex64; 3]) -> Result<(), EmError> {
        append(&self.efield, bin, point, value)
    }

    /// Add `value` into the H field of receiver `point` at bin `bin`.
    pub fn append_hfield(&self, bin: usize, point: usize, value: [Complex64; 3]) -> Result<(), EmError> {
        append(&self.hfield, bin, point, value)
    }

    /// Zero both accumulators, keeping their shapes.
    pub fn clear_fields(&self) {
        lock(&self.efield).fill(Complex64::new(0.0, 0.0));
        lock(&self.hfield).fill(Complex64::new(0.0, 0.0));
    }

    pub fn efield(&self, bin: usize, point: usize) -> Result<[Complex64; 3], EmError> {
        read(&self.efield, bin, point)
    }

    pub fn hfield(&self, bin: usize, point: usize) -> Result<[Complex64; 3], EmError> {
        read(&self.hfield, bin, point)
    }

    /// Copy of the whole E accumulator, shape (bins, points, 3).
    pub fn efield_snapshot(&self) -> Array3<Complex64> {
        lock(&self.efield).clone()
    }

    /// Copy of the whole H accumulator, shape (bins, points, 3).
    pub fn hfield_snapshot(&self) -> Array3<Complex64> {
        lock(&self.hfield).clone()
    }
}

fn check(field: &Array3<Complex64>, bin: usize, point: usize) -> Result<(), EmError> {
    let (bins, points, _) = field.dim();
    if bin >= bins {
        return Err(EmError::IndexOutOfRange { what: "frequency bin", index: bin, len: bins });
    }
    if point >= points {
        return Err(EmError::IndexOutOfRange { what: "receiver", index: point, len: points });
    }
    Ok(())
}

fn append(
    field: &Mutex<Array3<Complex64>>,
    bin: usize,
    point: usize,
    value: [Complex64; 3],
) -> Result<(), EmError> {
    let mut guard = lock(field);
    check(&guard, bin, point)?;
    let mut slot = guard.slice_mut(s![bin, point, ..]);
    for (dst, v) in slot.iter_mut().zip(value) {
        *dst += v;
    }
    Ok(())
}

fn read(field: &Mutex<Array3<Complex64>>, bin: usize, point: usize) -> Result<[Complex64; 3], EmError> {
    let guard = lock(field);
    check(&guard, bin, point)?;
    Ok([
        guard[[bin, point, 0]],
        guard[[bin, point, 1]],
        guard[[bin, point, 2]],
    ])
}
