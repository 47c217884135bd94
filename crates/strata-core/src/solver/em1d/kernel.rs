//! The kernel catalog and the per-call kernel manager.
//!
//! A kernel is keyed by its mode, formula id and the air/ground class of
//! the source and receiver layers. The catalog maps every key to the
//! potential that evaluates it, so dispatch is a table lookup instead of a
//! chain of branches.

use std::collections::HashMap;
use std::sync::OnceLock;

use num_complex::Complex64;
use strata_earth::LayeredEarth;

use super::potential::{self, FORMULAS};
use super::reflection::{ReflectionEngine, ReflectionState};
use crate::hankel::KernelSet;
use crate::solver::EmError;
use crate::types::{DipoleType, EmMode, FieldsWanted, LayerClass};

/// Identity of one closed-form kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelId {
    pub mode: EmMode,
    pub formula: usize,
    pub source: LayerClass,
    pub receiver: LayerClass,
}

type PotentialFn = fn(usize, &ReflectionEngine, &ReflectionState) -> Complex64;

/// What the catalog knows about a kernel.
#[derive(Clone, Copy)]
pub struct KernelEntry {
    pub bessel_order: u8,
    potential: PotentialFn,
}

impl std::fmt::Debug for KernelEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelEntry")
            .field("bessel_order", &self.bessel_order)
            .finish_non_exhaustive()
    }
}

fn catalog() -> &'static HashMap<KernelId, KernelEntry> {
    static CATALOG: OnceLock<HashMap<KernelId, KernelEntry>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        let placements: [(LayerClass, LayerClass, PotentialFn); 4] = [
            (LayerClass::Air, LayerClass::Air, |f, e, s| potential::in_source_layer(f, e, s)),
            (LayerClass::Air, LayerClass::Ground, |f, e, s| potential::below_source_layer(f, e, s)),
            (LayerClass::Ground, LayerClass::Air, |f, e, s| potential::above_source_layer(f, e, s)),
            (LayerClass::Ground, LayerClass::Ground, |f, e, s| potential::by_layers(f, e, s)),
        ];
        let mut table = HashMap::with_capacity(EmMode::ALL.len() * FORMULAS * placements.len());
        for mode in EmMode::ALL {
            for formula in 0..FORMULAS {
                for &(source, receiver, potential) in &placements {
                    table.insert(
                        KernelId {
                            mode,
                            formula,
                            source,
                            receiver,
                        },
                        KernelEntry {
                            bessel_order: potential::bessel_order(formula),
                            potential,
                        },
                    );
                }
            }
        }
        table
    })
}

/// Look up a kernel in the catalog.
///
/// # Errors
/// [`EmError::InvalidSetting`] for a formula id outside `0..13`.
pub fn lookup(id: KernelId) -> Result<KernelEntry, EmError> {
    catalog()
        .get(&id)
        .copied()
        .ok_or_else(|| EmError::InvalidSetting(format!("no kernel for {id:?}")))
}

/// Formula sets for one dipole, by field.
fn formulas(dipole_type: DipoleType, vertical: bool) -> (&'static [(EmMode, usize)], &'static [(EmMode, usize)]) {
    use EmMode::{Te, Tm};
    match (dipole_type, vertical) {
        (DipoleType::GroundedElectric, true) => (&[(Tm, 10), (Tm, 11)], &[(Tm, 12)]),
        (DipoleType::GroundedElectric, false) => (
            &[(Tm, 0), (Tm, 1), (Tm, 4), (Te, 2), (Te, 3)],
            &[(Tm, 5), (Tm, 6), (Te, 7), (Te, 8), (Te, 9)],
        ),
        (DipoleType::UngroundedElectric, true) => (&[(Tm, 11)], &[(Tm, 12)]),
        (DipoleType::UngroundedElectric, false) => (
            &[(Te, 2), (Te, 3)],
            &[(Tm, 5), (Tm, 6), (Te, 7), (Te, 8), (Te, 9)],
        ),
        (DipoleType::Magnetic, true) => (&[(Te, 12)], &[(Te, 10), (Te, 11)]),
        (DipoleType::Magnetic, false) => (
            &[(Te, 5), (Te, 6), (Tm, 7), (Tm, 8), (Tm, 9)],
            &[(Te, 0), (Te, 1), (Te, 4), (Tm, 2), (Tm, 3)],
        ),
    }
}

/// The (mode, formula) pairs a dipole needs, without duplicates.
pub fn select_kernels(
    dipole_type: DipoleType,
    polarisation: [f64; 3],
    fields: FieldsWanted,
) -> Vec<(EmMode, usize)> {
    let mut selected = Vec::new();
    let mut push = |set: &[(EmMode, usize)]| {
        for k in set {
            if !selected.contains(k) {
                selected.push(*k);
            }
        }
    };
    let mut axes = Vec::with_capacity(2);
    if polarisation[2].abs() > 0.0 {
        axes.push(true);
    }
    if polarisation[0].abs() > 0.0 || polarisation[1].abs() > 0.0 {
        axes.push(false);
    }
    for vertical in axes {
        let (e, h) = formulas(dipole_type, vertical);
        if fields.wants_e() {
            push(e);
        }
        if fields.wants_h() {
            push(h);
        }
    }
    selected
}

#[derive(Debug, Clone, Copy)]
struct ManagedKernel {
    mode: EmMode,
    formula: usize,
    entry: KernelEntry,
}

/// The kernels of one source/receiver/frequency combination.
///
/// Owns a reflection engine and its scratch state per mode; evaluation
/// computes each needed mode once per wavenumber and reuses it for every
/// kernel of that mode.
#[derive(Debug, Clone)]
pub struct KernelManager {
    engines: [ReflectionEngine; 2],
    states: [ReflectionState; 2],
    active: [bool; 2],
    kernels: Vec<ManagedKernel>,
}

impl KernelManager {
    pub fn new(earth: &LayeredEarth, omega: f64, tx_z: f64, rx_z: f64) -> Self {
        let nlay = earth.number_of_layers();
        Self {
            engines: EmMode::ALL.map(|mode| ReflectionEngine::new(earth, omega, tx_z, rx_z, mode)),
            states: [ReflectionState::new(nlay), ReflectionState::new(nlay)],
            active: [false; 2],
            kernels: Vec::new(),
        }
    }

    /// Register a kernel, returning its index. A kernel already present is
    /// not added twice.
    pub fn add_kernel(&mut self, mode: EmMode, formula: usize) -> Result<usize, EmError> {
        if let Some(i) = self.index_of(mode, formula) {
            return Ok(i);
        }
        let engine = &self.engines[mode.index()];
        let entry = lookup(KernelId {
            mode,
            formula,
            source: LayerClass::of_layer(engine.source_layer()),
            receiver: LayerClass::of_layer(engine.receiver_layer()),
        })?;
        self.active[mode.index()] = true;
        self.kernels.push(ManagedKernel { mode, formula, entry });
        Ok(self.kernels.len() - 1)
    }

    pub fn index_of(&self, mode: EmMode, formula: usize) -> Option<usize> {
        self.kernels
            .iter()
            .position(|k| k.mode == mode && k.formula == formula)
    }

    pub fn kernels(&self) -> impl Iterator<Item = (EmMode, usize)> + '_ {
        self.kernels.iter().map(|k| (k.mode, k.formula))
    }

    pub fn source_layer(&self) -> usize {
        self.engines[0].source_layer()
    }

    pub fn receiver_layer(&self) -> usize {
        self.engines[0].receiver_layer()
    }

    /// Admittance of the receiver layer.
    pub fn ym(&self) -> Complex64 {
        self.engines[0].ym()
    }

    /// Impedance of the source layer.
    pub fn zs(&self) -> Complex64 {
        self.engines[0].zs()
    }

    /// Impedance of the receiver layer.
    pub fn zm(&self) -> Complex64 {
        self.engines[0].zm()
    }

    /// Squared wavenumber of the source layer.
    pub fn ks(&self) -> Complex64 {
        self.engines[0].ks()
    }
}

impl KernelSet for KernelManager {
    fn len(&self) -> usize {
        self.kernels.len()
    }

    fn bessel_order(&self, index: usize) -> u8 {
        self.kernels[index].entry.bessel_order
    }

    fn evaluate(&mut self, lambda: f64, out: &mut [Complex64]) {
        for mode in EmMode::ALL {
            let m = mode.index();
            if self.active[m] {
                self.engines[m].compute(lambda, &mut self.states[m]);
            }
        }
        for (k, slot) in self.kernels.iter().zip(out.iter_mut()) {
            let m = k.mode.index();
            *slot = (k.entry.potential)(k.formula, &self.engines[m], &self.states[m]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_total() {
        for mode in EmMode::ALL {
            for formula in 0..FORMULAS {
                for source in [LayerClass::Air, LayerClass::Ground] {
                    for receiver in [LayerClass::Air, LayerClass::Ground] {
                        let id = KernelId {
                            mode,
                            formula,
                            source,
                            receiver,
                        };
                        assert!(lookup(id).is_ok(), "missing {id:?}");
                    }
                }
            }
        }
        let bad = KernelId {
            mode: EmMode::Te,
            formula: 13,
            source: LayerClass::Air,
            receiver: LayerClass::Air,
        };
        assert!(matches!(lookup(bad), Err(EmError::InvalidSetting(_))));
    }

    #[test]
    fn test_vertical_grounded_electric_counts() {
        let z = [0.0, 0.0, 1.0];
        assert_eq!(select_kernels(DipoleType::GroundedElectric, z, FieldsWanted::E).len(), 2);
        assert_eq!(select_kernels(DipoleType::GroundedElectric, z, FieldsWanted::H).len(), 1);
        assert_eq!(select_kernels(DipoleType::GroundedElectric, z, FieldsWanted::Both).len(), 3);
    }

    #[test]
    fn test_horizontal_sets_have_five_per_field() {
        let x = [1.0, 0.0, 0.0];
        for ty in [DipoleType::GroundedElectric, DipoleType::Magnetic] {
            assert_eq!(select_kernels(ty, x, FieldsWanted::E).len(), 5);
            assert_eq!(select_kernels(ty, x, FieldsWanted::H).len(), 5);
        }
    }

    #[test]
    fn test_oblique_polarisation_takes_both_sets() {
        let oblique = [0.6, 0.0, 0.8];
        let kernels = select_kernels(DipoleType::Magnetic, oblique, FieldsWanted::H);
        assert_eq!(kernels.len(), 7);
        assert!(kernels.contains(&(EmMode::Te, 11)));
        assert!(kernels.contains(&(EmMode::Tm, 3)));
    }

    #[test]
    fn test_manager_deduplicates() {
        let earth = LayeredEarth::halfspace(0.01);
        let mut manager = KernelManager::new(&earth, 1e3, -1.0, -1.0);
        let a = manager.add_kernel(EmMode::Te, 11).unwrap();
        let b = manager.add_kernel(EmMode::Tm, 11).unwrap();
        let c = manager.add_kernel(EmMode::Te, 11).unwrap();
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.bessel_order(a), 0);
    }

    #[test]
    fn test_manager_evaluates_every_kernel() {
        let earth = LayeredEarth::from_real(&[0.0, 0.05, 0.01], vec![40.0]).unwrap();
        let mut manager = KernelManager::new(&earth, 2e3, -2.0, 15.0);
        for (mode, formula) in select_kernels(DipoleType::Magnetic, [0.0, 0.0, 1.0], FieldsWanted::Both) {
            manager.add_kernel(mode, formula).unwrap();
        }
        let mut out = vec![Complex64::new(0.0, 0.0); manager.len()];
        manager.evaluate(0.02, &mut out);
        assert!(out.iter().all(|v| v.re.is_finite() && v.im.is_finite()));
        assert!(out.iter().any(|v| v.norm() > 0.0));
    }
}
