//! Frequency-domain EM fields of dipoles and wire loops over a layered earth.
//!
//! [`EmEarth1D`] is the driver. Attach an earth, a receiver set and either a
//! dipole or a loop antenna, pick a Hankel method, then run
//! [`EmEarth1D::make_calc3`] or [`EmEarth1D::calculate_wire_antenna_fields`].
//! Work is spread over one axis (receivers, frequencies or dipole elements)
//! through the attached [`ComputeBackend`]; each work unit owns its kernel
//! manager and transform, and every accumulator slot is written by one unit
//! only, so the result does not depend on the thread count.

pub mod dipole;
pub mod kernel;
pub mod potential;
pub mod reflection;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info};
use num_complex::Complex64;
use strata_compute::{ComputeBackend, ComputeError};
use strata_earth::LayeredEarth;
use strata_geometry::PolygonalWireAntenna;

use crate::fields::FieldPoints;
use crate::hankel::{HankelMethod, HankelTransform, LaggedTransform, QweConfig};
use crate::solver::EmError;
use crate::types::{DipoleSource, FieldsWanted};

pub use dipole::{CallContext, DipoleCall, MIN_RHO};
pub use kernel::{select_kernels, KernelId, KernelManager};
pub use reflection::{ReflectionEngine, ReflectionState};

/// Above this many frequencies the loop path parallelises over frequency
/// rather than over dipole elements.
const FREQUENCY_PARALLEL_THRESHOLD: usize = 8;

type Vector = [Complex64; 3];

/// Axis a run is spread over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Receivers,
    Frequencies,
    Dipoles,
    LaggedReceivers,
}

/// Layered-earth forward modeller.
pub struct EmEarth1D {
    earth: Option<Arc<LayeredEarth>>,
    receivers: Option<Arc<FieldPoints>>,
    dipole: Option<DipoleSource>,
    antenna: Option<Arc<PolygonalWireAntenna>>,
    fields: FieldsWanted,
    method: HankelMethod,
    qwe: QweConfig,
    lagged: bool,
    backend: Arc<dyn ComputeBackend>,
    convergence_failures: usize,
}

impl Default for EmEarth1D {
    fn default() -> Self {
        Self::new()
    }
}

fn default_backend() -> Arc<dyn ComputeBackend> {
    #[cfg(feature = "cpu")]
    {
        Arc::new(strata_compute::CpuBackend::new())
    }
    #[cfg(not(feature = "cpu"))]
    {
        Arc::new(strata_compute::SerialBackend)
    }
}

impl EmEarth1D {
    pub fn new() -> Self {
        Self {
            earth: None,
            receivers: None,
            dipole: None,
            antenna: None,
            fields: FieldsWanted::default(),
            method: HankelMethod::default(),
            qwe: QweConfig::default(),
            lagged: true,
            backend: default_backend(),
            convergence_failures: 0,
        }
    }

    pub fn attach_layered_earth(&mut self, earth: Arc<LayeredEarth>) {
        self.earth = Some(earth);
    }

    pub fn attach_field_points(&mut self, receivers: Arc<FieldPoints>) {
        self.receivers = Some(receivers);
    }

    pub fn attach_dipole_source(&mut self, dipole: DipoleSource) {
        self.dipole = Some(dipole);
    }

    pub fn attach_wire_antenna(&mut self, antenna: Arc<PolygonalWireAntenna>) {
        self.antenna = Some(antenna);
    }

    pub fn detach_layered_earth(&mut self) -> Option<Arc<LayeredEarth>> {
        self.earth.take()
    }

    pub fn detach_field_points(&mut self) -> Option<Arc<FieldPoints>> {
        self.receivers.take()
    }

    pub fn detach_dipole_source(&mut self) -> Option<DipoleSource> {
        self.dipole.take()
    }

    pub fn detach_wire_antenna(&mut self) -> Option<Arc<PolygonalWireAntenna>> {
        self.antenna.take()
    }

    pub fn field_points(&self) -> Option<&Arc<FieldPoints>> {
        self.receivers.as_ref()
    }

    pub fn set_fields_to_calculate(&mut self, fields: FieldsWanted) {
        self.fields = fields;
    }

    pub fn set_hankel_transform_method(&mut self, method: HankelMethod) {
        self.method = method;
    }

    pub fn hankel_transform_method(&self) -> HankelMethod {
        self.method
    }

    pub fn set_qwe_config(&mut self, config: QweConfig) {
        self.qwe = config;
    }

    /// Enable or disable the lagged loop path.
    pub fn set_lagged(&mut self, lagged: bool) {
        self.lagged = lagged;
    }

    pub fn set_backend(&mut self, backend: Arc<dyn ComputeBackend>) {
        self.backend = backend;
    }

    /// QWE transforms of the last run that stopped at the interval cap.
    pub fn convergence_failures(&self) -> usize {
        self.convergence_failures
    }

    fn validated_collaborators(&self) -> Result<(Arc<LayeredEarth>, Arc<FieldPoints>), EmError> {
        let earth = self.earth.clone().ok_or(EmError::MissingEarth)?;
        earth.validate()?;
        let receivers = self.receivers.clone().ok_or(EmError::MissingFieldPoints)?;
        Ok((earth, receivers))
    }

    fn size_bins(&self, receivers: &FieldPoints, nfreq: usize) {
        if self.fields.wants_e() && receivers.number_of_bins_e() != nfreq {
            receivers.set_number_of_bins_e(nfreq);
        }
        if self.fields.wants_h() && receivers.number_of_bins_h() != nfreq {
            receivers.set_number_of_bins_h(nfreq);
        }
    }

    /// Fields of the attached dipole at every unmasked receiver and frequency.
    ///
    /// Results are added into the receivers' accumulators, which are sized
    /// to the dipole's frequency count but not cleared.
    ///
    /// # Errors
    /// A missing dipole, earth or receiver set, or any failure inside a
    /// work unit.
    pub fn make_calc3(&mut self) -> Result<(), EmError> {
        let (earth, receivers) = self.validated_collaborators()?;
        let dipole = self.dipole.as_ref().ok_or(EmError::MissingDipole)?;
        check_frequencies(&dipole.frequencies)?;

        let nfreq = dipole.number_of_frequencies();
        let nrec = receivers.number_of_points();
        debug!("EmEarth1D validated: dipole, {nrec} receivers, {nfreq} frequencies");
        self.size_bins(&receivers, nfreq);

        let failures = AtomicUsize::new(0);
        let unit = |ifreq: usize, irec: usize| -> Result<(), EmError> {
            if receivers.mask(irec) {
                return Ok(());
            }
            let mut transform = self.method.build(&self.qwe);
            let mut call = DipoleCall::prepare(dipole, ifreq, self.fields, &receivers, irec, &earth)?;
            call.update_fields(transform.as_mut(), &receivers)?;
            count_failures(transform.as_ref(), &failures);
            Ok(())
        };

        let axis = if nfreq < nrec { Axis::Receivers } else { Axis::Frequencies };
        info!(
            "Dipole run with {} over {:?} on {}",
            self.method,
            axis,
            self.backend.device_info().name
        );
        debug!("EmEarth1D dispatched");
        if axis == Axis::Receivers {
            for ifreq in 0..nfreq {
                self.dispatch(nrec, |irec| unit(ifreq, irec))?;
            }
        } else {
            for irec in 0..nrec {
                self.dispatch(nfreq, |ifreq| unit(ifreq, irec))?;
            }
        }

        self.convergence_failures = failures.into_inner();
        debug!("EmEarth1D complete");
        Ok(())
    }

    /// Fields of the attached loop antenna at every unmasked receiver and
    /// frequency.
    ///
    /// The loop is split into electric dipoles for each receiver. Fields
    /// are cleared first.
    ///
    /// # Errors
    /// [`EmError::DipoleSpecifiedForAntennaCalc`] when a dipole is also
    /// attached, a missing antenna, earth or receiver set, or any failure
    /// inside a work unit.
    pub fn calculate_wire_antenna_fields(&mut self, progress: bool) -> Result<(), EmError> {
        if self.dipole.is_some() {
            return Err(EmError::DipoleSpecifiedForAntennaCalc);
        }
        let (earth, receivers) = self.validated_collaborators()?;
        let antenna = self.antenna.clone().ok_or(EmError::MissingAntenna)?;
        antenna.validate()?;
        check_frequencies(&antenna.frequencies)?;

        let nfreq = antenna.number_of_frequencies();
        let nrec = receivers.number_of_points();
        debug!(
            "EmEarth1D validated: {}-vertex loop, {nrec} receivers, {nfreq} frequencies",
            antenna.number_of_points()
        );
        receivers.clear_fields();
        self.size_bins(&receivers, nfreq);

        let axis = if antenna.is_horizontally_planar() && self.method.is_filter() && self.lagged {
            Axis::LaggedReceivers
        } else if nrec > nfreq {
            Axis::Receivers
        } else if nfreq > FREQUENCY_PARALLEL_THRESHOLD {
            Axis::Frequencies
        } else {
            Axis::Dipoles
        };
        info!(
            "Loop run with {} over {:?} on {}",
            self.method,
            axis,
            self.backend.device_info().name
        );

        let failures = AtomicUsize::new(0);
        let done = AtomicUsize::new(0);
        let report = |irec: usize| {
            if progress {
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                info!("Receiver {irec} finished ({n}/{nrec})");
            }
        };
        let ctx = LoopContext {
            earth: &earth,
            receivers: &receivers,
            antenna: &antenna,
            fields: self.fields,
            method: self.method,
            qwe: &self.qwe,
            failures: &failures,
        };

        debug!("EmEarth1D dispatched");
        match axis {
            Axis::LaggedReceivers => {
                for ifreq in 0..nfreq {
                    self.dispatch(nrec, |irec| {
                        if receivers.mask(irec) {
                            return Ok(());
                        }
                        ctx.lagged_receiver(ifreq, irec)?;
                        if ifreq + 1 == nfreq {
                            report(irec);
                        }
                        Ok(())
                    })?;
                }
            }
            Axis::Receivers => {
                self.dispatch(nrec, |irec| {
                    if receivers.mask(irec) {
                        return Ok(());
                    }
                    let dipoles = ctx.decompose(irec);
                    for ifreq in 0..nfreq {
                        for dipole in &dipoles {
                            ctx.direct(dipole, ifreq, irec)?;
                        }
                    }
                    report(irec);
                    Ok(())
                })?;
            }
            Axis::Frequencies => {
                for irec in (0..nrec).filter(|&i| !receivers.mask(i)) {
                    let dipoles = ctx.decompose(irec);
                    self.dispatch(nfreq, |ifreq| {
                        for dipole in &dipoles {
                            ctx.direct(dipole, ifreq, irec)?;
                        }
                        Ok(())
                    })?;
                    report(irec);
                }
            }
            Axis::Dipoles => {
                for irec in (0..nrec).filter(|&i| !receivers.mask(i)) {
                    let dipoles = ctx.decompose(irec);
                    for ifreq in 0..nfreq {
                        let slots: Vec<Mutex<Option<(Vector, Vector)>>> =
                            dipoles.iter().map(|_| Mutex::new(None)).collect();
                        self.dispatch(dipoles.len(), |i| {
                            let contribution = ctx.evaluate(&dipoles[i], ifreq, irec)?;
                            *slots[i].lock().unwrap_or_else(PoisonError::into_inner) = Some(contribution);
                            Ok(())
                        })?;
                        ctx.reduce(slots, ifreq, irec)?;
                    }
                    report(irec);
                }
            }
        }

        self.convergence_failures = failures.into_inner();
        debug!("EmEarth1D complete");
        Ok(())
    }

    /// Run `work` over `0..len` on the backend, keeping the first error.
    fn dispatch<F>(&self, len: usize, work: F) -> Result<(), EmError>
    where
        F: Fn(usize) -> Result<(), EmError> + Send + Sync,
    {
        let first: Mutex<Option<EmError>> = Mutex::new(None);
        let result = self.backend.parallel_for(len, &|i| {
            work(i).map_err(|err| {
                let message = err.to_string();
                let mut slot = first.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.is_none() {
                    *slot = Some(err);
                }
                ComputeError::TaskFailed { index: i, message }
            })
        });
        match result {
            Ok(()) => Ok(()),
            Err(err) => Err(first
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner)
                .unwrap_or(EmError::Compute(err))),
        }
    }
}

fn check_frequencies(frequencies: &[f64]) -> Result<(), EmError> {
    match frequencies.iter().find(|f| !(f.is_finite() && **f > 0.0)) {
        Some(f) => Err(EmError::InvalidSetting(format!(
            "frequencies must be positive, got {f}"
        ))),
        None => Ok(()),
    }
}

fn count_failures(transform: &dyn HankelTransform, failures: &AtomicUsize) {
    if let Some(report) = transform.convergence() {
        if !report.is_converged() {
            failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Shared read-only inputs of a loop run.
struct LoopContext<'a> {
    earth: &'a LayeredEarth,
    receivers: &'a FieldPoints,
    antenna: &'a PolygonalWireAntenna,
    fields: FieldsWanted,
    method: HankelMethod,
    qwe: &'a QweConfig,
    failures: &'a AtomicUsize,
}

impl LoopContext<'_> {
    fn decompose(&self, irec: usize) -> Vec<DipoleSource> {
        self.antenna
            .approximate_with_electric_dipoles(self.receivers.location(irec))
            .iter()
            .map(|element| DipoleSource::from_element(element, &self.antenna.frequencies))
            .collect()
    }

    fn evaluate(&self, dipole: &DipoleSource, ifreq: usize, irec: usize) -> Result<(Vector, Vector), EmError> {
        let mut transform = self.method.build(self.qwe);
        let mut call = DipoleCall::prepare(dipole, ifreq, self.fields, self.receivers, irec, self.earth)?;
        let contribution = call.evaluate(transform.as_mut())?;
        count_failures(transform.as_ref(), self.failures);
        Ok(contribution)
    }

    fn direct(&self, dipole: &DipoleSource, ifreq: usize, irec: usize) -> Result<(), EmError> {
        let (e, h) = self.evaluate(dipole, ifreq, irec)?;
        self.append(ifreq, irec, e, h)
    }

    fn append(&self, ifreq: usize, irec: usize, e: Vector, h: Vector) -> Result<(), EmError> {
        if self.fields.wants_e() {
            self.receivers.append_efield(ifreq, irec, e)?;
        }
        if self.fields.wants_h() {
            self.receivers.append_hfield(ifreq, irec, h)?;
        }
        Ok(())
    }

    /// Sum per-dipole contributions in index order and append once.
    fn reduce(&self, slots: Vec<Mutex<Option<(Vector, Vector)>>>, ifreq: usize, irec: usize) -> Result<(), EmError> {
        let zero = [Complex64::new(0.0, 0.0); 3];
        let (mut e, mut h) = (zero, zero);
        for slot in slots {
            if let Some((de, dh)) = slot.into_inner().unwrap_or_else(PoisonError::into_inner) {
                for k in 0..3 {
                    e[k] += de[k];
                    h[k] += dh[k];
                }
            }
        }
        self.append(ifreq, irec, e, h)
    }

    /// Every dipole of the loop from one lagged transform.
    fn lagged_receiver(&self, ifreq: usize, irec: usize) -> Result<(), EmError> {
        let dipoles = self.decompose(irec);
        let calls = dipoles
            .iter()
            .map(|d| DipoleCall::prepare(d, ifreq, self.fields, self.receivers, irec, self.earth))
            .collect::<Result<Vec<_>, _>>()?;
        let Some(first) = calls.first() else {
            return Ok(());
        };

        let (rho_min, rho_max) = calls.iter().fold((f64::INFINITY, 0.0_f64), |(lo, hi), c| {
            (lo.min(c.context().rho), hi.max(c.context().rho))
        });

        let mut kernels = first.kernels().clone();
        for call in &calls[1..] {
            for (mode, formula) in call.kernels().kernels() {
                kernels.add_kernel(mode, formula)?;
            }
        }

        let mut lagged = self.method.build_lagged()?;
        let n_lag = lagged.lags_for_span(rho_min, rho_max);
        lagged.compute_lagged_related(rho_max, n_lag, &mut kernels)?;
        for call in &calls {
            call.update_fields_lagged(&mut lagged, &kernels, self.receivers)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DipoleType, PolarisationAxis};

    fn air() -> Arc<LayeredEarth> {
        Arc::new(LayeredEarth::from_real(&[0.0, 0.0], vec![]).unwrap())
    }

    #[test]
    fn test_missing_collaborators() {
        let mut em = EmEarth1D::new();
        assert!(matches!(em.make_calc3(), Err(EmError::MissingEarth)));
        em.attach_layered_earth(air());
        assert!(matches!(em.make_calc3(), Err(EmError::MissingFieldPoints)));
        em.attach_field_points(Arc::new(FieldPoints::new(vec![[10.0, 0.0, -1.0]])));
        assert!(matches!(em.make_calc3(), Err(EmError::MissingDipole)));
        assert!(matches!(
            em.calculate_wire_antenna_fields(false),
            Err(EmError::MissingAntenna)
        ));
    }

    #[test]
    fn test_dipole_blocks_antenna_run() {
        let mut em = EmEarth1D::new();
        em.attach_layered_earth(air());
        em.attach_field_points(Arc::new(FieldPoints::new(vec![[10.0, 0.0, -1.0]])));
        em.attach_dipole_source(DipoleSource::along(
            DipoleType::Magnetic,
            [0.0, 0.0, -1.0],
            PolarisationAxis::Z,
            1.0,
            vec![10.0],
        ));
        assert!(matches!(
            em.calculate_wire_antenna_fields(false),
            Err(EmError::DipoleSpecifiedForAntennaCalc)
        ));
    }

    #[test]
    fn test_non_positive_frequency_rejected() {
        let mut em = EmEarth1D::new();
        em.attach_layered_earth(air());
        em.attach_field_points(Arc::new(FieldPoints::new(vec![[10.0, 0.0, -1.0]])));
        em.attach_dipole_source(DipoleSource::along(
            DipoleType::Magnetic,
            [0.0, 0.0, -1.0],
            PolarisationAxis::Z,
            1.0,
            vec![0.0],
        ));
        assert!(matches!(em.make_calc3(), Err(EmError::InvalidSetting(_))));
    }

    #[test]
    fn test_masked_receiver_stays_zero() {
        let mut points = FieldPoints::new(vec![[10.0, 0.0, -1.0], [20.0, 0.0, -1.0]]);
        points.set_mask(1, true).unwrap();
        let points = Arc::new(points);
        let mut em = EmEarth1D::new();
        em.attach_layered_earth(air());
        em.attach_field_points(points.clone());
        em.attach_dipole_source(DipoleSource::along(
            DipoleType::Magnetic,
            [0.0, 0.0, -1.0],
            PolarisationAxis::Z,
            1.0,
            vec![10.0],
        ));
        em.set_fields_to_calculate(FieldsWanted::H);
        em.make_calc3().unwrap();
        assert!(points.hfield(0, 0).unwrap()[2].norm() > 0.0);
        assert_eq!(points.hfield(0, 1).unwrap()[2].norm(), 0.0);
    }
}
