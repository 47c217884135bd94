//! Dipole field assembly.
//!
//! A [`DipoleCall`] binds one dipole, one receiver and one frequency. It
//! holds the horizontal geometry and the kernels that combination needs,
//! runs a Hankel transform over them and folds the transformed kernels into
//! Cartesian E and H vectors with the azimuthal weights of each dipole type.

use std::f64::consts::PI;

use num_complex::Complex64;
use strata_earth::LayeredEarth;

use super::kernel::{select_kernels, KernelManager};
use crate::fields::FieldPoints;
use crate::hankel::{HankelTransform, LaggedTransform};
use crate::solver::EmError;
use crate::types::{DipoleSource, DipoleType, EmMode, FieldsWanted};

/// Smallest horizontal offset handed to a transform (m).
pub const MIN_RHO: f64 = 1e-3;

const QPI: f64 = 1.0 / (4.0 * PI);

type Vector = [Complex64; 3];

/// Geometry of one source/receiver/frequency combination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallContext {
    /// Receiver minus source, x and y (m).
    pub offset: [f64; 2],
    /// Horizontal offset, clamped to [`MIN_RHO`].
    pub rho: f64,
    /// $\sin\phi$ of the receiver azimuth.
    pub sin: f64,
    /// $\cos\phi$ of the receiver azimuth.
    pub cos: f64,
    pub source_layer: usize,
    pub receiver_layer: usize,
    /// Angular frequency (rad/s).
    pub omega: f64,
}

impl CallContext {
    pub fn new(dipole: &DipoleSource, receiver: [f64; 3], omega: f64, earth: &LayeredEarth) -> Self {
        let dx = receiver[0] - dipole.location[0];
        let dy = receiver[1] - dipole.location[1];
        let r = dx.hypot(dy);
        // On-axis the azimuth is arbitrary; phi = 0 gives the right limit
        // for axisymmetric sources.
        let (sin, cos) = if r > 0.0 { (dy / r, dx / r) } else { (0.0, 1.0) };
        Self {
            offset: [dx, dy],
            rho: r.max(MIN_RHO),
            sin,
            cos,
            source_layer: earth.layer_of_point(dipole.location[2]),
            receiver_layer: earth.layer_of_point(receiver[2]),
            omega,
        }
    }
}

/// One dipole evaluated at one receiver and frequency.
#[derive(Debug, Clone)]
pub struct DipoleCall<'a> {
    dipole: &'a DipoleSource,
    fields: FieldsWanted,
    freq_index: usize,
    receiver_index: usize,
    ctx: CallContext,
    manager: KernelManager,
}

impl<'a> DipoleCall<'a> {
    /// Compute the geometry and select the kernels for one combination.
    ///
    /// # Errors
    /// [`EmError::IndexOutOfRange`] for a bad frequency or receiver index.
    pub fn prepare(
        dipole: &'a DipoleSource,
        freq_index: usize,
        fields: FieldsWanted,
        receivers: &FieldPoints,
        receiver_index: usize,
        earth: &LayeredEarth,
    ) -> Result<Self, EmError> {
        if freq_index >= dipole.number_of_frequencies() {
            return Err(EmError::IndexOutOfRange {
                what: "frequency",
                index: freq_index,
                len: dipole.number_of_frequencies(),
            });
        }
        if receiver_index >= receivers.number_of_points() {
            return Err(EmError::IndexOutOfRange {
                what: "receiver",
                index: receiver_index,
                len: receivers.number_of_points(),
            });
        }
        let receiver = receivers.location(receiver_index);
        let omega = dipole.angular_frequency(freq_index);
        let ctx = CallContext::new(dipole, receiver, omega, earth);

        let mut manager = KernelManager::new(earth, omega, dipole.location[2], receiver[2]);
        for (mode, formula) in select_kernels(dipole.dipole_type, dipole.polarisation(), fields) {
            manager.add_kernel(mode, formula)?;
        }

        Ok(Self {
            dipole,
            fields,
            freq_index,
            receiver_index,
            ctx,
            manager,
        })
    }

    pub fn context(&self) -> &CallContext {
        &self.ctx
    }

    pub fn kernels(&self) -> &KernelManager {
        &self.manager
    }

    pub fn kernels_mut(&mut self) -> &mut KernelManager {
        &mut self.manager
    }

    /// Transform the kernels and return the (E, H) contribution.
    pub fn evaluate(&mut self, transform: &mut dyn HankelTransform) -> Result<(Vector, Vector), EmError> {
        transform.compute_related(self.ctx.rho, &mut self.manager)?;
        let manager = &self.manager;
        Ok(self.combine(|mode, formula| {
            manager
                .index_of(mode, formula)
                .map_or(Complex64::new(0.0, 0.0), |i| transform.zgauss(i))
        }))
    }

    /// Transform the kernels and append the result to the receiver.
    pub fn update_fields(
        &mut self,
        transform: &mut dyn HankelTransform,
        receivers: &FieldPoints,
    ) -> Result<(), EmError> {
        let (e, h) = self.evaluate(transform)?;
        self.append(receivers, e, h)
    }

    /// Read this call's offset from a lagged transform and append the result.
    ///
    /// `lagged_kernels` is the manager the lagged transform was computed
    /// with; it must contain every kernel this call needs.
    pub fn update_fields_lagged(
        &self,
        lagged: &mut dyn LaggedTransform,
        lagged_kernels: &KernelManager,
        receivers: &FieldPoints,
    ) -> Result<(), EmError> {
        for (mode, formula) in self.manager.kernels() {
            if lagged_kernels.index_of(mode, formula).is_none() {
                return Err(EmError::InvalidSetting(format!(
                    "lagged transform lacks kernel {mode:?} {formula}"
                )));
            }
        }
        lagged.set_lagged_arg(self.ctx.rho)?;
        let lagged = &*lagged;
        let (e, h) = self.combine(|mode, formula| {
            lagged_kernels
                .index_of(mode, formula)
                .map_or(Complex64::new(0.0, 0.0), |i| lagged.zgauss(i))
        });
        self.append(receivers, e, h)
    }

    fn append(&self, receivers: &FieldPoints, e: Vector, h: Vector) -> Result<(), EmError> {
        if self.fields.wants_e() {
            receivers.append_efield(self.freq_index, self.receiver_index, e)?;
        }
        if self.fields.wants_h() {
            receivers.append_hfield(self.freq_index, self.receiver_index, h)?;
        }
        Ok(())
    }

    /// Fold transformed kernels into E and H.
    fn combine(&self, z: impl Fn(EmMode, usize) -> Complex64) -> (Vector, Vector) {
        use EmMode::{Te, Tm};

        let zero = Complex64::new(0.0, 0.0);
        let mut e = [zero; 3];
        let mut h = [zero; 3];

        let rho = self.ctx.rho;
        let (sp, cp) = (self.ctx.sin, self.ctx.cos);
        let scp = sp * cp;
        let sps = sp * sp;
        let cps = cp * cp;
        let c2p = cps - sps;

        let [px, py, pz] = self.dipole.polarisation();
        let m = self.dipole.complex_moment() * QPI;
        let (ym, zs, zm, ks) = (
            self.manager.ym(),
            self.manager.zs(),
            self.manager.zm(),
            self.manager.ks(),
        );
        let (want_e, want_h) = (self.fields.wants_e(), self.fields.wants_h());
        let vertical = pz.abs() > 0.0;
        let horizontal = px.abs() > 0.0 || py.abs() > 0.0;

        let add = |v: &mut Vector, scale: Complex64, c: [Complex64; 3]| {
            for (vi, ci) in v.iter_mut().zip(c) {
                *vi += scale * ci;
            }
        };

        match self.dipole.dipole_type {
            DipoleType::GroundedElectric | DipoleType::UngroundedElectric => {
                let grounded = self.dipole.dipole_type == DipoleType::GroundedElectric;
                if vertical {
                    let m = m * pz;
                    if want_e {
                        let f10 = if grounded { z(Tm, 10) / ym } else { zero };
                        let f11 = z(Tm, 11) / ym;
                        add(&mut e, m, [-cp * f10, -sp * f10, f11]);
                    }
                    if want_h {
                        let f12 = z(Tm, 12);
                        add(&mut h, m, [-sp * f12, cp * f12, zero]);
                    }
                }
                if horizontal {
                    if want_e {
                        let (f0, f1, f4) = if grounded {
                            (z(Tm, 0) / ym, z(Tm, 1) / ym, z(Tm, 4) / ym)
                        } else {
                            (zero, zero, zero)
                        };
                        let f2 = z(Te, 2) * zs;
                        let f3 = z(Te, 3) * zs;
                        let cross = scp * ((f0 - 2.0 * f1 / rho) + (f2 - 2.0 * f3 / rho));
                        add(
                            &mut e,
                            m * px,
                            [
                                (cps * f0 - c2p * f1 / rho) - (sps * f2 + c2p * f3 / rho),
                                cross,
                                cp * f4,
                            ],
                        );
                        add(
                            &mut e,
                            m * py,
                            [
                                cross,
                                (sps * f0 + c2p * f1 / rho) - (cps * f2 - c2p * f3 / rho),
                                sp * f4,
                            ],
                        );
                    }
                    if want_h {
                        let f5 = z(Tm, 5);
                        let f6 = z(Tm, 6);
                        let f7 = z(Te, 7) * zs / zm;
                        let f8 = z(Te, 8) * zs / zm;
                        let f9 = z(Te, 9) * zs / zm;
                        add(
                            &mut h,
                            m * px,
                            [
                                scp * (f5 - 2.0 * f6 / rho + f7 - 2.0 * f8 / rho),
                                -cps * f5 + c2p * f6 / rho + sps * f7 + c2p * f8 / rho,
                                sp * f9,
                            ],
                        );
                        add(
                            &mut h,
                            m * py,
                            [
                                sps * f5 + c2p * f6 / rho - cps * f7 + c2p * f8 / rho,
                                scp * (-f5 + 2.0 * f6 / rho - f7 + 2.0 * f8 / rho),
                                -cp * f9,
                            ],
                        );
                    }
                }
            }
            DipoleType::Magnetic => {
                if vertical {
                    let m = m * pz;
                    if want_e {
                        let f12 = z(Te, 12) * zs;
                        add(&mut e, m, [sp * f12, -cp * f12, zero]);
                    }
                    if want_h {
                        let f10 = z(Te, 10) * zs / zm;
                        let f11 = z(Te, 11) * zs / zm;
                        add(&mut h, m, [-cp * f10, -sp * f10, f11]);
                    }
                }
                if horizontal {
                    if want_e {
                        let f5 = z(Te, 5) * zs;
                        let f6 = z(Te, 6) * zs;
                        let f7 = z(Tm, 7) * ks / ym;
                        let f8 = z(Tm, 8) * ks / ym;
                        let f9 = z(Tm, 9) * ks / ym;
                        add(
                            &mut e,
                            m * px,
                            [
                                scp * ((-f5 + 2.0 * f6 / rho) + (f7 - 2.0 * f8 / rho)),
                                (cps * f5 - c2p * f6 / rho) + (sps * f7 + c2p * f8 / rho),
                                sp * f9,
                            ],
                        );
                        add(
                            &mut e,
                            m * py,
                            [
                                -(sps * f5 + c2p * f6 / rho) - (cps * f7 - c2p * f8 / rho),
                                scp * ((f5 - 2.0 * f6 / rho) - (f7 - 2.0 * f8 / rho)),
                                -cp * f9,
                            ],
                        );
                    }
                    if want_h {
                        let f0 = z(Te, 0) * zs / zm;
                        let f1 = z(Te, 1) * zs / zm;
                        let f4 = z(Te, 4) * zs / zm;
                        let f2 = z(Tm, 2) * ks;
                        let f3 = z(Tm, 3) * ks;
                        let cross = scp * (f0 - 2.0 * f1 / rho - (f2 - 2.0 * f3 / rho));
                        add(
                            &mut h,
                            m * px,
                            [
                                cps * f0 - c2p * f1 / rho + (sps * f2 + c2p * f3 / rho),
                                cross,
                                cp * f4,
                            ],
                        );
                        add(
                            &mut h,
                            m * py,
                            [
                                cross,
                                sps * f0 + c2p * f1 / rho + (cps * f2 - c2p * f3 / rho),
                                sp * f4,
                            ],
                        );
                    }
                }
            }
        }

        (e, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hankel::{HankelMethod, QweConfig};
    use crate::types::PolarisationAxis;
    use approx::assert_relative_eq;

    fn air() -> LayeredEarth {
        LayeredEarth::from_real(&[0.0, 0.0], vec![]).unwrap()
    }

    #[test]
    fn test_context_on_axis_uses_zero_azimuth() {
        let d = DipoleSource::along(DipoleType::Magnetic, [1.0, 2.0, -5.0], PolarisationAxis::Z, 1.0, vec![1.0]);
        let ctx = CallContext::new(&d, [1.0, 2.0, -1.0], 1.0, &air());
        assert_eq!(ctx.sin, 0.0);
        assert_eq!(ctx.cos, 1.0);
        assert_eq!(ctx.rho, MIN_RHO);
    }

    #[test]
    fn test_context_azimuth() {
        let d = DipoleSource::along(DipoleType::Magnetic, [0.0, 0.0, -5.0], PolarisationAxis::Z, 1.0, vec![1.0]);
        let ctx = CallContext::new(&d, [3.0, 4.0, 0.0], 1.0, &air());
        assert_relative_eq!(ctx.rho, 5.0);
        assert_relative_eq!(ctx.sin, 0.8);
        assert_relative_eq!(ctx.cos, 0.6);
    }

    #[test]
    fn test_prepare_rejects_bad_indices() {
        let d = DipoleSource::along(DipoleType::Magnetic, [0.0; 3], PolarisationAxis::Z, 1.0, vec![1.0]);
        let rx = FieldPoints::new(vec![[10.0, 0.0, 0.0]]);
        let earth = air();
        assert!(matches!(
            DipoleCall::prepare(&d, 1, FieldsWanted::H, &rx, 0, &earth),
            Err(EmError::IndexOutOfRange { what: "frequency", .. })
        ));
        assert!(matches!(
            DipoleCall::prepare(&d, 0, FieldsWanted::H, &rx, 3, &earth),
            Err(EmError::IndexOutOfRange { what: "receiver", .. })
        ));
    }

    #[test]
    fn test_vertical_magnetic_dipole_in_air() {
        // Quasi-static dipole: Hz = m (2h^2 - rho^2) / (4 pi R^5),
        // H_rho = 3 m h rho / (4 pi R^5), h measured downward.
        let d = DipoleSource::along(DipoleType::Magnetic, [0.0, 0.0, -30.0], PolarisationAxis::Z, 1.0, vec![100.0]);
        let rx = FieldPoints::new(vec![[40.0, 0.0, -10.0]]);
        let earth = air();
        let mut call = DipoleCall::prepare(&d, 0, FieldsWanted::H, &rx, 0, &earth).unwrap();
        let mut transform = HankelMethod::Filter801.build(&QweConfig::default());
        let (_, hv) = call.evaluate(transform.as_mut()).unwrap();

        let (rho, hgt) = (40.0_f64, 20.0_f64);
        let r5 = (rho * rho + hgt * hgt).powf(2.5);
        let hz = (2.0 * hgt * hgt - rho * rho) / (4.0 * PI * r5);
        let hr = 3.0 * hgt * rho / (4.0 * PI * r5);
        assert_relative_eq!(hv[2].re, hz, max_relative = 1e-4);
        assert_relative_eq!(hv[0].re, hr, max_relative = 1e-4);
        assert!(hv[1].norm() < 1e-12);
    }
}
