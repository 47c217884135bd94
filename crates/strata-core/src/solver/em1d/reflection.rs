//! TE/TM reflection coefficients of a layered earth.
//!
//! For radial wavenumber $\lambda$ each layer has vertical wavenumber
//! $u_n = \sqrt{\lambda^2 - k_n^2}$ and intrinsic impedance (TE, using
//! $\hat z$) or admittance (TM, using $\hat y$) $Z_n = u_n / \hat z_n$.
//! Apparent impedances are carried up from the basement and down from the
//! air by the usual transmission-line recursion with
//! $\tanh(u_n h_n) = (1 - e^{-2 u_n h_n}) / (1 + e^{-2 u_n h_n})$, and the
//! up/down reflection coefficients `rtu`, `rtd` follow for just the layers
//! between source and receiver.

use num_complex::Complex64;
use strata_earth::LayeredEarth;

use crate::types::{EmMode, EPSILON0, MU0};

/// Per-frequency constants of one source/receiver pair in one mode.
#[derive(Debug, Clone)]
pub struct ReflectionEngine {
    pub(crate) mode: EmMode,
    pub(crate) nlay: usize,
    pub(crate) zh: Vec<Complex64>,
    pub(crate) yh: Vec<Complex64>,
    pub(crate) kk: Vec<Complex64>,
    pub(crate) thickness: Vec<f64>,
    pub(crate) depth: Vec<f64>,
    pub(crate) tx_z: f64,
    pub(crate) rx_z: f64,
    pub(crate) lays: usize,
    pub(crate) layr: usize,
}

/// Everything that depends on $\lambda$; overwritten by each
/// [`ReflectionEngine::compute`].
#[derive(Debug, Clone)]
pub struct ReflectionState {
    pub lambda: f64,
    /// $\lambda^2$.
    pub rams: f64,
    pub u: Vec<Complex64>,
    /// $e^{-2 u_n h_n}$ for interior layers, zero for the halfspaces.
    pub cf: Vec<Complex64>,
    th: Vec<Complex64>,
    zyu: Vec<Complex64>,
    zyd: Vec<Complex64>,
    zyi: Vec<Complex64>,
    pub rtu: Vec<Complex64>,
    pub rtd: Vec<Complex64>,
    /// $u$ in the source layer.
    pub uk: Complex64,
    /// $u$ in the receiver layer.
    pub um: Complex64,
}

impl ReflectionState {
    pub fn new(nlay: usize) -> Self {
        let zero = Complex64::new(0.0, 0.0);
        Self {
            lambda: 0.0,
            rams: 0.0,
            u: vec![zero; nlay],
            cf: vec![zero; nlay],
            th: vec![zero; nlay],
            zyu: vec![zero; nlay],
            zyd: vec![zero; nlay],
            zyi: vec![zero; nlay],
            rtu: vec![zero; nlay],
            rtd: vec![zero; nlay],
            uk: zero,
            um: zero,
        }
    }
}

impl ReflectionEngine {
    /// Bind an earth, an angular frequency and source/receiver depths.
    ///
    /// The earth must already be validated.
    pub fn new(earth: &LayeredEarth, omega: f64, tx_z: f64, rx_z: f64, mode: EmMode) -> Self {
        let nlay = earth.number_of_layers();
        let zero = Complex64::new(0.0, 0.0);
        let mut zh = vec![zero; nlay];
        let mut yh = vec![zero; nlay];
        let mut kk = vec![zero; nlay];

        zh[0] = Complex64::new(0.0, omega * MU0);
        yh[0] = Complex64::new(0.0, omega * EPSILON0);
        kk[0] = -zh[0] * yh[0];
        for i in 1..nlay {
            zh[i] = zh[0] * earth.layer_susceptibility(i, omega);
            yh[i] = earth.layer_conductivity(i) + yh[0] * earth.layer_permittivity(i, omega);
            kk[i] = -zh[i] * yh[i];
        }

        Self {
            mode,
            nlay,
            zh,
            yh,
            kk,
            thickness: (0..nlay).map(|i| earth.layer_thickness(i)).collect(),
            depth: (0..nlay).map(|i| earth.layer_depth(i)).collect(),
            tx_z,
            rx_z,
            lays: earth.layer_of_point(tx_z),
            layr: earth.layer_of_point(rx_z),
        }
    }

    pub fn mode(&self) -> EmMode {
        self.mode
    }

    pub fn source_layer(&self) -> usize {
        self.lays
    }

    pub fn receiver_layer(&self) -> usize {
        self.layr
    }

    /// Admittance $\hat y$ of the receiver layer.
    pub fn ym(&self) -> Complex64 {
        self.yh[self.layr]
    }

    /// Impedance $\hat z$ of the receiver layer.
    pub fn zm(&self) -> Complex64 {
        self.zh[self.layr]
    }

    /// Impedance $\hat z$ of the source layer.
    pub fn zs(&self) -> Complex64 {
        self.zh[self.lays]
    }

    /// $k^2$ of the source layer.
    pub fn ks(&self) -> Complex64 {
        self.kk[self.lays]
    }

    /// Fill `st` with the reflection coefficients at `lambda`.
    pub fn compute(&self, lambda: f64, st: &mut ReflectionState) {
        let nlay = self.nlay;
        let (lays, layr) = (self.lays, self.layr);
        let one = Complex64::new(1.0, 0.0);

        st.lambda = lambda;
        st.rams = lambda * lambda;
        for (u, &k) in st.u.iter_mut().zip(&self.kk) {
            *u = (st.rams - k).sqrt();
        }
        st.uk = st.u[lays];
        st.um = st.u[layr];

        let h = match self.mode {
            EmMode::Tm => &self.yh,
            EmMode::Te => &self.zh,
        };
        st.zyu[1] = -st.u[0] / h[0];
        for i in 0..nlay {
            st.zyi[i] = st.u[i] / h[i];
        }
        st.zyd[nlay - 1] = st.zyi[nlay - 1];

        for i in 1..nlay - 1 {
            st.cf[i] = (-2.0 * st.u[i] * self.thickness[i]).exp();
            st.th[i] = (one - st.cf[i]) / (one + st.cf[i]);
        }

        let (zyi, th) = (&st.zyi, &st.th);
        for n in 1..lays {
            st.zyu[n + 1] =
                zyi[n] * (st.zyu[n] - zyi[n] * th[n]) / (zyi[n] - st.zyu[n] * th[n]);
        }
        if nlay >= 2 {
            for n in (lays + 1..=nlay - 2).rev() {
                st.zyd[n] =
                    zyi[n] * (st.zyd[n + 1] + zyi[n] * th[n]) / (zyi[n] + st.zyd[n + 1] * th[n]);
            }
        }

        let (zyu, zyd) = (&st.zyu, &st.zyd);
        let up = |n: usize| (zyi[n] + zyu[n]) / (zyi[n] - zyu[n]);
        let down = |n: usize| (zyi[n] - zyd[n + 1]) / (zyi[n] + zyd[n + 1]);
        let surface = || (zyu[1] + zyd[1]) / (zyu[1] - zyd[1]);

        st.rtd[nlay - 1] = Complex64::new(0.0, 0.0);
        if layr < lays {
            // receiver above the source layer
            for n in layr.max(1)..=lays {
                st.rtu[n] = up(n);
            }
            if lays < nlay - 1 {
                st.rtd[lays] = down(lays);
            }
        } else if layr == lays {
            if layr == 0 {
                st.rtd[0] = surface();
            } else if layr == nlay - 1 {
                st.rtu[nlay - 1] = up(nlay - 1);
            } else {
                st.rtu[layr] = up(layr);
                st.rtd[layr] = down(layr);
            }
        } else {
            // receiver below the source layer
            if lays == 0 {
                st.rtd[0] = surface();
            } else {
                st.rtu[lays] = up(lays);
            }
            let last = if layr == nlay - 1 { layr - 1 } else { layr };
            for n in lays.max(1)..=last {
                st.rtd[n] = down(n);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn three_layer() -> LayeredEarth {
        LayeredEarth::from_real(&[0.0, 0.01, 0.1], vec![50.0]).unwrap()
    }

    #[test]
    fn test_layer_indices() {
        let earth = three_layer();
        let e = ReflectionEngine::new(&earth, 1e3, -30.0, 10.0, EmMode::Te);
        assert_eq!(e.source_layer(), 0);
        assert_eq!(e.receiver_layer(), 1);
        let e = ReflectionEngine::new(&earth, 1e3, 75.0, -1.0, EmMode::Tm);
        assert_eq!(e.source_layer(), 2);
        assert_eq!(e.receiver_layer(), 0);
    }

    #[test]
    fn test_uniform_earth_has_no_internal_reflection() {
        // Layer 1 and basement identical: rtd(1) vanishes.
        let earth = LayeredEarth::from_real(&[0.0, 0.05, 0.05], vec![20.0]).unwrap();
        let e = ReflectionEngine::new(&earth, 2e3, 5.0, 5.0, EmMode::Te);
        let mut st = ReflectionState::new(3);
        e.compute(0.03, &mut st);
        assert!(st.rtd[1].norm() < 1e-14);
    }

    #[test]
    fn test_te_surface_coefficient_of_halfspace() {
        // TE reflection at the surface of a halfspace: (u0 - u1) / (u0 + u1)
        let earth = LayeredEarth::halfspace(0.1);
        let omega = 2.0 * std::f64::consts::PI * 1e3;
        let e = ReflectionEngine::new(&earth, omega, -10.0, -5.0, EmMode::Te);
        let mut st = ReflectionState::new(2);
        let lambda = 0.02;
        e.compute(lambda, &mut st);
        let expected = (st.u[0] - st.u[1]) / (st.u[0] + st.u[1]);
        assert_relative_eq!(st.rtd[0].re, expected.re, max_relative = 1e-12);
        assert_relative_eq!(st.rtd[0].im, expected.im, max_relative = 1e-12);
    }

    #[test]
    fn test_air_over_air_is_transparent() {
        let earth = LayeredEarth::from_real(&[0.0, 0.0], vec![]).unwrap();
        for mode in EmMode::ALL {
            let e = ReflectionEngine::new(&earth, 10.0, -10.0, -5.0, mode);
            let mut st = ReflectionState::new(2);
            e.compute(0.5, &mut st);
            assert!(st.rtd[0].norm() < 1e-12);
        }
    }
}
