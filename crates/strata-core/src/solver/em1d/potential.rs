//! Closed-form wavenumber-domain potentials.
//!
//! Each formula id selects a potential family (`JD`, 1 to 4) that fixes
//! the sign pattern of the up/down-going terms and the vertical-wavenumber
//! multiplier. The returned value is already divided by the source-layer
//! wavenumber, so it is the Hankel integrand proper.

use num_complex::Complex64;

use super::reflection::{ReflectionEngine, ReflectionState};
use crate::types::EmMode;

/// Number of formula ids.
pub const FORMULAS: usize = 13;

/// Potential family per formula id.
const JD: [usize; FORMULAS] = [4, 4, 1, 1, 3, 3, 3, 2, 2, 1, 2, 1, 1];

const SS_SN: [[f64; 4]; 4] = [
    [1.0, 1.0, 1.0, 1.0],
    [-1.0, -1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0, -1.0],
    [1.0, -1.0, 1.0, -1.0],
];

const SR_SN: [[f64; 4]; 4] = [
    [1.0, 1.0, 1.0, 1.0],
    [-1.0, -1.0, 1.0, 1.0],
    [1.0, -1.0, 1.0, -1.0],
    [-1.0, 1.0, 1.0, -1.0],
];

const RS_SN: [[f64; 4]; 4] = [
    [1.0, 1.0, 1.0, 1.0],
    [-1.0, -1.0, 1.0, 1.0],
    [-1.0, 1.0, -1.0, 1.0],
    [1.0, -1.0, -1.0, 1.0],
];

const SS_SL: [[f64; 2]; 4] = [[1.0, 1.0], [-1.0, 1.0], [1.0, -1.0], [-1.0, -1.0]];

/// Bessel order paired with a formula id.
pub fn bessel_order(formula: usize) -> u8 {
    match formula {
        0 | 2 | 5 | 7 | 11 => 0,
        _ => 1,
    }
}

/// The power of $\lambda$ multiplying a formula.
fn lambda_factor(formula: usize, st: &ReflectionState) -> f64 {
    match formula {
        0 | 2 | 5 | 7 => st.lambda,
        4 | 9 | 10 | 12 => st.rams,
        11 => st.lambda * st.rams,
        _ => 1.0,
    }
}

fn family(formula: usize) -> usize {
    JD[formula] - 1
}

/// Multiplier shared by the below and above potentials.
fn transmitted_multiplier(row: usize, st: &ReflectionState) -> Complex64 {
    match row {
        1 => st.um,
        2 => st.uk,
        3 => st.um * st.uk,
        _ => Complex64::new(1.0, 0.0),
    }
}

/// Source and receiver in the same layer.
pub fn in_source_layer(formula: usize, e: &ReflectionEngine, st: &ReflectionState) -> Complex64 {
    let row = family(formula);
    let ra = lambda_factor(formula, st);
    let (s, nlay) = (e.lays, e.nlay);
    let (rx, tx) = (e.rx_z, e.tx_z);
    let uk = st.uk;

    let iud = usize::from(rx <= tx);
    let adz = (rx - tx).abs();
    let ud = match row {
        0 => Complex64::new(1.0, 0.0),
        3 => uk * uk,
        _ => uk,
    };
    let ss = &SS_SN[row];

    let mut con = if s == 0 {
        st.rtd[0] * (st.u[0] * (rx + tx)).exp()
    } else if s == nlay - 1 {
        ss[0] * st.rtu[s] * (st.u[s] * (2.0 * e.depth[nlay - 2] - rx - tx)).exp()
    } else {
        let (rtu, rtd) = (st.rtu[s], st.rtd[s]);
        let top = 2.0 * e.depth[s - 1];
        let bottom = 2.0 * e.depth[s];
        let h2 = 2.0 * e.thickness[s];
        let c = rtu * (ss[0] * (uk * (top - rx - tx)).exp() + ss[1] * rtd * (uk * (tx - rx - h2)).exp())
            + rtd * (ss[2] * (uk * (rx + tx - bottom)).exp() + ss[3] * rtu * (uk * (rx - tx - h2)).exp());
        c / (1.0 - rtu * rtd * st.cf[s])
    };
    con += SS_SL[row][iud] * (-uk * adz).exp();

    ra * ud * con / uk
}

/// Receiver in a deeper layer than the source.
pub fn below_source_layer(formula: usize, e: &ReflectionEngine, st: &ReflectionState) -> Complex64 {
    let row = family(formula);
    let ra = lambda_factor(formula, st);
    let (s, r, nlay) = (e.lays, e.layr, e.nlay);
    let (rx, tx) = (e.rx_z, e.tx_z);
    let (uk, um) = (st.uk, st.um);
    let one = Complex64::new(1.0, 0.0);
    let sr = &SR_SN[row];

    let mut dd = one;
    if s > 0 {
        dd -= st.rtu[s] * st.rtd[s] * st.cf[s];
    }
    dd *= one + st.rtd[s + 1] * st.cf[s + 1];

    let mut a = (one + st.rtd[s]) / dd;
    for n in s + 2..=r {
        a *= one + st.rtd[n - 1];
        if n < nlay - 1 {
            a /= one + st.rtd[n] * st.cf[n];
        }
    }

    let p: Complex64 = (s + 1..=r)
        .map(|n| (st.u[n] - st.u[n - 1]) * e.depth[n - 1])
        .sum();

    let mut con = sr[0] * (uk * tx - um * rx + p).exp();
    if r < nlay - 1 {
        con += sr[2] * st.rtd[r] * (uk * tx - um * (2.0 * e.depth[r] - rx) + p).exp();
    }
    if s > 0 {
        let up = uk * (2.0 * e.depth[s - 1] - tx);
        con += sr[1] * st.rtu[s] * (up - um * rx + p).exp();
        if r < nlay - 1 {
            con += sr[3] * st.rtu[s] * st.rtd[r] * (up - um * (2.0 * e.depth[r] - rx) + p).exp();
        }
    }

    ra * a * con * transmitted_multiplier(row, st) / uk
}

/// Receiver in a shallower layer than the source.
pub fn above_source_layer(formula: usize, e: &ReflectionEngine, st: &ReflectionState) -> Complex64 {
    let row = family(formula);
    let ra = lambda_factor(formula, st);
    let (s, r, nlay) = (e.lays, e.layr, e.nlay);
    let (rx, tx) = (e.rx_z, e.tx_z);
    let (uk, um) = (st.uk, st.um);
    let one = Complex64::new(1.0, 0.0);
    let rs = &RS_SN[row];

    let surface_form = matches!(formula, 0 | 1 | 4 | 7 | 8 | 9 | 10 | 11);
    let cc = if e.mode == EmMode::Tm && r == 0 && surface_form {
        2.0 * st.rtu[s] * st.u[1] * e.yh[0] / (e.yh[0] * st.u[1] - e.yh[1] * st.u[0])
    } else {
        st.rtu[s] + st.rtu[s] / st.rtu[r + 1]
    };

    let mut dd = one - st.rtu[s] * st.rtd[s] * st.cf[s];
    if r > 0 {
        dd *= one + st.rtu[r] * st.cf[r];
    }

    let mut a = cc / dd;
    for n in r + 1..s {
        a *= (st.rtu[n] + st.rtu[n] / st.rtu[n + 1]) / (one + st.rtu[n] * st.cf[n]);
    }

    let phase = |from: usize| -> Complex64 {
        (from..s)
            .map(|n| 2.0 * st.u[n] * e.thickness[n] + (st.u[n + 1] - st.u[n]) * e.depth[n])
            .sum()
    };
    let down = uk * (tx - 2.0 * e.depth[s - 1]);
    let up = uk * (2.0 * e.thickness[s] - tx);

    let con = if r == 0 {
        let p = -st.u[0] * rx + phase(1);
        let mut con = rs[2] * (-p - down).exp();
        if s < nlay - 1 {
            con += rs[3] * st.rtd[s] * (-p - up).exp();
        }
        con
    } else {
        let p = phase(r);
        let mirror = um * (2.0 * e.depth[r - 1] - rx);
        let mut con = rs[0] * st.rtu[r] * (-p - down - um * rx).exp() + rs[2] * (-p - down - mirror).exp();
        if s < nlay - 1 {
            con += st.rtd[s]
                * (rs[1] * st.rtu[r] * (-p - up - um * rx).exp() + rs[3] * (-p - up - mirror).exp());
        }
        con
    };

    ra * a * con * transmitted_multiplier(row, st) / uk
}

/// Pick the potential for the actual source and receiver layers.
pub fn by_layers(formula: usize, e: &ReflectionEngine, st: &ReflectionState) -> Complex64 {
    use std::cmp::Ordering;
    match e.layr.cmp(&e.lays) {
        Ordering::Equal => in_source_layer(formula, e, st),
        Ordering::Greater => below_source_layer(formula, e, st),
        Ordering::Less => above_source_layer(formula, e, st),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_earth::LayeredEarth;

    #[test]
    fn test_bessel_orders() {
        let zeros: Vec<usize> = (0..FORMULAS).filter(|&f| bessel_order(f) == 0).collect();
        assert_eq!(zeros, vec![0, 2, 5, 7, 11]);
    }

    #[test]
    fn test_whole_space_direct_term() {
        // All-air model, source and receiver in layer 0: only the direct
        // term survives. Formula 10 has family 2, whose u factor cancels the
        // 1/u of the integrand, and the receiver is below the source.
        let earth = LayeredEarth::from_real(&[0.0, 0.0], vec![]).unwrap();
        let e = ReflectionEngine::new(&earth, 100.0, -20.0, -5.0, EmMode::Te);
        let mut st = ReflectionState::new(2);
        let lambda = 0.07;
        e.compute(lambda, &mut st);
        let got = in_source_layer(10, &e, &st);
        let expected = -lambda * lambda * (-st.u[0] * 15.0).exp();
        assert!((got - expected).norm() <= 1e-10 * expected.norm());
    }

    #[test]
    fn test_transparent_interface_is_continuous() {
        // With identical layers the below potential at the interface must
        // equal the in-source potential just above it.
        let earth = LayeredEarth::from_real(&[0.0, 0.02, 0.02], vec![30.0]).unwrap();
        let omega = 2.0 * std::f64::consts::PI * 500.0;
        let lambda = 0.05;
        for formula in [0, 5, 10] {
            let same = ReflectionEngine::new(&earth, omega, 10.0, 29.999, EmMode::Te);
            let below = ReflectionEngine::new(&earth, omega, 10.0, 30.001, EmMode::Te);
            let mut st = ReflectionState::new(3);
            same.compute(lambda, &mut st);
            let a = by_layers(formula, &same, &st);
            let mut st = ReflectionState::new(3);
            below.compute(lambda, &mut st);
            let b = by_layers(formula, &below, &st);
            assert!((a - b).norm() <= 1e-3 * a.norm(), "formula {formula}: {a} vs {b}");
        }
    }
}
