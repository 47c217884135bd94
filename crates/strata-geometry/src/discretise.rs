//! Decomposition of wire segments into short electric dipoles.
//!
//! A finite wire carrying current $I$ radiates like a line of infinitesimal
//! dipoles. Each segment is cut into pieces whose length $\ell$ grows with
//! distance $r$ from the receiver, $\ell \approx \alpha r$, so that every
//! piece subtends roughly the same angle at the observation point. The
//! pieces tile the segment exactly, hence the summed moments equal
//! $N I L$ for a wire of length $L$ and $N$ turns.

use nalgebra::Vector3;

/// Absolute floor on a dipole length (m), keeping the walk finite when the
/// receiver sits on the wire.
const STEP_FLOOR: f64 = 1e-9;

/// A point electric dipole produced by decomposing a wire.
#[derive(Debug, Clone, PartialEq)]
pub struct DipoleElement {
    /// Centre of the wire piece (m).
    pub location: [f64; 3],
    /// Unit vector along the current.
    pub direction: [f64; 3],
    /// Current moment $N I \ell$ (A·m).
    pub moment: f64,
}

/// The point on segment `p1 -> p2` closest to `target`.
pub fn closest_point_on_segment(
    p1: &Vector3<f64>,
    p2: &Vector3<f64>,
    target: &Vector3<f64>,
) -> Vector3<f64> {
    let seg = p2 - p1;
    let len2 = seg.norm_squared();
    if len2 == 0.0 {
        return *p1;
    }
    let t = ((target - p1).dot(&seg) / len2).clamp(0.0, 1.0);
    p1 + seg * t
}

/// Split one segment into dipoles, appending them to `out`.
///
/// The walk starts at the point closest to the receiver and proceeds
/// towards `p1`, then again towards `p2`. The final piece of each walk is
/// stretched to land exactly on the end point, absorbing any remainder
/// shorter than half a step. A closest point within `min_moment` of a
/// vertex is moved onto it, so the whole segment is walked from that end.
#[allow(clippy::too_many_arguments)]
pub(crate) fn approximate_segment(
    p1: &Vector3<f64>,
    p2: &Vector3<f64>,
    receiver: &Vector3<f64>,
    scale: f64,
    ratio: f64,
    min_moment: f64,
    max_moment: f64,
    out: &mut Vec<DipoleElement>,
) {
    let length = (p2 - p1).norm();
    if length == 0.0 {
        return;
    }
    let cdir = (p2 - p1) / length;
    let mut c = closest_point_on_segment(p1, p2, receiver);
    if (c - p1).norm() <= min_moment {
        c = *p1;
    } else if (p2 - c).norm() <= min_moment {
        c = *p2;
    }
    let floor = min_moment.max(STEP_FLOOR);

    for end in [p1, p2] {
        let span = (end - c).norm();
        if span == 0.0 {
            continue;
        }
        let heading = (end - c) / span;
        let mut travelled = 0.0;
        loop {
            let front = c + heading * travelled;
            let mut step = ratio * (front - receiver).norm();
            while step > max_moment {
                step *= 0.5;
            }
            step = step.max(floor);

            let remaining = span - travelled;
            let last = remaining - step <= (0.5 * step).max(min_moment);
            if last {
                step = remaining;
            }

            let centre = c + heading * (travelled + 0.5 * step);
            out.push(DipoleElement {
                location: [centre.x, centre.y, centre.z],
                direction: [cdir.x, cdir.y, cdir.z],
                moment: scale * step,
            });
            if last {
                break;
            }
            travelled += step;
        }
    }
}
