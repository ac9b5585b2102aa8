//! Relative cell offsets for annular rings and square boxes.

use std::f64::consts::PI;

/// Quantised annulus offsets for a ring of nominal radius `half_size + 0.5`.
///
/// The returned sequence has even length `2N` and antipodal pairing:
/// `offsets[i + N] == -offsets[i]` for every `i < N`. The pairing lets the
/// symmetry filter compare diametrically opposite cells by walking only
/// the first half of the list.
///
/// Small half sizes quantise to fixed shapes: 0 gives the 4-cell cardinal
/// cross, 1 the 8-cell diamond reaching index 2, 2 the 12-cell diamond
/// reaching index 3. Larger sizes approach a quantised circle.
pub fn ring_offsets(half_size: usize) -> Vec<(i32, i32)> {
    let mut offs: Vec<(i32, i32)> = Vec::with_capacity(14 * half_size + 8);

    let rad = half_size as f64 + 0.5;
    let step = 0.25 * PI / rad;

    // First-quadrant sweep. Repeats of the leading offset are dropped here;
    // interior repeats survive until the adjacent dedup below.
    let mut angle = 0.0f64;
    while angle <= 0.5 * PI {
        let off = (round_index(rad * angle.cos()), round_index(rad * angle.sin()));
        if offs.first() != Some(&off) {
            offs.push(off);
        }
        angle += step;
    }

    // Second quadrant by reverse row mirror.
    for i in (0..offs.len()).rev() {
        let (drow, dcol) = offs[i];
        offs.push((-drow, dcol));
    }

    // Second half by half-turn. The final element is skipped because its
    // antipode is the leading offset already in place.
    let half_end = offs.len() - 1;
    for i in 0..half_end {
        let (drow, dcol) = offs[i];
        offs.push((-drow, -dcol));
    }

    offs.dedup();

    debug_assert!(is_antipodal(&offs));
    offs
}

/// Row-major offsets of the `(2*half + 1)^2` square box around a center.
///
/// The row-major reversal of the sequence is its negation, which the SSD
/// refiner exploits when pairing cells across a half turn.
pub fn box_offsets(half: usize) -> Vec<(i32, i32)> {
    let full = 2 * half + 1;
    let mut offs = Vec::with_capacity(full * full);
    for row in 0..full {
        let drow = row as i32 - half as i32;
        for col in 0..full {
            let dcol = col as i32 - half as i32;
            offs.push((drow, dcol));
        }
    }
    offs
}

/// Rounds to the nearest integer index, halves up.
fn round_index(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

fn is_antipodal(offs: &[(i32, i32)]) -> bool {
    if offs.len() % 2 != 0 {
        return false;
    }
    let half = offs.len() / 2;
    (0..half).all(|i| {
        let (drow, dcol) = offs[i];
        offs[i + half] == (-drow, -dcol)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smallest_ring_is_the_cardinal_cross() {
        let offs = ring_offsets(0);
        assert_eq!(offs, vec![(1, 0), (0, 1), (-1, 0), (0, -1)]);
    }

    #[test]
    fn unit_ring_is_the_eight_cell_diamond() {
        let offs = ring_offsets(1);
        assert_eq!(offs.len(), 8);
        for (drow, dcol) in &offs {
            assert_eq!(drow.abs() + dcol.abs(), 2);
        }
    }

    #[test]
    fn two_ring_is_the_twelve_cell_diamond() {
        let offs = ring_offsets(2);
        assert_eq!(offs.len(), 12);
        for (drow, dcol) in &offs {
            assert_eq!(drow.abs() + dcol.abs(), 3);
        }
    }

    #[test]
    fn offsets_stay_within_the_filter_border() {
        for half_size in 0..=12usize {
            let reach = (half_size + 1) as i32;
            for (drow, dcol) in ring_offsets(half_size) {
                assert!(drow.abs() <= reach && dcol.abs() <= reach);
            }
        }
    }

    #[test]
    fn box_reversal_is_negation() {
        let offs = box_offsets(2);
        assert_eq!(offs.len(), 25);
        let n = offs.len();
        for i in 0..n {
            let (drow, dcol) = offs[i];
            assert_eq!(offs[n - 1 - i], (-drow, -dcol));
        }
    }
}
