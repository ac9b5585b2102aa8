//! Sub-cell center refinement by half-turn rotation correlation.
//!
//! For a candidate cell the refiner anchors a correlation box at every
//! cell of a small search hood, sums squared differences between cells
//! paired across a half turn, and takes a probability-weighted centroid
//! of the resulting SSD field. The SSD is exactly zero when the
//! neighbourhood repeats under a half-turn about the anchor, so the
//! weighted minimum lands on the rotation-symmetry center.

use crate::raster::stats::Stats;
use crate::raster::{Raster, RasterView, RowCol, Spot};
use crate::ring::box_offsets;

/// A located feature: sub-pixel spot, significance, and uncertainty.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// Sub-pixel location in raster coordinates.
    pub spot: Spot,
    /// Pseudo-probability in `[0, 1]` that the spot marks a real center.
    pub significance: f64,
    /// Expected radial position error in cells.
    pub sigma: f64,
}

impl Hit {
    /// A hit carrying no information; `is_valid()` is false.
    pub fn invalid() -> Self {
        Self {
            spot: Spot::new(f64::NAN, f64::NAN),
            significance: f64::NAN,
            sigma: f64::NAN,
        }
    }

    /// True if every field is finite.
    pub fn is_valid(&self) -> bool {
        self.spot.is_valid() && self.significance.is_finite() && self.sigma.is_finite()
    }
}

/// Center refiner bound to a borrowed intensity grid.
pub struct CenterRefiner<'a> {
    src: RasterView<'a, f32>,
    half_hood: usize,
    half_corr: usize,
    hood: Vec<(i32, i32)>,
    corr: Vec<(i32, i32)>,
}

impl<'a> CenterRefiner<'a> {
    /// Attaches a refiner to `src` with the given search-hood and
    /// correlation-box half sizes (both at least 1).
    pub fn new(src: RasterView<'a, f32>, half_hood: usize, half_corr: usize) -> Self {
        debug_assert!(half_hood >= 1 && half_corr >= 1);
        Self {
            src,
            half_hood,
            half_corr,
            hood: box_offsets(half_hood),
            corr: box_offsets(half_corr),
        }
    }

    /// Cells between a refinable candidate and the nearest raster edge.
    pub fn max_radius(&self) -> usize {
        self.half_hood + self.half_corr
    }

    /// Half-turn SSD at each hood cell around `rc0`, as a
    /// `(2*half_hood + 1)^2` grid in hood coordinates.
    ///
    /// Cells whose correlation box leaves the raster, or touches a
    /// non-finite value, carry NaN.
    pub fn ssd_field(&self, rc0: RowCol) -> Raster<f64> {
        let full_hood = 2 * self.half_hood + 1;
        let mut field = Raster::filled(full_hood, full_hood, 0.0f64);

        let num_pairs = self.corr.len() / 2;
        let last = self.corr.len() - 1;

        for (idx, &hood_off) in self.hood.iter().enumerate() {
            let anchor = (
                rc0.row as i64 + hood_off.0 as i64,
                rc0.col as i64 + hood_off.1 as i64,
            );

            // Walk the correlation box from both ends toward the middle;
            // with the row-major box this pairs each cell with its
            // half-turn counterpart. The exact middle cell is its own
            // counterpart and contributes nothing.
            let mut sum_sq_dif = 0.0f64;
            for i in 0..num_pairs {
                let fwd = self.sample(anchor, self.corr[i]);
                let rev = self.sample(anchor, self.corr[last - i]);
                let dif = (fwd - rev) as f64;
                sum_sq_dif += dif * dif;
            }
            field.set(idx / full_hood, idx % full_hood, sum_sq_dif);
        }
        field
    }

    fn sample(&self, anchor: (i64, i64), off: (i32, i32)) -> f32 {
        let row = anchor.0 + off.0 as i64;
        let col = anchor.1 + off.1 as i64;
        if row < 0 || col < 0 {
            return f32::NAN;
        }
        self.src
            .get(row as usize, col as usize)
            .copied()
            .unwrap_or(f32::NAN)
    }

    /// Refines a candidate cell to a sub-cell center estimate.
    ///
    /// Candidates closer than `max_radius()` to any edge produce an
    /// invalid hit, as do SSD fields with no usable minimum.
    pub fn fit_near(&self, rc0: RowCol) -> Hit {
        let max_rad = self.max_radius();
        let high = self.src.high();
        let wide = self.src.wide();

        let interior = 2 * max_rad < high
            && 2 * max_rad < wide
            && max_rad < rc0.row
            && rc0.row < high - max_rad
            && max_rad < rc0.col
            && rc0.col < wide - max_rad;
        if !interior {
            return Hit::invalid();
        }

        let field = self.ssd_field(rc0);
        let hood_hit = weighted_minimum(&field);
        if !hood_hit.is_valid() {
            trace_event!("refine_no_minimum", row = rc0.row, col = rc0.col);
            return Hit::invalid();
        }

        // Hood coordinates into full-raster coordinates.
        let spot = Spot::new(
            hood_hit.spot.row + rc0.row as f64 - self.half_hood as f64,
            hood_hit.spot.col + rc0.col as f64 - self.half_hood as f64,
        );
        Hit {
            spot,
            significance: hood_hit.significance,
            sigma: hood_hit.sigma,
        }
    }
}

/// Sub-cell estimate of the minimum of an SSD grid, in grid coordinates.
///
/// Every finite cell is weighted by `exp(-(4 * ssd / ssd_max)^2)`; the
/// span is anchored at the theoretical zero rather than the observed
/// minimum so significances stay comparable across calls. The weighted
/// average runs over cell centers, hence the half-cell shift.
fn weighted_minimum(field: &Raster<f64>) -> Hit {
    let stats = Stats::from_values(field.as_slice().iter().copied());
    let ssd_max = stats.max();
    if !(ssd_max.is_finite() && ssd_max > 0.0) {
        return Hit::invalid();
    }

    let mut probs = Raster::filled(field.high(), field.wide(), 0.0f64);
    let mut sum_row = 0.0f64;
    let mut sum_col = 0.0f64;
    let mut sum_prob = 0.0f64;
    for row in 0..field.high() {
        for col in 0..field.wide() {
            let ssd = *field.get(row, col).expect("cell within bounds");
            if !ssd.is_finite() {
                continue;
            }
            let arg = 4.0 * (ssd / ssd_max);
            let prob = (-arg * arg).exp();
            sum_row += prob * row as f64;
            sum_col += prob * col as f64;
            sum_prob += prob;
            probs.set(row, col, prob);
        }
    }
    if !(sum_prob > 0.0) {
        return Hit::invalid();
    }

    let spot = Spot::new(sum_row / sum_prob + 0.5, sum_col / sum_prob + 0.5);

    // Expected radial scatter of the probability mass about the spot.
    let mut sum_mag = 0.0f64;
    let mut sum_w = 0.0f64;
    for row in 0..field.high() {
        for col in 0..field.wide() {
            let ssd = *field.get(row, col).expect("cell within bounds");
            if !ssd.is_finite() {
                continue;
            }
            let prob = *probs.get(row, col).expect("cell within bounds");
            let center = Spot::cell_center(RowCol::new(row, col));
            sum_mag += prob * center.distance_to(spot);
            sum_w += prob;
        }
    }
    let sigma = (sum_mag / sum_w).sqrt();

    let min_rc = RowCol::new(spot.row.floor() as usize, spot.col.floor() as usize);
    let significance = match probs.get(min_rc.row, min_rc.col) {
        Some(&p) => p,
        None => return Hit::invalid(),
    };

    Hit {
        spot,
        significance,
        sigma,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_hit_has_no_finite_fields() {
        let hit = Hit::invalid();
        assert!(!hit.is_valid());
        assert!(hit.spot.row.is_nan());
    }

    #[test]
    fn candidates_near_the_edge_are_rejected() {
        let img = Raster::filled(16, 16, 0.0f32);
        let refiner = CenterRefiner::new(img.view(), 2, 5);
        assert!(!refiner.fit_near(RowCol::new(7, 8)).is_valid());
        assert!(!refiner.fit_near(RowCol::new(8, 7)).is_valid());
        assert!(!refiner.fit_near(RowCol::new(0, 0)).is_valid());
        assert!(!refiner.fit_near(RowCol::new(15, 15)).is_valid());
    }

    #[test]
    fn flat_field_has_no_ssd_minimum() {
        let img = Raster::filled(24, 24, 0.5f32);
        let refiner = CenterRefiner::new(img.view(), 2, 5);
        // Every SSD is exactly zero, so no span exists to weight against.
        assert!(!refiner.fit_near(RowCol::new(12, 12)).is_valid());
    }

    #[test]
    fn ssd_is_zero_at_a_half_turn_symmetric_anchor() {
        // Point-symmetric values about the center of cell (6, 6).
        let mut img = Raster::filled(13, 13, 0.0f32);
        for row in 0..13 {
            for col in 0..13 {
                let dr = row as i32 - 6;
                let dc = col as i32 - 6;
                img.set(row, col, (dr * dr + dc * dc + dr * dc) as f32);
            }
        }
        let refiner = CenterRefiner::new(img.view(), 1, 2);
        let field = refiner.ssd_field(RowCol::new(6, 6));
        // Hood center is the symmetric anchor.
        assert_eq!(*field.get(1, 1).unwrap(), 0.0);
        // Off-center anchors see asymmetry.
        assert!(*field.get(0, 0).unwrap() > 0.0);
    }
}
