//! Annular half-turn symmetry filter.
//!
//! The response at a cell measures how well the ring neighbourhood around
//! it looks like the center of a quad target: high contrast within the
//! ring, a balance of dark and light antipodal pairs, and values that
//! repeat under a half-turn rotation. A quantised annulus would ideally be
//! a circle; small radii produce diamonds and crosses instead.

use crate::raster::stats::Stats;
use crate::raster::{Raster, RasterView, RowCol};
use crate::ring::ring_offsets;

/// Fraction of the source range taken as the canonical bimodal amplitude
/// when normalising ring dissimilarity.
///
/// For a pure two-level signal at `mid +/- k` the pair-difference variance
/// approaches `k^2`; dissimilarity is scored against that scale. The value
/// 0.25 is empirical (0.5 matches the derivation but discriminates worse).
pub const BIMODAL_CONTRAST_FRACTION: f64 = 0.25;

/// Minimum number of antipodal pairs required on each side of the source
/// mid value (strictly-greater test) before a cell may respond.
pub const MIN_POS_NEG_PAIRS: usize = 1;

/// Response reported for cells the filter cannot evaluate: border cells,
/// rings touching non-finite values, degenerate sources, and
/// unbalanced neighbourhoods.
const NO_RESPONSE: f32 = 0.0;

/// Annular ring symmetry filter bound to a borrowed intensity grid.
pub struct SymRing<'a> {
    src: RasterView<'a, f32>,
    mid: f64,
    range: f64,
    half_size: usize,
    offsets: Vec<(i32, i32)>,
    num_pairs: usize,
}

impl<'a> SymRing<'a> {
    /// Builds a filter of the given ring half size over `src`, reusing
    /// precomputed source statistics.
    pub fn new(src: RasterView<'a, f32>, stats: &Stats, half_size: usize) -> Self {
        let offsets = ring_offsets(half_size);
        let num_pairs = offsets.len() / 2;
        Self {
            src,
            mid: stats.middle(),
            range: stats.range(),
            half_size,
            offsets,
            num_pairs,
        }
    }

    /// Ring half size this filter was built with.
    pub fn half_size(&self) -> usize {
        self.half_size
    }

    /// Width of the border band in which cells cannot be evaluated.
    pub fn border(&self) -> usize {
        self.half_size + 1
    }

    /// Filter response at `rc`, in `[0, 1]`.
    ///
    /// Zero means "no evidence of a quad center here", covering both
    /// unevaluable cells and rings that fail the balance gate. Positive
    /// responses combine ring contrast with a half-turn similarity
    /// pseudo-probability.
    pub fn response(&self, rc: RowCol) -> f32 {
        if !(self.range.is_finite() && self.range > 0.0) {
            return NO_RESPONSE;
        }

        let border = self.border();
        let interior = rc.row >= border
            && rc.col >= border
            && rc.row + border < self.src.high()
            && rc.col + border < self.src.wide();
        if !interior {
            return NO_RESPONSE;
        }

        let mut sum_sq_dif = 0.0f64;
        let mut ring_min = f64::INFINITY;
        let mut ring_max = f64::NEG_INFINITY;
        let mut num_pos = 0usize;
        let mut num_neg = 0usize;

        for i in 0..self.num_pairs {
            let v1 = match self.src.get_off(rc, self.offsets[i]) {
                Some(&v) if v.is_finite() => v as f64,
                _ => return NO_RESPONSE,
            };
            let v2 = match self.src.get_off(rc, self.offsets[i + self.num_pairs]) {
                Some(&v) if v.is_finite() => v as f64,
                _ => return NO_RESPONSE,
            };

            let d1 = v1 - self.mid;
            let d2 = v2 - self.mid;

            ring_min = ring_min.min(d1).min(d2);
            ring_max = ring_max.max(d1).max(d2);

            let dif = d2 - d1;
            sum_sq_dif += dif * dif;

            if d1 + d2 < 0.0 {
                num_neg += 1;
            } else {
                num_pos += 1;
            }
        }

        // Balance gate: rings entirely above or below the source mid value
        // (uniform patches, lone edges) carry no center evidence.
        if num_pos <= MIN_POS_NEG_PAIRS || num_neg <= MIN_POS_NEG_PAIRS {
            return NO_RESPONSE;
        }

        // Half-turn similarity against the canonical bimodal amplitude.
        let var = sum_sq_dif / self.num_pairs as f64;
        let k = BIMODAL_CONTRAST_FRACTION * self.range;
        let p_sym = (-(var / (k * k))).exp();

        // Contrast weight normalised to the full source range.
        let weight = (ring_max - ring_min) / self.range;

        (weight * p_sym) as f32
    }

    /// Evaluates the filter over every interior cell of the source grid.
    ///
    /// Border cells (and grids too small to hold the ring) stay at zero.
    pub fn response_grid(&self) -> Raster<f32> {
        let _span = trace_span!(
            "response_grid",
            half_size = self.half_size,
            high = self.src.high(),
            wide = self.src.wide()
        )
        .entered();

        let high = self.src.high();
        let wide = self.src.wide();
        let mut grid = Raster::filled(high, wide, NO_RESPONSE);

        let border = self.border();
        if high > 2 * border && wide > 2 * border {
            for row in border..high - border {
                for col in border..wide - border {
                    grid.set(row, col, self.response(RowCol::new(row, col)));
                }
            }
        }
        grid
    }

    /// Row-parallel variant of [`response_grid`](Self::response_grid).
    ///
    /// Shards write disjoint output rows, so the result is bit-identical
    /// to the sequential evaluation.
    #[cfg(feature = "rayon")]
    pub fn response_grid_par(&self) -> Raster<f32> {
        use rayon::prelude::*;

        let _span = trace_span!(
            "response_grid_par",
            half_size = self.half_size,
            high = self.src.high(),
            wide = self.src.wide()
        )
        .entered();

        let high = self.src.high();
        let wide = self.src.wide();
        let mut grid = Raster::filled(high, wide, NO_RESPONSE);

        let border = self.border();
        if high > 2 * border && wide > 2 * border {
            grid.as_mut_slice()
                .par_chunks_mut(wide)
                .enumerate()
                .filter(|(row, _)| *row >= border && *row + border < high)
                .for_each(|(row, out_row)| {
                    for col in border..wide - border {
                        out_row[col] = self.response(RowCol::new(row, col));
                    }
                });
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(values: Vec<f32>, high: usize, wide: usize) -> Raster<f32> {
        Raster::from_vec(values, high, wide).unwrap()
    }

    #[test]
    fn degenerate_range_yields_no_response() {
        let img = image(vec![0.5f32; 81], 9, 9);
        let stats = Stats::from_values(img.view().values());
        let ring = SymRing::new(img.view(), &stats, 1);
        assert_eq!(ring.response(RowCol::new(4, 4)), 0.0);
    }

    #[test]
    fn border_cells_yield_no_response() {
        let mut values = vec![0.0f32; 81];
        values[4 * 9 + 4] = 1.0;
        let img = image(values, 9, 9);
        let stats = Stats::from_values(img.view().values());
        let ring = SymRing::new(img.view(), &stats, 1);
        for col in 0..9 {
            assert_eq!(ring.response(RowCol::new(0, col)), 0.0);
            assert_eq!(ring.response(RowCol::new(1, col)), 0.0);
            assert_eq!(ring.response(RowCol::new(8, col)), 0.0);
        }
    }

    #[test]
    fn ring_touching_nan_yields_no_response() {
        let mut values: Vec<f32> = (0..121).map(|i| (i % 2) as f32).collect();
        values[3 * 11 + 5] = f32::NAN;
        let img = image(values, 11, 11);
        let stats = Stats::from_values(img.view().values());
        let ring = SymRing::new(img.view(), &stats, 1);
        // (5, 5) reaches (3, 5) through the (-2, 0) ring offset.
        assert_eq!(ring.response(RowCol::new(5, 5)), 0.0);
    }

    #[test]
    fn one_sided_ring_fails_the_balance_gate() {
        // Vertical ramp: every antipodal pair averages to the row value, so
        // all pairs land on one side of mid away from the middle row.
        let values: Vec<f32> = (0..15 * 15).map(|i| (i / 15) as f32).collect();
        let img = image(values, 15, 15);
        let stats = Stats::from_values(img.view().values());
        let ring = SymRing::new(img.view(), &stats, 2);
        assert_eq!(ring.response(RowCol::new(4, 7)), 0.0);
        assert_eq!(ring.response(RowCol::new(10, 7)), 0.0);
    }
}
