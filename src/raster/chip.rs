//! Address translation between a full raster and a rectangular sub-region.

use crate::raster::{Raster, RasterView, RowCol, Spot};
use crate::util::{QuadLocoError, QuadLocoResult};

/// Maps cell and spot coordinates between a full raster and a chip
/// (a working crop) whose upper-left corner sits at `origin`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChipSpec {
    /// Chip upper-left corner within the full raster.
    pub origin: RowCol,
    /// Number of chip rows.
    pub high: usize,
    /// Number of chip columns.
    pub wide: usize,
}

impl ChipSpec {
    /// Creates a chip spec from an origin and a size.
    pub fn new(origin: RowCol, high: usize, wide: usize) -> Self {
        Self { origin, high, wide }
    }

    /// Chip of size `high x wide` centered on `center`, or `None` when the
    /// center is too close to the top or left edge for the chip to start
    /// at a non-negative origin.
    pub fn centered_on(center: RowCol, high: usize, wide: usize) -> Option<Self> {
        let half_high = high / 2;
        let half_wide = wide / 2;
        if center.row < half_high || center.col < half_wide {
            return None;
        }
        Some(Self {
            origin: RowCol::new(center.row - half_high, center.col - half_wide),
            high,
            wide,
        })
    }

    /// True if the chip lies entirely inside a `full_high x full_wide` raster.
    pub fn fits_in(&self, full_high: usize, full_wide: usize) -> bool {
        self.origin.row + self.high <= full_high && self.origin.col + self.wide <= full_wide
    }

    /// Full-raster cell for a chip-local cell (no bounds checking).
    pub fn full_rc(&self, chip_rc: RowCol) -> RowCol {
        RowCol::new(chip_rc.row + self.origin.row, chip_rc.col + self.origin.col)
    }

    /// Chip-local cell for a full-raster cell, or `None` when the cell
    /// lies outside the chip.
    pub fn chip_rc(&self, full_rc: RowCol) -> Option<RowCol> {
        if full_rc.row < self.origin.row || full_rc.col < self.origin.col {
            return None;
        }
        let rc = RowCol::new(full_rc.row - self.origin.row, full_rc.col - self.origin.col);
        if rc.row < self.high && rc.col < self.wide {
            Some(rc)
        } else {
            None
        }
    }

    /// Full-raster spot for a chip-local spot.
    pub fn full_spot(&self, chip_spot: Spot) -> Spot {
        Spot::new(
            chip_spot.row + self.origin.row as f64,
            chip_spot.col + self.origin.col as f64,
        )
    }

    /// Chip-local spot for a full-raster spot.
    pub fn chip_spot(&self, full_spot: Spot) -> Spot {
        Spot::new(
            full_spot.row - self.origin.row as f64,
            full_spot.col - self.origin.col as f64,
        )
    }

    /// Copies the chip region out of `src` as an owned intensity grid,
    /// promoting cell values by plain cast.
    pub fn crop<T: Copy + Into<f32>>(&self, src: &RasterView<T>) -> QuadLocoResult<Raster<f32>> {
        if self.high == 0 || self.wide == 0 {
            return Err(QuadLocoError::InvalidDimensions {
                high: self.high,
                wide: self.wide,
            });
        }
        if !self.fits_in(src.high(), src.wide()) {
            return Err(QuadLocoError::ChipOutOfBounds {
                origin_row: self.origin.row,
                origin_col: self.origin.col,
                high: self.high,
                wide: self.wide,
                full_high: src.high(),
                full_wide: src.wide(),
            });
        }

        let mut data = Vec::with_capacity(self.high * self.wide);
        for chip_row in 0..self.high {
            let full_row = src
                .row(self.origin.row + chip_row)
                .expect("chip row within bounds");
            let span = &full_row[self.origin.col..self.origin.col + self.wide];
            data.extend(span.iter().map(|&v| v.into()));
        }
        Raster::from_vec(data, self.high, self.wide)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_translation_round_trips() {
        let chip = ChipSpec::new(RowCol::new(3, 5), 4, 6);
        let local = RowCol::new(2, 4);
        let full = chip.full_rc(local);
        assert_eq!(full, RowCol::new(5, 9));
        assert_eq!(chip.chip_rc(full), Some(local));
        assert_eq!(chip.chip_rc(RowCol::new(2, 5)), None);
        assert_eq!(chip.chip_rc(RowCol::new(7, 5)), None);
    }

    #[test]
    fn spot_translation_round_trips() {
        let chip = ChipSpec::new(RowCol::new(10, 20), 8, 8);
        let full = Spot::new(12.25, 21.75);
        let local = chip.chip_spot(full);
        assert_eq!(local, Spot::new(2.25, 1.75));
        assert_eq!(chip.full_spot(local), full);
    }

    #[test]
    fn centered_chip_respects_edges() {
        let chip = ChipSpec::centered_on(RowCol::new(10, 10), 7, 7).unwrap();
        assert_eq!(chip.origin, RowCol::new(7, 7));
        assert!(ChipSpec::centered_on(RowCol::new(2, 10), 7, 7).is_none());
    }

    #[test]
    fn fit_check_uses_both_axes() {
        let chip = ChipSpec::new(RowCol::new(2, 2), 4, 4);
        assert!(chip.fits_in(6, 6));
        assert!(!chip.fits_in(6, 5));
        assert!(!chip.fits_in(5, 6));
    }

    #[test]
    fn crop_copies_and_promotes() {
        let data: Vec<u8> = (0u8..16).collect();
        let full = RasterView::from_slice(&data, 4, 4).unwrap();
        let chip = ChipSpec::new(RowCol::new(1, 1), 2, 2);
        let crop = chip.crop(&full).unwrap();
        assert_eq!(crop.as_slice(), &[5.0f32, 6.0, 9.0, 10.0]);

        let outside = ChipSpec::new(RowCol::new(3, 3), 2, 2);
        assert!(outside.crop(&full).is_err());
    }
}
