//! QuadLoco locates the centers of quad targets (four alternating
//! light/dark quadrants meeting at a point) in grayscale rasters with
//! sub-pixel precision.
//!
//! The pipeline runs an annular half-turn symmetry filter over the image,
//! enumerates local maxima of the response field, qualifies them with
//! filters at further ring radii, and refines the best candidate to a
//! sub-cell location via a rotation-correlation SSD fit.

#[macro_use]
mod trace;

mod keyed;
mod locate;
mod peaks;
mod raster;
mod refine;
mod ring;
mod symring;
mod util;

#[cfg(feature = "image-io")]
pub mod io;

pub use keyed::{
    chip_specs_for, keyed_center_hits, nominal_rcs, parse_meapoints, read_meapoints,
    write_meapoints, MeaPoint, QuadKey,
};
pub use locate::{locate_centers, multi_sym_peaks, LocateConfig, Locator};
pub use peaks::{distinction, find_peaks, largest_peaks, sorted_peaks, Peak};
pub use raster::chip::ChipSpec;
pub use raster::stats::Stats;
pub use raster::{Raster, RasterView, RowCol, Spot};
pub use refine::{CenterRefiner, Hit};
pub use ring::{box_offsets, ring_offsets};
pub use symring::{SymRing, BIMODAL_CONTRAST_FRACTION, MIN_POS_NEG_PAIRS};
pub use util::error::{QuadLocoError, QuadLocoResult};
