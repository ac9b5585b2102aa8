//! Raster loading and saving via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. Grayscale images are
//! exchanged as binary PGM (P5); the encoder subtype is pinned so written
//! files are deterministic and round-trip byte-for-byte at the pixel
//! level. Promotion of 8-bit pixels to intensities is a plain cast.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ExtendedColorType, ImageEncoder};

use crate::raster::stats::Stats;
use crate::raster::{Raster, RasterView};
use crate::util::{QuadLocoError, QuadLocoResult};

/// Loads an image from disk and converts it to an 8-bit grayscale raster.
pub fn load_gray<P: AsRef<Path>>(path: P) -> QuadLocoResult<Raster<u8>> {
    let img = image::open(path).map_err(|err| QuadLocoError::ImageIo {
        reason: err.to_string(),
    })?;
    let gray = img.to_luma8();
    let high = gray.height() as usize;
    let wide = gray.width() as usize;
    Raster::from_vec(gray.into_raw(), high, wide)
}

/// Saves an 8-bit grayscale raster as binary PGM (P5).
pub fn save_gray_pgm<P: AsRef<Path>>(path: P, gray: &Raster<u8>) -> QuadLocoResult<()> {
    let file = File::create(path).map_err(|err| QuadLocoError::FileIo {
        reason: err.to_string(),
    })?;
    let writer = BufWriter::new(file);
    PnmEncoder::new(writer)
        .with_subtype(PnmSubtype::Graymap(SampleEncoding::Binary))
        .write_image(
            gray.as_slice(),
            gray.wide() as u32,
            gray.high() as u32,
            ExtendedColorType::L8,
        )
        .map_err(|err| QuadLocoError::ImageIo {
            reason: err.to_string(),
        })
}

/// Saves a floating-point field as binary PGM, stretching the finite
/// value range onto `0..=255`.
///
/// Non-finite cells and degenerate (constant or empty) fields map to
/// black. Intended for debug dumps of response grids.
pub fn save_stretched_pgm<P: AsRef<Path>>(
    path: P,
    field: &RasterView<'_, f32>,
) -> QuadLocoResult<()> {
    let stats = Stats::from_values(field.values());
    let min = stats.min();
    let range = stats.range();
    let usable = stats.is_valid() && range > 0.0;

    let mut bytes = Vec::with_capacity(field.high() * field.wide());
    for value in field.values() {
        let value = value as f64;
        let byte = if usable && value.is_finite() {
            (255.0 * (value - min) / range).round().clamp(0.0, 255.0) as u8
        } else {
            0
        };
        bytes.push(byte);
    }

    let gray = Raster::from_vec(bytes, field.high(), field.wide())?;
    save_gray_pgm(path, &gray)
}
