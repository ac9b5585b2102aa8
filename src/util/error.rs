//! Error types for quadloco.

use thiserror::Error;

/// Result alias for quadloco operations.
pub type QuadLocoResult<T> = std::result::Result<T, QuadLocoError>;

/// Errors that can occur when constructing views, configurations, or
/// exchanging data with the filesystem.
///
/// The detection pipeline itself reports degenerate inputs through its
/// return values (zero responses, empty peak lists, invalid hits) rather
/// than through this enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuadLocoError {
    /// The provided raster dimensions are invalid (must be non-zero).
    #[error("invalid dimensions: high={high} wide={wide}")]
    InvalidDimensions { high: usize, wide: usize },
    /// The provided stride is smaller than the raster width.
    #[error("invalid stride: wide={wide} stride={stride}")]
    InvalidStride { wide: usize, stride: usize },
    /// The backing buffer is too small for the requested view.
    #[error("buffer too small: needed={needed} got={got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A configuration parameter is out of its accepted range.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Parallel evaluation was requested without the `rayon` feature.
    #[error("parallel execution requested but the `rayon` feature is not enabled")]
    ParallelUnavailable,
    /// A chip region does not fit inside the full raster.
    #[error(
        "chip out of bounds: origin=({origin_row},{origin_col}) size={high}x{wide} \
         full={full_high}x{full_wide}"
    )]
    ChipOutOfBounds {
        origin_row: usize,
        origin_col: usize,
        high: usize,
        wide: usize,
        full_high: usize,
        full_wide: usize,
    },
    /// A `.meapoint` record could not be parsed.
    #[error("point file parse error at line {line}: {reason}")]
    PointFileParse { line: usize, reason: &'static str },
    /// A filesystem read or write failed.
    #[error("file i/o error: {reason}")]
    FileIo { reason: String },
    /// An image decode or encode operation failed.
    #[error("image i/o error: {reason}")]
    ImageIo { reason: String },
}
