//! Keyed center finding: refine targets near externally provided
//! nominal locations.
//!
//! Nominal centers come from `.meapoint` files, ASCII records of the form
//! `ID row col [srr src scc]` with sub-pixel coordinates and an optional
//! row-major 2x2 covariance. For each nominal a fixed-size chip is cropped
//! around it, the locate pipeline runs on the chip, and the resulting hit
//! is translated back into full-raster coordinates.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::locate::Locator;
use crate::raster::chip::ChipSpec;
use crate::raster::{RasterView, RowCol, Spot};
use crate::refine::Hit;
use crate::util::{QuadLocoError, QuadLocoResult};

/// Identifier for an individual quad target within an image.
pub type QuadKey = String;

/// One `.meapoint` record.
#[derive(Clone, Debug, PartialEq)]
pub struct MeaPoint {
    /// Alphanumeric target identifier.
    pub key: QuadKey,
    /// Sub-pixel nominal location.
    pub spot: Spot,
    /// Optional `(srr, src, scc)` covariance triple.
    pub covar: Option<[f64; 3]>,
}

/// Parses `.meapoint` records from text, one record per line.
///
/// Blank lines are skipped. A record must carry exactly three or six
/// whitespace-separated fields.
pub fn parse_meapoints(text: &str) -> QuadLocoResult<Vec<MeaPoint>> {
    let mut points = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let fields: Vec<&str> = raw.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != 3 && fields.len() != 6 {
            return Err(QuadLocoError::PointFileParse {
                line,
                reason: "expected `ID row col` or `ID row col srr src scc`",
            });
        }

        let key = fields[0].to_string();
        let row = parse_real(fields[1], line)?;
        let col = parse_real(fields[2], line)?;
        let covar = if fields.len() == 6 {
            Some([
                parse_real(fields[3], line)?,
                parse_real(fields[4], line)?,
                parse_real(fields[5], line)?,
            ])
        } else {
            None
        };

        points.push(MeaPoint {
            key,
            spot: Spot::new(row, col),
            covar,
        });
    }
    Ok(points)
}

fn parse_real(field: &str, line: usize) -> QuadLocoResult<f64> {
    field
        .parse::<f64>()
        .map_err(|_| QuadLocoError::PointFileParse {
            line,
            reason: "numeric field did not parse as a real",
        })
}

/// Reads `.meapoint` records from a file.
pub fn read_meapoints<P: AsRef<Path>>(path: P) -> QuadLocoResult<Vec<MeaPoint>> {
    let text = fs::read_to_string(path).map_err(|err| QuadLocoError::FileIo {
        reason: err.to_string(),
    })?;
    parse_meapoints(&text)
}

/// Writes keyed hits as `.meapoint` records.
///
/// The radial sigma becomes an isotropic covariance: `srr = scc = sigma^2`
/// with zero cross term.
pub fn write_meapoints<P: AsRef<Path>>(
    path: P,
    hits: &BTreeMap<QuadKey, Hit>,
) -> QuadLocoResult<()> {
    let mut text = String::new();
    for (key, hit) in hits {
        let var = hit.sigma * hit.sigma;
        text.push_str(&format!(
            "{} {:.6} {:.6} {:.9} {:.9} {:.9}\n",
            key, hit.spot.row, hit.spot.col, var, 0.0, var
        ));
    }
    fs::write(path, text).map_err(|err| QuadLocoError::FileIo {
        reason: err.to_string(),
    })
}

/// Integer nominal cells for parsed points, keyed by ID.
///
/// Points with non-finite or negative coordinates are dropped.
pub fn nominal_rcs(points: &[MeaPoint]) -> BTreeMap<QuadKey, RowCol> {
    let mut nominals = BTreeMap::new();
    for point in points {
        if !point.spot.is_valid() || point.spot.row < 0.0 || point.spot.col < 0.0 {
            continue;
        }
        let rc = RowCol::new(point.spot.row.floor() as usize, point.spot.col.floor() as usize);
        nominals.insert(point.key.clone(), rc);
    }
    nominals
}

/// Chip specs of size `chip_high x chip_wide` centered on each nominal.
///
/// Nominals whose chip would leave a `full_high x full_wide` raster are
/// dropped.
pub fn chip_specs_for(
    nominals: &BTreeMap<QuadKey, RowCol>,
    chip_high: usize,
    chip_wide: usize,
    full_high: usize,
    full_wide: usize,
) -> BTreeMap<QuadKey, ChipSpec> {
    let mut chips = BTreeMap::new();
    for (key, &rc) in nominals {
        let Some(chip) = ChipSpec::centered_on(rc, chip_high, chip_wide) else {
            continue;
        };
        if chip.fits_in(full_high, full_wide) {
            chips.insert(key.clone(), chip);
        }
    }
    chips
}

/// Refined center hits near each chipped nominal, in full-raster
/// coordinates.
///
/// Chips where the pipeline finds nothing, or where the refined hit is
/// invalid, are absent from the result.
pub fn keyed_center_hits<T: Copy + Into<f32>>(
    src: &RasterView<'_, T>,
    chips: &BTreeMap<QuadKey, ChipSpec>,
    locator: &Locator,
) -> BTreeMap<QuadKey, Hit> {
    let mut hits = BTreeMap::new();
    for (key, chip) in chips {
        let Ok(crop) = chip.crop(src) else {
            continue;
        };
        let Some(chip_hit) = locator.locate(&crop.view()).into_iter().next() else {
            continue;
        };
        if !chip_hit.is_valid() {
            continue;
        }
        hits.insert(
            key.clone(),
            Hit {
                spot: chip.full_spot(chip_hit.spot),
                ..chip_hit
            },
        );
    }
    hits
}
