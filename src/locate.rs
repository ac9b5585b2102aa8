//! Orchestration: multi-ring candidate search plus sub-cell refinement.

use crate::peaks::{sort_descending, sorted_peaks, Peak};
use crate::raster::stats::Stats;
use crate::raster::RasterView;
use crate::refine::{CenterRefiner, Hit};
use crate::symring::SymRing;
use crate::util::{QuadLocoError, QuadLocoResult};

/// Configuration for the center-locating pipeline.
#[derive(Clone, Debug)]
pub struct LocateConfig {
    /// Ring half sizes in order of application. The first (usually the
    /// largest) filter nominates candidates; the rest qualify them.
    pub ring_half_sizes: Vec<usize>,
    /// Response threshold below which cells are not considered peaks.
    pub min_peak_value: f32,
    /// Refinement search-hood half size.
    pub half_hood: usize,
    /// Refinement correlation-box half size.
    pub half_corr: usize,
    /// Enables row-parallel response evaluation when the `rayon` feature
    /// is available.
    pub parallel: bool,
}

impl Default for LocateConfig {
    fn default() -> Self {
        Self {
            ring_half_sizes: vec![5, 3],
            min_peak_value: f32::EPSILON,
            half_hood: 2,
            half_corr: 5,
            parallel: false,
        }
    }
}

impl LocateConfig {
    /// Validates the configuration, returning an error if any parameter
    /// is invalid.
    pub fn validate(&self) -> QuadLocoResult<()> {
        if self.ring_half_sizes.is_empty() {
            return Err(QuadLocoError::InvalidConfig {
                reason: "ring_half_sizes must name at least one filter",
            });
        }
        if self.half_hood == 0 {
            return Err(QuadLocoError::InvalidConfig {
                reason: "half_hood must be at least 1",
            });
        }
        if self.half_corr == 0 {
            return Err(QuadLocoError::InvalidConfig {
                reason: "half_corr must be at least 1",
            });
        }
        if !self.min_peak_value.is_finite() {
            return Err(QuadLocoError::InvalidConfig {
                reason: "min_peak_value must be finite",
            });
        }
        #[cfg(not(feature = "rayon"))]
        if self.parallel {
            return Err(QuadLocoError::ParallelUnavailable);
        }
        Ok(())
    }

    pub(crate) fn use_parallel(&self) -> bool {
        self.parallel && cfg!(feature = "rayon")
    }
}

/// Candidate peaks from multiple combined symmetry filters.
///
/// The first ring half size is run across the whole grid and all local
/// maxima of its response are collected. Each remaining filter is then
/// evaluated only at those candidate cells and its response multiplies
/// the candidate value; cells never move. The result is sorted largest
/// combined value first and contains the same cells as the initial peak
/// pass. Degenerate inputs (no finite values, zero range, empty ring
/// list) yield an empty list.
pub fn multi_sym_peaks(
    src: &RasterView<'_, f32>,
    stats: &Stats,
    cfg: &LocateConfig,
) -> Vec<Peak> {
    if cfg.ring_half_sizes.is_empty() || !stats.is_valid() {
        return Vec::new();
    }

    let _span = trace_span!(
        "multi_sym_peaks",
        rings = cfg.ring_half_sizes.len(),
        high = src.high(),
        wide = src.wide()
    )
    .entered();

    let rings: Vec<SymRing<'_>> = cfg
        .ring_half_sizes
        .iter()
        .map(|&half_size| SymRing::new(*src, stats, half_size))
        .collect();

    let grid = if cfg.use_parallel() {
        #[cfg(feature = "rayon")]
        {
            rings[0].response_grid_par()
        }
        #[cfg(not(feature = "rayon"))]
        {
            rings[0].response_grid()
        }
    } else {
        rings[0].response_grid()
    };

    let seeds = sorted_peaks(&grid.view(), cfg.min_peak_value);
    trace_event!("seed_peaks", count = seeds.len());

    let mut combined: Vec<Peak> = seeds
        .into_iter()
        .map(|seed| {
            let mut value = seed.value;
            for ring in &rings[1..] {
                value *= ring.response(seed.rc) as f64;
            }
            Peak {
                rc: seed.rc,
                value,
            }
        })
        .collect();
    sort_descending(&mut combined);
    combined
}

/// Center locator holding a validated configuration.
pub struct Locator {
    cfg: LocateConfig,
}

impl Locator {
    /// Creates a locator after validating `cfg`.
    pub fn new(cfg: LocateConfig) -> QuadLocoResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// Creates a locator with the default configuration.
    pub fn with_defaults() -> Self {
        Self {
            cfg: LocateConfig::default(),
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &LocateConfig {
        &self.cfg
    }

    /// Locates the strongest quad-target center in `src`.
    ///
    /// Only the top-ranked candidate is refined. When its refinement
    /// window leaves the raster the single returned hit is invalid; the
    /// empty vector means no candidate existed at all.
    pub fn locate(&self, src: &RasterView<'_, f32>) -> Vec<Hit> {
        let _span = trace_span!("locate", high = src.high(), wide = src.wide()).entered();

        let stats = Stats::from_values(src.values());
        let peaks = multi_sym_peaks(src, &stats, &self.cfg);
        let Some(best) = peaks.first() else {
            return Vec::new();
        };

        let refiner = CenterRefiner::new(*src, self.cfg.half_hood, self.cfg.half_corr);
        let hit = refiner.fit_near(best.rc);
        if hit.is_valid() {
            trace_event!(
                "located",
                row = hit.spot.row,
                col = hit.spot.col,
                significance = hit.significance
            );
        }
        vec![hit]
    }
}

/// Locates the strongest quad-target center using default refinement
/// parameters and the given ring half sizes.
pub fn locate_centers(src: &RasterView<'_, f32>, ring_half_sizes: &[usize]) -> Vec<Hit> {
    let cfg = LocateConfig {
        ring_half_sizes: ring_half_sizes.to_vec(),
        ..LocateConfig::default()
    };
    match Locator::new(cfg) {
        Ok(locator) => locator.locate(src),
        Err(_) => Vec::new(),
    }
}
