use clap::Parser;
use quadloco::io::{load_gray, save_stretched_pgm};
use quadloco::{
    chip_specs_for, keyed_center_hits, nominal_rcs, read_meapoints, Hit, LocateConfig, Locator,
    Stats, SymRing,
};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Locate quad-target centers in grayscale images")]
struct Cli {
    /// Grayscale input image (PGM or PNG).
    image: PathBuf,
    /// Nominal centers (.meapoint file) for keyed refinement.
    #[arg(long, value_name = "FILE")]
    points: Option<PathBuf>,
    /// Ring half sizes in order of application.
    #[arg(long, value_delimiter = ',', default_values_t = vec![5usize, 3])]
    ring_sizes: Vec<usize>,
    /// Chip height and width used for keyed refinement.
    #[arg(long, default_value_t = 48)]
    chip_size: usize,
    /// Refinement search-hood half size.
    #[arg(long, default_value_t = 2)]
    half_hood: usize,
    /// Refinement correlation-box half size.
    #[arg(long, default_value_t = 5)]
    half_corr: usize,
    /// Write JSON hits to this file instead of stdout.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Dump the first-ring response grid as a stretched PGM.
    #[arg(long, value_name = "FILE")]
    response_pgm: Option<PathBuf>,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Serialize)]
struct HitRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    row: f64,
    col: f64,
    significance: f64,
    sigma: f64,
}

impl HitRecord {
    fn from_hit(key: Option<String>, hit: Hit) -> Self {
        Self {
            key,
            row: hit.spot.row,
            col: hit.spot.col,
            significance: hit.significance,
            sigma: hit.sigma,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("quadloco=info".parse()?))
            .with_target(false)
            .init();
    }

    let gray = load_gray(&cli.image)?;
    let intensity = gray.view().to_intensity();

    let locator = Locator::new(LocateConfig {
        ring_half_sizes: cli.ring_sizes.clone(),
        half_hood: cli.half_hood,
        half_corr: cli.half_corr,
        ..LocateConfig::default()
    })?;

    if let Some(path) = &cli.response_pgm {
        let stats = Stats::from_values(intensity.view().values());
        let ring = SymRing::new(intensity.view(), &stats, cli.ring_sizes[0]);
        save_stretched_pgm(path, &ring.response_grid().view())?;
    }

    let mut records: Vec<HitRecord> = match &cli.points {
        Some(points_path) => {
            let points = read_meapoints(points_path)?;
            let nominals = nominal_rcs(&points);
            let chips = chip_specs_for(
                &nominals,
                cli.chip_size,
                cli.chip_size,
                intensity.high(),
                intensity.wide(),
            );
            keyed_center_hits(&gray.view(), &chips, &locator)
                .into_iter()
                .map(|(key, hit)| HitRecord::from_hit(Some(key), hit))
                .collect()
        }
        None => locator
            .locate(&intensity.view())
            .into_iter()
            .filter(Hit::is_valid)
            .map(|hit| HitRecord::from_hit(None, hit))
            .collect(),
    };
    records.sort_by(|a, b| b.significance.partial_cmp(&a.significance).unwrap());

    let json = serde_json::to_string_pretty(&records)?;
    match &cli.output {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
