#![cfg(feature = "rayon")]

//! Parallel response evaluation must reproduce the sequential result
//! bit-for-bit: shards own disjoint rows and no reductions cross them.

use quadloco::{LocateConfig, Locator, Raster, Stats, SymRing};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_image(high: usize, wide: usize, seed: u64) -> Raster<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = Raster::filled(high, wide, 0.0f32);
    for row in 0..high {
        for col in 0..wide {
            img.set(row, col, rng.random_range(0.0..1.0));
        }
    }
    img
}

#[test]
fn parallel_response_grid_matches_sequential() {
    let img = random_image(48, 40, 99);
    let stats = Stats::from_values(img.view().values());
    for half_size in [0usize, 1, 3, 5] {
        let ring = SymRing::new(img.view(), &stats, half_size);
        let sequential = ring.response_grid();
        let parallel = ring.response_grid_par();
        assert_eq!(sequential.as_slice(), parallel.as_slice());
    }
}

#[test]
fn parallel_locate_matches_sequential() {
    // A quad target with a touch of noise so responses are non-trivial.
    let mut img = random_image(24, 24, 7);
    for row in 0..24 {
        for col in 0..24 {
            let base = if (row < 12) == (col < 12) { 1.0 } else { 0.0 };
            let noise = 0.05 * *img.get(row, col).unwrap();
            img.set(row, col, base + noise);
        }
    }

    let sequential = Locator::new(LocateConfig::default()).unwrap();
    let parallel = Locator::new(LocateConfig {
        parallel: true,
        ..LocateConfig::default()
    })
    .unwrap();

    assert_eq!(
        sequential.locate(&img.view()),
        parallel.locate(&img.view())
    );
}
