//! Keyed refinement near nominal centers and `.meapoint` round trips.

use std::collections::BTreeMap;

use quadloco::{
    chip_specs_for, keyed_center_hits, nominal_rcs, read_meapoints, write_meapoints, Hit,
    LocateConfig, Locator, MeaPoint, Raster, Spot,
};

/// Draws a u8 quad target whose center is the center of cell
/// `(center_row, center_col)`, quadrant half-width 8, mid-gray seam.
fn draw_quad(img: &mut Raster<u8>, center_row: usize, center_col: usize) {
    for drow in -8i32..=8 {
        for dcol in -8i32..=8 {
            let row = (center_row as i32 + drow) as usize;
            let col = (center_col as i32 + dcol) as usize;
            let value = if drow == 0 || dcol == 0 {
                128
            } else if (drow < 0) == (dcol < 0) {
                255
            } else {
                0
            };
            img.set(row, col, value);
        }
    }
}

#[test]
fn keyed_pipeline_refines_near_each_nominal() {
    let mut img = Raster::filled(48, 48, 128u8);
    draw_quad(&mut img, 12, 12);
    draw_quad(&mut img, 34, 34);

    let points = vec![
        MeaPoint {
            key: "T1".into(),
            spot: Spot::new(12.2, 12.7),
            covar: None,
        },
        MeaPoint {
            key: "T2".into(),
            spot: Spot::new(34.4, 34.1),
            covar: Some([0.01, 0.0, 0.01]),
        },
    ];

    let nominals = nominal_rcs(&points);
    let chips = chip_specs_for(&nominals, 21, 21, 48, 48);
    assert_eq!(chips.len(), 2);

    let locator = Locator::new(LocateConfig::default()).unwrap();
    let hits = keyed_center_hits(&img.view(), &chips, &locator);
    assert_eq!(hits.len(), 2);

    let first = hits["T1"];
    assert!(first.spot.distance_to(Spot::new(12.5, 12.5)) < 0.25);
    let second = hits["T2"];
    assert!(second.spot.distance_to(Spot::new(34.5, 34.5)) < 0.25);
}

#[test]
fn nominals_outside_the_frame_are_skipped() {
    let mut img = Raster::filled(32, 32, 128u8);
    draw_quad(&mut img, 16, 16);

    let mut nominals = BTreeMap::new();
    nominals.insert("in".to_string(), quadloco::RowCol::new(16, 16));
    nominals.insert("edge".to_string(), quadloco::RowCol::new(3, 16));

    let chips = chip_specs_for(&nominals, 21, 21, 32, 32);
    assert_eq!(chips.len(), 1);
    assert!(chips.contains_key("in"));
}

#[test]
fn meapoint_files_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("centers.meapoint");

    let mut hits = BTreeMap::new();
    hits.insert(
        "A1".to_string(),
        Hit {
            spot: Spot::new(12.503, 12.497),
            significance: 0.93,
            sigma: 0.21,
        },
    );
    hits.insert(
        "B2".to_string(),
        Hit {
            spot: Spot::new(34.508, 34.491),
            significance: 0.88,
            sigma: 0.33,
        },
    );
    write_meapoints(&path, &hits).unwrap();

    let points = read_meapoints(&path).unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].key, "A1");
    assert!(points[0].spot.distance_to(Spot::new(12.503, 12.497)) < 1e-5);
    let covar = points[0].covar.unwrap();
    assert!((covar[0] - 0.21f64 * 0.21).abs() < 1e-6);
    assert_eq!(covar[1], 0.0);
    assert_eq!(covar[0], covar[2]);
}
