mod common;

use common::{flat_cells, grid_720p};
use iris_core::consts::{MIN_ZONES_COUNTED, ZONE_GRID_HEIGHT, ZONE_GRID_WIDTH};
use iris_core::stats::zones::{self, CellAverages};

#[test]
fn zone_grid_has_expected_shape() {
    let grid = grid_720p();
    let stats = zones::extract(&flat_cells(&grid, 50, 60, 70), Default::default(), &grid, 51);
    assert_eq!(stats.zones.dim(), (ZONE_GRID_HEIGHT, ZONE_GRID_WIDTH));
}

#[test]
fn every_cell_lands_in_exactly_one_zone() {
    let grid = grid_720p();
    let stats = zones::extract(&flat_cells(&grid, 50, 60, 70), Default::default(), &grid, 51);
    let counted: u32 = stats.zones.iter().map(|z| z.counted).sum();
    assert_eq!(counted as usize, grid.cells());
}

#[test]
fn zone_averages_match_cell_averages() {
    let grid = grid_720p();
    let stats = zones::extract(&flat_cells(&grid, 80, 120, 40), Default::default(), &grid, 51);
    for zone in stats.zones.iter() {
        let (r, g, b) = zone.averages().expect("zone must be populated");
        assert_eq!(r, 80.0);
        assert_eq!(g, 120.0);
        assert_eq!(b, 40.0);
    }
}

#[test]
fn saturation_threshold_is_inclusive() {
    let grid = grid_720p();
    let mut cells = flat_cells(&grid, 50, 60, 70);
    cells[0].sat_ratio = 51;
    cells[1].sat_ratio = 52;
    let stats = zones::extract(&cells, Default::default(), &grid, 51);

    let counted: u32 = stats.zones.iter().map(|z| z.counted).sum();
    let uncounted: u32 = stats.zones.iter().map(|z| z.uncounted).sum();
    assert_eq!(counted as usize, grid.cells() - 1);
    assert_eq!(uncounted, 1);
}

#[test]
fn dark_zones_fail_the_validity_filter() {
    let grid = grid_720p();
    // Green average 15 sits just below the green floor of 16.
    let stats = zones::extract(&flat_cells(&grid, 50, 15, 70), Default::default(), &grid, 51);
    assert_eq!(stats.valid_zones().count(), 0);

    let stats = zones::extract(&flat_cells(&grid, 50, 16, 70), Default::default(), &grid, 51);
    assert!(stats.valid_zones().count() > 0);
}

#[test]
fn sparse_zones_fail_the_validity_filter() {
    let grid = grid_720p();
    let mut cells = vec![
        CellAverages {
            sat_ratio: 255,
            ..Default::default()
        };
        grid.cells()
    ];
    // Leave fewer unsaturated cells in the first zone than the count floor.
    for cell in cells.iter_mut().take(MIN_ZONES_COUNTED as usize - 1) {
        *cell = CellAverages {
            green_red: 100,
            red: 100,
            blue: 100,
            green_blue: 100,
            sat_ratio: 0,
        };
    }
    let stats = zones::extract(&cells, Default::default(), &grid, 51);
    assert_eq!(stats.valid_zones().count(), 0);
}

#[test]
fn histogram_tracks_green_channel() {
    let grid = grid_720p();
    let cells = flat_cells(&grid, 10, 90, 10);
    let stats = zones::extract(&cells, Default::default(), &grid, 51);
    assert_eq!(stats.histogram.total(), grid.cells() as u64);
    // All mass in bin 90.
    assert_eq!(stats.histogram.quantile(0.5).floor(), 90.0);
}

#[test]
fn metering_regions_cover_all_cells() {
    let grid = grid_720p();
    let stats = zones::extract(&flat_cells(&grid, 50, 60, 70), Default::default(), &grid, 51);
    let counted: u32 = stats.regions.iter().map(|z| z.counted).sum();
    assert_eq!(counted as usize, grid.cells());
}
