mod common;

use common::grid_720p;
use iris_core::isp::layout::{self, HwRevision, MEAS_AE, MEAS_AWB, MEAS_HIST};
use iris_core::isp::stats::{StatsBuffer, StatsView};
use iris_core::stats::zones::CellAverages;
use iris_core::IrisError;

#[test]
fn undersized_buffer_is_invalid() {
    let short = vec![0u8; layout::stats_size(HwRevision::V10) - 1];
    let result = StatsView::new(&short, HwRevision::V10);
    assert!(matches!(result, Err(IrisError::InvalidStats { .. })));
}

#[test]
fn v12_buffers_are_larger_than_v10() {
    assert!(layout::stats_size(HwRevision::V12) > layout::stats_size(HwRevision::V10));

    // A V10-sized buffer cannot be read as V12.
    let v10 = StatsBuffer::new(HwRevision::V10);
    assert!(StatsView::new(v10.as_bytes(), HwRevision::V12).is_err());
}

#[test]
fn awb_cells_round_trip_through_the_blob() {
    let grid = grid_720p();
    let mut buffer = StatsBuffer::new(HwRevision::V10);
    buffer.set_meas_type(MEAS_AWB);
    buffer.set_sequence(42);
    for index in 0..grid.cells() {
        buffer.set_awb_cell(
            index,
            CellAverages {
                green_red: 10,
                red: 20,
                blue: 30,
                green_blue: 40,
                sat_ratio: (index % 2) as u8,
            },
        );
    }

    let view = StatsView::new(buffer.as_bytes(), HwRevision::V10).unwrap();
    assert_eq!(view.sequence(), 42);
    assert!(view.has(MEAS_AWB));

    let cells = view.awb_cells(&grid);
    assert_eq!(cells.len(), grid.cells());
    assert_eq!(cells[0].red, 20);
    assert_eq!(cells[0].green(), 25);
    assert_eq!(cells[1].sat_ratio, 1);
}

#[test]
fn ae_brightness_skips_black_cells() {
    let mut buffer = StatsBuffer::new(HwRevision::V10);
    buffer.set_meas_type(MEAS_AE);

    // Half the cells at the black floor, half at 100.
    let cells = HwRevision::V10.ae_mean_cells();
    let mut means = vec![15u8; cells];
    for mean in means.iter_mut().take(cells / 2) {
        *mean = 100;
    }
    buffer.set_ae_means(&means);

    let view = StatsView::new(buffer.as_bytes(), HwRevision::V10).unwrap();
    assert_eq!(view.ae_brightness(), Some(100.0));
}

#[test]
fn ae_brightness_is_absent_without_measurements() {
    let mut buffer = StatsBuffer::new(HwRevision::V10);
    buffer.set_meas_type(MEAS_AWB);
    buffer.set_ae_means(&[200; 25]);

    let view = StatsView::new(buffer.as_bytes(), HwRevision::V10).unwrap();
    assert_eq!(view.ae_brightness(), None);

    // All-black AE cells read as no measurement either.
    buffer.set_meas_type(MEAS_AE);
    buffer.set_ae_means(&[10; 25]);
    let view = StatsView::new(buffer.as_bytes(), HwRevision::V10).unwrap();
    assert_eq!(view.ae_brightness(), None);
}

#[test]
fn histogram_block_is_gated_by_meas_type() {
    let mut buffer = StatsBuffer::new(HwRevision::V10);
    let mut bins = [0u32; 256];
    bins[128] = 77;
    buffer.set_histogram(&bins);

    let view = StatsView::new(buffer.as_bytes(), HwRevision::V10).unwrap();
    assert!(view.histogram().is_none());

    buffer.set_meas_type(MEAS_HIST);
    let view = StatsView::new(buffer.as_bytes(), HwRevision::V10).unwrap();
    let bins = view.histogram().unwrap();
    assert_eq!(bins[128], 77);
    assert_eq!(bins[127], 0);
}
