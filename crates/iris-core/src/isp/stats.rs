//! Read adapter over the statistics buffer blob.

use std::io::Cursor;

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};

use crate::consts::FOCUS_REGIONS;
use crate::error::{IrisError, Result};
use crate::isp::layout::{
    self, HwRevision, AWB_CELL_SIZE, FOCUS_REGION_SIZE, HIST_BINS, MEAS_HIST,
    STATS_AE_MEAN_OFFSET, STATS_MEAS_TYPE_OFFSET, STATS_SEQUENCE_OFFSET,
};
use crate::stats::grid::GridDescriptor;
use crate::stats::zones::{CellAverages, FocusRegion};

/// Validated, read-only view of a mapped statistics buffer.
///
/// The view borrows the mapping and must not outlive the event that
/// delivered it.
pub struct StatsView<'a> {
    data: &'a [u8],
    revision: HwRevision,
}

impl<'a> StatsView<'a> {
    pub fn new(data: &'a [u8], revision: HwRevision) -> Result<Self> {
        let expected = layout::stats_size(revision);
        if data.len() < expected {
            return Err(IrisError::InvalidStats {
                expected,
                got: data.len(),
            });
        }
        Ok(Self { data, revision })
    }

    fn read_u32(&self, offset: usize) -> u32 {
        let mut cursor = Cursor::new(&self.data[offset..offset + 4]);
        cursor.read_u32::<NativeEndian>().unwrap()
    }

    pub fn meas_type(&self) -> u32 {
        self.read_u32(STATS_MEAS_TYPE_OFFSET)
    }

    pub fn has(&self, bits: u32) -> bool {
        self.meas_type() & bits == bits
    }

    pub fn sequence(&self) -> u32 {
        self.read_u32(STATS_SEQUENCE_OFFSET)
    }

    /// The raw AE luma means, one u8 per AE cell.
    pub fn ae_means(&self) -> &[u8] {
        let cells = self.revision.ae_mean_cells();
        &self.data[STATS_AE_MEAN_OFFSET..STATS_AE_MEAN_OFFSET + cells]
    }

    /// Mean of the AE luma cells, skipping cells at or below the sensor
    /// black level of 15. None when every cell is black or the AE block
    /// was not measured.
    pub fn ae_brightness(&self) -> Option<f64> {
        if !self.has(layout::MEAS_AE) {
            return None;
        }
        let mut sum = 0u64;
        let mut count = 0u64;
        for &mean in self.ae_means() {
            if mean > 15 {
                sum += mean as u64;
                count += 1;
            }
        }
        (count > 0).then(|| sum as f64 / count as f64)
    }

    pub fn focus_regions(&self) -> [FocusRegion; FOCUS_REGIONS] {
        let base = layout::stats_af_offset(self.revision);
        let mut regions = [FocusRegion::default(); FOCUS_REGIONS];
        for (i, region) in regions.iter_mut().enumerate() {
            let offset = base + i * FOCUS_REGION_SIZE;
            region.contrast_val = self.read_u32(offset);
            region.contrast_val_num = self.read_u32(offset + 4);
        }
        regions
    }

    /// The per-cell Bayer averages for the cells `grid` describes.
    pub fn awb_cells(&self, grid: &GridDescriptor) -> Vec<CellAverages> {
        let base = layout::stats_awb_offset(self.revision);
        let count = grid.cells().min(crate::consts::GRID_CELLS_MAX);
        (0..count)
            .map(|i| {
                let record = &self.data[base + i * AWB_CELL_SIZE..];
                CellAverages {
                    green_red: record[0],
                    red: record[1],
                    blue: record[2],
                    green_blue: record[3],
                    sat_ratio: record[4],
                }
            })
            .collect()
    }

    /// The hardware histogram block, when the ISP produced one.
    pub fn histogram(&self) -> Option<Vec<u32>> {
        if !self.has(MEAS_HIST) {
            return None;
        }
        let base = layout::stats_hist_offset(self.revision);
        Some((0..HIST_BINS).map(|i| self.read_u32(base + i * 4)).collect())
    }
}

/// Owned statistics blob with write access, used by the simulator and by
/// tests to synthesize frames.
pub struct StatsBuffer {
    data: Vec<u8>,
    revision: HwRevision,
}

impl StatsBuffer {
    pub fn new(revision: HwRevision) -> Self {
        Self {
            data: vec![0; layout::stats_size(revision)],
            revision,
        }
    }

    fn write_u32(&mut self, offset: usize, value: u32) {
        let mut cursor = Cursor::new(&mut self.data[offset..offset + 4]);
        cursor.write_u32::<NativeEndian>(value).unwrap();
    }

    pub fn set_meas_type(&mut self, bits: u32) {
        self.write_u32(STATS_MEAS_TYPE_OFFSET, bits);
    }

    pub fn set_sequence(&mut self, sequence: u32) {
        self.write_u32(STATS_SEQUENCE_OFFSET, sequence);
    }

    pub fn set_ae_means(&mut self, means: &[u8]) {
        let cells = self.revision.ae_mean_cells().min(means.len());
        self.data[STATS_AE_MEAN_OFFSET..STATS_AE_MEAN_OFFSET + cells]
            .copy_from_slice(&means[..cells]);
    }

    pub fn set_focus_region(&mut self, index: usize, contrast_val: u32, contrast_val_num: u32) {
        let offset = layout::stats_af_offset(self.revision) + index * FOCUS_REGION_SIZE;
        self.write_u32(offset, contrast_val);
        self.write_u32(offset + 4, contrast_val_num);
    }

    pub fn set_awb_cell(&mut self, index: usize, cell: CellAverages) {
        let offset = layout::stats_awb_offset(self.revision) + index * AWB_CELL_SIZE;
        self.data[offset] = cell.green_red;
        self.data[offset + 1] = cell.red;
        self.data[offset + 2] = cell.blue;
        self.data[offset + 3] = cell.green_blue;
        self.data[offset + 4] = cell.sat_ratio;
    }

    pub fn set_histogram(&mut self, bins: &[u32]) {
        let base = layout::stats_hist_offset(self.revision);
        for (i, &bin) in bins.iter().take(HIST_BINS).enumerate() {
            self.write_u32(base + i * 4, bin);
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}
