use ndarray::Array2;

use crate::consts::{
    AGC_CELLS_X, AGC_CELLS_Y, AGC_REGIONS, FOCUS_REGIONS, HISTOGRAM_BINS, MIN_GREEN_LEVEL,
    MIN_ZONES_COUNTED, ZONE_GRID_HEIGHT, ZONE_GRID_WIDTH,
};
use crate::controls::MeteringMode;
use crate::stats::grid::GridDescriptor;
use crate::stats::histogram::Histogram;

/// One AF measurement region.
#[derive(Clone, Copy, Debug, Default)]
pub struct FocusRegion {
    pub contrast_val: u32,
    pub contrast_val_num: u32,
}

impl FocusRegion {
    /// Contrast contribution of the region; an unmeasured region reads 0.
    pub fn ratio(&self) -> f64 {
        if self.contrast_val_num == 0 {
            0.0
        } else {
            self.contrast_val as f64 / self.contrast_val_num as f64
        }
    }
}

/// Normalized Bayer averages of a single statistics cell.
#[derive(Clone, Copy, Debug, Default)]
pub struct CellAverages {
    pub green_red: u8,
    pub red: u8,
    pub blue: u8,
    pub green_blue: u8,
    pub sat_ratio: u8,
}

impl CellAverages {
    /// Combined green average over both Bayer green channels.
    pub fn green(&self) -> u32 {
        (self.green_red as u32 + self.green_blue as u32) / 2
    }
}

/// Accumulated statistics of one analysis zone.
#[derive(Clone, Copy, Debug, Default)]
pub struct Zone {
    pub r_sum: u64,
    pub g_sum: u64,
    pub b_sum: u64,
    pub counted: u32,
    pub uncounted: u32,
}

impl Zone {
    fn add(&mut self, cell: &CellAverages) {
        self.r_sum += cell.red as u64;
        self.g_sum += cell.green() as u64;
        self.b_sum += cell.blue as u64;
        self.counted += 1;
    }

    /// Whether the zone carries enough unsaturated signal for AWB.
    pub fn is_valid(&self) -> bool {
        self.counted >= MIN_ZONES_COUNTED
            && self.g_sum as f64 / self.counted as f64 >= MIN_GREEN_LEVEL
    }

    /// Per-channel averages, None when nothing was counted.
    pub fn averages(&self) -> Option<(f64, f64, f64)> {
        if self.counted == 0 {
            return None;
        }
        let counted = self.counted as f64;
        Some((
            self.r_sum as f64 / counted,
            self.g_sum as f64 / counted,
            self.b_sum as f64 / counted,
        ))
    }
}

/// The 7x5 AGC cell layout folded onto 15 metering regions, numbered from
/// the image centre outwards:
///
/// ```text
///   +--+--------------+--+
///   |11|     9        |12|
///   +--+--+--------+--+--+
///   |7 |5 |1  0  2 |6 |8 |
///   +--+--+--------+--+--+
///   |13|     10       |14|
///   +--+--------------+--+
/// ```
const AGC_REGION_MAP: [usize; AGC_CELLS_X * AGC_CELLS_Y] = [
    11, 9, 9, 9, 9, 9, 12, //
    7, 5, 3, 3, 3, 6, 8, //
    7, 5, 1, 0, 2, 6, 8, //
    7, 5, 4, 4, 4, 6, 8, //
    13, 10, 10, 10, 10, 10, 14,
];

/// Metering weights per AGC region for a metering mode.
pub fn metering_weights(mode: MeteringMode) -> [f64; AGC_REGIONS] {
    match mode {
        MeteringMode::CentreWeighted | MeteringMode::Custom => {
            [3.0, 3.0, 3.0, 2.0, 2.0, 2.0, 2.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]
        }
        MeteringMode::Spot => {
            let mut weights = [0.0; AGC_REGIONS];
            weights[0] = 1.0;
            weights
        }
        MeteringMode::Matrix => [1.0; AGC_REGIONS],
    }
}

/// Canonical per-frame statistics extracted from the ISP cell grid.
#[derive(Clone, Debug)]
pub struct FrameStats {
    /// 16x12 zone grid feeding AWB, indexed `[row][col]`.
    pub zones: Array2<Zone>,
    /// The 15 weighted metering regions feeding AGC.
    pub regions: [Zone; AGC_REGIONS],
    /// Green-channel histogram over unsaturated cells.
    pub histogram: Histogram,
    /// Contrast statistics feeding AF.
    pub focus: [FocusRegion; FOCUS_REGIONS],
}

impl FrameStats {
    /// Zones passing the AWB validity filter.
    pub fn valid_zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(|z| z.is_valid())
    }
}

/// Fold the ISP cell grid into the analysis zones, the AGC metering
/// regions and the green histogram.
///
/// `cells` is the row-major cell grid described by `grid`; cells whose
/// saturation ratio exceeds `sat_ratio_max` contribute to `uncounted`
/// only.
pub fn extract(
    cells: &[CellAverages],
    focus: [FocusRegion; FOCUS_REGIONS],
    grid: &GridDescriptor,
    sat_ratio_max: u8,
) -> FrameStats {
    let mut zones = Array2::<Zone>::default((ZONE_GRID_HEIGHT, ZONE_GRID_WIDTH));
    let mut regions = [Zone::default(); AGC_REGIONS];
    let mut hist = [0u32; HISTOGRAM_BINS];

    let grid_w = grid.width.max(1) as usize;
    let grid_h = grid.height.max(1) as usize;

    for y in 0..grid_h {
        for x in 0..grid_w {
            let Some(cell) = cells.get(y * grid_w + x) else {
                continue;
            };

            let zone_x = x * ZONE_GRID_WIDTH / grid_w;
            let zone_y = y * ZONE_GRID_HEIGHT / grid_h;
            let region_x = x * AGC_CELLS_X / grid_w;
            let region_y = y * AGC_CELLS_Y / grid_h;
            let region = AGC_REGION_MAP[region_y * AGC_CELLS_X + region_x];

            if cell.sat_ratio <= sat_ratio_max {
                zones[[zone_y, zone_x]].add(cell);
                regions[region].add(cell);
                hist[cell.green() as usize] += 1;
            } else {
                zones[[zone_y, zone_x]].uncounted += 1;
                regions[region].uncounted += 1;
            }
        }
    }

    FrameStats {
        zones,
        regions,
        histogram: Histogram::new(&hist),
        focus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::stats::grid::resolve_grid;

    fn flat_cells(n: usize, r: u8, g: u8, b: u8) -> Vec<CellAverages> {
        vec![
            CellAverages {
                green_red: g,
                red: r,
                blue: b,
                green_blue: g,
                sat_ratio: 0,
            };
            n
        ]
    }

    #[test]
    fn saturated_cells_are_uncounted() {
        let grid = resolve_grid(Size::new(1280, 720));
        let mut cells = flat_cells(grid.cells(), 100, 120, 80);
        for cell in cells.iter_mut().take(grid.cells() / 2) {
            cell.sat_ratio = 255;
        }
        let stats = extract(&cells, Default::default(), &grid, 51);
        let counted: u32 = stats.zones.iter().map(|z| z.counted).sum();
        let uncounted: u32 = stats.zones.iter().map(|z| z.uncounted).sum();
        assert_eq!(counted as usize + uncounted as usize, grid.cells());
        assert_eq!(uncounted as usize, grid.cells() / 2);
    }

    #[test]
    fn histogram_counts_unsaturated_green() {
        let grid = resolve_grid(Size::new(1280, 720));
        let cells = flat_cells(grid.cells(), 0, 40, 0);
        let stats = extract(&cells, Default::default(), &grid, 51);
        assert_eq!(stats.histogram.total(), grid.cells() as u64);
        assert_eq!(stats.histogram.quantile(0.5) as usize, 40);
    }
}
