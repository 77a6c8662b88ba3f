/// Width of the AWB analysis zone grid the ISP cell grid is folded into.
pub const ZONE_GRID_WIDTH: usize = 16;

/// Height of the AWB analysis zone grid.
pub const ZONE_GRID_HEIGHT: usize = 12;

/// Width of the coarser AGC metering cell layout.
pub const AGC_CELLS_X: usize = 7;

/// Height of the AGC metering cell layout.
pub const AGC_CELLS_Y: usize = 5;

/// Number of weighted AGC metering regions the 7x5 cells map onto.
pub const AGC_REGIONS: usize = 15;

/// Number of luma histogram bins.
pub const HISTOGRAM_BINS: usize = 256;

/// Minimum cells accumulated into a zone for it to enter AWB.
pub const MIN_ZONES_COUNTED: u32 = 16;

/// Minimum per-zone green average for the zone to enter AWB.
pub const MIN_GREEN_LEVEL: f64 = 16.0;

/// Statistics are an 8-bit pipeline; averages saturate at this value.
pub const PIPELINE_MAX: u32 = 255;

/// AWB gains are held within this range after clamping.
pub const AWB_GAIN_MIN: f64 = 0.125;
pub const AWB_GAIN_MAX: f64 = 8.0;

/// Depth of the delayed-controls value ring.
pub const CONTROL_RING_SIZE: usize = 16;

/// Number of contrast statistics regions delivered for AF.
pub const FOCUS_REGIONS: usize = 4;

/// Largest cell counts a single measurement set can carry.
pub const CELL_SET_WIDTH_MAX: u32 = 160;
pub const CELL_SET_HEIGHT_MAX: u32 = 56;

/// Largest cell grid the statistics buffer stores.
pub const GRID_WIDTH_MAX: u32 = 80;
pub const GRID_HEIGHT_MAX: u32 = 60;
pub const GRID_CELLS_MAX: usize = (GRID_WIDTH_MAX * GRID_HEIGHT_MAX) as usize;

/// Valid range of the grid block size exponents.
pub const BLOCK_LOG2_MIN: u32 = 3;
pub const BLOCK_LOG2_MAX: u32 = 7;
