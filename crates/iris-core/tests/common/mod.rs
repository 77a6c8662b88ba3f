#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use iris_core::consts::FOCUS_REGIONS;
use iris_core::context::{IpaContext, SessionConfig};
use iris_core::controls::{ControlList, ControlRange, SensorControlId, SensorControlRanges};
use iris_core::geometry::Size;
use iris_core::sensor::{CameraSensorInfo, SensorDevice};
use iris_core::stats::grid::{resolve_grid, GridDescriptor};
use iris_core::stats::zones::{self, CellAverages, FocusRegion, FrameStats};

/// Sensor double that records every write and serves fixed read-backs.
pub struct FakeSensor {
    pub state: Mutex<HashMap<SensorControlId, i32>>,
    pub writes: Mutex<Vec<ControlList>>,
}

impl FakeSensor {
    pub fn new() -> Arc<Self> {
        let mut state = HashMap::new();
        state.insert(SensorControlId::Exposure, 600);
        state.insert(SensorControlId::AnalogueGain, 16);
        state.insert(SensorControlId::Vblank, 80);
        Arc::new(Self {
            state: Mutex::new(state),
            writes: Mutex::new(Vec::new()),
        })
    }

    /// Control writes recorded since the last call.
    pub fn take_writes(&self) -> Vec<ControlList> {
        std::mem::take(&mut self.writes.lock().unwrap())
    }

    pub fn current(&self, id: SensorControlId) -> i32 {
        self.state.lock().unwrap()[&id]
    }
}

impl SensorDevice for FakeSensor {
    fn get_controls(&self, ids: &[SensorControlId]) -> iris_core::Result<ControlList> {
        let state = self.state.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| state.get(id).map(|&value| (*id, value)))
            .collect())
    }

    fn set_controls(&self, controls: &ControlList) -> iris_core::Result<()> {
        let mut state = self.state.lock().unwrap();
        for (id, value) in controls.iter() {
            state.insert(id, value);
        }
        self.writes.lock().unwrap().push(controls.clone());
        Ok(())
    }
}

/// 16.8us lines, 720p raw output.
pub fn sensor_info() -> CameraSensorInfo {
    CameraSensorInfo {
        model: "testcam".into(),
        output_size: Size::new(1280, 720),
        pixel_rate: 100_000_000,
        line_length: 1680,
    }
}

/// Exposure 4..2000 lines, gain codes 16..128 (1x..8x), vblank 80.
pub fn control_ranges() -> SensorControlRanges {
    SensorControlRanges {
        exposure: Some(ControlRange::new(4, 2000, 1000)),
        analogue_gain: Some(ControlRange::new(16, 128, 16)),
        vblank: Some(ControlRange::new(40, 2000, 80)),
    }
}

pub fn grid_720p() -> GridDescriptor {
    resolve_grid(Size::new(1280, 720))
}

/// A session matching `sensor_info` + `control_ranges` over 720p.
pub fn session_720p() -> SessionConfig {
    SessionConfig {
        grid: grid_720p(),
        bds_output: Size::new(1280, 720),
        line_duration: Duration::from_nanos(16_800),
        min_exposure_lines: 4,
        max_exposure_lines: 2000,
        min_gain: 1.0,
        max_gain: 8.0,
        vblank: 80,
    }
}

pub fn context_720p() -> IpaContext {
    IpaContext {
        session: session_720p(),
        ..Default::default()
    }
}

/// A full cell grid with every cell carrying the same averages.
pub fn flat_cells(grid: &GridDescriptor, r: u8, g: u8, b: u8) -> Vec<CellAverages> {
    vec![
        CellAverages {
            green_red: g,
            red: r,
            blue: b,
            green_blue: g,
            sat_ratio: 0,
        };
        grid.cells()
    ]
}

pub fn focus_regions(contrast: f64) -> [FocusRegion; FOCUS_REGIONS] {
    let mut regions = [FocusRegion::default(); FOCUS_REGIONS];
    // Spread the scene contrast evenly over the regions.
    for region in regions.iter_mut() {
        region.contrast_val = (contrast / FOCUS_REGIONS as f64 * 1000.0) as u32;
        region.contrast_val_num = 1000;
    }
    regions
}

/// Extract canonical statistics from a flat scene.
pub fn flat_stats(grid: &GridDescriptor, r: u8, g: u8, b: u8) -> FrameStats {
    let cells = flat_cells(grid, r, g, b);
    zones::extract(&cells, Default::default(), grid, 51)
}

/// Extract canonical statistics with a given scene contrast for AF.
pub fn stats_with_contrast(grid: &GridDescriptor, luma: u8, contrast: f64) -> FrameStats {
    let cells = flat_cells(grid, luma, luma, luma);
    zones::extract(&cells, focus_regions(contrast), grid, 51)
}
