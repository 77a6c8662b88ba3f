use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Args;

use iris_core::buffer::{BufferKind, IpaBuffer};
use iris_core::consts::FOCUS_REGIONS;
use iris_core::controls::{ControlList, ControlRange, SensorControlId, SensorControlRanges};
use iris_core::geometry::Size;
use iris_core::isp::layout::{self, HwRevision};
use iris_core::isp::stats::StatsBuffer;
use iris_core::pipeline::events::{IpaAction, IpaEvent};
use iris_core::pipeline::orchestrator::{Ipa, IpaSettings};
use iris_core::sensor::{CameraSensorInfo, SensorDevice, SensorHelper};
use iris_core::stats::grid::resolve_grid;
use iris_core::stats::zones::CellAverages;
use iris_core::tuning::Tuning;

#[derive(Args)]
pub struct SimulateArgs {
    /// Frames to run
    #[arg(short = 'n', long, default_value_t = 60)]
    pub frames: u64,

    /// Scene reflectance in [0, 1]; the green level at the reference
    /// exposure of 10ms at unity gain
    #[arg(long, default_value_t = 0.08)]
    pub brightness: f64,

    /// Red channel multiplier relative to green
    #[arg(long, default_value_t = 1.0)]
    pub red: f64,

    /// Blue channel multiplier relative to green
    #[arg(long, default_value_t = 1.0)]
    pub blue: f64,
}

/// Luma at the reference exposure equals the scene reflectance.
const REFERENCE_EXPOSURE_US: f64 = 10_000.0;

/// Sensor double recording whatever the loop programs.
struct SimSensor {
    state: Mutex<HashMap<SensorControlId, i32>>,
}

impl SimSensor {
    fn new() -> Self {
        let mut state = HashMap::new();
        state.insert(SensorControlId::Exposure, 600);
        state.insert(SensorControlId::AnalogueGain, 16);
        state.insert(SensorControlId::Vblank, 80);
        Self {
            state: Mutex::new(state),
        }
    }

    fn applied(&self) -> (u32, u32) {
        let state = self.state.lock().unwrap();
        (
            state[&SensorControlId::Exposure].max(0) as u32,
            state[&SensorControlId::AnalogueGain].max(0) as u32,
        )
    }
}

impl SensorDevice for SimSensor {
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
        Ok(())
    }
}

fn scratch_buffer(path: &PathBuf, len: u64) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.set_len(len)?;
    Ok(file)
}

/// Drive the loop against a synthetic scene whose brightness responds to
/// the programmed exposure, and print the per-frame trajectory.
pub fn run(args: &SimulateArgs) -> Result<()> {
    let revision = HwRevision::V10;
    let sensor = Arc::new(SimSensor::new());
    let helper = SensorHelper::for_model("simulated");

    let mut ipa = Ipa::init(
        IpaSettings {
            sensor_model: "simulated".into(),
            hw_revision: 10,
            tuning: Tuning::default(),
        },
        sensor.clone(),
    )?;

    let sensor_info = CameraSensorInfo {
        model: "simulated".into(),
        output_size: Size::new(1280, 720),
        pixel_rate: 100_000_000,
        line_length: 1680,
    };
    let ranges = SensorControlRanges {
        exposure: Some(ControlRange::new(4, 3000, 1000)),
        analogue_gain: Some(ControlRange::new(16, 128, 16)),
        vblank: Some(ControlRange::new(40, 2000, 80)),
    };
    let bds_output = Size::new(1280, 720);
    ipa.configure(&sensor_info, &ranges, bds_output)?;

    // Scratch files standing in for the driver's shared buffers.
    let dir = std::env::temp_dir();
    let pid = std::process::id();
    let mut files = HashMap::new();
    let mut buffers = Vec::new();
    for i in 0..4u32 {
        let param_path = dir.join(format!("iris-sim-{pid}-param-{i}"));
        let stat_path = dir.join(format!("iris-sim-{pid}-stat-{i}"));
        let param_file = scratch_buffer(&param_path, layout::PARAMS_SIZE as u64)?;
        let stat_file = scratch_buffer(&stat_path, layout::stats_size(revision) as u64)?;
        files.insert(i, param_file.try_clone()?);
        files.insert(100 + i, stat_file.try_clone()?);
        buffers.push(IpaBuffer {
            id: i,
            kind: BufferKind::Params,
            file: param_file,
        });
        buffers.push(IpaBuffer {
            id: 100 + i,
            kind: BufferKind::Stats,
            file: stat_file,
        });
    }
    ipa.map_buffers(buffers)?;

    let grid = resolve_grid(bds_output);
    let line_duration_us = sensor_info.line_duration().as_secs_f64() * 1e6;

    println!("frame  lines  gain   luma   r_gain b_gain   cct  locked");

    for frame in 0..args.frames {
        ipa.process_event(IpaEvent::QueueRequest {
            frame,
            controls: Default::default(),
        });
        ipa.process_event(IpaEvent::FillParams { frame });

        let sequence = frame as u32;
        ipa.process_event(IpaEvent::FrameStart { sequence });

        // The scene as the sensor sees it with the currently applied
        // exposure and gain.
        let (lines, gain_code) = sensor.applied();
        let exposure_us = lines as f64 * line_duration_us;
        let gain = helper.gain(gain_code);
        let level = |multiplier: f64| -> u8 {
            let response =
                args.brightness * multiplier * exposure_us * gain / REFERENCE_EXPOSURE_US;
            (response * 255.0).clamp(0.0, 255.0) as u8
        };
        let cell = CellAverages {
            green_red: level(1.0),
            red: level(args.red),
            blue: level(args.blue),
            green_blue: level(1.0),
            sat_ratio: 0,
        };

        let mut stats = StatsBuffer::new(revision);
        stats.set_meas_type(layout::MEAS_AWB | layout::MEAS_AE | layout::MEAS_AF);
        stats.set_sequence(sequence);
        for index in 0..grid.cells() {
            stats.set_awb_cell(index, cell);
        }
        for region in 0..FOCUS_REGIONS {
            stats.set_focus_region(region, 1000, 10);
        }

        let (_, stat_buffer) = ipa
            .frame_buffers(frame)
            .context("frame dropped by the loop")?;
        files[&stat_buffer].write_at(stats.as_bytes(), 0)?;

        let actions = ipa.process_event(IpaEvent::StatsReady {
            frame,
            buffer: stat_buffer,
            timestamp_us: frame * 33_000,
        });

        for action in actions {
            if let IpaAction::MetadataReady { metadata, .. } = action {
                let (red_gain, blue_gain) = metadata.colour_gains.unwrap_or((1.0, 1.0));
                let luma = cell.green() as f64 / 255.0;
                println!(
                    "{frame:>5}  {lines:>5}  {gain:>4.2}  {luma:>5.3}  {red_gain:>6.3} {blue_gain:>6.3}  {:>4}  {}",
                    metadata.colour_temperature.unwrap_or(0),
                    metadata.ae_locked.unwrap_or(false),
                );
            }
        }
    }

    for i in 0..4u32 {
        let _ = std::fs::remove_file(dir.join(format!("iris-sim-{pid}-param-{i}")));
        let _ = std::fs::remove_file(dir.join(format!("iris-sim-{pid}-stat-{i}")));
    }

    Ok(())
}
