//! Shared state the algorithms exchange, one typed struct per concern.

use std::time::Duration;

use crate::controls::{AfMode, FrameMetadata, MeteringMode, NoiseReductionMode};
use crate::geometry::{Rectangle, Size};
use crate::stats::grid::GridDescriptor;

/// Configuration frozen at `configure` time, valid for the whole session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub grid: GridDescriptor,
    pub bds_output: Size,
    pub line_duration: Duration,
    pub min_exposure_lines: u32,
    pub max_exposure_lines: u32,
    pub min_gain: f64,
    pub max_gain: f64,
    /// Default vertical blanking, in lines.
    pub vblank: u32,
}

impl SessionConfig {
    /// Shutter limits in time units.
    pub fn min_shutter(&self) -> Duration {
        self.line_duration * self.min_exposure_lines
    }

    pub fn max_shutter(&self) -> Duration {
        self.line_duration * self.max_exposure_lines
    }

    /// Duration of one full frame at the configured blanking.
    pub fn frame_duration(&self) -> Duration {
        self.line_duration * (self.bds_output.height + self.vblank)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grid: GridDescriptor::default(),
            bds_output: Size::default(),
            line_duration: Duration::from_micros(30),
            min_exposure_lines: 1,
            max_exposure_lines: 1,
            min_gain: 1.0,
            max_gain: 1.0,
            vblank: 0,
        }
    }
}

/// Per-frame inputs resolved from the application's request controls.
///
/// Values persist across frames until a later request changes them.
#[derive(Clone, Debug)]
pub struct FrameContext {
    pub frame: u64,
    pub sensor_sequence: u32,
    /// Shutter and gain the sensor actually applied to this frame, read
    /// back through the delayed-controls history.
    pub effective_shutter: Duration,
    pub effective_gain: f64,
    pub ae_enable: bool,
    pub awb_enable: bool,
    pub metering: MeteringMode,
    /// Exposure target multiplier derived from `AeExposureValue`.
    pub target_multiplier: f64,
    pub manual_exposure_lines: Option<u32>,
    pub manual_gain: Option<f64>,
    pub manual_colour_gains: Option<(f32, f32)>,
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub sharpness: f32,
    pub noise_reduction: NoiseReductionMode,
    pub af_windows: Option<Rectangle>,
}

impl Default for FrameContext {
    fn default() -> Self {
        Self {
            frame: 0,
            sensor_sequence: 0,
            effective_shutter: Duration::ZERO,
            effective_gain: 1.0,
            ae_enable: true,
            awb_enable: true,
            metering: MeteringMode::CentreWeighted,
            target_multiplier: 1.0,
            manual_exposure_lines: None,
            manual_gain: None,
            manual_colour_gains: None,
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            sharpness: 1.0,
            noise_reduction: NoiseReductionMode::Fast,
            af_windows: None,
        }
    }
}

/// White balance outcome of the current frame.
#[derive(Clone, Copy, Debug)]
pub struct AwbResult {
    pub temperature_k: f64,
    pub red_gain: f64,
    pub green_gain: f64,
    pub blue_gain: f64,
}

impl Default for AwbResult {
    fn default() -> Self {
        Self {
            temperature_k: 4500.0,
            red_gain: 1.0,
            green_gain: 1.0,
            blue_gain: 1.0,
        }
    }
}

/// Exposure outcome of the current frame.
#[derive(Clone, Copy, Debug)]
pub struct AgcResult {
    pub exposure_lines: u32,
    pub analogue_gain: f64,
    pub filtered_exposure: Duration,
    pub converged: bool,
    /// Set when the sensor must be reprogrammed for this result.
    pub update_sensor: bool,
    /// Tone-curve exponent suggested by the scene's luma spread; None
    /// until a frame with a usable histogram was metered.
    pub scene_gamma: Option<f64>,
}

impl Default for AgcResult {
    fn default() -> Self {
        Self {
            exposure_lines: 1,
            analogue_gain: 1.0,
            filtered_exposure: Duration::ZERO,
            converged: false,
            update_sensor: false,
            scene_gamma: None,
        }
    }
}

/// Focus outcome published by the AF state machine.
#[derive(Clone, Copy, Debug)]
pub struct AfStatus {
    pub mode: AfMode,
    pub lens_position: u32,
    pub stable: bool,
}

impl Default for AfStatus {
    fn default() -> Self {
        Self {
            mode: AfMode::Manual,
            lens_position: 0,
            stable: false,
        }
    }
}

/// The full inter-algorithm exchange surface.
///
/// Owned by the orchestrator; each algorithm hook borrows it for one call
/// and never retains references across frames.
#[derive(Clone, Debug, Default)]
pub struct IpaContext {
    pub session: SessionConfig,
    pub frame: FrameContext,
    pub awb: AwbResult,
    pub agc: AgcResult,
    pub gamma: f64,
    pub af: AfStatus,
}

impl IpaContext {
    /// The per-frame result metadata for the current state.
    ///
    /// `AeLocked` is only reported while exposure runs automatically; a
    /// manually exposed frame has no convergence to report.
    pub fn metadata(&self, pipeline_depth: u32) -> FrameMetadata {
        let colour_gains = match self.frame.manual_colour_gains {
            Some(gains) => gains,
            None => (self.awb.red_gain as f32, self.awb.blue_gain as f32),
        };

        FrameMetadata {
            frame_duration_us: Some(self.session.frame_duration().as_micros() as i64),
            ae_locked: self.frame.ae_enable.then_some(self.agc.converged),
            af_state: Some(self.af.mode),
            colour_gains: Some(colour_gains),
            colour_temperature: Some(self.awb.temperature_k.max(0.0) as u32),
            pipeline_depth: Some(pipeline_depth),
        }
    }
}
