//! The per-frame control loop.
//!
//! One instance owns the algorithms, their shared context, the in-flight
//! frame table and the delayed-controls shim. The pipeline handler drives
//! it exclusively through [`Ipa::process_event`] from a single thread;
//! each handler runs to completion and returns the outbound actions.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::algorithms::Algorithms;
use crate::buffer::{BufferKind, IpaBuffer, MappedBuffers};
use crate::context::{FrameContext, IpaContext};
use crate::controls::{
    AfMode, ControlList, RequestControls, SensorControlId, SensorControlRanges,
};
use crate::delayed::DelayedControls;
use crate::error::{IrisError, Result};
use crate::geometry::{Rectangle, Size};
use crate::isp::layout::{self, HwRevision, MEAS_AWB};
use crate::isp::params;
use crate::isp::stats::StatsView;
use crate::sensor::{CameraSensorInfo, SensorDevice, SensorHelper};
use crate::stats::grid::resolve_grid;
use crate::stats::zones;
use crate::tuning::Tuning;

use super::events::{IpaAction, IpaEvent};
use super::frames::FrameTable;

/// Frames each control needs before a write takes effect on the sensor.
pub const CONTROL_DELAYS: [(SensorControlId, u32); 3] = [
    (SensorControlId::Exposure, 2),
    (SensorControlId::AnalogueGain, 1),
    (SensorControlId::Vblank, 2),
];

/// Everything needed to construct the loop.
pub struct IpaSettings {
    pub sensor_model: String,
    pub hw_revision: u32,
    pub tuning: Tuning,
}

pub struct Ipa {
    revision: HwRevision,
    helper: SensorHelper,
    tuning: Tuning,
    algorithms: Algorithms,
    context: IpaContext,
    buffers: MappedBuffers,
    frames: FrameTable,
    delayed: DelayedControls,
    /// Accumulated application controls; requests only override the
    /// fields they carry.
    active: RequestControls,
    running: bool,
}

impl Ipa {
    /// Construct the loop for a sensor and hardware revision.
    pub fn init(settings: IpaSettings, device: Arc<dyn SensorDevice>) -> Result<Self> {
        let revision = HwRevision::from_raw(settings.hw_revision)?;
        let helper = SensorHelper::for_model(&settings.sensor_model);
        info!(
            sensor = settings.sensor_model,
            revision = settings.hw_revision,
            "initialising control loop"
        );

        Ok(Self {
            revision,
            helper,
            tuning: settings.tuning,
            algorithms: Algorithms::new(),
            context: IpaContext::default(),
            buffers: MappedBuffers::new(),
            frames: FrameTable::new(),
            delayed: DelayedControls::new(device, &CONTROL_DELAYS),
            active: RequestControls::default(),
            running: false,
        })
    }

    /// Adopt a stream configuration: compute the statistics grid, seed the
    /// exposure limits from the sensor's control ranges, configure every
    /// algorithm and program the sensor's starting point.
    pub fn configure(
        &mut self,
        sensor_info: &CameraSensorInfo,
        ranges: &SensorControlRanges,
        bds_output: Size,
    ) -> Result<()> {
        let exposure = ranges
            .exposure
            .ok_or(IrisError::MissingControl("EXPOSURE"))?;
        let gain = ranges
            .analogue_gain
            .ok_or(IrisError::MissingControl("ANALOGUE_GAIN"))?;
        let vblank = ranges.vblank.ok_or(IrisError::MissingControl("VBLANK"))?;

        let session = &mut self.context.session;
        session.grid = resolve_grid(bds_output);
        session.bds_output = bds_output;
        session.line_duration = sensor_info.line_duration();
        session.min_exposure_lines = exposure.min.max(1) as u32;
        session.max_exposure_lines = exposure.max.max(1) as u32;
        session.min_gain = self.helper.gain(gain.min.max(1) as u32);
        session.max_gain = self.helper.gain(gain.max.max(1) as u32);
        session.vblank = vblank.default.max(0) as u32;

        info!(
            %bds_output,
            min_exposure = session.min_exposure_lines,
            max_exposure = session.max_exposure_lines,
            min_gain = session.min_gain,
            max_gain = session.max_gain,
            "configured"
        );

        self.context.frame = FrameContext::default();
        self.active = RequestControls::default();

        for algorithm in self.algorithms.each_mut() {
            algorithm.configure(&mut self.context, &self.tuning)?;
        }

        // Program the sensor's starting point and seed the control
        // history from it.
        let initial = self.sensor_controls();
        self.delayed.reset(Some(&initial))?;
        self.context.agc.update_sensor = false;

        self.running = true;
        Ok(())
    }

    /// Map the pipeline's shared buffers and add them to the free lists.
    pub fn map_buffers(&mut self, buffers: Vec<IpaBuffer>) -> Result<()> {
        for buffer in buffers {
            let min_len = match buffer.kind {
                BufferKind::Params => layout::PARAMS_SIZE,
                BufferKind::Stats => layout::stats_size(self.revision),
            };
            self.buffers.map(&buffer, min_len)?;
            match buffer.kind {
                BufferKind::Params => self.frames.add_param_buffer(buffer.id),
                BufferKind::Stats => self.frames.add_stat_buffer(buffer.id),
            }
        }
        Ok(())
    }

    pub fn unmap_buffers(&mut self, ids: &[u32]) {
        self.buffers.unmap(ids);
        for &id in ids {
            self.frames.remove_buffer(id);
        }
    }

    /// Stop the loop: cancel in-flight frames and reset algorithm state.
    /// Events arriving afterwards are dropped.
    pub fn stop(&mut self) {
        self.frames.drain();
        self.running = false;

        self.algorithms = Algorithms::new();
        self.context = IpaContext {
            session: self.context.session.clone(),
            ..Default::default()
        };
        for algorithm in self.algorithms.each_mut() {
            if let Err(error) = algorithm.configure(&mut self.context, &self.tuning) {
                error!(%error, "algorithm reset failed");
            }
        }
        info!("stopped");
    }

    /// Handle one pipeline event to completion.
    pub fn process_event(&mut self, event: IpaEvent) -> Vec<IpaAction> {
        if !self.running {
            warn!(?event, "event after stop dropped");
            return Vec::new();
        }

        match event {
            IpaEvent::QueueRequest { frame, controls } => {
                self.queue_request(frame, controls);
                Vec::new()
            }
            IpaEvent::FillParams { frame } => self.fill_params(frame),
            IpaEvent::StatsReady {
                frame,
                buffer,
                timestamp_us,
            } => self.stats_ready(frame, buffer, timestamp_us),
            IpaEvent::FrameStart { sequence } => {
                self.delayed.frame_start(sequence);
                Vec::new()
            }
        }
    }

    /// The (param, stat) buffer ids assigned to an in-flight frame.
    pub fn frame_buffers(&mut self, frame: u64) -> Option<(u32, u32)> {
        self.frames
            .find(frame)
            .map(|info| (info.param_buffer, info.stat_buffer))
    }

    // AF is the one algorithm with an out-of-band surface: focus requests
    // do not ride on capture requests.

    pub fn af_set_mode(&mut self, mode: AfMode) {
        self.algorithms.af.set_mode(mode);
    }

    pub fn af_trigger(&mut self) {
        self.algorithms.af.trigger();
    }

    pub fn af_cancel(&mut self) {
        self.algorithms.af.cancel();
    }

    pub fn af_set_windows(&mut self, windows: Rectangle) {
        self.algorithms.af.set_windows(windows);
        self.context.frame.af_windows = if windows.is_empty() {
            None
        } else {
            Some(windows)
        };
    }

    pub fn af_set_range(&mut self, low: u32, high: u32) {
        self.algorithms.af.set_range(low, high);
    }

    pub fn af_set_speed(&mut self, speed: u32) {
        self.algorithms.af.set_speed(speed);
    }

    fn queue_request(&mut self, frame: u64, controls: RequestControls) {
        merge_controls(&mut self.active, &controls);

        for algorithm in self.algorithms.each_mut() {
            algorithm.queue_request(&mut self.context, &controls);
        }

        let frame_context = self.resolve_frame_context(frame);
        if let Err(error) = self.frames.create(frame, frame_context) {
            error!(%error, frame, "request not admitted");
        }
    }

    /// Build the per-frame inputs for `frame` from the accumulated
    /// application controls.
    fn resolve_frame_context(&self, frame: u64) -> FrameContext {
        let active = &self.active;
        let session = &self.context.session;

        let line_ns = session.line_duration.as_nanos().max(1) as u64;
        let manual_exposure_lines = active
            .exposure_time_us
            .filter(|&us| us > 0)
            .map(|us| ((us as u64 * 1_000) / line_ns) as u32);
        let manual_gain = active
            .analogue_gain
            .filter(|&gain| gain >= 1.0)
            .map(f64::from);
        let manual = manual_exposure_lines.is_some() || manual_gain.is_some();

        let ae_enable = active.ae_enable.unwrap_or(true) && !manual;
        let exposure_value = active.ae_exposure_value.unwrap_or(0.0) as f64;

        FrameContext {
            frame,
            sensor_sequence: self.context.frame.sensor_sequence,
            effective_shutter: self.context.frame.effective_shutter,
            effective_gain: self.context.frame.effective_gain,
            ae_enable,
            awb_enable: active.awb_enable.unwrap_or(true),
            metering: active.ae_metering_mode.unwrap_or_default(),
            target_multiplier: if ae_enable {
                2f64.powf(exposure_value)
            } else {
                1.0
            },
            manual_exposure_lines,
            manual_gain,
            manual_colour_gains: active.colour_gains,
            brightness: active.brightness.unwrap_or(0.0).clamp(-1.0, 1.0),
            contrast: active.contrast.unwrap_or(1.0).clamp(0.0, 32.0),
            saturation: active.saturation.unwrap_or(1.0).clamp(0.0, 32.0),
            sharpness: active.sharpness.unwrap_or(1.0).clamp(0.0, 16.0),
            noise_reduction: active.noise_reduction.unwrap_or_default(),
            af_windows: self.context.frame.af_windows,
        }
    }

    fn fill_params(&mut self, frame: u64) -> Vec<IpaAction> {
        let Some(info) = self.frames.find(frame) else {
            warn!(frame, "parameter fill for unknown frame");
            return Vec::new();
        };
        let param_buffer = info.param_buffer;
        let mut frame_context = info.context.clone();
        frame_context.sensor_sequence = self.context.frame.sensor_sequence;
        frame_context.effective_shutter = self.context.frame.effective_shutter;
        frame_context.effective_gain = self.context.frame.effective_gain;
        self.context.frame = frame_context;

        for algorithm in self.algorithms.each_mut() {
            algorithm.prepare(&mut self.context);
        }

        let Some(data) = self.buffers.get_mut(param_buffer) else {
            error!(frame, buffer = param_buffer, "parameter buffer not mapped");
            return Vec::new();
        };
        if let Err(error) = params::assemble(&self.context, data) {
            error!(%error, frame, "parameter assembly failed");
            return Vec::new();
        }

        if let Some(info) = self.frames.find(frame) {
            info.param_filled = true;
        }
        debug!(frame, buffer = param_buffer, "parameters filled");
        vec![IpaAction::ParamsFilled { frame }]
    }

    fn stats_ready(&mut self, frame: u64, buffer: u32, timestamp_us: u64) -> Vec<IpaAction> {
        let Some(info) = self.frames.find(frame) else {
            warn!(frame, "statistics for unknown frame");
            return Vec::new();
        };
        if info.stat_buffer != buffer {
            warn!(
                frame,
                expected = info.stat_buffer,
                got = buffer,
                "statistics buffer id mismatch"
            );
        }
        let stat_buffer = info.stat_buffer;
        self.context.frame = info.context.clone();

        // Parse and extract inside a scope so the mapping borrow ends
        // before the algorithms run.
        let extracted = {
            let Some(data) = self.buffers.get(stat_buffer) else {
                error!(frame, buffer = stat_buffer, "statistics buffer not mapped");
                return self.finish_frame(frame);
            };
            match StatsView::new(data, self.revision) {
                Ok(view) if view.has(MEAS_AWB) => {
                    if let Some(brightness) = view.ae_brightness() {
                        debug!(frame, brightness, "AE mean brightness");
                    }
                    let sequence = view.sequence();
                    let cells = view.awb_cells(&self.context.session.grid);
                    let focus = view.focus_regions();
                    Some((sequence, cells, focus))
                }
                Ok(_) => {
                    warn!(frame, "statistics lack AWB measurements, keeping outputs");
                    None
                }
                Err(error) => {
                    warn!(%error, frame, "invalid statistics, keeping outputs");
                    None
                }
            }
        };

        // Unusable statistics still complete the frame, with the
        // algorithms keeping their previous outputs.
        let Some((sequence, cells, focus)) = extracted else {
            return self.finish_frame(frame);
        };

        debug!(frame, sequence, timestamp_us, "processing statistics");

        self.context.frame.sensor_sequence = sequence;

        // What the sensor actually applied to this frame.
        let effective = self.delayed.get(sequence);
        if let Some(lines) = effective.get(SensorControlId::Exposure) {
            self.context.frame.effective_shutter =
                self.context.session.line_duration * lines.max(0) as u32;
        }
        if let Some(code) = effective.get(SensorControlId::AnalogueGain) {
            self.context.frame.effective_gain = self.helper.gain(code.max(0) as u32);
        }

        let stats = zones::extract(
            &cells,
            focus,
            &self.context.session.grid,
            self.tuning.stats.saturation_ratio_max,
        );

        for algorithm in self.algorithms.each_mut() {
            algorithm.process(&mut self.context, &stats);
        }

        if self.context.agc.update_sensor {
            let controls = self.sensor_controls();
            if !self.delayed.push(&controls) {
                warn!(frame, "sensor control push rejected");
            }
            self.context.agc.update_sensor = false;
        }

        self.finish_frame(frame)
    }

    /// The sensor control list for the current AGC result.
    fn sensor_controls(&self) -> ControlList {
        let agc = &self.context.agc;
        let mut controls = ControlList::new();
        controls.set(SensorControlId::Exposure, agc.exposure_lines as i32);
        controls.set(
            SensorControlId::AnalogueGain,
            self.helper.gain_code(agc.analogue_gain) as i32,
        );
        controls.set(SensorControlId::Vblank, self.context.session.vblank as i32);
        controls
    }

    fn finish_frame(&mut self, frame: u64) -> Vec<IpaAction> {
        let metadata = self.context.metadata(self.frames.depth() as u32);

        if let Some(info) = self.frames.find(frame) {
            info.metadata_done = true;
            // Statistics only exist once the ISP consumed the frame's
            // parameters, so the parameter buffer is free again too.
            info.param_dequeued = true;
        }
        self.frames.try_complete(frame);

        vec![IpaAction::MetadataReady { frame, metadata }]
    }
}

/// Overlay the fields `update` carries onto `active`.
fn merge_controls(active: &mut RequestControls, update: &RequestControls) {
    macro_rules! merge {
        ($($field:ident),* $(,)?) => {
            $(if update.$field.is_some() {
                active.$field = update.$field;
            })*
        };
    }
    merge!(
        ae_enable,
        ae_constraint_mode,
        ae_exposure_mode,
        ae_metering_mode,
        ae_exposure_value,
        analogue_gain,
        exposure_time_us,
        awb_enable,
        awb_mode,
        colour_gains,
        brightness,
        contrast,
        saturation,
        sharpness,
        noise_reduction,
    );

    // Zero is the documented "return to auto" value for the manual
    // exposure controls.
    if update.exposure_time_us == Some(0) {
        active.exposure_time_us = None;
    }
    if let Some(gain) = update.analogue_gain {
        if gain == 0.0 {
            active.analogue_gain = None;
        }
    }
}
