//! Mean-based automatic exposure and gain control.
//!
//! Each frame the algorithm estimates the relative luma the sensor saw,
//! derives the total exposure (shutter x gain) needed to hit the target,
//! smooths it, and splits it back into shutter time and analogue gain,
//! shutter first.

use std::time::Duration;

use tracing::debug;

use crate::consts::PIPELINE_MAX;
use crate::context::{AgcResult, IpaContext};
use crate::error::Result;
use crate::stats::zones::{metering_weights, FrameStats};
use crate::tuning::Tuning;

use super::contrast::{GAMMA_MAX, GAMMA_MIN};
use super::Algorithm;

/// Iterations of the gain refinement loop.
const GAIN_ITERATIONS: usize = 8;

/// Largest single-iteration gain amplification.
const GAIN_STEP_MAX: f64 = 10.0;

/// Refinement stops once the incremental gain falls below this.
const GAIN_SETTLED: f64 = 1.01;

/// Relative luma error under which the loop reports convergence.
const CONVERGED_ERROR: f64 = 0.01;

pub struct Agc {
    luma_target: f64,
    min_shutter: Duration,
    max_shutter: Duration,
    min_gain: f64,
    max_gain: f64,
    filter_speed: f64,
    startup_frames: u64,

    filtered_exposure: Duration,
    frame_count: u64,
}

impl Agc {
    pub fn new() -> Self {
        let defaults = Tuning::default();
        Self {
            luma_target: defaults.agc.relative_luma_target,
            min_shutter: Duration::from_micros(defaults.agc.shutter_min_us),
            max_shutter: Duration::from_micros(defaults.agc.shutter_max_us),
            min_gain: defaults.agc.gain_min,
            max_gain: defaults.agc.gain_max,
            filter_speed: defaults.agc.filter_speed,
            startup_frames: defaults.agc.startup_frames,
            filtered_exposure: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Weighted relative luma of the frame, with `gain` applied to the
    /// accumulated sums. Channel sums saturate at the pipeline maximum the
    /// way the real pixels would, so the estimate stays honest for gains
    /// that would clip.
    ///
    /// Returns `None` when no weighted cell was counted.
    fn compute_initial_y(&self, context: &IpaContext, stats: &FrameStats, gain: f64) -> Option<f64> {
        let weights = metering_weights(context.frame.metering);

        let mut red_sum = 0.0;
        let mut green_sum = 0.0;
        let mut blue_sum = 0.0;
        let mut pixel_sum = 0.0;
        for (region, weight) in stats.regions.iter().zip(weights.iter()) {
            let counted = region.counted as f64;
            let ceiling = PIPELINE_MAX as f64 * counted;
            red_sum += (region.r_sum as f64 * gain).min(ceiling) * weight;
            green_sum += (region.g_sum as f64 * gain).min(ceiling) * weight;
            blue_sum += (region.b_sum as f64 * gain).min(ceiling) * weight;
            pixel_sum += counted * weight;
        }

        if pixel_sum == 0.0 {
            return None;
        }

        let awb = &context.awb;
        let y_sum = red_sum * awb.red_gain * 0.299
            + green_sum * awb.green_gain * 0.587
            + blue_sum * awb.blue_gain * 0.114;

        Some(y_sum / pixel_sum / PIPELINE_MAX as f64)
    }

    /// Iteratively find the extra gain that brings the measured luma to
    /// the target.
    fn compute_gain(&self, context: &IpaContext, stats: &FrameStats, target: f64) -> f64 {
        let mut current_gain = 1.0;
        for _ in 0..GAIN_ITERATIONS {
            let initial_y = self.compute_initial_y(context, stats, current_gain).unwrap_or_else(|| {
                // Blind frame: read the histogram instead, which reports
                // fully bright when empty and pulls exposure down.
                stats.histogram.inter_quantile_mean(0.0, 1.0) / PIPELINE_MAX as f64
            });
            let extra_gain = GAIN_STEP_MAX.min(target / (initial_y + 0.001));
            current_gain *= extra_gain;
            if extra_gain < GAIN_SETTLED {
                break;
            }
        }
        current_gain
    }

    /// Tone-curve exponent for the scene: the narrower the luma spread,
    /// the more midtone lift the tone curve applies. None when the
    /// histogram carries no counts.
    fn compute_scene_gamma(&self, stats: &FrameStats) -> Option<f64> {
        let histogram = &stats.histogram;
        if histogram.total() == 0 {
            return None;
        }
        let spread = (histogram.quantile(0.98) - histogram.quantile(0.02))
            / (histogram.bins() as f64 - 1.0);
        Some((GAMMA_MAX - (GAMMA_MAX - GAMMA_MIN) * spread).clamp(GAMMA_MIN, GAMMA_MAX))
    }

    /// Exponential smoothing towards the target exposure. Startup frames
    /// pass straight through; near the target the filter speeds up to
    /// avoid a long tail of micro-adjustments.
    fn filter_exposure(&mut self, target: Duration) {
        let mut speed = self.filter_speed;
        if self.frame_count < self.startup_frames {
            speed = 1.0;
        } else {
            let prev = self.filtered_exposure.as_secs_f64();
            let tgt = target.as_secs_f64();
            if prev > 0.8 * tgt && prev < 1.2 * tgt {
                speed = speed.sqrt();
            }
        }
        self.filtered_exposure = Duration::from_secs_f64(
            target.as_secs_f64() * speed + self.filtered_exposure.as_secs_f64() * (1.0 - speed),
        );
    }

    /// Split the filtered exposure into shutter and gain: shutter runs to
    /// its maximum before gain rises above its minimum.
    fn divide_exposure(&self) -> (Duration, f64) {
        let exposure = self.filtered_exposure.as_secs_f64();
        let shutter = (exposure / self.min_gain)
            .clamp(self.min_shutter.as_secs_f64(), self.max_shutter.as_secs_f64());
        let gain = (exposure / shutter).clamp(self.min_gain, self.max_gain);
        (Duration::from_secs_f64(shutter), gain)
    }

    fn lines_for(&self, shutter: Duration, context: &IpaContext) -> u32 {
        let line = context.session.line_duration.as_nanos().max(1);
        let lines = (shutter.as_nanos() / line) as u32;
        lines.clamp(
            context.session.min_exposure_lines,
            context.session.max_exposure_lines,
        )
    }
}

impl Default for Agc {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for Agc {
    fn configure(&mut self, context: &mut IpaContext, tuning: &Tuning) -> Result<()> {
        self.luma_target = tuning.agc.relative_luma_target;
        self.min_gain = tuning.agc.gain_min.max(context.session.min_gain);
        self.max_gain = tuning.agc.gain_max.min(context.session.max_gain);
        self.min_shutter = Duration::from_micros(tuning.agc.shutter_min_us)
            .max(context.session.min_shutter());
        self.max_shutter = Duration::from_micros(tuning.agc.shutter_max_us)
            .min(context.session.max_shutter());
        self.filter_speed = tuning.agc.filter_speed;
        self.startup_frames = tuning.agc.startup_frames;
        self.filtered_exposure = Duration::ZERO;
        self.frame_count = 0;

        context.agc = AgcResult {
            exposure_lines: context.session.max_exposure_lines,
            analogue_gain: self.min_gain,
            filtered_exposure: Duration::ZERO,
            converged: false,
            update_sensor: true,
            scene_gamma: None,
        };
        Ok(())
    }

    fn process(&mut self, context: &mut IpaContext, stats: &FrameStats) {
        let frame = &context.frame;

        if !frame.ae_enable {
            // Manual operation: program exactly what the application
            // asked for and keep the filter state untouched so re-enabling
            // AE resumes from where the scene last was.
            let manual_lines = frame.manual_exposure_lines;
            let manual_gain = frame.manual_gain;
            if manual_lines.is_some() || manual_gain.is_some() {
                let agc = &mut context.agc;
                if let Some(lines) = manual_lines {
                    agc.exposure_lines = lines.clamp(
                        context.session.min_exposure_lines,
                        context.session.max_exposure_lines,
                    );
                }
                if let Some(gain) = manual_gain {
                    agc.analogue_gain = gain.clamp(self.min_gain, self.max_gain);
                }
                agc.converged = false;
                agc.update_sensor = true;
            }
            return;
        }

        let target = self.luma_target * frame.target_multiplier;
        let effective = frame.effective_shutter.as_secs_f64() * frame.effective_gain;

        let gain = self.compute_gain(context, stats, target);

        // Total exposure needed, bounded by what the sensor can deliver.
        let max_total = self.max_shutter.as_secs_f64() * self.max_gain;
        let target_exposure = Duration::from_secs_f64((effective * gain).min(max_total));

        self.filter_exposure(target_exposure);
        self.frame_count += 1;

        let (shutter, analogue_gain) = self.divide_exposure();
        let exposure_lines = self.lines_for(shutter, context);

        let converged = target_exposure > Duration::ZERO
            && (self.filtered_exposure.as_secs_f64() / target_exposure.as_secs_f64() - 1.0).abs()
                < CONVERGED_ERROR;

        let changed = exposure_lines != context.agc.exposure_lines
            || (analogue_gain - context.agc.analogue_gain).abs() > f64::EPSILON;

        // A blind frame keeps the previous tone-curve suggestion.
        let scene_gamma = self
            .compute_scene_gamma(stats)
            .or(context.agc.scene_gamma);

        context.agc = AgcResult {
            exposure_lines,
            analogue_gain,
            filtered_exposure: self.filtered_exposure,
            converged,
            update_sensor: changed,
            scene_gamma,
        };

        debug!(
            frame = frame.frame,
            gain,
            target_us = target_exposure.as_micros() as u64,
            filtered_us = self.filtered_exposure.as_micros() as u64,
            exposure_lines,
            analogue_gain,
            converged,
            "exposure updated"
        );
    }
}
