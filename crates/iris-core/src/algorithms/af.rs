//! Contrast-detection autofocus.
//!
//! A hill-climbing scan over the VCM travel: a coarse pass finds the
//! neighbourhood of the contrast peak, a fine pass walks it at single-step
//! resolution, and the lens locks on the best position found. A locked
//! lens rescans when the scene contrast drifts too far from the value it
//! locked at.

use tracing::{debug, info};

use crate::context::{AfStatus, IpaContext};
use crate::controls::AfMode;
use crate::error::Result;
use crate::geometry::Rectangle;
use crate::stats::zones::FrameStats;
use crate::tuning::Tuning;

use super::Algorithm;

/// Scan phases of the focus state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AfState {
    Idle,
    CoarseScan,
    FineScan,
    Locked,
}

pub struct Af {
    mode: AfMode,
    state: AfState,
    triggered: bool,

    focus: u32,
    best_focus: u32,
    max_contrast: f64,
    prev_contrast: f64,

    low_step: u32,
    high_step: u32,
    max_step: u32,

    coarse_step: u32,
    fine_step: u32,
    fine_range: f64,
    max_change: f64,
    speed: u32,
    windows: Option<Rectangle>,
}

impl Af {
    pub fn new() -> Self {
        let defaults = Tuning::default().af;
        Self {
            mode: AfMode::Manual,
            state: AfState::Idle,
            triggered: false,
            focus: defaults.position_min,
            best_focus: defaults.position_min,
            max_contrast: 0.0,
            prev_contrast: 0.0,
            low_step: defaults.position_min,
            high_step: defaults.position_max,
            max_step: defaults.position_max,
            coarse_step: defaults.coarse_step,
            fine_step: defaults.fine_step,
            fine_range: defaults.fine_range,
            max_change: defaults.max_change,
            speed: 1,
            windows: None,
        }
    }

    pub fn state(&self) -> AfState {
        self.state
    }

    pub fn lens_position(&self) -> u32 {
        self.focus
    }

    pub fn best_focus(&self) -> u32 {
        self.best_focus
    }

    pub fn set_mode(&mut self, mode: AfMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.reset();
    }

    /// Start a scan; a no-op outside Auto mode or while one is running.
    pub fn trigger(&mut self) {
        if self.mode == AfMode::Auto && self.state == AfState::Idle {
            self.triggered = true;
        }
    }

    /// Abandon any scan in progress and return to idle.
    pub fn cancel(&mut self) {
        self.reset();
    }

    pub fn set_windows(&mut self, windows: Rectangle) {
        self.windows = if windows.is_empty() { None } else { Some(windows) };
    }

    pub fn windows(&self) -> Option<Rectangle> {
        self.windows
    }

    /// Restrict the VCM travel the scans cover.
    pub fn set_range(&mut self, low: u32, high: u32) {
        self.low_step = low;
        self.high_step = high;
        debug!(low, high, "lens range set");
        self.reset();
    }

    pub fn set_speed(&mut self, speed: u32) {
        self.speed = speed.max(1);
    }

    fn reset(&mut self) {
        self.state = AfState::Idle;
        self.triggered = false;
        self.focus = self.low_step;
        self.best_focus = self.low_step;
        self.max_step = self.high_step;
        self.max_contrast = 0.0;
        self.prev_contrast = 0.0;
    }

    fn begin_coarse(&mut self) {
        self.state = AfState::CoarseScan;
        self.focus = self.low_step;
        self.best_focus = self.low_step;
        self.max_step = self.high_step;
        self.max_contrast = 0.0;
        self.prev_contrast = 0.0;
    }

    fn begin_fine(&mut self) {
        let best = self.best_focus;
        let margin = (best as f64 * self.fine_range) as u32;
        self.state = AfState::FineScan;
        self.focus = best.saturating_sub(margin).max(self.low_step);
        self.max_step = best.saturating_add(margin).min(self.high_step);
        self.max_contrast = 0.0;
        self.prev_contrast = 0.0;
    }

    /// One hill-climbing step; `current` is the contrast measured at the
    /// position commanded last frame. The scan keeps walking while the
    /// contrast stays within 90% of the last accepted sample, so a noisy
    /// dip does not end it early. Returns true once the travel is
    /// exhausted or the contrast fell off the peak, with the lens sent
    /// back to the best position seen.
    fn scan(&mut self, current: f64, step: u32) -> bool {
        if self.focus + step > self.max_step {
            self.focus = self.best_focus;
            self.prev_contrast = current;
            return true;
        }

        if current - self.max_contrast >= -(self.max_contrast * 0.1) {
            self.best_focus = self.focus;
            self.focus += step;
            self.max_contrast = current;
            self.prev_contrast = current;
            return false;
        }

        self.focus = self.best_focus;
        self.prev_contrast = current;
        true
    }

    /// Contrast drift ratio relative to the value the lens locked at.
    fn is_out_of_focus(&self, current: f64) -> bool {
        if self.max_contrast == 0.0 {
            return false;
        }
        let ratio = (current - self.max_contrast).abs() / self.max_contrast;
        ratio > self.max_change
    }
}

impl Default for Af {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for Af {
    fn configure(&mut self, context: &mut IpaContext, tuning: &Tuning) -> Result<()> {
        self.coarse_step = tuning.af.coarse_step;
        self.fine_step = tuning.af.fine_step;
        self.fine_range = tuning.af.fine_range;
        self.max_change = tuning.af.max_change;
        self.low_step = tuning.af.position_min;
        self.high_step = tuning.af.position_max;
        self.reset();
        context.af = AfStatus {
            mode: self.mode,
            lens_position: self.focus,
            stable: false,
        };
        Ok(())
    }

    fn process(&mut self, context: &mut IpaContext, stats: &FrameStats) {
        if self.mode == AfMode::Manual {
            context.af = AfStatus {
                mode: self.mode,
                lens_position: self.focus,
                stable: false,
            };
            return;
        }

        let current: f64 = stats.focus.iter().map(|region| region.ratio()).sum();

        // The lens idles at the scan start position, so the frame that
        // starts a scan already carries a usable measurement.
        if self.state == AfState::Idle && (self.mode == AfMode::Continuous || self.triggered) {
            self.triggered = false;
            self.begin_coarse();
        }

        match self.state {
            AfState::Idle => {}
            AfState::CoarseScan => {
                let step = self.coarse_step * self.speed;
                if self.scan(current, step) {
                    self.begin_fine();
                }
            }
            AfState::FineScan => {
                if self.scan(current, self.fine_step) {
                    self.state = AfState::Locked;
                    info!(
                        position = self.best_focus,
                        contrast = self.max_contrast,
                        "focus locked"
                    );
                }
            }
            AfState::Locked => {
                if self.is_out_of_focus(current) {
                    debug!(
                        contrast = current,
                        previous = self.prev_contrast,
                        locked_at = self.max_contrast,
                        "contrast drifted, rescanning"
                    );
                    self.reset();
                } else {
                    self.prev_contrast = current;
                }
            }
        }

        context.af = AfStatus {
            mode: self.mode,
            lens_position: self.focus,
            stable: self.state == AfState::Locked,
        };
    }
}
