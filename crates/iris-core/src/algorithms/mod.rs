//! The 3A algorithms and the hooks the orchestrator drives them through.

pub mod af;
pub mod agc;
pub mod awb;
pub mod contrast;

use crate::context::IpaContext;
use crate::controls::RequestControls;
use crate::error::Result;
use crate::stats::zones::FrameStats;
use crate::tuning::Tuning;

/// Hooks every algorithm exposes to the frame loop.
///
/// All hooks default to no-ops so an algorithm only implements the phases
/// it participates in. Hooks borrow the context for the duration of one
/// call; implementations must not retain references into it or into the
/// statistics across frames.
pub trait Algorithm: Send {
    /// Adopt the session configuration before streaming starts.
    fn configure(&mut self, _context: &mut IpaContext, _tuning: &Tuning) -> Result<()> {
        Ok(())
    }

    /// React to application controls attached to a request.
    fn queue_request(&mut self, _context: &mut IpaContext, _controls: &RequestControls) {}

    /// Publish state needed by the parameter assembler for the next frame.
    fn prepare(&mut self, _context: &mut IpaContext) {}

    /// Consume the statistics of a completed frame.
    fn process(&mut self, _context: &mut IpaContext, _stats: &FrameStats) {}
}

/// The algorithm instances, owned by the orchestrator and run in a fixed
/// order: AGC first, then AWB, contrast, AF.
///
/// Construction is explicit; there is no registration machinery and the
/// order never changes at runtime.
pub struct Algorithms {
    pub agc: agc::Agc,
    pub awb: awb::Awb,
    pub contrast: contrast::Contrast,
    pub af: af::Af,
}

impl Algorithms {
    pub fn new() -> Self {
        Self {
            agc: agc::Agc::new(),
            awb: awb::Awb::new(),
            contrast: contrast::Contrast::new(),
            af: af::Af::new(),
        }
    }

    /// The algorithms in processing order.
    pub fn each_mut(&mut self) -> [&mut dyn Algorithm; 4] {
        [
            &mut self.agc,
            &mut self.awb,
            &mut self.contrast,
            &mut self.af,
        ]
    }
}

impl Default for Algorithms {
    fn default() -> Self {
        Self::new()
    }
}
