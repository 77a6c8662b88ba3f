//! Grey-world automatic white balance.

use tracing::{debug, warn};

use crate::consts::{AWB_GAIN_MAX, AWB_GAIN_MIN};
use crate::context::{AwbResult, IpaContext};
use crate::error::Result;
use crate::stats::zones::FrameStats;
use crate::tuning::Tuning;

use super::Algorithm;

/// Per-zone channel averages entering the grey-world estimate.
#[derive(Clone, Copy, Debug)]
struct ZoneRgb {
    r: f64,
    g: f64,
    b: f64,
}

pub struct Awb {
    min_valid_zones: usize,
}

impl Awb {
    pub fn new() -> Self {
        Self { min_valid_zones: 10 }
    }

    /// Estimate the correlated colour temperature of an RGB triple by
    /// projecting it to CIE xy chromaticity and evaluating McCamy's
    /// Planckian-locus approximation.
    pub fn estimate_cct(red: f64, green: f64, blue: f64) -> f64 {
        let x_tri = -0.14282 * red + 1.54924 * green - 0.95641 * blue;
        let y_tri = -0.32466 * red + 1.57837 * green - 0.73191 * blue;
        let z_tri = -0.68202 * red + 0.77073 * green + 0.56332 * blue;

        let x = x_tri / (x_tri + y_tri + z_tri);
        let y = y_tri / (x_tri + y_tri + z_tri);

        let n = (x - 0.3320) / (0.1858 - y);
        449.0 * n * n * n + 3525.0 * n * n + 6823.3 * n + 5520.33
    }

    /// Grey-world gains over a set of zone averages.
    ///
    /// The zones are ranked separately by their G/R and G/B derivatives
    /// and the extreme quartiles discarded, so a saturated colour patch in
    /// a corner cannot drag the whole estimate.
    fn grey_world(zones: &[ZoneRgb]) -> AwbResult {
        let mut red_derivative = zones.to_vec();
        let mut blue_derivative = zones.to_vec();
        red_derivative.sort_by(|a, b| (a.g * b.r).total_cmp(&(b.g * a.r)));
        blue_derivative.sort_by(|a, b| (a.g * b.b).total_cmp(&(b.g * a.b)));

        let discard = zones.len() / 4;
        let kept = zones.len() - 2 * discard;

        let mut sum_red = ZoneRgb { r: 0.0, g: 0.0, b: 0.0 };
        let mut sum_blue = ZoneRgb { r: 0.0, g: 0.0, b: 0.0 };
        for (red_zone, blue_zone) in red_derivative
            .iter()
            .skip(discard)
            .take(kept)
            .zip(blue_derivative.iter().skip(discard).take(kept))
        {
            sum_red.r += red_zone.r;
            sum_red.g += red_zone.g;
            sum_red.b += red_zone.b;
            sum_blue.r += blue_zone.r;
            sum_blue.g += blue_zone.g;
            sum_blue.b += blue_zone.b;
        }

        let red_gain = if sum_red.r == 0.0 {
            AWB_GAIN_MAX
        } else {
            (sum_red.g / sum_red.r).clamp(AWB_GAIN_MIN, AWB_GAIN_MAX)
        };
        let blue_gain = if sum_blue.b == 0.0 {
            AWB_GAIN_MAX
        } else {
            (sum_blue.g / sum_blue.b).clamp(AWB_GAIN_MIN, AWB_GAIN_MAX)
        };

        let kept = kept as f64;
        AwbResult {
            temperature_k: Self::estimate_cct(
                sum_red.r / kept,
                sum_red.g / kept,
                sum_blue.b / kept,
            ),
            red_gain,
            green_gain: 1.0,
            blue_gain,
        }
    }
}

impl Default for Awb {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for Awb {
    fn configure(&mut self, context: &mut IpaContext, tuning: &Tuning) -> Result<()> {
        self.min_valid_zones = tuning.awb.min_valid_zones;
        context.awb = AwbResult::default();
        Ok(())
    }

    fn process(&mut self, context: &mut IpaContext, stats: &FrameStats) {
        if !context.frame.awb_enable || context.frame.manual_colour_gains.is_some() {
            return;
        }

        let zones: Vec<ZoneRgb> = stats
            .valid_zones()
            .filter_map(|zone| zone.averages())
            .map(|(r, g, b)| ZoneRgb { r, g, b })
            .collect();

        if zones.len() < self.min_valid_zones {
            warn!(
                valid = zones.len(),
                needed = self.min_valid_zones,
                "too few valid zones, keeping previous white balance"
            );
            return;
        }

        context.awb = Self::grey_world(&zones);
        debug!(
            red_gain = context.awb.red_gain,
            blue_gain = context.awb.blue_gain,
            temperature_k = context.awb.temperature_k,
            zones = zones.len(),
            "grey-world gains updated"
        );
    }
}
