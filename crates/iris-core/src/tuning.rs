use serde::{Deserialize, Serialize};

/// Tuning values for the control loop, loadable from TOML.
///
/// Every section has defaults good enough for bring-up on an unknown
/// module; production platforms ship a tuned file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Tuning {
    #[serde(default)]
    pub agc: AgcTuning,
    #[serde(default)]
    pub awb: AwbTuning,
    #[serde(default)]
    pub af: AfTuning,
    #[serde(default)]
    pub contrast: ContrastTuning,
    #[serde(default)]
    pub stats: StatsTuning,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgcTuning {
    /// Normalized luma the loop converges towards.
    pub relative_luma_target: f64,
    /// Shutter limits in microseconds.
    pub shutter_min_us: u64,
    pub shutter_max_us: u64,
    /// Analogue gain limits as real gains.
    pub gain_min: f64,
    pub gain_max: f64,
    /// Base smoothing factor of the exposure filter.
    pub filter_speed: f64,
    /// Frames at startup during which filtering is bypassed.
    pub startup_frames: u64,
}

impl Default for AgcTuning {
    fn default() -> Self {
        Self {
            relative_luma_target: 0.4,
            shutter_min_us: 100,
            shutter_max_us: 33_000,
            gain_min: 1.0,
            gain_max: 8.0,
            filter_speed: 0.2,
            startup_frames: 10,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AwbTuning {
    /// Zones needed before the grey-world estimate replaces the last one.
    pub min_valid_zones: usize,
}

impl Default for AwbTuning {
    fn default() -> Self {
        Self { min_valid_zones: 10 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AfTuning {
    /// VCM units advanced per coarse scan frame.
    pub coarse_step: u32,
    /// VCM units advanced per fine scan frame.
    pub fine_step: u32,
    /// Half-width of the fine scan window around the coarse best, as a
    /// fraction of the coarse best position.
    pub fine_range: f64,
    /// Contrast drift ratio above which a locked lens rescans.
    pub max_change: f64,
    /// VCM travel limits.
    pub position_min: u32,
    pub position_max: u32,
}

impl Default for AfTuning {
    fn default() -> Self {
        Self {
            coarse_step: 30,
            fine_step: 1,
            fine_range: 0.05,
            max_change: 0.5,
            position_min: 0,
            position_max: 1023,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContrastTuning {
    /// Default gamma exponent applied through the LUT.
    pub gamma: f64,
}

impl Default for ContrastTuning {
    fn default() -> Self {
        Self { gamma: 1.1 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatsTuning {
    /// Cells whose saturation ratio exceeds this are not accumulated.
    pub saturation_ratio_max: u8,
}

impl Default for StatsTuning {
    fn default() -> Self {
        Self {
            saturation_ratio_max: (255 * 20 / 100) as u8,
        }
    }
}
