use std::time::Duration;

use crate::controls::{ControlList, SensorControlId};
use crate::error::Result;
use crate::geometry::Size;

/// Static description of the camera sensor driving the ISP.
#[derive(Clone, Debug)]
pub struct CameraSensorInfo {
    pub model: String,
    /// Size of the raw frames handed to the ISP.
    pub output_size: Size,
    /// Pixel clock in Hz.
    pub pixel_rate: u64,
    /// Total line length in pixel clocks, blanking included.
    pub line_length: u32,
}

impl CameraSensorInfo {
    /// Readout time of a single sensor row.
    pub fn line_duration(&self) -> Duration {
        Duration::from_nanos(self.line_length as u64 * 1_000_000_000 / self.pixel_rate)
    }
}

/// Analogue gain response of a sensor.
///
/// `Linear` covers sensors whose gain is the ratio of two affine functions
/// of the gain code; `Exponential` covers sensors with a fixed dB step per
/// code increment.
#[derive(Clone, Copy, Debug)]
pub enum GainModel {
    Linear { m0: f64, c0: f64, m1: f64, c1: f64 },
    Exponential { a: f64, m: f64 },
}

/// Converts between real analogue gains and sensor gain codes.
#[derive(Clone, Copy, Debug)]
pub struct SensorHelper {
    model: GainModel,
}

impl SensorHelper {
    pub fn new(model: GainModel) -> Self {
        Self { model }
    }

    /// Look up the helper for a sensor model name.
    ///
    /// Unknown sensors fall back to the common 1/16th-step linear model
    /// rather than failing: bring-up on a new module should not require a
    /// helper entry to produce an image.
    pub fn for_model(name: &str) -> Self {
        let model = match name {
            "imx219" | "imx258" => GainModel::Linear {
                m0: 0.0,
                c0: 256.0,
                m1: -1.0,
                c1: 256.0,
            },
            "ov5670" | "ov5693" => GainModel::Linear {
                m0: 1.0,
                c0: 0.0,
                m1: 0.0,
                c1: 128.0,
            },
            _ => GainModel::Linear {
                m0: 1.0,
                c0: 0.0,
                m1: 0.0,
                c1: 16.0,
            },
        };
        Self { model }
    }

    /// Real gain for a sensor gain code.
    pub fn gain(&self, code: u32) -> f64 {
        let code = code as f64;
        match self.model {
            GainModel::Linear { m0, c0, m1, c1 } => (m0 * code + c0) / (m1 * code + c1),
            GainModel::Exponential { a, m } => a * m.powf(code),
        }
    }

    /// Sensor gain code approximating a real gain, rounded to the nearest
    /// representable code.
    pub fn gain_code(&self, gain: f64) -> u32 {
        let code = match self.model {
            GainModel::Linear { m0, c0, m1, c1 } => (c0 - c1 * gain) / (m1 * gain - m0),
            GainModel::Exponential { a, m } => (gain / a).ln() / m.ln(),
        };
        code.round().max(0.0) as u32
    }
}

/// The sensor subdevice the delayed-controls shim programs.
///
/// Implementations wrap the actual kernel device; tests substitute a
/// recording double.
pub trait SensorDevice: Send + Sync {
    /// Read the current value of each requested control.
    fn get_controls(&self, ids: &[SensorControlId]) -> Result<ControlList>;

    /// Program the given control values.
    fn set_controls(&self, controls: &ControlList) -> Result<()>;
}
