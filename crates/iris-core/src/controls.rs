//! Sensor and application control definitions.
//!
//! The sensor side is a small closed set of integer V4L2-style controls the
//! loop programs through the delayed-controls shim. The application side is
//! a typed per-request control struct and a typed per-frame metadata struct;
//! the set of exchanged keys is closed and known at compile time.

/// Controls the loop may program on the camera sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SensorControlId {
    Exposure,
    AnalogueGain,
    Vblank,
}

impl SensorControlId {
    pub const ALL: [SensorControlId; 3] = [
        SensorControlId::Exposure,
        SensorControlId::AnalogueGain,
        SensorControlId::Vblank,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SensorControlId::Exposure => "EXPOSURE",
            SensorControlId::AnalogueGain => "ANALOGUE_GAIN",
            SensorControlId::Vblank => "VBLANK",
        }
    }
}

impl std::fmt::Display for SensorControlId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Inclusive value range a sensor reports for one of its controls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControlRange {
    pub min: i32,
    pub max: i32,
    pub default: i32,
}

impl ControlRange {
    pub fn new(min: i32, max: i32, default: i32) -> Self {
        Self { min, max, default }
    }
}

/// The control ranges reported by the sensor subdevice at configure time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SensorControlRanges {
    pub exposure: Option<ControlRange>,
    pub analogue_gain: Option<ControlRange>,
    pub vblank: Option<ControlRange>,
}

impl SensorControlRanges {
    pub fn get(&self, id: SensorControlId) -> Option<ControlRange> {
        match id {
            SensorControlId::Exposure => self.exposure,
            SensorControlId::AnalogueGain => self.analogue_gain,
            SensorControlId::Vblank => self.vblank,
        }
    }
}

/// An ordered list of sensor control values.
///
/// Insertion order is preserved so the values reach the device in the order
/// they were set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlList {
    entries: Vec<(SensorControlId, i32)>,
}

impl ControlList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `id` to `value`, replacing any previous entry for `id`.
    pub fn set(&mut self, id: SensorControlId, value: i32) {
        match self.entries.iter_mut().find(|(eid, _)| *eid == id) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((id, value)),
        }
    }

    pub fn get(&self, id: SensorControlId) -> Option<i32> {
        self.entries
            .iter()
            .find(|(eid, _)| *eid == id)
            .map(|(_, v)| *v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SensorControlId, i32)> + '_ {
        self.entries.iter().copied()
    }
}

impl FromIterator<(SensorControlId, i32)> for ControlList {
    fn from_iter<T: IntoIterator<Item = (SensorControlId, i32)>>(iter: T) -> Self {
        let mut list = ControlList::new();
        for (id, value) in iter {
            list.set(id, value);
        }
        list
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AeConstraintMode {
    #[default]
    Normal,
    Highlight,
    Shadows,
    Custom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AeExposureMode {
    #[default]
    Normal,
    Short,
    Long,
    Custom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MeteringMode {
    #[default]
    CentreWeighted,
    Spot,
    Matrix,
    Custom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AwbMode {
    #[default]
    Auto,
    Incandescent,
    Tungsten,
    Fluorescent,
    Indoor,
    Daylight,
    Cloudy,
    Custom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoiseReductionMode {
    Off,
    #[default]
    Fast,
    HighQuality,
    Minimal,
    Zsl,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AfMode {
    #[default]
    Manual,
    Auto,
    Continuous,
}

/// Controls an application may attach to a capture request.
///
/// Every field is optional; an absent field leaves the previous setting in
/// effect. `analogue_gain` of 0.0 and `exposure_time_us` of 0 hand the
/// corresponding value back to the automatic algorithms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestControls {
    pub ae_enable: Option<bool>,
    pub ae_constraint_mode: Option<AeConstraintMode>,
    pub ae_exposure_mode: Option<AeExposureMode>,
    pub ae_metering_mode: Option<MeteringMode>,
    /// Exposure compensation in EV stops; the target multiplier is `2^EV`.
    pub ae_exposure_value: Option<f32>,
    pub analogue_gain: Option<f32>,
    pub exposure_time_us: Option<u32>,
    pub awb_enable: Option<bool>,
    pub awb_mode: Option<AwbMode>,
    /// Manual (red, blue) gains; overrides AWB while present.
    pub colour_gains: Option<(f32, f32)>,
    pub brightness: Option<f32>,
    pub contrast: Option<f32>,
    pub saturation: Option<f32>,
    pub sharpness: Option<f32>,
    pub noise_reduction: Option<NoiseReductionMode>,
}

/// Per-frame result metadata handed back with `MetadataReady`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameMetadata {
    pub frame_duration_us: Option<i64>,
    pub ae_locked: Option<bool>,
    pub af_state: Option<AfMode>,
    /// (red, blue) gains currently applied.
    pub colour_gains: Option<(f32, f32)>,
    pub colour_temperature: Option<u32>,
    pub pipeline_depth: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_list_set_replaces() {
        let mut list = ControlList::new();
        list.set(SensorControlId::Exposure, 100);
        list.set(SensorControlId::Exposure, 200);
        list.set(SensorControlId::AnalogueGain, 4);
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(SensorControlId::Exposure), Some(200));
        assert_eq!(list.get(SensorControlId::Vblank), None);
    }
}
