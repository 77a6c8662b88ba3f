//! Parameter-buffer assembly.
//!
//! Once per frame the orchestrator turns the current algorithm outputs
//! into the hardware configuration blob. The blob is zeroed first, then
//! every module gets its enable-update, enable and config-update bits and
//! its payload. Gains are quantized to the hardware's 8-bit fractional
//! fixed point; out-of-range values clamp, never wrap.

use std::io::Cursor;

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};

use crate::algorithms::contrast::Contrast;
use crate::context::IpaContext;
use crate::controls::NoiseReductionMode;
use crate::error::{IrisError, Result};
use crate::isp::layout::*;

/// 8-bit fractional fixed point: 256 is gain 1.0.
const GAIN_UNITY: f64 = 256.0;
const GAIN_CODE_MIN: f64 = 128.0;
const GAIN_CODE_MAX: f64 = 512.0;

/// CCM coefficients: 128 is 1.0.
const CCM_UNITY: i32 = 128;

/// CPROC contrast/saturation: 128 is 1.0.
const CPROC_UNITY: f64 = 128.0;

/// Fixed black-level subtraction per Bayer channel.
const BLS_LEVEL: u32 = 64;

/// Demosaic texture threshold.
const BDM_THRESHOLD: u32 = 4;

fn gain_code(gain: f64) -> u32 {
    (GAIN_UNITY * gain).clamp(GAIN_CODE_MIN, GAIN_CODE_MAX) as u32
}

/// Write adapter over a mapped parameter buffer.
pub struct ParamsWriter<'a> {
    data: &'a mut [u8],
}

impl<'a> ParamsWriter<'a> {
    pub fn new(data: &'a mut [u8]) -> Result<Self> {
        if data.len() < PARAMS_SIZE {
            return Err(IrisError::InvalidParams {
                expected: PARAMS_SIZE,
                got: data.len(),
            });
        }
        Ok(Self { data })
    }

    fn write_u32(&mut self, offset: usize, value: u32) {
        let mut cursor = Cursor::new(&mut self.data[offset..offset + 4]);
        cursor.write_u32::<NativeEndian>(value).unwrap();
    }

    fn write_i32(&mut self, offset: usize, value: i32) {
        let mut cursor = Cursor::new(&mut self.data[offset..offset + 4]);
        cursor.write_i32::<NativeEndian>(value).unwrap();
    }

    fn write_u16(&mut self, offset: usize, value: u16) {
        let mut cursor = Cursor::new(&mut self.data[offset..offset + 2]);
        cursor.write_u16::<NativeEndian>(value).unwrap();
    }

    fn enable(&mut self, module: IspModule) {
        let bit = module.bit();
        let en_update = self.read_u32(PARAMS_EN_UPDATE_OFFSET) | bit;
        let ens = self.read_u32(PARAMS_ENS_OFFSET) | bit;
        let cfg_update = self.read_u32(PARAMS_CFG_UPDATE_OFFSET) | bit;
        self.write_u32(PARAMS_EN_UPDATE_OFFSET, en_update);
        self.write_u32(PARAMS_ENS_OFFSET, ens);
        self.write_u32(PARAMS_CFG_UPDATE_OFFSET, cfg_update);
    }

    /// Mark a module reconfigured but switched off.
    fn disable(&mut self, module: IspModule) {
        let bit = module.bit();
        let en_update = self.read_u32(PARAMS_EN_UPDATE_OFFSET) | bit;
        self.write_u32(PARAMS_EN_UPDATE_OFFSET, en_update);
    }

    fn read_u32(&self, offset: usize) -> u32 {
        let mut cursor = Cursor::new(&self.data[offset..offset + 4]);
        cursor.read_u32::<NativeEndian>().unwrap()
    }
}

/// Fill `out` with the hardware configuration for the current context.
pub fn assemble(context: &IpaContext, out: &mut [u8]) -> Result<()> {
    let mut writer = ParamsWriter::new(out)?;
    writer.data[..PARAMS_SIZE].fill(0);

    let grid = &context.session.grid;

    // AWB measurement window follows the statistics grid.
    writer.enable(IspModule::AwbMeas);
    writer.write_u32(AWB_MEAS_OFFSET, 2); // RGB measurement mode
    writer.write_u32(AWB_MEAS_OFFSET + 4, grid.width);
    writer.write_u32(AWB_MEAS_OFFSET + 8, grid.height);
    writer.write_u32(AWB_MEAS_OFFSET + 12, grid.block_width_log2);
    writer.write_u32(AWB_MEAS_OFFSET + 16, grid.block_height_log2);
    writer.write_u32(AWB_MEAS_OFFSET + 20, grid.x_start);
    writer.write_u32(AWB_MEAS_OFFSET + 24, grid.y_start);

    // White balance gains, manual gains taking precedence over the
    // algorithm's.
    let (red_gain, blue_gain) = match context.frame.manual_colour_gains {
        Some((red, blue)) => (red as f64, blue as f64),
        None => (context.awb.red_gain, context.awb.blue_gain),
    };
    let green_code = gain_code(context.awb.green_gain);
    writer.enable(IspModule::AwbGain);
    writer.write_u32(AWB_GAIN_OFFSET, green_code);
    writer.write_u32(AWB_GAIN_OFFSET + 4, gain_code(red_gain));
    writer.write_u32(AWB_GAIN_OFFSET + 8, gain_code(blue_gain));
    writer.write_u32(AWB_GAIN_OFFSET + 12, green_code);

    // AE metering window covers the full grid area.
    writer.enable(IspModule::Aec);
    writer.write_u32(AEC_OFFSET, grid.x_start);
    writer.write_u32(AEC_OFFSET + 4, grid.y_start);
    writer.write_u32(AEC_OFFSET + 8, grid.covered_width());
    writer.write_u32(AEC_OFFSET + 12, grid.covered_height());

    // Histogram weights: every cell counts the same.
    writer.enable(IspModule::Hst);
    for i in 0..HST_WEIGHT_CELLS {
        writer.data[HST_OFFSET + i] = 1;
    }

    writer.enable(IspModule::Bls);
    for i in 0..4 {
        writer.write_u32(BLS_OFFSET + 4 * i, BLS_LEVEL);
    }

    // Identity colour correction; a tuned CCM per illuminant would hang
    // off the AWB temperature here.
    writer.enable(IspModule::Ccm);
    for row in 0..3 {
        for col in 0..3 {
            let value = if row == col { CCM_UNITY } else { 0 };
            writer.write_i32(CCM_OFFSET + 4 * (row * 3 + col), value);
        }
    }
    for i in 0..3 {
        writer.write_i32(CCM_OFFSET + 36 + 4 * i, 0);
    }

    // Colour processing from the application's picture controls.
    let frame = &context.frame;
    writer.enable(IspModule::Cproc);
    writer.data[CPROC_OFFSET] =
        (frame.contrast as f64 * CPROC_UNITY).clamp(0.0, 255.0) as u8;
    writer.data[CPROC_OFFSET + 1] = (frame.brightness * 127.0).clamp(-128.0, 127.0) as i8 as u8;
    writer.data[CPROC_OFFSET + 2] =
        (frame.saturation as f64 * CPROC_UNITY).clamp(0.0, 255.0) as u8;
    writer.data[CPROC_OFFSET + 3] = 0; // hue

    // Bayer noise reduction thresholds scale with the requested mode.
    let bnr_strength: u32 = match frame.noise_reduction {
        NoiseReductionMode::Off => 0,
        NoiseReductionMode::Minimal => 4,
        NoiseReductionMode::Fast => 8,
        NoiseReductionMode::HighQuality | NoiseReductionMode::Zsl => 16,
    };
    if bnr_strength == 0 {
        writer.disable(IspModule::Bnr);
    } else {
        writer.enable(IspModule::Bnr);
        for i in 0..4 {
            writer.write_u32(BNR_OFFSET + 4 * i, bnr_strength);
        }
    }

    // Lens shading: flat field until a tuned table exists.
    writer.enable(IspModule::Lsc);
    for i in 0..4 {
        writer.write_u32(LSC_OFFSET + 4 * i, 0);
    }

    writer.enable(IspModule::Dpcc);
    writer.write_u32(DPCC_OFFSET, 1);
    writer.write_u32(DPCC_OFFSET + 4, 8);
    writer.write_u32(DPCC_OFFSET + 8, 16);

    writer.enable(IspModule::Flt);
    writer.write_u32(FLT_OFFSET, bnr_strength);
    writer.write_u32(
        FLT_OFFSET + 4,
        frame.sharpness.clamp(0.0, 16.0) as u32,
    );

    writer.enable(IspModule::Dpf);
    writer.write_u32(DPF_OFFSET, GAIN_UNITY as u32);
    for i in 1..4 {
        writer.write_u32(DPF_OFFSET + 4 * i, 16);
    }

    writer.enable(IspModule::DpfStrength);
    let dpf_strength = bnr_strength.min(255) as u8;
    writer.data[DPF_STRENGTH_OFFSET] = dpf_strength;
    writer.data[DPF_STRENGTH_OFFSET + 1] = dpf_strength;
    writer.data[DPF_STRENGTH_OFFSET + 2] = dpf_strength;

    // Tone mapping LUT from the published gamma.
    writer.enable(IspModule::Goc);
    let lut = Contrast::lut(if context.gamma > 0.0 { context.gamma } else { 1.0 });
    for (i, entry) in lut.iter().enumerate() {
        writer.write_u16(GOC_OFFSET + 2 * i, *entry);
    }

    writer.enable(IspModule::Ie);
    writer.write_u32(IE_OFFSET, 0);

    writer.enable(IspModule::Bdm);
    writer.write_u32(BDM_OFFSET, BDM_THRESHOLD);

    Ok(())
}

/// Read adapter used to decode an assembled blob.
pub struct ParamsReader<'a> {
    data: &'a [u8],
}

impl<'a> ParamsReader<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.len() < PARAMS_SIZE {
            return Err(IrisError::InvalidParams {
                expected: PARAMS_SIZE,
                got: data.len(),
            });
        }
        Ok(Self { data })
    }

    pub fn read_u32(&self, offset: usize) -> u32 {
        let mut cursor = Cursor::new(&self.data[offset..offset + 4]);
        cursor.read_u32::<NativeEndian>().unwrap()
    }

    pub fn read_u16(&self, offset: usize) -> u16 {
        let mut cursor = Cursor::new(&self.data[offset..offset + 2]);
        cursor.read_u16::<NativeEndian>().unwrap()
    }

    pub fn module_ens(&self) -> u32 {
        self.read_u32(PARAMS_ENS_OFFSET)
    }

    pub fn module_en_update(&self) -> u32 {
        self.read_u32(PARAMS_EN_UPDATE_OFFSET)
    }

    pub fn module_cfg_update(&self) -> u32 {
        self.read_u32(PARAMS_CFG_UPDATE_OFFSET)
    }

    pub fn is_enabled(&self, module: IspModule) -> bool {
        self.module_ens() & module.bit() != 0
    }

    /// (green_r, red, blue, green_b) gain codes.
    pub fn awb_gains(&self) -> (u32, u32, u32, u32) {
        (
            self.read_u32(AWB_GAIN_OFFSET),
            self.read_u32(AWB_GAIN_OFFSET + 4),
            self.read_u32(AWB_GAIN_OFFSET + 8),
            self.read_u32(AWB_GAIN_OFFSET + 12),
        )
    }

    pub fn gamma_lut(&self) -> [u16; GOC_LUT_ENTRIES] {
        let mut lut = [0u16; GOC_LUT_ENTRIES];
        for (i, entry) in lut.iter_mut().enumerate() {
            *entry = self.read_u16(GOC_OFFSET + 2 * i);
        }
        lut
    }
}
