//! Frozen byte layout of the driver's statistics and parameter buffers.
//!
//! Both buffers are fixed-size blobs; every offset below is in bytes from
//! the start of the mapping. All multi-byte fields are host-endian. The
//! layout is versioned by the hardware revision reported at init; only the
//! revisions listed here are accepted.

use crate::consts::GRID_CELLS_MAX;
use crate::error::{IrisError, Result};

/// Supported ISP hardware revisions.
///
/// V12 widened the AE mean grid from 5x5 to 9x9 cells; everything else is
/// layout-identical.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HwRevision {
    V10,
    V12,
}

impl HwRevision {
    pub fn from_raw(raw: u32) -> Result<Self> {
        match raw {
            10 => Ok(HwRevision::V10),
            12 => Ok(HwRevision::V12),
            other => Err(IrisError::UnsupportedHardware(other)),
        }
    }

    /// Cells in the AE exposure-mean block.
    pub fn ae_mean_cells(&self) -> usize {
        match self {
            HwRevision::V10 => 25,
            HwRevision::V12 => 81,
        }
    }
}

/// Measurement-type bits in the statistics header.
pub const MEAS_AWB: u32 = 1 << 0;
pub const MEAS_AE: u32 = 1 << 1;
pub const MEAS_HIST: u32 = 1 << 2;
pub const MEAS_AF: u32 = 1 << 3;

pub const STATS_MEAS_TYPE_OFFSET: usize = 0;
pub const STATS_SEQUENCE_OFFSET: usize = 4;
pub const STATS_AE_MEAN_OFFSET: usize = 8;

/// Per-cell AWB record: gr, r, b, gb averages, saturation ratio, 3 pad.
pub const AWB_CELL_SIZE: usize = 8;

/// Focus statistics: 4 regions of (contrast_val, contrast_val_num).
pub const FOCUS_REGION_SIZE: usize = 8;

pub const HIST_BINS: usize = 256;

fn align4(n: usize) -> usize {
    (n + 3) & !3
}

pub fn stats_af_offset(rev: HwRevision) -> usize {
    STATS_AE_MEAN_OFFSET + align4(rev.ae_mean_cells())
}

pub fn stats_awb_offset(rev: HwRevision) -> usize {
    stats_af_offset(rev) + crate::consts::FOCUS_REGIONS * FOCUS_REGION_SIZE
}

pub fn stats_hist_offset(rev: HwRevision) -> usize {
    stats_awb_offset(rev) + GRID_CELLS_MAX * AWB_CELL_SIZE
}

/// Total statistics buffer size for a revision.
pub fn stats_size(rev: HwRevision) -> usize {
    stats_hist_offset(rev) + HIST_BINS * 4
}

/// ISP processing modules addressed by the parameter buffer bitmasks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IspModule {
    AwbMeas = 0,
    AwbGain = 1,
    Aec = 2,
    Hst = 3,
    Bls = 4,
    Ccm = 5,
    Cproc = 6,
    Bnr = 7,
    Lsc = 8,
    Dpcc = 9,
    Flt = 10,
    Dpf = 11,
    DpfStrength = 12,
    Goc = 13,
    Ie = 14,
    Bdm = 15,
}

impl IspModule {
    pub fn bit(&self) -> u32 {
        1 << (*self as u32)
    }
}

pub const PARAMS_EN_UPDATE_OFFSET: usize = 0;
pub const PARAMS_ENS_OFFSET: usize = 4;
pub const PARAMS_CFG_UPDATE_OFFSET: usize = 8;

/// Module payload offsets. Payloads are laid out back to back, 4-aligned.
pub const AWB_MEAS_OFFSET: usize = 12; // mode + grid descriptor, 7 x u32
pub const AWB_GAIN_OFFSET: usize = 40; // green_r, red, blue, green_b, 4 x u32
pub const AEC_OFFSET: usize = 56; // metering window, 4 x u32
pub const HST_OFFSET: usize = 72; // 35 cell weights, padded to 36
pub const BLS_OFFSET: usize = 108; // per-channel levels, 4 x u32
pub const CCM_OFFSET: usize = 124; // 3x3 coeffs + 3 offsets, 12 x i32
pub const CPROC_OFFSET: usize = 172; // contrast, brightness, saturation, hue
pub const BNR_OFFSET: usize = 176; // per-channel thresholds, 4 x u32
pub const LSC_OFFSET: usize = 192; // corner gradients, 4 x u32
pub const DPCC_OFFSET: usize = 208; // mode + 2 thresholds, 3 x u32
pub const FLT_OFFSET: usize = 220; // denoise + sharpen levels, 2 x u32
pub const DPF_OFFSET: usize = 228; // gain + 3 spatial coeffs, 4 x u32
pub const DPF_STRENGTH_OFFSET: usize = 244; // r, g, b, padded to 4
pub const GOC_OFFSET: usize = 248; // 256 x u16 gamma LUT
pub const IE_OFFSET: usize = 760; // effect selector
pub const BDM_OFFSET: usize = 764; // demosaic threshold

/// Total parameter buffer size.
pub const PARAMS_SIZE: usize = 768;

pub const HST_WEIGHT_CELLS: usize = 35;
pub const GOC_LUT_ENTRIES: usize = 256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_packed_and_aligned() {
        assert_eq!(AWB_MEAS_OFFSET + 28, AWB_GAIN_OFFSET);
        assert_eq!(AWB_GAIN_OFFSET + 16, AEC_OFFSET);
        assert_eq!(AEC_OFFSET + 16, HST_OFFSET);
        assert_eq!(HST_OFFSET + 36, BLS_OFFSET);
        assert_eq!(BLS_OFFSET + 16, CCM_OFFSET);
        assert_eq!(CCM_OFFSET + 48, CPROC_OFFSET);
        assert_eq!(CPROC_OFFSET + 4, BNR_OFFSET);
        assert_eq!(BNR_OFFSET + 16, LSC_OFFSET);
        assert_eq!(LSC_OFFSET + 16, DPCC_OFFSET);
        assert_eq!(DPCC_OFFSET + 12, FLT_OFFSET);
        assert_eq!(FLT_OFFSET + 8, DPF_OFFSET);
        assert_eq!(DPF_OFFSET + 16, DPF_STRENGTH_OFFSET);
        assert_eq!(DPF_STRENGTH_OFFSET + 4, GOC_OFFSET);
        assert_eq!(GOC_OFFSET + 2 * GOC_LUT_ENTRIES, IE_OFFSET);
        assert_eq!(IE_OFFSET + 4, BDM_OFFSET);
        assert_eq!(BDM_OFFSET + 4, PARAMS_SIZE);
    }

    #[test]
    fn stats_sections_do_not_overlap() {
        for rev in [HwRevision::V10, HwRevision::V12] {
            assert!(stats_af_offset(rev) >= STATS_AE_MEAN_OFFSET + rev.ae_mean_cells());
            assert!(stats_awb_offset(rev) > stats_af_offset(rev));
            assert!(stats_hist_offset(rev) > stats_awb_offset(rev));
            assert_eq!(stats_size(rev), stats_hist_offset(rev) + HIST_BINS * 4);
        }
    }

    #[test]
    fn unknown_revision_is_rejected() {
        assert!(HwRevision::from_raw(10).is_ok());
        assert!(HwRevision::from_raw(12).is_ok());
        assert!(matches!(
            HwRevision::from_raw(11),
            Err(IrisError::UnsupportedHardware(11))
        ));
    }
}
