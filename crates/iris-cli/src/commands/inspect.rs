use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use iris_core::isp::layout::IspModule;
use iris_core::isp::params::ParamsReader;

#[derive(Args)]
pub struct InspectArgs {
    /// Parameter buffer dump to decode
    pub input: PathBuf,
}

const MODULES: [(IspModule, &str); 16] = [
    (IspModule::AwbMeas, "awb-meas"),
    (IspModule::AwbGain, "awb-gain"),
    (IspModule::Aec, "aec"),
    (IspModule::Hst, "hst"),
    (IspModule::Bls, "bls"),
    (IspModule::Ccm, "ccm"),
    (IspModule::Cproc, "cproc"),
    (IspModule::Bnr, "bnr"),
    (IspModule::Lsc, "lsc"),
    (IspModule::Dpcc, "dpcc"),
    (IspModule::Flt, "flt"),
    (IspModule::Dpf, "dpf"),
    (IspModule::DpfStrength, "dpf-strength"),
    (IspModule::Goc, "goc"),
    (IspModule::Ie, "ie"),
    (IspModule::Bdm, "bdm"),
];

/// Decode a parameter blob and print the enabled modules and the key
/// payload fields.
pub fn run(args: &InspectArgs) -> Result<()> {
    let data = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let reader = ParamsReader::new(&data)
        .with_context(|| "buffer too small for a parameter blob")?;

    println!(
        "masks: en_update={:#06x} ens={:#06x} cfg_update={:#06x}",
        reader.module_en_update(),
        reader.module_ens(),
        reader.module_cfg_update(),
    );

    print!("enabled:");
    for (module, name) in MODULES {
        if reader.is_enabled(module) {
            print!(" {name}");
        }
    }
    println!();

    let (green_r, red, blue, green_b) = reader.awb_gains();
    println!(
        "awb gains (x256): gr={green_r} r={red} b={blue} gb={green_b} \
         (r={:.3} b={:.3})",
        red as f64 / 256.0,
        blue as f64 / 256.0,
    );

    let lut = reader.gamma_lut();
    println!(
        "gamma lut: [0]={} [64]={} [128]={} [255]={}",
        lut[0], lut[64], lut[128], lut[255]
    );

    Ok(())
}
