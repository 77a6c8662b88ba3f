use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use iris_core::tuning::Tuning;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the tuning to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save the full default tuning as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let tuning = Tuning::default();
    let toml_str = toml::to_string_pretty(&tuning)?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write tuning to {}", path.display()))?;
        println!("Default tuning saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
