use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::warn;

use deepsky_core::config::ProjectConfig;
use deepsky_core::engine::siril::SirilEngine;
use deepsky_core::engine::ProcessingEngine;
use deepsky_core::frame::FrameKind;
use deepsky_core::pipeline::params::{calibration_parameters, CalibrationMasters};

use super::FrameKindArg;

#[derive(Args)]
pub struct CalibrateArgs {
    /// Sequence to calibrate (path to the sequence in its process directory)
    pub seq: PathBuf,

    /// Frame type being calibrated
    #[arg(short, long, value_enum)]
    pub frame: FrameKindArg,

    /// Master bias file
    #[arg(short = 'B', long)]
    pub bias: Option<PathBuf>,

    /// Master dark file
    #[arg(short = 'D', long)]
    pub dark: Option<PathBuf>,

    /// Master flat file
    #[arg(short = 'F', long)]
    pub flat: Option<PathBuf>,

    /// The sequence is a single FITS sequence file
    #[arg(long)]
    pub fitseq: bool,

    /// Engine executable
    #[arg(long)]
    pub siril: Option<PathBuf>,
}

pub fn run(args: &CalibrateArgs) -> Result<()> {
    let kind: FrameKind = args.frame.into();
    if !kind.is_calibrated() {
        bail!("{kind} frames are stacked without calibration");
    }
    if kind == FrameKind::Flats && args.bias.is_none() {
        warn!("calibrating flats without a master bias");
    }

    let mut config = ProjectConfig::default();
    if let Some(siril) = &args.siril {
        config.engine.executable = siril.clone();
    }

    let dir = args
        .seq
        .parent()
        .context("Sequence path has no parent directory")?;
    let name = args
        .seq
        .file_stem()
        .context("Sequence path has no name")?
        .to_string_lossy()
        .into_owned();

    let masters = CalibrationMasters {
        bias: args.bias.clone(),
        dark: args.dark.clone(),
        flat: args.flat.clone(),
    };
    let params = calibration_parameters(kind, &masters, &config.naming, args.fitseq);

    let mut engine = SirilEngine::new(config.engine.clone(), config.naming.extension.clone());
    engine.open().context("Failed to open engine session")?;
    let calibrated = engine.calibrate(dir, &name, &params);
    let close_result = engine.close();
    let calibrated = calibrated?;
    close_result?;

    if !calibrated {
        bail!("Failed to calibrate {name}");
    }
    println!("Calibrated {name}");
    Ok(())
}
