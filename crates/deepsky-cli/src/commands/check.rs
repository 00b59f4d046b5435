use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use deepsky_core::checks::run_checks;
use deepsky_core::exif::ExifTool;
use deepsky_core::session::Session;

use crate::summary;

#[derive(Args)]
pub struct CheckArgs {
    /// Working directory with biases/, darks/, flats/, lights/ subdirectories
    pub workdir: PathBuf,

    /// Config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: &CheckArgs) -> Result<()> {
    let config = super::load_config(args.config.as_ref())?;
    let session = Session::with_all_frames(args.workdir.clone(), false, &config.naming);
    let exif = ExifTool::new();

    let report = run_checks(&session, &exif, &config.checks)?;
    summary::print_check_report(&report);

    if !report.is_ok() {
        bail!("capture checks failed");
    }
    Ok(())
}
