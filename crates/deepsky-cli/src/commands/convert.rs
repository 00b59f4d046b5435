use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::warn;

use deepsky_core::config::ProjectConfig;
use deepsky_core::engine::params::ConvertParams;
use deepsky_core::engine::siril::SirilEngine;
use deepsky_core::engine::ProcessingEngine;

#[derive(Args)]
pub struct ConvertArgs {
    /// Source directory of raw captures
    pub src: PathBuf,

    /// Destination directory for converted files, relative to the source
    #[arg(short, long)]
    pub out: Option<String>,

    /// Produce a single FITS sequence file
    #[arg(long)]
    pub fitseq: bool,

    /// Debayer during conversion
    #[arg(long)]
    pub debayer: bool,

    /// Engine executable
    #[arg(long)]
    pub siril: Option<PathBuf>,
}

pub fn run(args: &ConvertArgs) -> Result<()> {
    let mut config = ProjectConfig::default();
    if let Some(siril) = &args.siril {
        config.engine.executable = siril.clone();
    }

    let name = args
        .src
        .file_name()
        .context("Source directory has no name")?
        .to_string_lossy()
        .into_owned();
    let out = args.out.clone().unwrap_or_else(|| {
        warn!("no destination given, using the process directory convention");
        config.naming.process_dir.clone()
    });

    let params = ConvertParams {
        output_dir: Some(out),
        fits_sequence: args.fitseq,
        debayer: args.debayer,
    };

    let mut engine = SirilEngine::new(config.engine.clone(), config.naming.extension.clone());
    engine.open().context("Failed to open engine session")?;
    let converted = engine.convert(&args.src, &name, &params);
    let close_result = engine.close();
    let converted = converted?;
    close_result?;

    if !converted {
        bail!("Failed to convert {name}");
    }
    println!("Converted {name}");
    Ok(())
}
