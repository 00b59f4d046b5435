use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use deepsky_core::engine::siril::SirilEngine;
use deepsky_core::engine::ProcessingEngine;
use deepsky_core::graxpert::GraXpert;
use deepsky_core::post::PostProcessor;
use deepsky_core::target::TargetCoords;

#[derive(Args)]
pub struct PostArgs {
    /// Stacked image to post-process
    pub file: PathBuf,

    /// Config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Target right ascension in degrees
    #[arg(long)]
    pub ra: Option<f64>,

    /// Target declination in degrees
    #[arg(long)]
    pub dec: Option<f64>,

    /// Skip the initial autostretch
    #[arg(long)]
    pub no_stretch: bool,

    /// AI-denoise the starless layer (slow)
    #[arg(long)]
    pub denoise: bool,

    /// Keep external-tool intermediates
    #[arg(long)]
    pub no_cleanup: bool,

    /// Engine executable
    #[arg(long)]
    pub siril: Option<PathBuf>,

    /// Background-extraction tool executable
    #[arg(long)]
    pub graxpert: Option<PathBuf>,
}

pub fn run(args: &PostArgs) -> Result<()> {
    let mut config = super::load_config(args.config.as_ref())?;
    if let Some(siril) = &args.siril {
        config.engine.executable = siril.clone();
    }
    if let Some(graxpert) = &args.graxpert {
        config.graxpert.executable = graxpert.clone();
    }
    if args.no_stretch {
        config.post.autostretch = false;
    }
    if args.denoise {
        config.post.denoise_starless = true;
    }
    if args.no_cleanup {
        config.post.cleanup = false;
    }

    let target = match (args.ra, args.dec) {
        (Some(ra_deg), Some(dec_deg)) => Some(TargetCoords { ra_deg, dec_deg }),
        (None, None) => None,
        _ => bail!("--ra and --dec must be given together"),
    };

    let graxpert = GraXpert::new(config.graxpert.clone());
    let mut engine = SirilEngine::new(config.engine.clone(), config.naming.extension.clone());
    engine.open().context("Failed to open engine session")?;

    let outcome = {
        let mut post = PostProcessor::new(
            &mut engine,
            &graxpert,
            &config.post,
            config.naming.extension.clone(),
        );
        post.run(&args.file, target)
    };
    let close_result = engine.close();
    let final_path = outcome.context("Post-processing failed")?;
    close_result?;

    println!("Final image saved to {}", final_path.display());
    Ok(())
}
