use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use deepsky_core::config::ProjectConfig;
use deepsky_core::engine::siril::SirilEngine;
use deepsky_core::engine::ProcessingEngine;
use deepsky_core::exif::ExifTool;
use deepsky_core::frame::FrameKind;
use deepsky_core::graxpert::GraXpert;
use deepsky_core::library::MasterLibrary;
use deepsky_core::pipeline::params::CalibrationMasters;
use deepsky_core::pipeline::{
    FrameOutcome, Orchestrator, PipelineReport, PipelineStage, ProgressReporter, RunOptions,
};
use deepsky_core::post::PostProcessor;
use deepsky_core::session::Session;
use deepsky_core::target::TargetCoords;

use super::FrameKindArg;
use crate::summary;

#[derive(Args)]
pub struct RunArgs {
    /// Working directory with biases/, darks/, flats/, lights/ subdirectories
    pub workdir: PathBuf,

    /// Config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Process only this frame type
    #[arg(long, value_enum)]
    pub frame: Option<FrameKindArg>,

    /// Frames are split into per-night subdirectories
    #[arg(long)]
    pub multi_night: bool,

    /// Master bias file to use instead of resolving one
    #[arg(long)]
    pub master_bias: Option<PathBuf>,

    /// Master dark file to use instead of resolving one
    #[arg(long)]
    pub master_dark: Option<PathBuf>,

    /// Master flat file to use instead of resolving one
    #[arg(long)]
    pub master_flat: Option<PathBuf>,

    /// Maximum stars matched per frame during registration
    #[arg(long, default_value = "500", value_parser = clap::value_parser!(u32).range(100..=2000))]
    pub max_stars: u32,

    /// Convert to single FITS sequence files
    #[arg(long)]
    pub fitseq: bool,

    /// Save freshly stacked bias/dark masters to the library
    #[arg(long)]
    pub save_library: bool,

    /// Master bias library directory
    #[arg(long)]
    pub bias_library: Option<PathBuf>,

    /// Master dark library directory
    #[arg(long)]
    pub dark_library: Option<PathBuf>,

    /// Target right ascension in degrees (for plate solve / color calibration)
    #[arg(long)]
    pub ra: Option<f64>,

    /// Target declination in degrees
    #[arg(long)]
    pub dec: Option<f64>,

    /// Skip the cosmetic post-processing chain
    #[arg(long)]
    pub no_post: bool,

    /// AI-denoise the starless layer during post-processing (slow)
    #[arg(long)]
    pub denoise: bool,

    /// Engine executable
    #[arg(long)]
    pub siril: Option<PathBuf>,

    /// Background-extraction tool executable
    #[arg(long)]
    pub graxpert: Option<PathBuf>,
}

struct BarReporter {
    bar: ProgressBar,
}

impl ProgressReporter for BarReporter {
    fn begin_frame(&self, kind: FrameKind) {
        self.bar.set_message(kind.to_string());
    }

    fn begin_stage(&self, kind: FrameKind, stage: PipelineStage) {
        self.bar.set_message(format!("{kind}: {stage}"));
    }

    fn finish_frame(&self, _kind: FrameKind, _outcome: &FrameOutcome) {
        self.bar.inc(1);
    }
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = build_config(args)?;
    let session = Session::with_all_frames(
        args.workdir.clone(),
        args.multi_night,
        &config.naming,
    );
    let library = MasterLibrary::new(
        config.library.clone(),
        config.naming.clone(),
        Box::new(ExifTool::new()),
    );

    summary::print_run_summary(&config, &session, args.save_library);

    let target = match (args.ra, args.dec) {
        (Some(ra_deg), Some(dec_deg)) => Some(TargetCoords { ra_deg, dec_deg }),
        (None, None) => None,
        _ => bail!("--ra and --dec must be given together"),
    };

    let options = RunOptions {
        save_to_library: args.save_library,
        fits_sequence: args.fitseq,
        only: args.frame.map(Into::into),
        master_overrides: CalibrationMasters {
            bias: args.master_bias.clone(),
            dark: args.master_dark.clone(),
            flat: args.master_flat.clone(),
        },
    };

    let mut engine = SirilEngine::new(config.engine.clone(), config.naming.extension.clone());
    engine.open().context("Failed to open engine session")?;

    // The engine session must be released on every path, so the pipeline
    // outcome is held until after close().
    let outcome = run_pipeline(&mut engine, &session, &library, &config, options, target, args);
    let close_result = engine.close();

    let report = outcome?;
    close_result.context("Failed to close engine session")?;

    summary::print_report(&report);
    if report.has_failures() {
        bail!("pipeline completed with failures");
    }
    Ok(())
}

fn run_pipeline(
    engine: &mut SirilEngine,
    session: &Session,
    library: &MasterLibrary,
    config: &ProjectConfig,
    options: RunOptions,
    target: Option<TargetCoords>,
    args: &RunArgs,
) -> Result<PipelineReport> {
    let bar = ProgressBar::new(FrameKind::ORDER.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg:30} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    let reporter = BarReporter { bar };

    let report = {
        let mut orchestrator =
            Orchestrator::new(engine, session, library, &config.registration, options);
        orchestrator.run_reported(&reporter)?
    };
    reporter.bar.finish_with_message("pipeline done");

    if args.no_post || !config.post.enabled {
        return Ok(report);
    }
    let Some(stacked) = report.stacked_light().map(|p| p.to_path_buf()) else {
        return Ok(report);
    };

    let graxpert = GraXpert::new(config.graxpert.clone());
    let mut post = PostProcessor::new(
        engine,
        &graxpert,
        &config.post,
        config.naming.extension.clone(),
    );
    let final_path = post
        .run(&stacked, target)
        .context("Post-processing failed")?;
    println!("\nFinal image saved to {}", final_path.display());
    Ok(report)
}

fn build_config(args: &RunArgs) -> Result<ProjectConfig> {
    let mut config = super::load_config(args.config.as_ref())?;
    if let Some(siril) = &args.siril {
        config.engine.executable = siril.clone();
    }
    if let Some(graxpert) = &args.graxpert {
        config.graxpert.executable = graxpert.clone();
    }
    if let Some(root) = &args.bias_library {
        config.library.biases = Some(root.clone());
    }
    if let Some(root) = &args.dark_library {
        config.library.darks = Some(root.clone());
    }
    config.registration.max_stars = args.max_stars;
    if args.denoise {
        config.post.denoise_starless = true;
    }
    Ok(config)
}
