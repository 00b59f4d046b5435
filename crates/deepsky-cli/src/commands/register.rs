use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use deepsky_core::config::ProjectConfig;
use deepsky_core::engine::params::RegisterParams;
use deepsky_core::engine::siril::SirilEngine;
use deepsky_core::engine::ProcessingEngine;

#[derive(Args)]
pub struct RegisterArgs {
    /// Sequence to register (path to the sequence in its process directory)
    pub seq: PathBuf,

    /// Maximum stars matched per frame
    #[arg(long, default_value = "500", value_parser = clap::value_parser!(u32).range(100..=2000))]
    pub max_stars: u32,

    /// Engine executable
    #[arg(long)]
    pub siril: Option<PathBuf>,
}

pub fn run(args: &RegisterArgs) -> Result<()> {
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

    let base = RegisterParams {
        max_stars: args.max_stars,
        layer: config.registration.layer,
        no_star_list: true,
        ..RegisterParams::default()
    };

    let mut engine = SirilEngine::new(config.engine.clone(), config.naming.extension.clone());
    engine.open().context("Failed to open engine session")?;
    let registered = register_two_pass(&mut engine, dir, &name, &base, &config);
    let close_result = engine.close();
    let registered = registered?;
    close_result?;

    if !registered {
        bail!("Failed to register {name}");
    }
    println!(
        "Registered {name} as {}{name}",
        config.naming.registered_prefix
    );
    Ok(())
}

fn register_two_pass(
    engine: &mut SirilEngine,
    dir: &std::path::Path,
    name: &str,
    base: &RegisterParams,
    config: &ProjectConfig,
) -> Result<bool> {
    let estimation = RegisterParams {
        two_pass: true,
        ..base.clone()
    };
    if !engine.register(dir, name, &estimation)? {
        return Ok(false);
    }
    let output = RegisterParams {
        prefix: Some(config.naming.registered_prefix.clone()),
        distortion: true,
        ..base.clone()
    };
    Ok(engine.register(dir, name, &output)?)
}
