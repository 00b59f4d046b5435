use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use deepsky_core::config::ProjectConfig;
use deepsky_core::engine::siril::SirilEngine;
use deepsky_core::engine::ProcessingEngine;
use deepsky_core::frame::FrameKind;
use deepsky_core::pipeline::params::stack_parameters;

use super::FrameKindArg;

#[derive(Args)]
pub struct StackArgs {
    /// Sequence to stack (path to the sequence in its process directory)
    pub seq: PathBuf,

    /// Frame type being stacked (selects normalization and rejection)
    #[arg(short, long, value_enum)]
    pub frame: FrameKindArg,

    /// Output name (defaults to the stacked-prefix convention)
    #[arg(short, long)]
    pub out: Option<String>,

    /// Engine executable
    #[arg(long)]
    pub siril: Option<PathBuf>,
}

pub fn run(args: &StackArgs) -> Result<()> {
    let kind: FrameKind = args.frame.into();

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
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| format!("{}{name}", config.naming.stacked_prefix));

    let params = stack_parameters(kind);

    let mut engine = SirilEngine::new(config.engine.clone(), config.naming.extension.clone());
    engine.open().context("Failed to open engine session")?;
    let stacked = engine.stack(dir, &name, &out, &params);
    let close_result = engine.close();
    let stacked = stacked?;
    close_result?;

    if !stacked {
        bail!("Failed to stack {name}");
    }
    println!(
        "Stacked {name} to {}",
        dir.join(format!("{out}.{}", config.naming.extension)).display()
    );
    Ok(())
}
