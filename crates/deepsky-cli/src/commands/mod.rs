pub mod calibrate;
pub mod check;
pub mod config;
pub mod convert;
pub mod post;
pub mod register;
pub mod run;
pub mod stack;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;
use deepsky_core::config::ProjectConfig;
use deepsky_core::frame::FrameKind;

/// Frame kind as a CLI value.
#[derive(Clone, Copy, ValueEnum)]
pub enum FrameKindArg {
    Biases,
    Darks,
    Flats,
    Lights,
}

impl From<FrameKindArg> for FrameKind {
    fn from(arg: FrameKindArg) -> Self {
        match arg {
            FrameKindArg::Biases => FrameKind::Biases,
            FrameKindArg::Darks => FrameKind::Darks,
            FrameKindArg::Flats => FrameKind::Flats,
            FrameKindArg::Lights => FrameKind::Lights,
        }
    }
}

/// Load a TOML config file, or fall back to defaults.
pub fn load_config(path: Option<&PathBuf>) -> Result<ProjectConfig> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            toml::from_str(&contents).context("Invalid config")
        }
        None => Ok(ProjectConfig::default()),
    }
}
