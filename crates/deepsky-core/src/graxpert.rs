use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::config::GraxpertConfig;
use crate::error::{DeepskyError, Result};

/// Suffix the external tool appends to its output file.
const OUTPUT_SUFFIX: &str = "_GraXpert.fits";

/// Wrapper around the GraXpert background-extraction/denoising tool.
///
/// The tool is a one-shot command: it reads the image given as positional
/// argument and writes a sibling file with a fixed suffix. Both operations
/// block until the process exits.
pub struct GraXpert {
    config: GraxpertConfig,
}

impl GraXpert {
    pub fn new(config: GraxpertConfig) -> Self {
        Self { config }
    }

    /// Sibling path the tool will write for `image`.
    pub fn output_path(image: &Path) -> PathBuf {
        let stem = image
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        image.with_file_name(format!("{stem}{OUTPUT_SUFFIX}"))
    }

    /// Model and subtract the sky background gradient from `image`.
    pub fn background_extraction(&self, image: &Path) -> Result<PathBuf> {
        info!(image = %image.display(), "running background extraction");
        let mut cmd = Command::new(&self.config.executable);
        cmd.arg(image)
            .arg("-cli")
            .args(["-correction", "Subtraction"])
            .args(["-smoothing", &self.config.smoothing.to_string()])
            .arg("-bg")
            .args(["-gpu", if self.config.gpu { "true" } else { "false" }])
            .args(["--command", "background-extraction"]);
        self.run(cmd, image)
    }

    /// AI denoise of `image`. Can take a long time on CPU.
    pub fn denoise(&self, image: &Path) -> Result<PathBuf> {
        info!(image = %image.display(), "running denoise");
        let mut cmd = Command::new(&self.config.executable);
        cmd.arg(image)
            .arg("-cli")
            .args(["-gpu", if self.config.gpu { "true" } else { "false" }])
            .args(["--command", "denoising"]);
        self.run(cmd, image)
    }

    fn run(&self, mut cmd: Command, image: &Path) -> Result<PathBuf> {
        let status = cmd.status().map_err(|e| {
            DeepskyError::Tool(format!(
                "failed to run {}: {e}",
                self.config.executable.display()
            ))
        })?;
        if !status.success() {
            return Err(DeepskyError::Tool(format!(
                "graxpert exited with {status} for {}",
                image.display()
            )));
        }
        let output = Self::output_path(image);
        if !output.is_file() {
            return Err(DeepskyError::Tool(format!(
                "graxpert reported success but {} was not produced",
                output.display()
            )));
        }
        Ok(output)
    }
}
