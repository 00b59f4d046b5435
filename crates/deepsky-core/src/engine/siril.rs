use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::{debug, info, trace, warn};

use crate::config::EngineConfig;
use crate::error::{DeepskyError, Result};

use super::params::{
    AsinhParams, CalibrateParams, ColorCalibrationParams, ConvertParams, DenoiseParams,
    PixelMathParams, PlateSolveParams, RegisterParams, StackParameters, StarSeparationParams,
};
use super::ProcessingEngine;

/// Siril driven as a long-lived child process in pipe mode.
///
/// One process serves the whole pipeline run: commands go to its stdin, the
/// `log:` / `progress:` / `status:` stream on stdout carries the per-command
/// result. All calls block until the engine answers; the process is killed
/// on drop so a panic or early return cannot leak it.
pub struct SirilEngine {
    config: EngineConfig,
    extension: String,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
}

impl SirilEngine {
    pub fn new(config: EngineConfig, extension: String) -> Self {
        Self {
            config,
            extension,
            child: None,
            stdin: None,
            stdout: None,
        }
    }

    fn send(&mut self, command: &str) -> Result<bool> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| DeepskyError::Engine("engine session is not open".into()))?;
        debug!(command, "engine command");
        stdin
            .write_all(command.as_bytes())
            .and_then(|_| stdin.write_all(b"\n"))
            .and_then(|_| stdin.flush())
            .map_err(|e| DeepskyError::Engine(format!("failed to send command: {e}")))?;
        self.wait_status()
    }

    /// Read engine output until a status line terminates the command.
    fn wait_status(&mut self) -> Result<bool> {
        let stdout = self
            .stdout
            .as_mut()
            .ok_or_else(|| DeepskyError::Engine("engine session is not open".into()))?;
        let mut line = String::new();
        loop {
            line.clear();
            let n = stdout
                .read_line(&mut line)
                .map_err(|e| DeepskyError::Engine(format!("failed to read engine output: {e}")))?;
            if n == 0 {
                return Err(DeepskyError::Engine("engine closed unexpectedly".into()));
            }
            let trimmed = line.trim_end();
            if let Some(msg) = trimmed.strip_prefix("log: ") {
                debug!(target: "siril", "{msg}");
            } else if let Some(msg) = trimmed.strip_prefix("progress: ") {
                trace!(target: "siril", "{msg}");
            } else if let Some(status) = trimmed.strip_prefix("status: ") {
                if status.starts_with("success") {
                    return Ok(true);
                }
                if status.starts_with("error") {
                    warn!(target: "siril", "{status}");
                    return Ok(false);
                }
                // "starting <cmd>" and similar progress statuses
                trace!(target: "siril", "{status}");
            } else if !trimmed.is_empty() {
                trace!(target: "siril", "{trimmed}");
            }
        }
    }

    /// `cd` into `dir`, then run `command`. Composing them per call keeps
    /// the working directory out of the public contract.
    fn send_in(&mut self, dir: &Path, command: &str) -> Result<bool> {
        if !self.send(&format!("cd {}", dir.display()))? {
            return Ok(false);
        }
        self.send(command)
    }

    fn require(&mut self, command: &str) -> Result<()> {
        if self.send(command)? {
            Ok(())
        } else {
            Err(DeepskyError::Engine(format!(
                "engine rejected setup command: {command}"
            )))
        }
    }
}

impl ProcessingEngine for SirilEngine {
    fn open(&mut self) -> Result<()> {
        if self.child.is_some() {
            return Ok(());
        }
        info!(executable = %self.config.executable.display(), "starting engine session");
        let mut child = Command::new(&self.config.executable)
            .arg("-p")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                DeepskyError::Engine(format!(
                    "failed to start {}: {e}",
                    self.config.executable.display()
                ))
            })?;
        self.stdin = child.stdin.take();
        self.stdout = child.stdout.take().map(BufReader::new);
        self.child = Some(child);

        if self.config.force_16bit {
            self.require("set16bits")?;
        }
        let ext = self.extension.clone();
        self.require(&format!("setext {ext}"))?;
        if let Some(threads) = self.config.cpu_threads {
            self.require(&format!("setcpu {threads}"))?;
        }
        info!("engine session started");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            info!("closing engine session");
            if let Some(mut stdin) = self.stdin.take() {
                // A failed exit write just means the process is already gone.
                let _ = stdin.write_all(b"exit\n");
            }
            self.stdout = None;
            match child.wait() {
                Ok(status) => debug!(%status, "engine session closed"),
                Err(_) => {
                    let _ = child.kill();
                }
            }
        }
        Ok(())
    }

    fn convert(&mut self, dir: &Path, name: &str, params: &ConvertParams) -> Result<bool> {
        let mut cmd = format!("convert {name}");
        if let Some(out) = &params.output_dir {
            cmd.push_str(&format!(" -out={out}"));
        }
        if params.fits_sequence {
            cmd.push_str(" -fitseq");
        }
        if params.debayer {
            cmd.push_str(" -debayer");
        }
        self.send_in(dir, &cmd)
    }

    fn calibrate(&mut self, dir: &Path, name: &str, params: &CalibrateParams) -> Result<bool> {
        let mut cmd = format!("calibrate {name}");
        if let Some(bias) = &params.bias {
            cmd.push_str(&format!(" -bias={}", bias.display()));
        }
        if let Some(dark) = &params.dark {
            cmd.push_str(&format!(" -dark={}", dark.display()));
        }
        if let Some(flat) = &params.flat {
            cmd.push_str(&format!(" -flat={}", flat.display()));
        }
        if params.cosmetic_from_dark {
            cmd.push_str(&format!(
                " -cc=dark {} {}",
                params.sigma_low, params.sigma_high
            ));
        }
        if params.cfa {
            cmd.push_str(" -cfa");
        }
        if params.equalize_cfa {
            cmd.push_str(" -equalize_cfa");
        }
        if params.debayer {
            cmd.push_str(" -debayer");
        }
        cmd.push_str(&format!(" -prefix={}", params.prefix));
        if params.fits_sequence {
            cmd.push_str(" -fitseq");
        }
        self.send_in(dir, &cmd)
    }

    fn register(&mut self, dir: &Path, name: &str, params: &RegisterParams) -> Result<bool> {
        params.validate()?;
        let mut cmd = format!(
            "register {name} -layer={} -maxstars={}",
            params.layer, params.max_stars
        );
        if params.no_star_list {
            cmd.push_str(" -nostarlist");
        }
        if params.two_pass {
            cmd.push_str(" -2pass");
        }
        if let Some(prefix) = &params.prefix {
            cmd.push_str(&format!(" -prefix={prefix}"));
        }
        if params.distortion {
            cmd.push_str(" -drizzle");
        }
        self.send_in(dir, &cmd)
    }

    fn stack(
        &mut self,
        dir: &Path,
        name: &str,
        out: &str,
        params: &StackParameters,
    ) -> Result<bool> {
        params.validate()?;
        let mut cmd = format!(
            "stack {name} rej {} {} {} -norm={}",
            params.rejection.engine_name(),
            params.sigma_low,
            params.sigma_high,
            params.normalization.engine_name()
        );
        if params.rgb_equal {
            cmd.push_str(" -rgb_equal");
        }
        if let Some(pct) = params.filter_fwhm_pct {
            cmd.push_str(&format!(" -filter-fwhm={pct}%"));
        }
        if let Some(pct) = params.filter_round_pct {
            cmd.push_str(&format!(" -filter-round={pct}%"));
        }
        cmd.push_str(&format!(" -out={out}"));
        self.send_in(dir, &cmd)
    }

    fn merge(&mut self, dir: &Path, names: &[String], out: &str) -> Result<bool> {
        let mut cmd = String::from("merge");
        for name in names {
            cmd.push_str(&format!(" {name}"));
        }
        cmd.push_str(&format!(" {out}"));
        self.send_in(dir, &cmd)
    }

    fn load(&mut self, dir: &Path, name: &str) -> Result<bool> {
        self.send_in(dir, &format!("load {name}"))
    }

    fn save(&mut self, name: &str) -> Result<bool> {
        self.send(&format!("save {name}"))
    }

    fn save_jpeg(&mut self, name: &str) -> Result<bool> {
        self.send(&format!("savejpg {name} 100"))
    }

    fn autostretch(&mut self) -> Result<bool> {
        self.send("autostretch")
    }

    fn remove_green(&mut self) -> Result<bool> {
        self.send("rmgreen")
    }

    fn asinh_stretch(&mut self, params: &AsinhParams) -> Result<bool> {
        let mut cmd = String::from("asinh");
        if params.human {
            cmd.push_str(" -human");
        }
        cmd.push_str(&format!(" {} {}", params.factor, params.offset));
        self.send(&cmd)
    }

    fn platesolve(&mut self, params: &PlateSolveParams) -> Result<bool> {
        let mut cmd = format!("platesolve {},{}", params.ra_deg, params.dec_deg);
        if params.force {
            cmd.push_str(" -platesolve");
        }
        if params.downscale {
            cmd.push_str(" -downscale");
        }
        if params.local_solver {
            cmd.push_str(" -localasnet");
        }
        if let Some(mag) = params.limit_mag {
            cmd.push_str(&format!(" -limitmag={mag}"));
        }
        self.send(&cmd)
    }

    fn photometric_color_calibration(&mut self, params: &ColorCalibrationParams) -> Result<bool> {
        let mut cmd = format!("pcc {},{}", params.ra_deg, params.dec_deg);
        if !params.reuse_solution {
            cmd.push_str(" -platesolve");
        }
        self.send(&cmd)
    }

    fn star_separation(&mut self, params: &StarSeparationParams) -> Result<bool> {
        let mut cmd = String::from("starnet");
        if params.stretch {
            cmd.push_str(" -stretch");
        }
        if params.upscale {
            cmd.push_str(" -upscale");
        }
        self.send(&cmd)
    }

    fn denoise(&mut self, params: &DenoiseParams) -> Result<bool> {
        let mut cmd = format!("denoise -mod={}", params.modulation);
        if !params.cosmetic {
            cmd.push_str(" -nocosmetic");
        }
        if params.da3d {
            cmd.push_str(" -da3d");
        }
        self.send(&cmd)
    }

    fn pixel_math(&mut self, dir: &Path, params: &PixelMathParams) -> Result<bool> {
        let mut cmd = format!("pm \"{}\"", params.expression);
        if params.rescale {
            cmd.push_str(&format!(" -rescale {} {}", params.low, params.high));
        }
        self.send_in(dir, &cmd)
    }
}

impl Drop for SirilEngine {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
