use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::PostConfig;
use crate::engine::params::{
    AsinhParams, ColorCalibrationParams, DenoiseParams, PixelMathParams, PlateSolveParams,
    StarSeparationParams,
};
use crate::engine::ProcessingEngine;
use crate::error::{DeepskyError, Result};
use crate::graxpert::GraXpert;
use crate::target::TargetCoords;

/// Weights of the starless/starmask recomposition blend.
const RECOMPOSE_WEIGHT: f64 = 0.5;
/// Output range the recomposition is rescaled into.
const RECOMPOSE_LOW: f64 = 0.0;
const RECOMPOSE_HIGH: f64 = 0.9;

/// Cosmetic post-processing chain over one stacked light image.
///
/// The chain is best-effort: the astronomically significant work (stacking)
/// is already done, so presentation stages log failures and move on. The
/// exception is star separation — its two outputs feed every remaining
/// stage, so its failure ends the chain. The star and starless branch
/// transforms are correctness-critical and also fatal.
pub struct PostProcessor<'a, E: ProcessingEngine> {
    engine: &'a mut E,
    graxpert: &'a GraXpert,
    config: &'a PostConfig,
    extension: String,
}

impl<'a, E: ProcessingEngine> PostProcessor<'a, E> {
    pub fn new(
        engine: &'a mut E,
        graxpert: &'a GraXpert,
        config: &'a PostConfig,
        extension: String,
    ) -> Self {
        Self {
            engine,
            graxpert,
            config,
            extension,
        }
    }

    /// Run the chain over `stacked`, returning the path of the final
    /// postprocessed image.
    pub fn run(&mut self, stacked: &Path, target: Option<TargetCoords>) -> Result<PathBuf> {
        let dir = stacked
            .parent()
            .ok_or_else(|| DeepskyError::Engine("stacked file has no parent directory".into()))?
            .to_path_buf();
        let file_name = stacked
            .file_name()
            .ok_or_else(|| DeepskyError::Engine("stacked file has no name".into()))?
            .to_string_lossy()
            .into_owned();
        let name = stacked
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        info!(file = %stacked.display(), "post-processing stacked light");
        if !self.engine.load(&dir, &file_name)? {
            return Err(step_failed("loading stacked light"));
        }
        // Backup before any destructive edit.
        if !self.engine.save(&format!("{name}.bak"))? {
            return Err(step_failed("saving backup"));
        }

        if self.config.remove_green && !self.engine.remove_green()? {
            warn!("green-noise removal failed, continuing");
        }
        if self.config.autostretch && !self.engine.autostretch()? {
            warn!("autostretch failed, continuing");
        }

        if let Some(coords) = target {
            self.solve_and_calibrate(coords, &name)?;
        } else {
            info!("no target coordinates, skipping plate solve and color calibration");
        }

        let (starless, starmask) = self.separate_stars(&name)?;
        self.process_stars(&dir, &starmask)?;
        let processed_starless = self.process_starless(&dir, &starless)?;
        let final_path = self.recompose(&dir, &starless, &starmask, &name)?;

        if self.config.cleanup {
            self.cleanup(&processed_starless);
        }
        info!(file = %final_path.display(), "post-processing complete");
        Ok(final_path)
    }

    /// Plate solve and photometric color calibration, both advisory: a
    /// failure leaves the image unsolved/uncalibrated but keeps the chain
    /// going.
    fn solve_and_calibrate(&mut self, coords: TargetCoords, name: &str) -> Result<()> {
        if self.config.platesolve {
            info!(ra = coords.ra_deg, dec = coords.dec_deg, "plate solving");
            if self.engine.platesolve(&PlateSolveParams::at(coords.ra_deg, coords.dec_deg))? {
                self.engine.save(name)?;
            } else {
                warn!("plate solve failed, continuing without astrometric solution");
            }
        }
        if self.config.photometric_color {
            info!("running photometric color calibration");
            let params = ColorCalibrationParams {
                ra_deg: coords.ra_deg,
                dec_deg: coords.dec_deg,
                reuse_solution: true,
            };
            if self.engine.photometric_color_calibration(&params)? {
                self.engine.save(name)?;
            } else {
                warn!("photometric color calibration failed, continuing");
            }
        }
        Ok(())
    }

    /// Star separation. Fatal on failure: the remaining stages operate on
    /// its starless/starmask outputs.
    fn separate_stars(&mut self, name: &str) -> Result<(String, String)> {
        info!("separating stars");
        if !self
            .engine
            .star_separation(&StarSeparationParams::default())?
        {
            return Err(step_failed("star separation"));
        }
        Ok((format!("starless_{name}"), format!("starmask_{name}")))
    }

    /// Star branch: optional asinh stretch, then denoise. Both transforms
    /// shape the star layer that ends up in the recomposition, so both are
    /// fatal on failure.
    fn process_stars(&mut self, dir: &Path, starmask: &str) -> Result<()> {
        if !self
            .engine
            .load(dir, &format!("{starmask}.{}", self.extension))?
        {
            return Err(step_failed("loading star mask"));
        }
        self.engine.save(&format!("{starmask}.bak"))?;

        if self.config.star_stretch {
            info!(offset = self.config.star_offset, "asinh stretch on star layer");
            let params = AsinhParams {
                factor: 1.0,
                offset: self.config.star_offset,
                human: true,
            };
            if !self.engine.asinh_stretch(&params)? {
                return Err(step_failed("asinh stretch on star layer"));
            }
        }

        info!("denoising star layer");
        if !self.engine.denoise(&DenoiseParams::default())? {
            return Err(step_failed("denoising star layer"));
        }
        if !self.engine.save(starmask)? {
            return Err(step_failed("saving star layer"));
        }
        Ok(())
    }

    /// Starless branch: background extraction always runs, AI denoise is
    /// optional, the closing asinh stretch is fatal.
    fn process_starless(&mut self, dir: &Path, starless: &str) -> Result<PathBuf> {
        let starless_file = dir.join(format!("{starless}.{}", self.extension));
        if !self
            .engine
            .load(dir, &format!("{starless}.{}", self.extension))?
        {
            return Err(step_failed("loading starless image"));
        }
        self.engine.save(&format!("{starless}.bak"))?;

        let mut processed = self.graxpert.background_extraction(&starless_file)?;
        if self.config.denoise_starless {
            processed = self.graxpert.denoise(&processed)?;
        }

        let processed_name = processed
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !self.engine.load(dir, &processed_name)? {
            return Err(step_failed("loading background-extracted image"));
        }

        info!(
            offset = self.config.background_offset,
            "asinh stretch on starless background"
        );
        let params = AsinhParams {
            factor: 1.0,
            offset: self.config.background_offset,
            human: true,
        };
        if !self.engine.asinh_stretch(&params)? {
            return Err(step_failed("asinh stretch on starless background"));
        }
        if !self.engine.save(starless)? {
            return Err(step_failed("saving starless image"));
        }
        Ok(processed)
    }

    /// Pixel-level blend of the processed starless and star layers.
    fn recompose(
        &mut self,
        dir: &Path,
        starless: &str,
        starmask: &str,
        name: &str,
    ) -> Result<PathBuf> {
        info!(starless, starmask, "recomposing starless and star layers");
        let params = PixelMathParams::blend(
            &format!("{starless}.{}", self.extension),
            &format!("{starmask}.{}", self.extension),
            RECOMPOSE_WEIGHT,
            RECOMPOSE_WEIGHT,
            RECOMPOSE_LOW,
            RECOMPOSE_HIGH,
        );
        if !self.engine.pixel_math(dir, &params)? {
            return Err(step_failed("star recomposition"));
        }
        let out = format!("{name}_postprocessed");
        if !self.engine.save(&out)? {
            return Err(step_failed("saving postprocessed image"));
        }
        if self.config.save_preview && !self.engine.save_jpeg(&out)? {
            warn!("preview export failed, continuing");
        }
        Ok(dir.join(format!("{out}.{}", self.extension)))
    }

    fn cleanup(&self, processed_starless: &Path) {
        if let Err(err) = std::fs::remove_file(processed_starless) {
            warn!(file = %processed_starless.display(), %err, "failed to remove intermediate");
        }
    }
}

fn step_failed(what: &str) -> DeepskyError {
    DeepskyError::Engine(format!("{what} failed"))
}
