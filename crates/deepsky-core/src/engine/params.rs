use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{DeepskyError, Result};

/// Engine-imposed bounds on the per-frame star-matching budget.
pub const MIN_MAX_STARS: u32 = 100;
pub const MAX_MAX_STARS: u32 = 2000;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConvertParams {
    /// Output directory for the converted sequence, relative to the
    /// conversion directory.
    pub output_dir: Option<String>,
    /// Produce a single FITS sequence file instead of one file per frame.
    pub fits_sequence: bool,
    pub debayer: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CalibrateParams {
    pub bias: Option<PathBuf>,
    pub dark: Option<PathBuf>,
    pub flat: Option<PathBuf>,
    /// Cosmetic correction derived from the dark master.
    pub cosmetic_from_dark: bool,
    pub sigma_low: f32,
    pub sigma_high: f32,
    pub cfa: bool,
    pub equalize_cfa: bool,
    pub debayer: bool,
    /// Prefix of the calibrated output sequence.
    pub prefix: String,
    pub fits_sequence: bool,
}

impl Default for CalibrateParams {
    fn default() -> Self {
        Self {
            bias: None,
            dark: None,
            flat: None,
            cosmetic_from_dark: false,
            sigma_low: 3.0,
            sigma_high: 3.0,
            cfa: true,
            equalize_cfa: true,
            debayer: false,
            prefix: "pp_".into(),
            fits_sequence: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RegisterParams {
    /// Estimation-only pass: compute transforms without writing frames.
    pub two_pass: bool,
    /// Prefix of the registered output sequence (output passes only).
    pub prefix: Option<String>,
    pub max_stars: u32,
    /// Channel used for star detection (1 = green).
    pub layer: u8,
    /// Skip writing the star list sidecar files.
    pub no_star_list: bool,
    /// Apply distortion correction on the output pass.
    pub distortion: bool,
}

impl RegisterParams {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_MAX_STARS..=MAX_MAX_STARS).contains(&self.max_stars) {
            return Err(DeepskyError::Config(format!(
                "max_stars must be within [{MIN_MAX_STARS}, {MAX_MAX_STARS}], got {}",
                self.max_stars
            )));
        }
        Ok(())
    }
}

impl Default for RegisterParams {
    fn default() -> Self {
        Self {
            two_pass: false,
            prefix: None,
            max_stars: 500,
            layer: 1,
            no_star_list: true,
            distortion: false,
        }
    }
}

/// Inter-frame normalization applied before stacking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Normalization {
    None,
    Multiplicative,
    AdditiveScale,
}

impl Normalization {
    pub fn engine_name(self) -> &'static str {
        match self {
            Self::None => "no",
            Self::Multiplicative => "mul",
            Self::AdditiveScale => "addscale",
        }
    }
}

/// Per-pixel outlier rejection algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionAlgorithm {
    Winsorized,
    Linear,
}

impl RejectionAlgorithm {
    pub fn engine_name(self) -> &'static str {
        match self {
            Self::Winsorized => "w",
            Self::Linear => "l",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StackParameters {
    pub normalization: Normalization,
    pub rejection: RejectionAlgorithm,
    pub sigma_low: f32,
    pub sigma_high: f32,
    /// Equalize RGB channel backgrounds.
    pub rgb_equal: bool,
    /// Keep only frames within this FWHM percentile (outlier-frame filter).
    pub filter_fwhm_pct: Option<u8>,
    /// Keep only frames within this roundness percentile.
    pub filter_round_pct: Option<u8>,
}

impl StackParameters {
    pub fn validate(&self) -> Result<()> {
        for (name, pct) in [
            ("filter_fwhm_pct", self.filter_fwhm_pct),
            ("filter_round_pct", self.filter_round_pct),
        ] {
            if let Some(pct) = pct {
                if pct == 0 || pct > 100 {
                    return Err(DeepskyError::Config(format!(
                        "{name} must be within [1, 100], got {pct}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AsinhParams {
    /// Stretch amount.
    pub factor: f64,
    /// Black-point offset.
    pub offset: f64,
    /// Use the perceptual (human-vision weighted) variant.
    pub human: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlateSolveParams {
    pub ra_deg: f64,
    pub dec_deg: f64,
    /// Solve even when the image already carries a solution.
    pub force: bool,
    pub downscale: bool,
    /// Use the locally installed astrometry solver.
    pub local_solver: bool,
    pub limit_mag: Option<f64>,
}

impl PlateSolveParams {
    pub fn at(ra_deg: f64, dec_deg: f64) -> Self {
        Self {
            ra_deg,
            dec_deg,
            force: true,
            downscale: true,
            local_solver: false,
            limit_mag: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColorCalibrationParams {
    pub ra_deg: f64,
    pub dec_deg: f64,
    /// Reuse the existing astrometric solution instead of re-solving.
    pub reuse_solution: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StarSeparationParams {
    /// Pre-stretch the linear image before separation.
    pub stretch: bool,
    pub upscale: bool,
}

impl Default for StarSeparationParams {
    fn default() -> Self {
        Self {
            stretch: false,
            upscale: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DenoiseParams {
    /// Modulation between the original and denoised image (1 = fully denoised).
    pub modulation: f32,
    pub cosmetic: bool,
    /// Extra DA3D refinement pass.
    pub da3d: bool,
}

impl Default for DenoiseParams {
    fn default() -> Self {
        Self {
            modulation: 1.0,
            cosmetic: true,
            da3d: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PixelMathParams {
    pub expression: String,
    pub rescale: bool,
    pub low: f64,
    pub high: f64,
}

impl PixelMathParams {
    /// Weighted blend of two images, rescaled into `[low, high]`.
    pub fn blend(a: &str, b: &str, weight_a: f64, weight_b: f64, low: f64, high: f64) -> Self {
        Self {
            expression: format!("${a}$ * {weight_a} + ${b}$ * {weight_b}"),
            rescale: true,
            low,
            high,
        }
    }
}
