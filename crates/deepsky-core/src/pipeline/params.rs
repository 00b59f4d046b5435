use std::path::PathBuf;

use crate::config::NamingConfig;
use crate::engine::params::{
    CalibrateParams, Normalization, RejectionAlgorithm, StackParameters,
};
use crate::frame::FrameKind;

/// Masters available for a calibration run, in whatever way they were
/// resolved (same-run stack, session file, or library fallback).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalibrationMasters {
    pub bias: Option<PathBuf>,
    pub dark: Option<PathBuf>,
    pub flat: Option<PathBuf>,
}

impl CalibrationMasters {
    pub fn for_kind(&self, kind: FrameKind) -> Option<&PathBuf> {
        match kind {
            FrameKind::Biases => self.bias.as_ref(),
            FrameKind::Darks => self.dark.as_ref(),
            FrameKind::Flats => self.flat.as_ref(),
            FrameKind::Lights => None,
        }
    }
}

/// Stacking parameters are fixed per frame type:
///
/// | kind   | normalization  | rejection  | extras                          |
/// |--------|----------------|------------|---------------------------------|
/// | biases | none           | winsorized |                                 |
/// | darks  | none           | winsorized |                                 |
/// | flats  | multiplicative | winsorized |                                 |
/// | lights | additive-scale | linear     | rgb equalization, 90% filters   |
pub fn stack_parameters(kind: FrameKind) -> StackParameters {
    let base = StackParameters {
        normalization: Normalization::None,
        rejection: RejectionAlgorithm::Winsorized,
        sigma_low: 3.0,
        sigma_high: 3.0,
        rgb_equal: false,
        filter_fwhm_pct: None,
        filter_round_pct: None,
    };
    match kind {
        FrameKind::Biases | FrameKind::Darks => base,
        FrameKind::Flats => StackParameters {
            normalization: Normalization::Multiplicative,
            ..base
        },
        FrameKind::Lights => StackParameters {
            normalization: Normalization::AdditiveScale,
            rejection: RejectionAlgorithm::Linear,
            rgb_equal: true,
            filter_fwhm_pct: Some(90),
            filter_round_pct: Some(90),
            ..base
        },
    }
}

/// Calibration parameter set for a frame kind.
///
/// Every kind gets CFA handling and 3/3 sigma clipping; lights additionally
/// debayer and take the dark (with cosmetic correction) and flat masters;
/// flats take the bias master. Absent masters simply leave that correction
/// out — the caller decides whether that deserves a warning.
pub fn calibration_parameters(
    kind: FrameKind,
    masters: &CalibrationMasters,
    naming: &NamingConfig,
    fits_sequence: bool,
) -> CalibrateParams {
    let mut params = CalibrateParams {
        prefix: naming.preprocess_prefix.clone(),
        fits_sequence,
        ..CalibrateParams::default()
    };
    match kind {
        FrameKind::Lights => {
            params.debayer = true;
            if let Some(dark) = &masters.dark {
                params.dark = Some(dark.clone());
                params.cosmetic_from_dark = true;
            }
            params.flat = masters.flat.clone();
        }
        FrameKind::Flats => {
            params.bias = masters.bias.clone();
        }
        FrameKind::Biases | FrameKind::Darks => {}
    }
    params
}
