use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::frame::FrameKind;

/// Top-level configuration, constructed once at process start and passed by
/// reference into Session/Orchestrator constructors. Loadable from TOML.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub graxpert: GraxpertConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub post: PostConfig,
    #[serde(default)]
    pub checks: CheckConfig,
}

/// File and directory naming conventions shared by every pipeline stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Subdirectory (under each frame's source dir) for intermediate artifacts.
    pub process_dir: String,
    /// Prefix of stacked outputs.
    pub stacked_prefix: String,
    /// Prefix the register stage puts on output sequences.
    pub registered_prefix: String,
    /// Prefix the calibrate stage puts on output sequences.
    pub preprocess_prefix: String,
    /// FITS file extension, without the dot.
    pub extension: String,
    /// Substring marking night subdirectories in multi-night layouts.
    pub night_marker: String,
    pub biases: String,
    pub darks: String,
    pub flats: String,
    pub lights: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            process_dir: "process".into(),
            stacked_prefix: "stacked_".into(),
            registered_prefix: "r_".into(),
            preprocess_prefix: "pp_".into(),
            extension: "fit".into(),
            night_marker: "night".into(),
            biases: "biases".into(),
            darks: "darks".into(),
            flats: "flats".into(),
            lights: "lights".into(),
        }
    }
}

impl NamingConfig {
    pub fn frame_name(&self, kind: FrameKind) -> &str {
        match kind {
            FrameKind::Biases => &self.biases,
            FrameKind::Darks => &self.darks,
            FrameKind::Flats => &self.flats,
            FrameKind::Lights => &self.lights,
        }
    }
}

/// Cross-session master library roots. A kind without a root never
/// participates in library lookup or persist.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LibraryConfig {
    pub biases: Option<PathBuf>,
    pub darks: Option<PathBuf>,
}

impl LibraryConfig {
    pub fn root_for(&self, kind: FrameKind) -> Option<&PathBuf> {
        match kind {
            FrameKind::Biases => self.biases.as_ref(),
            FrameKind::Darks => self.darks.as_ref(),
            _ => None,
        }
    }
}

/// Processing-engine process settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine executable, looked up on PATH when not absolute.
    pub executable: PathBuf,
    /// Worker threads the engine may use; engine default when absent.
    pub cpu_threads: Option<usize>,
    /// Force 16-bit processing (the engine's recommended mode for DSLR raws).
    pub force_16bit: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("siril-cli"),
            cpu_threads: None,
            force_16bit: true,
        }
    }
}

/// External background-extraction/denoise tool settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GraxpertConfig {
    pub executable: PathBuf,
    pub gpu: bool,
    /// Background model smoothing factor.
    pub smoothing: f64,
}

impl Default for GraxpertConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("graxpert"),
            gpu: false,
            smoothing: 0.2,
        }
    }
}

/// Star-registration settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Maximum stars matched per frame (engine-bounded to 100..=2000).
    pub max_stars: u32,
    /// Channel used for star detection (1 = green).
    pub layer: u8,
    /// How multi-night registered sequences are combined before the final stack.
    pub merge: MergeMode,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            max_stars: 500,
            layer: 1,
            merge: MergeMode::MergeOnly,
        }
    }
}

/// Multi-night merge strategy for light frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    /// Merge the per-night registered sequences, then stack once.
    #[default]
    MergeOnly,
    /// Re-register the merged sequence before the final stack.
    RegisterMerged,
}

/// Cosmetic post-processing chain flags and tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PostConfig {
    pub enabled: bool,
    pub remove_green: bool,
    pub autostretch: bool,
    pub platesolve: bool,
    pub photometric_color: bool,
    /// Asinh stretch on the star layer.
    pub star_stretch: bool,
    /// AI denoise on the starless layer (slow).
    pub denoise_starless: bool,
    /// Asinh black-point offset for the star layer.
    pub star_offset: f64,
    /// Asinh black-point offset for the starless background.
    pub background_offset: f64,
    /// Export JPEG previews of the final image.
    pub save_preview: bool,
    /// Delete external-tool intermediates when the chain completes.
    pub cleanup: bool,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            remove_green: true,
            autostretch: true,
            platesolve: true,
            photometric_color: true,
            star_stretch: true,
            denoise_starless: false,
            star_offset: 0.2,
            background_offset: 0.18,
            save_preview: true,
            cleanup: true,
        }
    }
}

/// Thresholds for the pre-flight capture checks.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub min_bias_frames: usize,
    pub min_dark_frames: usize,
    pub min_flat_frames: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            min_bias_frames: 30,
            min_dark_frames: 20,
            min_flat_frames: 20,
        }
    }
}
