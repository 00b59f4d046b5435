use serde::{Deserialize, Serialize};

use crate::config::NamingConfig;

/// Acquisition category of a capture sequence.
///
/// `ORDER` is the pipeline dependency order: flats are calibrated with the
/// bias master, lights with the dark and flat masters, so earlier kinds must
/// be stacked before later ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Biases,
    Darks,
    Flats,
    Lights,
}

impl FrameKind {
    pub const ORDER: [FrameKind; 4] = [
        FrameKind::Biases,
        FrameKind::Darks,
        FrameKind::Flats,
        FrameKind::Lights,
    ];

    /// Biases are a cross-night library artifact, never split per night.
    pub fn supports_multi_night(self) -> bool {
        !matches!(self, FrameKind::Biases)
    }

    /// Kinds that run the calibrate stage (with a master correction frame).
    pub fn is_calibrated(self) -> bool {
        matches!(self, FrameKind::Flats | FrameKind::Lights)
    }

    /// Kinds whose stacked master may be persisted to the cross-session library.
    pub fn saves_to_library(self) -> bool {
        matches!(self, FrameKind::Biases | FrameKind::Darks)
    }

    /// The dark library key additionally carries the exposure time, since
    /// dark current scales with exposure.
    pub fn library_key_includes_exposure(self) -> bool {
        matches!(self, FrameKind::Darks)
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Biases => write!(f, "biases"),
            Self::Darks => write!(f, "darks"),
            Self::Flats => write!(f, "flats"),
            Self::Lights => write!(f, "lights"),
        }
    }
}

/// Immutable descriptor for one acquisition category within a session.
///
/// Constructed once from configuration at pipeline start; all derived names
/// (sequence, stacked output) are deterministic functions of it.
#[derive(Clone, Debug)]
pub struct Frame {
    pub kind: FrameKind,
    /// Logical sequence name, also the raw capture directory name.
    pub name: String,
    /// Directory holding raw captures, relative to the session working dir.
    pub source_dir: String,
    /// Directory for intermediate artifacts, relative to `source_dir`.
    pub process_dir: String,
    /// Stacked output name: `stacked_prefix + name`.
    pub stacked_name: String,
}

impl Frame {
    pub fn new(kind: FrameKind, naming: &NamingConfig) -> Self {
        let name = naming.frame_name(kind).to_string();
        Self {
            kind,
            source_dir: name.clone(),
            process_dir: naming.process_dir.clone(),
            stacked_name: format!("{}{}", naming.stacked_prefix, name),
            name,
        }
    }

    /// Sequence name the engine operates on, suffixed by the night
    /// identifier in multi-night mode.
    pub fn sequence_name(&self, night: &str) -> String {
        if night.is_empty() {
            self.name.clone()
        } else {
            format!("{}_{}", self.name, night)
        }
    }

    /// Stacked output name, suffixed by the night identifier when non-empty.
    pub fn stacked_name_for(&self, night: &str) -> String {
        if night.is_empty() {
            self.stacked_name.clone()
        } else {
            format!("{}_{}", self.stacked_name, night)
        }
    }
}
