use std::path::{Path, PathBuf};

use crate::frame::FrameKind;

/// Pipeline stage, used for progress reporting and failure attribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Convert,
    Calibrate,
    Register,
    Stack,
    Merge,
    SaveLibrary,
    PostProcess,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Convert => write!(f, "convert"),
            Self::Calibrate => write!(f, "calibration"),
            Self::Register => write!(f, "registration"),
            Self::Stack => write!(f, "stacking"),
            Self::Merge => write!(f, "sequence merge"),
            Self::SaveLibrary => write!(f, "library save"),
            Self::PostProcess => write!(f, "post-processing"),
        }
    }
}

/// Outcome of processing one frame kind (or one night of it).
#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    /// Source directory absent or empty; nothing to do, not an error.
    Skipped,
    /// Processed through to a stacked output.
    Done(PathBuf),
    Failed(String),
}

impl FrameOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Done(path) => Some(path),
            _ => None,
        }
    }
}

/// Per-night sub-result in multi-night mode.
#[derive(Clone, Debug, PartialEq)]
pub struct NightResult {
    pub night: String,
    pub outcome: FrameOutcome,
}

/// Result for one frame kind across all its directories.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRunResult {
    pub kind: FrameKind,
    pub outcome: FrameOutcome,
    pub nights: Vec<NightResult>,
}

impl FrameRunResult {
    pub fn skipped(kind: FrameKind) -> Self {
        Self {
            kind,
            outcome: FrameOutcome::Skipped,
            nights: Vec::new(),
        }
    }

    pub fn failed(kind: FrameKind, reason: String) -> Self {
        Self {
            kind,
            outcome: FrameOutcome::Failed(reason),
            nights: Vec::new(),
        }
    }
}

/// Aggregate outcome of a pipeline run.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub frames: Vec<FrameRunResult>,
}

impl PipelineReport {
    pub fn result_for(&self, kind: FrameKind) -> Option<&FrameRunResult> {
        self.frames.iter().find(|f| f.kind == kind)
    }

    /// Stacked light output, when the lights pipeline completed.
    pub fn stacked_light(&self) -> Option<&Path> {
        self.result_for(FrameKind::Lights)
            .and_then(|r| r.outcome.path())
    }

    pub fn has_failures(&self) -> bool {
        self.frames
            .iter()
            .any(|f| matches!(f.outcome, FrameOutcome::Failed(_)))
    }
}

/// Progress feedback for the pipeline run. All methods default to no-ops.
pub trait ProgressReporter {
    fn begin_frame(&self, _kind: FrameKind) {}
    fn begin_stage(&self, _kind: FrameKind, _stage: PipelineStage) {}
    fn finish_frame(&self, _kind: FrameKind, _outcome: &FrameOutcome) {}
}

/// Used when the caller does not care about progress.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
