use thiserror::Error;

use crate::frame::FrameKind;
use crate::pipeline::PipelineStage;

#[derive(Error, Debug)]
pub enum DeepskyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("multi-night layout is not supported for {0} frames")]
    UnsupportedFrame(FrameKind),

    #[error("no stacked file found for {frame}{}; run the stack stage first", night_suffix(.night))]
    StackedFileNotFound { frame: String, night: String },

    #[error("camera metadata unavailable: {0}")]
    MetadataUnavailable(String),

    #[error("{stage} failed for {frame} frames")]
    Stage { frame: String, stage: PipelineStage },

    #[error("engine error: {0}")]
    Engine(String),

    #[error("external tool failed: {0}")]
    Tool(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

fn night_suffix(night: &str) -> String {
    if night.is_empty() {
        String::new()
    } else {
        format!(" (night {night})")
    }
}

pub type Result<T> = std::result::Result<T, DeepskyError>;
