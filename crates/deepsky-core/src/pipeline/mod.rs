pub mod orchestrator;
pub mod params;
pub mod types;

pub use orchestrator::{Orchestrator, RunOptions};
pub use types::{
    FrameOutcome, FrameRunResult, NightResult, NoOpReporter, PipelineReport, PipelineStage,
    ProgressReporter,
};
