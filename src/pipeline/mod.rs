//! Staged transcription pipeline.
//!
//! Each stage consumes the explicit outputs of the previous one. A run either
//! reaches `Finalized` and yields a [`FinalizedSession`] or stops at the first
//! failing stage.

pub mod orchestrator;
pub mod session;
pub mod types;
pub mod workers;

pub use orchestrator::{Collaborators, Pipeline, PipelineConfig};
pub use session::FinalizedSession;
pub use types::{CancelToken, RunRequest, Stage};
pub use workers::transcribe_segments;
