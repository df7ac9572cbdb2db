//! captioncraft - Subtitles for long recordings
//!
//! Splits long media into segments, transcribes each one with an external
//! speech-to-text tool, stitches the per-segment subtitles back onto one
//! timeline and converts the result to an editable speaker table that can be
//! translated, speaker-renamed and burned into the video.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod collab;
pub mod config;
pub mod defaults;
#[cfg(feature = "cli")]
pub mod diagnostics;
pub mod error;
pub mod language;
pub mod logging;
pub mod pipeline;
pub mod reassembly;
pub mod subtitle;
pub mod table;
pub mod workdir;

// Collaborator seams (fetch → extract → transcribe → translate → render)
pub use collab::{AudioExtractor, MediaFetcher, Renderer, SegmentTranscriber, Translator};

// Pipeline
pub use pipeline::{
    CancelToken, Collaborators, FinalizedSession, Pipeline, PipelineConfig, RunRequest, Stage,
};

// Engine and format bridge
pub use reassembly::{reassemble, reassemble_dir};
pub use table::{TranscriptRow, TranscriptTable, csv_to_srt, srt_to_csv};

// Error handling
pub use error::{CaptionError, ErrorKind, Result};

// Config
pub use config::Config;
pub use language::Language;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
