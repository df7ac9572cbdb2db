//! Subtitle primitives: timestamps, time ranges and SRT cues.

pub mod srt;
pub mod timestamp;

pub use srt::{Cue, Line, TimeRange, classify_line, parse_cues, render_cues};
pub use timestamp::Timestamp;
