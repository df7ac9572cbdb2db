//! Audio segmentation.

pub mod splitter;

pub use splitter::{Segment, SegmentSplitter, wav_duration};
