//! Bounded fan-out of per-segment transcription.
//!
//! Segments are pulled from a shared cursor by a fixed number of scoped
//! worker threads. Completion order does not matter: every result is keyed by
//! the segment ordinal and offsets are computed afterwards from measured
//! durations.

use super::types::{CancelToken, Stage};
use crate::audio::Segment;
use crate::collab::SegmentTranscriber;
use crate::error::{CaptionError, Result};
use crate::language::Language;
use crate::reassembly::{SegmentTranscript, offsets_from_durations};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

/// Transcribe every segment with at most `workers` in flight.
///
/// All segments must succeed. After the first failure no new segment is
/// started and the failure with the lowest ordinal is returned.
pub fn transcribe_segments(
    segments: &[Segment],
    transcriber: &dyn SegmentTranscriber,
    language: Language,
    output_dir: &Path,
    workers: usize,
    cancel: &CancelToken,
    progress: bool,
) -> Result<Vec<SegmentTranscript>> {
    if segments.is_empty() {
        return Ok(Vec::new());
    }
    let workers = workers.clamp(1, segments.len());
    let pb = progress.then(|| progress_bar(segments.len()));

    let cursor = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let results: Mutex<Vec<Option<Result<PathBuf>>>> =
        Mutex::new((0..segments.len()).map(|_| None).collect());

    tracing::info!(
        segments = segments.len(),
        workers,
        backend = transcriber.name(),
        "transcribing segments"
    );

    let panicked = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| {
                    loop {
                        if stop.load(Ordering::SeqCst) {
                            break;
                        }
                        let i = cursor.fetch_add(1, Ordering::SeqCst);
                        let Some(segment) = segments.get(i) else {
                            break;
                        };

                        let outcome = cancel
                            .checkpoint(Stage::Transcribed)
                            .and_then(|()| transcriber.transcribe(segment, language, output_dir));
                        match &outcome {
                            Ok(path) => tracing::debug!(
                                ordinal = segment.ordinal,
                                srt = %path.display(),
                                "segment transcribed"
                            ),
                            Err(e) => {
                                tracing::warn!(ordinal = segment.ordinal, error = %e, "segment failed");
                                stop.store(true, Ordering::SeqCst);
                            }
                        }
                        if let Ok(mut slots) = results.lock() {
                            slots[i] = Some(outcome);
                        }
                        if let Some(pb) = &pb {
                            pb.inc(1);
                        }
                    }
                })
            })
            .collect();

        let mut panicked = false;
        for handle in handles {
            panicked |= handle.join().is_err();
        }
        panicked
    });

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }
    if panicked {
        return Err(CaptionError::Other(
            "transcription worker panicked".to_string(),
        ));
    }

    let slots = results
        .into_inner()
        .map_err(|_| CaptionError::Other("transcription results poisoned".to_string()))?;

    let mut paths = Vec::with_capacity(segments.len());
    for (segment, slot) in segments.iter().zip(slots) {
        match slot {
            Some(Ok(path)) => paths.push(path),
            Some(Err(e)) => return Err(e),
            // Skipped after an earlier failure, which is returned first.
            None => {
                return Err(CaptionError::Other(format!(
                    "segment {} was not transcribed",
                    segment.ordinal
                )));
            }
        }
    }

    let offsets = offsets_from_durations(segments.iter().map(|s| s.duration));
    Ok(segments
        .iter()
        .zip(paths)
        .zip(offsets)
        .map(|((segment, path), offset)| SegmentTranscript {
            ordinal: segment.ordinal,
            path,
            offset,
        })
        .collect())
}

fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        // SAFETY: hardcoded template string, always valid
        #[allow(clippy::expect_used)]
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} transcribing [{bar:40.cyan/blue}] {pos}/{len} segments ({eta})",
            )
            .expect("hardcoded progress bar template")
            .progress_chars("#>-"),
    );
    pb
}
