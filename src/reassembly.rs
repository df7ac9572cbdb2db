//! Reassembly of segment-local subtitles into one global transcript.
//!
//! Each segment subtitle numbers its cues from 1 and times them from its own
//! start. Merging shifts every time range by the segment's offset on the
//! global timeline and renumbers cues with one counter shared across all
//! segments, in ordinal order.

use crate::error::{CaptionError, Result};
use crate::subtitle::{Line, TimeRange, classify_line};
use crate::workdir::{ordinal_from_path, write_atomic};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A segment-local subtitle file and where it sits on the global timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTranscript {
    pub ordinal: usize,
    pub path: PathBuf,
    pub offset: Duration,
}

/// Outcome of a successful reassembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassembled {
    pub path: PathBuf,
    pub cues: u64,
    pub segments: usize,
}

/// Offsets as a running sum of measured segment durations, starting at zero.
pub fn offsets_from_durations<I>(durations: I) -> Vec<Duration>
where
    I: IntoIterator<Item = Duration>,
{
    let mut elapsed = Duration::ZERO;
    durations
        .into_iter()
        .map(|d| {
            let offset = elapsed;
            elapsed += d;
            offset
        })
        .collect()
}

/// Offsets of `ordinal * slice` for `count` segments.
///
/// Only exact when every segment but the last has exactly the slice length.
pub fn uniform_offsets(count: usize, slice: Duration) -> Vec<Duration> {
    (0..count).map(|i| slice * i as u32).collect()
}

/// Find segment subtitles in `dir`, sorted by the ordinal embedded in their
/// file names.
pub fn discover(dir: &Path) -> Result<Vec<(usize, PathBuf)>> {
    let entries = fs::read_dir(dir).map_err(|e| CaptionError::fs(dir, e))?;
    let mut found: BTreeMap<usize, PathBuf> = BTreeMap::new();

    for entry in entries {
        let path = entry.map_err(|e| CaptionError::fs(dir, e))?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("srt") {
            continue;
        }
        let ordinal = ordinal_from_path(&path).ok_or_else(|| CaptionError::SegmentParse {
            path: path.clone(),
            line: 0,
            message: "file name carries no segment ordinal".to_string(),
        })?;
        if let Some(previous) = found.insert(ordinal, path.clone()) {
            return Err(CaptionError::SegmentParse {
                path,
                line: 0,
                message: format!(
                    "ordinal {ordinal} already used by {}",
                    previous.display()
                ),
            });
        }
    }

    Ok(found.into_iter().collect())
}

/// Merge segment subtitles into one SRT document.
///
/// Returns the merged text and the number of cues. Any malformed time range
/// fails the whole merge.
pub fn merge(transcripts: &[SegmentTranscript]) -> Result<(String, u64)> {
    let mut ordered: Vec<&SegmentTranscript> = transcripts.iter().collect();
    ordered.sort_by_key(|t| t.ordinal);

    let mut out = String::new();
    let mut next_index: u64 = 1;

    for transcript in ordered {
        let content =
            fs::read_to_string(&transcript.path).map_err(|e| CaptionError::fs(&transcript.path, e))?;
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

        for (i, line) in content.lines().enumerate() {
            let kind = classify_line(line).map_err(|e| CaptionError::SegmentParse {
                path: transcript.path.clone(),
                line: i + 1,
                message: e.to_string(),
            })?;
            match kind {
                Line::Index(_) => {
                    out.push_str(&next_index.to_string());
                    next_index += 1;
                }
                Line::TimeRange(range) => {
                    let shifted = TimeRange {
                        start: range.start.add_offset(transcript.offset),
                        end: range.end.add_offset(transcript.offset),
                    };
                    out.push_str(&shifted.to_string());
                }
                Line::Text(text) => out.push_str(text),
            }
            out.push('\n');
        }

        tracing::debug!(
            ordinal = transcript.ordinal,
            offset_secs = transcript.offset.as_secs_f64(),
            "merged segment subtitle"
        );
    }

    Ok((out, next_index - 1))
}

/// Merge `transcripts` and write the result to `output`.
///
/// Nothing is written unless every segment merged cleanly.
pub fn reassemble(transcripts: &[SegmentTranscript], output: &Path) -> Result<Reassembled> {
    let (merged, cues) = merge(transcripts)?;
    write_atomic(output, |tmp| {
        fs::write(tmp, &merged).map_err(|e| CaptionError::fs(tmp, e))
    })?;

    tracing::info!(
        output = %output.display(),
        cues,
        segments = transcripts.len(),
        "reassembled transcript"
    );
    Ok(Reassembled {
        path: output.to_path_buf(),
        cues,
        segments: transcripts.len(),
    })
}

/// Reassemble every segment subtitle found in `dir`, using `ordinal * slice`
/// offsets.
pub fn reassemble_dir(dir: &Path, slice: Duration, output: &Path) -> Result<Reassembled> {
    let found = discover(dir)?;
    if found.is_empty() {
        return Err(CaptionError::SubtitleParse {
            message: format!("no segment subtitles found in {}", dir.display()),
        });
    }
    if let Some((position, (ordinal, _))) = found
        .iter()
        .enumerate()
        .find(|(position, (ordinal, _))| position != ordinal)
    {
        tracing::warn!(
            position,
            ordinal,
            "segment ordinals are not contiguous; offsets follow file order"
        );
    }

    let offsets = uniform_offsets(found.len(), slice);
    let transcripts: Vec<SegmentTranscript> = found
        .into_iter()
        .zip(offsets)
        .map(|((ordinal, path), offset)| SegmentTranscript {
            ordinal,
            path,
            offset,
        })
        .collect();
    reassemble(&transcripts, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::subtitle::parse_cues;
    use tempfile::TempDir;

    fn segment_srt(cues: usize) -> String {
        let mut out = String::new();
        for i in 0..cues {
            let start = i as u64 * 2;
            out.push_str(&format!(
                "{}\n00:00:{:02},000 --> 00:00:{:02},500\n[SPEAKER_0{}]: line {}\n\n",
                i + 1,
                start,
                start + 1,
                i % 2,
                i + 1
            ));
        }
        out
    }

    fn write_segments(dir: &Path, counts: &[usize]) -> Vec<PathBuf> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                let path = dir.join(format!("chunk_{i:04}.srt"));
                fs::write(&path, segment_srt(n)).unwrap();
                path
            })
            .collect()
    }

    fn transcripts(paths: &[PathBuf], slice: Duration) -> Vec<SegmentTranscript> {
        paths
            .iter()
            .enumerate()
            .map(|(i, p)| SegmentTranscript {
                ordinal: i,
                path: p.clone(),
                offset: slice * i as u32,
            })
            .collect()
    }

    #[test]
    fn renumbers_cues_contiguously_across_segments() {
        let dir = TempDir::new().unwrap();
        let paths = write_segments(dir.path(), &[5, 3, 4]);
        let output = dir.path().join("result.srt");

        let result = reassemble(&transcripts(&paths, Duration::from_secs(300)), &output).unwrap();
        assert_eq!(result.cues, 12);
        assert_eq!(result.segments, 3);

        let cues = parse_cues(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(cues.len(), 12);

        let content = fs::read_to_string(&output).unwrap();
        let indices: Vec<u64> = content
            .lines()
            .filter_map(|l| match classify_line(l).unwrap() {
                Line::Index(n) => Some(n),
                _ => None,
            })
            .collect();
        assert_eq!(indices, (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn shifts_each_segment_by_its_offset() {
        let dir = TempDir::new().unwrap();
        let paths = write_segments(dir.path(), &[1, 1, 2]);
        fs::write(
            &paths[2],
            "1\n00:00:02,000 --> 00:00:03,250\n[SPEAKER_01]: third\n\n",
        )
        .unwrap();
        let output = dir.path().join("result.srt");

        reassemble(&transcripts(&paths, Duration::from_secs(300)), &output).unwrap();

        let cues = parse_cues(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(cues[0].range.start.to_string(), "00:00:00,000");
        assert_eq!(cues[1].range.start.to_string(), "00:05:00,000");
        assert_eq!(cues[2].range.start.to_string(), "00:10:02,000");
        assert_eq!(cues[2].range.end.to_string(), "00:10:03,250");
        assert_eq!(cues[2].text, "[SPEAKER_01]: third");
    }

    #[test]
    fn fractional_offsets_carry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chunk_0001.srt");
        fs::write(&path, "1\n00:04:59,800 --> 00:04:59,900\nhi\n").unwrap();

        let (merged, cues) = merge(&[SegmentTranscript {
            ordinal: 1,
            path,
            offset: Duration::from_millis(500),
        }])
        .unwrap();
        assert_eq!(cues, 1);
        assert_eq!(merged, "1\n00:05:00,300 --> 00:05:00,400\nhi\n");
    }

    #[test]
    fn merges_in_ordinal_order_regardless_of_input_order() {
        let dir = TempDir::new().unwrap();
        let paths = write_segments(dir.path(), &[1, 1]);
        fs::write(&paths[0], "1\n00:00:00,000 --> 00:00:01,000\nfirst\n\n").unwrap();
        fs::write(&paths[1], "1\n00:00:00,000 --> 00:00:01,000\nsecond\n\n").unwrap();

        let mut inputs = transcripts(&paths, Duration::from_secs(60));
        inputs.reverse();
        let (merged, _) = merge(&inputs).unwrap();
        let cues = parse_cues(&merged).unwrap();
        assert_eq!(cues[0].text, "first");
        assert_eq!(cues[1].text, "second");
        assert_eq!(cues[1].range.start.to_string(), "00:01:00,000");
    }

    #[test]
    fn malformed_time_range_fails_without_output() {
        let dir = TempDir::new().unwrap();
        let paths = write_segments(dir.path(), &[2, 2]);
        fs::write(&paths[1], "1\n00:00:01,000 --> 00:00:xx,000\nbroken\n").unwrap();
        let output = dir.path().join("result.srt");

        let err = reassemble(&transcripts(&paths, Duration::from_secs(300)), &output).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SegmentParse);
        match err {
            CaptionError::SegmentParse { path, line, .. } => {
                assert_eq!(path, paths[1]);
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!output.exists());
    }

    #[test]
    fn text_and_blank_lines_are_copied_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chunk_0000.srt");
        fs::write(&path, "1\n00:00:00,000 --> 00:00:01,000\n  spaced text  \n\n").unwrap();
        let (merged, _) = merge(&[SegmentTranscript {
            ordinal: 0,
            path,
            offset: Duration::ZERO,
        }])
        .unwrap();
        assert_eq!(merged, "1\n00:00:00,000 --> 00:00:01,000\n  spaced text  \n\n");
    }

    #[test]
    fn discover_sorts_numerically() {
        let dir = TempDir::new().unwrap();
        for name in ["chunk_0010.srt", "chunk_0002.srt", "chunk_0001.srt", "notes.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let found = discover(dir.path()).unwrap();
        let ordinals: Vec<usize> = found.iter().map(|(o, _)| *o).collect();
        assert_eq!(ordinals, vec![1, 2, 10]);
    }

    #[test]
    fn discover_rejects_unnumbered_and_duplicate_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("transcript.srt"), "").unwrap();
        assert_eq!(
            discover(dir.path()).unwrap_err().kind(),
            ErrorKind::SegmentParse
        );

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("chunk_1.srt"), "").unwrap();
        fs::write(dir.path().join("chunk_0001.srt"), "").unwrap();
        assert_eq!(
            discover(dir.path()).unwrap_err().kind(),
            ErrorKind::SegmentParse
        );
    }

    #[test]
    fn reassemble_dir_uses_slice_offsets() {
        let dir = TempDir::new().unwrap();
        write_segments(dir.path(), &[5, 3, 4]);
        let output = dir.path().join("merged.srt");

        let result = reassemble_dir(dir.path(), Duration::from_secs(300), &output).unwrap();
        assert_eq!(result.cues, 12);

        let cues = parse_cues(&fs::read_to_string(&output).unwrap()).unwrap();
        // First cue of segment 1 follows the five cues of segment 0
        assert_eq!(cues[5].range.start.to_string(), "00:05:00,000");
        assert_eq!(cues[8].range.start.to_string(), "00:10:00,000");
    }

    #[test]
    fn reassemble_dir_fails_when_empty() {
        let dir = TempDir::new().unwrap();
        let err = reassemble_dir(dir.path(), Duration::from_secs(300), &dir.path().join("r.srt"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SubtitleParse);
    }

    #[test]
    fn offsets_accumulate_measured_durations() {
        let offsets = offsets_from_durations([
            Duration::from_secs(300),
            Duration::from_millis(299_500),
            Duration::from_secs(120),
        ]);
        assert_eq!(
            offsets,
            vec![
                Duration::ZERO,
                Duration::from_secs(300),
                Duration::from_millis(599_500)
            ]
        );
        assert!(offsets_from_durations(Vec::new()).is_empty());
    }

    #[test]
    fn uniform_offsets_multiply_slice() {
        assert_eq!(
            uniform_offsets(3, Duration::from_secs(300)),
            vec![
                Duration::ZERO,
                Duration::from_secs(300),
                Duration::from_secs(600)
            ]
        );
    }
}
