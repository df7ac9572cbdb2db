//! Fixed-length WAV segmentation.
//!
//! Every segment except the last holds exactly `slice` worth of frames, so the
//! running sum of measured durations places each segment on the global
//! timeline without drift.

use crate::defaults;
use crate::error::{CaptionError, Result};
use crate::workdir::prepare_segment_dir;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One slice of the source audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// 0-based position in the split sequence.
    pub ordinal: usize,
    pub path: PathBuf,
    /// Measured from the frames actually written.
    pub duration: Duration,
}

/// Splits WAV audio into ordinal-named segments.
#[derive(Debug, Clone)]
pub struct SegmentSplitter {
    slice: Duration,
}

impl SegmentSplitter {
    /// Create a splitter with a slice length in whole minutes.
    pub fn from_minutes(minutes: u64) -> Result<Self> {
        Self::new(Duration::from_secs(minutes * 60))
    }

    pub fn new(slice: Duration) -> Result<Self> {
        if slice.as_millis() == 0 {
            return Err(CaptionError::ConfigInvalidValue {
                key: "audio.split_length_minutes".to_string(),
                message: "slice length must be positive".to_string(),
            });
        }
        Ok(Self { slice })
    }

    pub fn slice(&self) -> Duration {
        self.slice
    }

    /// Split `audio` into `out_dir/chunk_NNNN.wav` files.
    ///
    /// Leftover segment files in `out_dir` are removed first.
    pub fn split(&self, audio: &Path, out_dir: &Path) -> Result<Vec<Segment>> {
        let mut reader = WavReader::open(audio).map_err(|e| audio_error(audio, e))?;
        let spec = reader.spec();
        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(CaptionError::Audio {
                path: audio.to_path_buf(),
                message: "invalid channel count or sample rate".to_string(),
            });
        }
        if reader.duration() == 0 {
            return Err(CaptionError::Audio {
                path: audio.to_path_buf(),
                message: "contains no audio frames".to_string(),
            });
        }

        prepare_segment_dir(out_dir, "wav")?;

        let frames_per_slice =
            (self.slice.as_millis() * u128::from(spec.sample_rate) / 1000).max(1) as u64;
        let target = SplitTarget {
            spec,
            out_dir,
            source: audio,
            frames_per_slice,
        };

        let segments = match spec.sample_format {
            SampleFormat::Int => target.write(reader.samples::<i32>())?,
            SampleFormat::Float => target.write(reader.samples::<f32>())?,
        };

        tracing::info!(
            source = %audio.display(),
            segments = segments.len(),
            slice_secs = self.slice.as_secs_f64(),
            "split audio into segments"
        );
        Ok(segments)
    }
}

struct SplitTarget<'a> {
    spec: WavSpec,
    out_dir: &'a Path,
    source: &'a Path,
    frames_per_slice: u64,
}

impl SplitTarget<'_> {
    fn write<S, I>(&self, samples: I) -> Result<Vec<Segment>>
    where
        S: hound::Sample,
        I: Iterator<Item = hound::Result<S>>,
    {
        let channels = u64::from(self.spec.channels);
        let samples_per_slice = (self.frames_per_slice * channels) as usize;
        let mut samples = samples.peekable();
        let mut segments = Vec::new();

        while samples.peek().is_some() {
            let ordinal = segments.len();
            let path = self
                .out_dir
                .join(format!("{}.wav", defaults::segment_stem(ordinal)));
            let mut writer =
                WavWriter::create(&path, self.spec).map_err(|e| audio_error(&path, e))?;

            let mut written: u64 = 0;
            for sample in samples.by_ref().take(samples_per_slice) {
                let sample = sample.map_err(|e| audio_error(self.source, e))?;
                writer
                    .write_sample(sample)
                    .map_err(|e| audio_error(&path, e))?;
                written += 1;
            }
            writer.finalize().map_err(|e| audio_error(&path, e))?;

            let duration = frames_to_duration(written / channels, self.spec.sample_rate);
            tracing::debug!(
                ordinal,
                path = %path.display(),
                duration_secs = duration.as_secs_f64(),
                "wrote segment"
            );
            segments.push(Segment {
                ordinal,
                path,
                duration,
            });
        }

        Ok(segments)
    }
}

fn frames_to_duration(frames: u64, sample_rate: u32) -> Duration {
    let nanos = u128::from(frames) * 1_000_000_000 / u128::from(sample_rate);
    Duration::from_nanos(nanos as u64)
}

/// Measure the duration of a WAV file without decoding samples.
pub fn wav_duration(path: &Path) -> Result<Duration> {
    let reader = WavReader::open(path).map_err(|e| audio_error(path, e))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(CaptionError::Audio {
            path: path.to_path_buf(),
            message: "sample rate is zero".to_string(),
        });
    }
    Ok(frames_to_duration(
        u64::from(reader.duration()),
        spec.sample_rate,
    ))
}

fn audio_error(path: &Path, error: hound::Error) -> CaptionError {
    match error {
        hound::Error::IoError(e) => CaptionError::fs(path, e),
        other => CaptionError::Audio {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    // Low sample rate keeps multi-minute fixtures small.
    const RATE: u32 = 100;

    fn write_wav(path: &Path, channels: u16, seconds: u32) {
        let spec = WavSpec {
            channels,
            sample_rate: RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for i in 0..(seconds * RATE * u32::from(channels)) {
            writer.write_sample((i % 1000) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn twelve_minutes_at_five_minute_slices_yields_three_segments() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("audio.wav");
        write_wav(&source, 1, 12 * 60);

        let splitter = SegmentSplitter::from_minutes(5).unwrap();
        let segments = splitter.split(&source, &dir.path().join("chunks")).unwrap();

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].duration, Duration::from_secs(300));
        assert_eq!(segments[1].duration, Duration::from_secs(300));
        assert_eq!(segments[2].duration, Duration::from_secs(120));
        for (i, segment) in segments.iter().enumerate() {
            assert_eq!(segment.ordinal, i);
            assert!(segment.path.exists());
            assert_eq!(wav_duration(&segment.path).unwrap(), segment.duration);
        }
        assert!(segments[2].path.ends_with("chunks/chunk_0002.wav"));
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("audio.wav");
        write_wav(&source, 1, 10 * 60);

        let segments = SegmentSplitter::from_minutes(5)
            .unwrap()
            .split(&source, dir.path())
            .unwrap();
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.duration == Duration::from_secs(300)));
    }

    #[test]
    fn stereo_segments_keep_frame_boundaries() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("stereo.wav");
        write_wav(&source, 2, 150);

        let segments = SegmentSplitter::new(Duration::from_secs(60))
            .unwrap()
            .split(&source, dir.path())
            .unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[2].duration, Duration::from_secs(30));

        let reader = WavReader::open(&segments[0].path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.duration(), 60 * RATE);
    }

    #[test]
    fn segments_preserve_sample_values() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("audio.wav");
        write_wav(&source, 1, 3);

        let segments = SegmentSplitter::new(Duration::from_secs(2))
            .unwrap()
            .split(&source, dir.path())
            .unwrap();

        let mut joined: Vec<i16> = Vec::new();
        for segment in &segments {
            let mut reader = WavReader::open(&segment.path).unwrap();
            joined.extend(reader.samples::<i16>().map(|s| s.unwrap()));
        }
        let expected: Vec<i16> = (0..3 * RATE).map(|i| (i % 1000) as i16).collect();
        assert_eq!(joined, expected);
    }

    #[test]
    fn stale_segments_are_replaced() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("chunks");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("chunk_0009.wav"), b"stale").unwrap();

        let source = dir.path().join("audio.wav");
        write_wav(&source, 1, 1);
        SegmentSplitter::from_minutes(5)
            .unwrap()
            .split(&source, &out)
            .unwrap();

        assert!(!out.join("chunk_0009.wav").exists());
        assert!(out.join("chunk_0000.wav").exists());
    }

    #[test]
    fn zero_slice_is_rejected() {
        let err = SegmentSplitter::from_minutes(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn missing_source_is_filesystem_error() {
        let dir = TempDir::new().unwrap();
        let err = SegmentSplitter::from_minutes(5)
            .unwrap()
            .split(&dir.path().join("missing.wav"), dir.path())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Filesystem);
    }

    #[test]
    fn garbage_source_is_audio_error() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("garbage.wav");
        std::fs::write(&source, b"XXXX\x00\x00\x00\x00WAVEfmt ").unwrap();
        let err = SegmentSplitter::from_minutes(5)
            .unwrap()
            .split(&source, dir.path())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Audio);
    }

    #[test]
    fn empty_source_is_rejected() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("empty.wav");
        write_wav(&source, 1, 0);
        let err = SegmentSplitter::from_minutes(5)
            .unwrap()
            .split(&source, dir.path())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Audio);
    }
}
