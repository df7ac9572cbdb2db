use super::CommandTemplate;
use crate::audio::Segment;
use crate::error::{CaptionError, Result};
use crate::language::Language;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Trait for per-segment speech-to-text.
///
/// This trait allows swapping implementations (external tool vs mock).
pub trait SegmentTranscriber: Send + Sync {
    /// Transcribe one audio segment into a segment-local SRT file.
    ///
    /// # Arguments
    /// * `segment` - The audio slice; its file stem names the output
    /// * `language` - Spoken language of the source
    /// * `output_dir` - Directory receiving `<segment stem>.srt`
    ///
    /// # Returns
    /// Path of the written subtitle file. Cue numbering starts at 1 and
    /// timestamps are relative to the start of the segment.
    fn transcribe(&self, segment: &Segment, language: Language, output_dir: &Path)
    -> Result<PathBuf>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Implement SegmentTranscriber for Arc<T> to allow sharing across workers.
impl<T: SegmentTranscriber + ?Sized> SegmentTranscriber for Arc<T> {
    fn transcribe(
        &self,
        segment: &Segment,
        language: Language,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        (**self).transcribe(segment, language, output_dir)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Subtitle path a segment is expected to produce in `output_dir`.
pub fn expected_output(segment: &Segment, output_dir: &Path) -> PathBuf {
    let stem = segment
        .path
        .file_stem()
        .map_or_else(|| crate::defaults::segment_stem(segment.ordinal), |s| {
            s.to_string_lossy().into_owned()
        });
    output_dir.join(format!("{stem}.srt"))
}

/// Transcribes by running an external tool (`whisperx` by default).
#[derive(Debug, Clone)]
pub struct CommandTranscriber {
    command: CommandTemplate,
}

impl CommandTranscriber {
    pub fn new(command: &str) -> Self {
        Self {
            command: CommandTemplate::new("transcribe", command),
        }
    }
}

impl SegmentTranscriber for CommandTranscriber {
    fn transcribe(
        &self,
        segment: &Segment,
        language: Language,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        let expected = expected_output(segment, output_dir);
        let input = segment.path.to_string_lossy().into_owned();
        let dir = output_dir.to_string_lossy().into_owned();
        let output = expected.to_string_lossy().into_owned();

        self.command.run(&[
            ("input", input.as_str()),
            ("output_dir", dir.as_str()),
            ("output", output.as_str()),
            ("language", language.code()),
        ])?;

        if !expected.is_file() {
            return Err(CaptionError::ExternalService {
                service: self.command.service(),
                message: format!(
                    "segment {} produced no subtitle at {}",
                    segment.ordinal,
                    expected.display()
                ),
            });
        }
        Ok(expected)
    }

    fn name(&self) -> &str {
        self.command.program().unwrap_or("transcribe")
    }
}

/// Mock transcriber for testing
///
/// Writes a fixed subtitle body for every segment. `{ordinal}` in the body is
/// replaced with the segment ordinal.
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    name: String,
    response: String,
    fail_on: Option<usize>,
    calls: Arc<Mutex<Vec<usize>>>,
}

impl MockTranscriber {
    /// Create a new mock transcriber that emits one cue per segment
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            response: "1\n00:00:00,000 --> 00:00:01,000\n[SPEAKER_00]: segment {ordinal}\n\n"
                .to_string(),
            fail_on: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Configure the subtitle body written for each segment
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail on one segment ordinal
    pub fn with_failure_on(mut self, ordinal: usize) -> Self {
        self.fail_on = Some(ordinal);
        self
    }

    /// Ordinals transcribed so far, in call order
    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl SegmentTranscriber for MockTranscriber {
    fn transcribe(
        &self,
        segment: &Segment,
        _language: Language,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(segment.ordinal);
        }
        if self.fail_on == Some(segment.ordinal) {
            return Err(CaptionError::ExternalService {
                service: "transcribe",
                message: "mock transcription failure".to_string(),
            });
        }

        fs::create_dir_all(output_dir).map_err(|e| CaptionError::fs(output_dir, e))?;
        let path = expected_output(segment, output_dir);
        let body = self
            .response
            .replace("{ordinal}", &segment.ordinal.to_string());
        fs::write(&path, body).map_err(|e| CaptionError::fs(&path, e))?;
        Ok(path)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
