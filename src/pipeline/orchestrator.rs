//! Staged pipeline: media → audio → segments → transcripts → subtitle →
//! table → optional translation.

use super::session::FinalizedSession;
use super::types::{CancelToken, RunRequest, Stage};
use super::workers::transcribe_segments;
use crate::audio::{Segment, SegmentSplitter};
use crate::collab::extract::{audio_path_for, is_wav};
use crate::collab::{
    AudioExtractor, CommandExtractor, CommandFetcher, CommandTranscriber, CommandTranslator,
    MediaFetcher, SegmentTranscriber, Translator, translate_to_files,
};
use crate::config::Config;
use crate::defaults;
use crate::error::{CaptionError, Result};
use crate::reassembly::{Reassembled, SegmentTranscript, reassemble};
use crate::table::{TranscriptTable, srt_to_csv};
use crate::workdir::{WorkDir, prepare_segment_dir};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Length of each audio segment
    pub slice: Duration,
    /// Segments transcribed concurrently
    pub workers: usize,
    /// Remove per-segment files after a successful run
    pub delete_intermediate: bool,
    /// Show a progress bar while transcribing
    pub progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            slice: Duration::from_secs(defaults::SPLIT_LENGTH_MINUTES * 60),
            workers: defaults::TRANSCRIBE_WORKERS,
            delete_intermediate: false,
            progress: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            slice: Duration::from_secs(config.audio.split_length_minutes * 60),
            workers: config.transcribe.workers,
            delete_intermediate: config.pipeline.delete_intermediate,
            progress: false,
        }
    }
}

/// External tools the pipeline delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn MediaFetcher>,
    pub extractor: Arc<dyn AudioExtractor>,
    pub transcriber: Arc<dyn SegmentTranscriber>,
    pub translator: Arc<dyn Translator>,
}

impl Collaborators {
    /// Command-backed collaborators built from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            fetcher: Arc::new(CommandFetcher::new(
                &config.fetch.command,
                Some(config.fetch.title_command.as_str()),
                config.fetch.downloads_dir.clone(),
            )),
            extractor: Arc::new(CommandExtractor::new(&config.audio.extract_command)),
            transcriber: Arc::new(CommandTranscriber::new(&config.transcribe.command)),
            translator: Arc::new(CommandTranslator::new(&config.translate.command)),
        }
    }
}

/// Media located on disk, and the directory all outputs go to.
#[derive(Debug)]
struct Located {
    workdir: WorkDir,
    media: PathBuf,
}

/// Runs a request through every stage in order.
pub struct Pipeline {
    config: PipelineConfig,
    collaborators: Collaborators,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline.
    ///
    /// Any stage failure aborts the run and is returned unchanged. Per-segment
    /// files are only removed after every stage succeeded.
    pub fn run(&self, request: &RunRequest, cancel: &CancelToken) -> Result<FinalizedSession> {
        request.validate()?;
        let splitter = SegmentSplitter::new(self.config.slice)?;

        let located = step(Stage::LocatedMedia, cancel, || self.locate(request))?;
        let wd = &located.workdir;

        let audio = step(Stage::AudioExtracted, cancel, || {
            self.extract(&located.media, wd.root())
        })?;
        let segments = step(Stage::Segmented, cancel, || {
            splitter.split(&audio, &wd.chunks_dir())
        })?;
        let transcripts = step(Stage::Transcribed, cancel, || {
            self.transcribe(&segments, request, wd, cancel)
        })?;
        let merged = step(Stage::Reassembled, cancel, || {
            reassemble(&transcripts, &wd.result_srt())
        })?;
        let table = step(Stage::Tabulated, cancel, || {
            srt_to_csv(&merged.path, &wd.result_csv())
        })?;

        if let Some(destination) = request.destination {
            step(Stage::Translated, cancel, || {
                translate_to_files(
                    &table,
                    request.source,
                    destination,
                    self.collaborators.translator.as_ref(),
                    &wd.translated_csv(destination),
                    &wd.translated_srt(destination),
                )
            })?;
        }

        step(Stage::Finalized, cancel, || {
            self.finalize(&located, &merged, &table, request)
        })
    }

    fn locate(&self, request: &RunRequest) -> Result<Located> {
        let input = request.input.trim();
        let (default_dir, media) = if input.starts_with("http://") || input.starts_with("https://")
        {
            let fetched = self.collaborators.fetcher.fetch(input)?;
            (fetched.dir, fetched.media)
        } else {
            let path = Path::new(input);
            if !path.is_file() {
                let message = if path.exists() {
                    "not a regular file"
                } else {
                    "no such file and not an http(s) URL"
                };
                return Err(CaptionError::Acquisition {
                    input: input.to_string(),
                    message: message.to_string(),
                });
            }
            let parent = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            };
            (parent, path.to_path_buf())
        };

        let root = request.workdir.clone().unwrap_or(default_dir);
        fs::create_dir_all(&root).map_err(|e| CaptionError::fs(&root, e))?;
        tracing::info!(media = %media.display(), workdir = %root.display(), "located media");
        Ok(Located {
            workdir: WorkDir::new(root),
            media,
        })
    }

    fn extract(&self, media: &Path, root: &Path) -> Result<PathBuf> {
        if is_wav(media) {
            tracing::debug!(media = %media.display(), "input is already WAV");
            return Ok(media.to_path_buf());
        }
        self.collaborators
            .extractor
            .extract(media, &audio_path_for(media, root))
    }

    fn transcribe(
        &self,
        segments: &[Segment],
        request: &RunRequest,
        wd: &WorkDir,
        cancel: &CancelToken,
    ) -> Result<Vec<SegmentTranscript>> {
        let output_dir = wd.transcribe_results_dir();
        prepare_segment_dir(&output_dir, "srt")?;
        transcribe_segments(
            segments,
            self.collaborators.transcriber.as_ref(),
            request.source,
            &output_dir,
            self.config.workers,
            cancel,
            self.config.progress,
        )
    }

    fn finalize(
        &self,
        located: &Located,
        merged: &Reassembled,
        table: &TranscriptTable,
        request: &RunRequest,
    ) -> Result<FinalizedSession> {
        let session = FinalizedSession::new(
            &located.workdir,
            located.media.clone(),
            request.destination,
        );

        if self.config.delete_intermediate
            && let Err(e) = located.workdir.remove_intermediate()
        {
            tracing::warn!(error = %e, "failed to remove intermediate files");
        }

        tracing::info!(
            cues = merged.cues,
            segments = merged.segments,
            rows = table.len(),
            subtitle = %session.subtitle_path().display(),
            "pipeline finished"
        );
        Ok(session)
    }
}

/// Run one stage: honor cancellation, then log the outcome under its label.
fn step<T>(stage: Stage, cancel: &CancelToken, run: impl FnOnce() -> Result<T>) -> Result<T> {
    cancel.checkpoint(stage)?;
    tracing::debug!(%stage, "entering stage");
    match run() {
        Ok(value) => {
            tracing::debug!(%stage, "stage complete");
            Ok(value)
        }
        Err(e) => {
            tracing::error!(%stage, kind = %e.kind(), error = %e, "stage failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::fetch::FetchedMedia;
    use crate::collab::{MockTranscriber, MockTranslator};
    use crate::error::ErrorKind;
    use crate::language::Language;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use tempfile::TempDir;

    const RATE: u32 = 100;

    fn write_wav(path: &Path, seconds: u32) {
        let spec = WavSpec {
            channels: 1,
            sample_rate: RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for _ in 0..seconds * RATE {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    struct NoFetch;

    impl MediaFetcher for NoFetch {
        fn fetch(&self, url: &str) -> Result<FetchedMedia> {
            Err(CaptionError::Acquisition {
                input: url.to_string(),
                message: "offline".to_string(),
            })
        }
    }

    struct NoExtract;

    impl AudioExtractor for NoExtract {
        fn extract(&self, media: &Path, _output: &Path) -> Result<PathBuf> {
            Err(CaptionError::ExternalService {
                service: "extract",
                message: format!("unexpected extraction of {}", media.display()),
            })
        }
    }

    fn pipeline(transcriber: MockTranscriber, minutes: u64) -> Pipeline {
        Pipeline::new(
            PipelineConfig {
                slice: Duration::from_secs(minutes * 60),
                ..PipelineConfig::default()
            },
            Collaborators {
                fetcher: Arc::new(NoFetch),
                extractor: Arc::new(NoExtract),
                transcriber: Arc::new(transcriber),
                translator: Arc::new(MockTranslator::new()),
            },
        )
    }

    #[test]
    fn wav_input_runs_every_stage() {
        let dir = TempDir::new().unwrap();
        let audio = dir.path().join("talk.wav");
        write_wav(&audio, 12 * 60);

        let session = pipeline(MockTranscriber::new("mock"), 5)
            .run(
                &RunRequest::new(audio.to_string_lossy(), Language::English),
                &CancelToken::new(),
            )
            .unwrap();

        assert_eq!(session.workdir(), dir.path());
        assert_eq!(session.subtitle_path(), dir.path().join("result.srt"));
        let srt = fs::read_to_string(session.subtitle_path()).unwrap();
        assert!(srt.contains("3\n00:10:00,000 --> 00:10:01,000\n[SPEAKER_00]: segment 2\n"));

        let table = session.table().unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[1].speaker, "SPEAKER_00");
        assert_eq!(table.rows()[1].text, "segment 1");
        assert!(dir.path().join("chunks/chunk_0002.wav").exists());
    }

    #[test]
    fn unknown_input_is_acquisition_error() {
        let dir = TempDir::new().unwrap();
        let err = pipeline(MockTranscriber::new("mock"), 5)
            .run(
                &RunRequest::new(dir.path().join("nope.mp4").to_string_lossy(), Language::English),
                &CancelToken::new(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Acquisition);

        let err = pipeline(MockTranscriber::new("mock"), 5)
            .run(
                &RunRequest::new("ftp://host/video.mp4", Language::English),
                &CancelToken::new(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Acquisition);
    }

    #[test]
    fn untranslatable_destination_fails_before_any_stage() {
        let dir = TempDir::new().unwrap();
        let audio = dir.path().join("talk.wav");
        write_wav(&audio, 60);
        let transcriber = MockTranscriber::new("mock");

        let err = pipeline(transcriber.clone(), 5)
            .run(
                &RunRequest::new(audio.to_string_lossy(), Language::English)
                    .with_destination(Language::Greek),
                &CancelToken::new(),
            )
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnsupportedLanguage);
        assert!(transcriber.calls().is_empty());
        assert!(!dir.path().join("chunks").exists());
    }

    #[test]
    fn cancelled_run_names_first_stage() {
        let dir = TempDir::new().unwrap();
        let audio = dir.path().join("talk.wav");
        write_wav(&audio, 60);
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = pipeline(MockTranscriber::new("mock"), 5)
            .run(&RunRequest::new(audio.to_string_lossy(), Language::English), &cancel)
            .unwrap_err();
        match err {
            CaptionError::Cancelled { stage } => assert_eq!(stage, "locate-media"),
            other => panic!("expected Cancelled, got {other:?}"),
        }
    }

    #[test]
    fn workdir_override_receives_outputs() {
        let dir = TempDir::new().unwrap();
        let audio = dir.path().join("talk.wav");
        write_wav(&audio, 30);
        let out = dir.path().join("out/nested");

        let session = pipeline(MockTranscriber::new("mock"), 5)
            .run(
                &RunRequest::new(audio.to_string_lossy(), Language::English).with_workdir(&out),
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(session.workdir(), out);
        assert!(out.join("result.csv").is_file());
        assert!(!dir.path().join("result.csv").exists());
    }

    #[test]
    fn non_wav_media_goes_through_extractor() {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("talk.mp4");
        fs::write(&video, b"not really a video").unwrap();

        let err = pipeline(MockTranscriber::new("mock"), 5)
            .run(
                &RunRequest::new(video.to_string_lossy(), Language::English),
                &CancelToken::new(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalService);
        assert!(err.to_string().contains("unexpected extraction"));
    }
}
