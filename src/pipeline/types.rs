//! Data types for the staged pipeline.

use crate::error::{CaptionError, Result};
use crate::language::Language;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Idle,
    LocatedMedia,
    AudioExtracted,
    Segmented,
    Transcribed,
    Reassembled,
    Tabulated,
    Translated,
    Finalized,
}

impl Stage {
    /// The stage label used in logs and errors.
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::LocatedMedia => "locate-media",
            Self::AudioExtracted => "extract-audio",
            Self::Segmented => "segment",
            Self::Transcribed => "transcribe",
            Self::Reassembled => "reassemble",
            Self::Tabulated => "tabulate",
            Self::Translated => "translate",
            Self::Finalized => "finalize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What to run the pipeline on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Local file path or `http(s)://` URL.
    pub input: String,
    pub source: Language,
    /// Translate the transcript into this language when set.
    pub destination: Option<Language>,
    /// Working directory override; defaults to the media's directory.
    pub workdir: Option<PathBuf>,
}

impl RunRequest {
    pub fn new(input: impl Into<String>, source: Language) -> Self {
        Self {
            input: input.into(),
            source,
            destination: None,
            workdir: None,
        }
    }

    pub fn with_destination(mut self, destination: Language) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// Reject unusable languages before any stage runs.
    pub fn validate(&self) -> Result<()> {
        if let Some(destination) = self.destination {
            self.source.ensure_translatable()?;
            destination.ensure_translatable()?;
        }
        Ok(())
    }
}

/// Cooperative cancellation shared between the caller and a running pipeline.
///
/// Checked before each stage and before each segment is transcribed. Work
/// already handed to an external tool runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with `Cancelled` if cancellation was requested.
    pub fn checkpoint(&self, stage: impl fmt::Display) -> Result<()> {
        if self.is_cancelled() {
            return Err(CaptionError::Cancelled {
                stage: stage.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn stages_are_ordered() {
        assert!(Stage::Idle < Stage::LocatedMedia);
        assert!(Stage::Tabulated < Stage::Translated);
        assert!(Stage::Translated < Stage::Finalized);
        assert_eq!(Stage::Reassembled.to_string(), "reassemble");
    }

    #[test]
    fn request_validation() {
        let plain = RunRequest::new("talk.mp4", Language::Latin);
        assert!(plain.validate().is_ok());

        let to_welsh = RunRequest::new("talk.mp4", Language::English).with_destination(Language::Welsh);
        assert_eq!(
            to_welsh.validate().unwrap_err().kind(),
            ErrorKind::UnsupportedLanguage
        );

        let from_latin = RunRequest::new("talk.mp4", Language::Latin).with_destination(Language::English);
        assert!(from_latin.validate().is_err());

        let ok = RunRequest::new("talk.mp4", Language::English)
            .with_destination(Language::Hindi)
            .with_workdir("/w");
        assert!(ok.validate().is_ok());
        assert_eq!(ok.workdir, Some(PathBuf::from("/w")));
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.checkpoint(Stage::Segmented).is_ok());

        clone.cancel();
        assert!(token.is_cancelled());
        let err = token.checkpoint(Stage::Transcribed).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(err.to_string(), "Pipeline cancelled before transcribe");
    }
}
