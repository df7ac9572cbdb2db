//! Error types for captioncraft.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptionError {
    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Media acquisition errors
    #[error("Cannot acquire media from '{input}': {message}")]
    Acquisition { input: String, message: String },

    // Language errors
    #[error("Unsupported language: {language}")]
    UnsupportedLanguage { language: String },

    #[error("Language '{language}' cannot be used for translation")]
    UntranslatableLanguage { language: String },

    // Audio errors
    #[error("Failed to read audio {path}: {message}")]
    Audio { path: PathBuf, message: String },

    // Subtitle errors
    #[error("Malformed segment subtitle {path}:{line}: {message}")]
    SegmentParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Malformed subtitle: {message}")]
    SubtitleParse { message: String },

    #[error("Invalid timestamp '{value}'")]
    Timestamp { value: String },

    // Table errors
    #[error("Transcript table error: {0}")]
    Table(#[from] csv::Error),

    #[error("Invalid speaker label '{label}': {message}")]
    SpeakerLabel { label: String, message: String },

    // External collaborator errors
    #[error("{service} failed: {message}")]
    ExternalService {
        service: &'static str,
        message: String,
    },

    // Filesystem errors
    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Pipeline errors
    #[error("Pipeline cancelled before {stage}")]
    Cancelled { stage: String },

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

/// Coarse classification of a [`CaptionError`], stable across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Acquisition,
    UnsupportedLanguage,
    SegmentParse,
    ExternalService,
    Filesystem,
    Config,
    Audio,
    SubtitleParse,
    Table,
    Cancelled,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Acquisition => "acquisition",
            ErrorKind::UnsupportedLanguage => "unsupported-language",
            ErrorKind::SegmentParse => "segment-parse",
            ErrorKind::ExternalService => "external-service",
            ErrorKind::Filesystem => "filesystem",
            ErrorKind::Config => "config",
            ErrorKind::Audio => "audio",
            ErrorKind::SubtitleParse => "subtitle-parse",
            ErrorKind::Table => "table",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

impl CaptionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaptionError::ConfigParse { .. }
            | CaptionError::ConfigInvalidValue { .. }
            | CaptionError::Config(_) => ErrorKind::Config,
            CaptionError::Acquisition { .. } => ErrorKind::Acquisition,
            CaptionError::UnsupportedLanguage { .. }
            | CaptionError::UntranslatableLanguage { .. } => ErrorKind::UnsupportedLanguage,
            CaptionError::Audio { .. } => ErrorKind::Audio,
            CaptionError::SegmentParse { .. } => ErrorKind::SegmentParse,
            CaptionError::SubtitleParse { .. } | CaptionError::Timestamp { .. } => {
                ErrorKind::SubtitleParse
            }
            CaptionError::Table(_) | CaptionError::SpeakerLabel { .. } => ErrorKind::Table,
            CaptionError::ExternalService { .. } => ErrorKind::ExternalService,
            CaptionError::Filesystem { .. } | CaptionError::Io(_) => ErrorKind::Filesystem,
            CaptionError::Cancelled { .. } => ErrorKind::Cancelled,
            CaptionError::Other(_) => ErrorKind::Other,
        }
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CaptionError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, CaptionError>;
