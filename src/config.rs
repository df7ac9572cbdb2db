use crate::collab::SubtitleStyle;
use crate::defaults;
use crate::error::{CaptionError, Result};
use crate::language::Language;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub transcribe: TranscribeConfig,
    pub translate: TranslateConfig,
    pub render: RenderConfig,
    pub fetch: FetchConfig,
    pub pipeline: PipelineSettings,
}

/// Audio extraction and segmentation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub split_length_minutes: u64,
    pub extract_command: String,
}

/// Per-segment speech-to-text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranscribeConfig {
    pub command: String,
    pub workers: usize,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranslateConfig {
    pub command: String,
}

/// Subtitle burn-in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub command: String,
    pub font_name: String,
    pub font_size: u32,
}

/// Remote media acquisition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub command: String,
    /// Prints the video title; empty disables the lookup.
    pub title_command: String,
    pub downloads_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PipelineSettings {
    /// Remove `chunks/` and `transcribe_results/` after a successful run.
    pub delete_intermediate: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            split_length_minutes: defaults::SPLIT_LENGTH_MINUTES,
            extract_command: defaults::EXTRACT_COMMAND.to_string(),
        }
    }
}

impl Default for TranscribeConfig {
    fn default() -> Self {
        Self {
            command: defaults::TRANSCRIBE_COMMAND.to_string(),
            workers: defaults::TRANSCRIBE_WORKERS,
            language: defaults::DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            command: defaults::TRANSLATE_COMMAND.to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            command: defaults::RENDER_COMMAND.to_string(),
            font_name: defaults::FONT_NAME.to_string(),
            font_size: defaults::FONT_SIZE,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            command: defaults::FETCH_COMMAND.to_string(),
            title_command: defaults::FETCH_TITLE_COMMAND.to_string(),
            downloads_dir: PathBuf::from(defaults::DOWNLOADS_DIR),
        }
    }
}

impl RenderConfig {
    pub fn style(&self) -> SubtitleStyle {
        SubtitleStyle {
            font_name: self.font_name.clone(),
            font_size: self.font_size,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| CaptionError::fs(path, e))?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(CaptionError::Filesystem { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - CAPTIONCRAFT_LANGUAGE → transcribe.language
    /// - CAPTIONCRAFT_SPLIT_MINUTES → audio.split_length_minutes
    /// - CAPTIONCRAFT_WORKERS → transcribe.workers
    ///
    /// Unparseable numbers are ignored with a warning.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(language) = std::env::var("CAPTIONCRAFT_LANGUAGE")
            && !language.is_empty()
        {
            self.transcribe.language = language;
        }

        if let Ok(minutes) = std::env::var("CAPTIONCRAFT_SPLIT_MINUTES")
            && !minutes.is_empty()
        {
            match minutes.parse() {
                Ok(m) => self.audio.split_length_minutes = m,
                Err(_) => tracing::warn!(value = %minutes, "ignoring invalid CAPTIONCRAFT_SPLIT_MINUTES"),
            }
        }

        if let Ok(workers) = std::env::var("CAPTIONCRAFT_WORKERS")
            && !workers.is_empty()
        {
            match workers.parse() {
                Ok(w) => self.transcribe.workers = w,
                Err(_) => tracing::warn!(value = %workers, "ignoring invalid CAPTIONCRAFT_WORKERS"),
            }
        }

        self
    }

    /// Check values that deserialize fine but cannot drive a run.
    pub fn validate(&self) -> Result<()> {
        if self.audio.split_length_minutes == 0 {
            return Err(invalid("audio.split_length_minutes", "must be at least 1"));
        }
        if self.transcribe.workers == 0 {
            return Err(invalid("transcribe.workers", "must be at least 1"));
        }
        if self.render.font_size == 0 {
            return Err(invalid("render.font_size", "must be positive"));
        }
        for (key, command) in [
            ("audio.extract_command", &self.audio.extract_command),
            ("transcribe.command", &self.transcribe.command),
            ("translate.command", &self.translate.command),
            ("render.command", &self.render.command),
            ("fetch.command", &self.fetch.command),
        ] {
            if command.trim().is_empty() {
                return Err(invalid(key, "command must not be empty"));
            }
        }
        self.language()?;
        Ok(())
    }

    /// Configured source language.
    pub fn language(&self) -> Result<Language> {
        self.transcribe.language.parse()
    }

    /// Serialize the effective configuration back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CaptionError::ConfigParse {
            message: e.to_string(),
        })
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/captioncraft/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("captioncraft")
            .join("config.toml")
    }
}

fn invalid(key: &str, message: &str) -> CaptionError {
    CaptionError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
