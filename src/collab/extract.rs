//! Audio extraction from media containers.

use super::CommandTemplate;
use crate::error::{CaptionError, Result};
use std::path::{Path, PathBuf};

/// Produces a WAV track from a media file.
pub trait AudioExtractor: Send + Sync {
    /// Write the audio of `media` to `output` and return the written path.
    fn extract(&self, media: &Path, output: &Path) -> Result<PathBuf>;
}

/// Whether a path already names a WAV file.
pub fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
}

/// Where the extracted audio for `media` goes inside `workdir`.
pub fn audio_path_for(media: &Path, workdir: &Path) -> PathBuf {
    let stem = media
        .file_stem()
        .map_or_else(|| "audio".into(), |s| s.to_string_lossy());
    workdir.join(format!("{stem}.wav"))
}

/// Extracts with an external tool (`ffmpeg` by default).
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    command: CommandTemplate,
}

impl CommandExtractor {
    pub fn new(command: &str) -> Self {
        Self {
            command: CommandTemplate::new("extract", command),
        }
    }
}

impl AudioExtractor for CommandExtractor {
    fn extract(&self, media: &Path, output: &Path) -> Result<PathBuf> {
        let input = media.to_string_lossy().into_owned();
        let out = output.to_string_lossy().into_owned();
        self.command
            .run(&[("input", input.as_str()), ("output", out.as_str())])?;

        if !output.is_file() {
            return Err(CaptionError::ExternalService {
                service: self.command.service(),
                message: format!("no audio written to {}", output.display()),
            });
        }
        tracing::info!(media = %media.display(), audio = %output.display(), "extracted audio");
        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn wav_detection_ignores_case() {
        assert!(is_wav(Path::new("/a/talk.wav")));
        assert!(is_wav(Path::new("TALK.WAV")));
        assert!(!is_wav(Path::new("talk.mp4")));
        assert!(!is_wav(Path::new("wav")));
    }

    #[test]
    fn audio_path_uses_media_stem() {
        assert_eq!(
            audio_path_for(Path::new("/v/my_talk.mp4"), Path::new("/w")),
            PathBuf::from("/w/my_talk.wav")
        );
    }

    #[cfg(unix)]
    #[test]
    fn copy_command_acts_as_extractor() {
        let dir = TempDir::new().unwrap();
        let media = dir.path().join("in.bin");
        std::fs::write(&media, b"RIFF").unwrap();
        let out = dir.path().join("out.wav");

        let extractor = CommandExtractor::new("cp {input} {output}");
        assert_eq!(extractor.extract(&media, &out).unwrap(), out);
        assert!(out.is_file());
    }

    #[cfg(unix)]
    #[test]
    fn silent_success_without_output_is_an_error() {
        let dir = TempDir::new().unwrap();
        let extractor = CommandExtractor::new("true");
        let err = extractor
            .extract(&dir.path().join("in.mp4"), &dir.path().join("out.wav"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalService);
    }
}
