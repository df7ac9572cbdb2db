//! Working-directory layout shared by every pipeline stage.
//!
//! ```text
//! <root>/chunks/chunk_0000.wav ...
//! <root>/transcribe_results/chunk_0000.srt ...
//! <root>/result.srt
//! <root>/result.csv
//! <root>/result_<code>.csv / .srt
//! <root>/subtitled.mp4
//! ```

use crate::defaults;
use crate::error::{CaptionError, Result};
use crate::language::Language;
use std::fs;
use std::path::{Path, PathBuf};

/// Paths inside one pipeline working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn chunks_dir(&self) -> PathBuf {
        self.root.join(defaults::CHUNKS_DIR)
    }

    pub fn transcribe_results_dir(&self) -> PathBuf {
        self.root.join(defaults::TRANSCRIBE_RESULTS_DIR)
    }

    pub fn result_srt(&self) -> PathBuf {
        self.root.join(defaults::RESULT_SRT)
    }

    pub fn result_csv(&self) -> PathBuf {
        self.root.join(defaults::RESULT_CSV)
    }

    pub fn translated_csv(&self, language: Language) -> PathBuf {
        self.root.join(defaults::translated_csv(language.code()))
    }

    pub fn translated_srt(&self, language: Language) -> PathBuf {
        self.root.join(defaults::translated_srt(language.code()))
    }

    pub fn subtitled_video(&self) -> PathBuf {
        self.root.join(defaults::SUBTITLED_VIDEO)
    }

    /// Per-segment subtitle path for an ordinal.
    pub fn segment_srt(&self, ordinal: usize) -> PathBuf {
        self.transcribe_results_dir()
            .join(format!("{}.srt", defaults::segment_stem(ordinal)))
    }

    /// Delete the per-segment audio and subtitle directories.
    ///
    /// Merged results at the root are left untouched.
    pub fn remove_intermediate(&self) -> Result<()> {
        for dir in [self.chunks_dir(), self.transcribe_results_dir()] {
            match fs::remove_dir_all(&dir) {
                Ok(()) => tracing::debug!(dir = %dir.display(), "removed intermediate directory"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(CaptionError::fs(dir, e)),
            }
        }
        Ok(())
    }
}

/// Create `dir` if needed and delete leftover segment files with `extension`.
///
/// Leftovers from an aborted run must never leak into a later reassembly.
pub fn prepare_segment_dir(dir: &Path, extension: &str) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| CaptionError::fs(dir, e))?;

    let entries = fs::read_dir(dir).map_err(|e| CaptionError::fs(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| CaptionError::fs(dir, e))?.path();
        let is_segment = path.extension().and_then(|e| e.to_str()) == Some(extension)
            && path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s.starts_with(defaults::SEGMENT_PREFIX));
        if is_segment {
            fs::remove_file(&path).map_err(|e| CaptionError::fs(&path, e))?;
            tracing::debug!(path = %path.display(), "removed stale segment file");
        }
    }
    Ok(())
}

/// Parse the ordinal out of a segment file stem such as `chunk_0007`.
///
/// Any stem ending in `_<digits>` is accepted so that backends which keep
/// the source stem and add a prefix still sort correctly.
pub fn ordinal_from_path(path: &Path) -> Option<usize> {
    let stem = path.file_stem()?.to_str()?;
    let (_, digits) = stem.rsplit_once('_')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Write through a sibling temp file, then rename over `path`.
pub(crate) fn write_atomic(path: &Path, write: impl FnOnce(&Path) -> Result<()>) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Err(e) = write(&tmp) {
        discard(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path).map_err(|e| CaptionError::fs(path, e))
}

/// Remove a partial output, logging rather than failing if it cannot be removed.
pub(crate) fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "cannot remove partial output"),
    }
}
