//! Operations available once a pipeline run has finished.

use crate::collab::{Renderer, SubtitleStyle};
use crate::error::{CaptionError, Result};
use crate::language::Language;
use crate::subtitle::TimeRange;
use crate::table::TranscriptTable;
use crate::workdir::{WorkDir, write_atomic};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Outputs of a completed run.
///
/// Speaker remapping and burn-in only exist on this type, so they cannot be
/// invoked before the transcript table is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalizedSession {
    workdir: PathBuf,
    media: Option<PathBuf>,
    subtitle: PathBuf,
    table: PathBuf,
    translated: Option<Language>,
    /// Original label to current label for every label seen by a remap.
    #[serde(rename = "speaker_mapping", serialize_with = "serialize_renames")]
    speakers: BTreeMap<String, String>,
}

impl FinalizedSession {
    pub(crate) fn new(workdir: &WorkDir, media: PathBuf, translated: Option<Language>) -> Self {
        let (subtitle, table) = current_outputs(workdir, translated);
        Self {
            workdir: workdir.root().to_path_buf(),
            media: Some(media),
            subtitle,
            table,
            translated,
            speakers: BTreeMap::new(),
        }
    }

    /// Reopen the outputs of an earlier run in `root`.
    ///
    /// Uses the translated outputs when `translated` is set. The table must
    /// exist; the subtitle is regenerated from it on the next remap.
    pub fn from_workdir(
        root: impl Into<PathBuf>,
        media: Option<PathBuf>,
        translated: Option<Language>,
    ) -> Result<Self> {
        let workdir = WorkDir::new(root);
        let (subtitle, table) = current_outputs(&workdir, translated);
        if !table.is_file() {
            return Err(CaptionError::fs(
                &table,
                std::io::Error::new(std::io::ErrorKind::NotFound, "transcript table not found"),
            ));
        }
        Ok(Self {
            workdir: workdir.root().to_path_buf(),
            media,
            subtitle,
            table,
            translated,
            speakers: BTreeMap::new(),
        })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn media(&self) -> Option<&Path> {
        self.media.as_deref()
    }

    /// Latest subtitle file (translated if a translation ran).
    pub fn subtitle_path(&self) -> &Path {
        &self.subtitle
    }

    /// Latest transcript table (translated if a translation ran).
    pub fn table_path(&self) -> &Path {
        &self.table
    }

    pub fn translated(&self) -> Option<Language> {
        self.translated
    }

    /// Original label to current label, for every label that was renamed.
    pub fn speaker_mapping(&self) -> BTreeMap<String, String> {
        renames(&self.speakers)
    }

    pub fn table(&self) -> Result<TranscriptTable> {
        TranscriptTable::read_csv(&self.table)
    }

    /// Speakers in the current table with the range of their first line.
    pub fn speaker_overview(&self) -> Result<Vec<(String, TimeRange)>> {
        let table = self.table()?;
        Ok(table
            .speakers()
            .into_iter()
            .filter_map(|s| table.first_occurrence(s).map(|r| (s.to_string(), r)))
            .collect())
    }

    /// Rename speakers in the current table and regenerate the subtitle
    /// from it. Returns the number of rows changed.
    ///
    /// The mapping is applied simultaneously, so swaps such as
    /// `{A: B, B: A}` exchange the two labels.
    pub fn remap_speakers(&mut self, mapping: &HashMap<String, String>) -> Result<usize> {
        let mut table = self.table()?;
        let present: Vec<String> = table.speakers().into_iter().map(str::to_string).collect();
        let changed = table.remap_speakers(mapping)?;

        write_atomic(&self.table, |tmp| table.write_csv(tmp))?;
        write_atomic(&self.subtitle, |tmp| table.write_srt(tmp))?;
        self.record_mapping(mapping, &present);

        tracing::info!(
            rows = changed,
            table = %self.table.display(),
            "remapped speakers"
        );
        Ok(changed)
    }

    /// Compose `mapping` onto the original-to-current bookkeeping.
    ///
    /// `present` holds the labels in the table before the rename. A label not
    /// yet produced by an earlier rename is an original one.
    fn record_mapping(&mut self, mapping: &HashMap<String, String>, present: &[String]) {
        for label in present {
            if !self.speakers.values().any(|current| current == label) {
                self.speakers
                    .entry(label.clone())
                    .or_insert_with(|| label.clone());
            }
        }
        for current in self.speakers.values_mut() {
            if let Some(new) = mapping.get(current.as_str()) {
                *current = new.clone();
            }
        }
    }

    /// Burn the current subtitle into the source video.
    pub fn burn(&self, renderer: &dyn Renderer, style: &SubtitleStyle) -> Result<PathBuf> {
        let media = self.media.as_deref().ok_or_else(|| CaptionError::Acquisition {
            input: self.workdir.display().to_string(),
            message: "session has no source video".to_string(),
        })?;
        if !media.is_file() {
            return Err(CaptionError::Acquisition {
                input: media.display().to_string(),
                message: "source video no longer exists".to_string(),
            });
        }
        let output = WorkDir::new(&self.workdir).subtitled_video();
        renderer.render(media, &self.subtitle, style, &output)?;
        Ok(output)
    }
}

fn renames(speakers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    speakers
        .iter()
        .filter(|(original, current)| original != current)
        .map(|(original, current)| (original.clone(), current.clone()))
        .collect()
}

fn serialize_renames<S: serde::Serializer>(
    speakers: &BTreeMap<String, String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    renames(speakers).serialize(serializer)
}

fn current_outputs(workdir: &WorkDir, translated: Option<Language>) -> (PathBuf, PathBuf) {
    match translated {
        Some(language) => (
            workdir.translated_srt(language),
            workdir.translated_csv(language),
        ),
        None => (workdir.result_srt(), workdir.result_csv()),
    }
}
