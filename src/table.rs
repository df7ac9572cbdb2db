//! Row-oriented transcript tables and their conversion to and from SRT.
//!
//! One row per cue: start, end, speaker, text. Tables are persisted as CSV with
//! the columns `Start,End,Speaker,Text` and period decimal separators in the
//! timestamps.

use crate::defaults::UNKNOWN_SPEAKER;
use crate::error::{CaptionError, Result};
use crate::subtitle::timestamp::table_format;
use crate::subtitle::{Cue, TimeRange, Timestamp, parse_cues, render_cues};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static BRACKET_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[([^\]]+)\]:?\s*(.*)$").expect("bracket tag pattern is valid")
});

#[allow(clippy::expect_used)]
static COLON_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^:\[\]]+?):(?:\s+(.*))?$").expect("colon tag pattern is valid")
});

/// Tabular twin of a cue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRow {
    #[serde(rename = "Start", with = "table_format")]
    pub start: Timestamp,
    #[serde(rename = "End", with = "table_format")]
    pub end: Timestamp,
    #[serde(rename = "Speaker")]
    pub speaker: String,
    #[serde(rename = "Text")]
    pub text: String,
}

impl TranscriptRow {
    pub fn new(start: Timestamp, end: Timestamp, speaker: &str, text: &str) -> Self {
        Self {
            start,
            end,
            speaker: speaker.to_string(),
            text: text.to_string(),
        }
    }

    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start,
            end: self.end,
        }
    }
}

/// Split a leading speaker tag off cue text.
///
/// Recognizes `[LABEL] text`, `[LABEL]: text` and `LABEL: text`. Returns
/// `Unknown` as the speaker when no tag is present.
pub fn split_speaker(text: &str) -> (String, String) {
    let text = text.trim();
    for pattern in [&*BRACKET_TAG, &*COLON_TAG] {
        if let Some(caps) = pattern.captures(text) {
            let speaker = caps.get(1).map_or("", |m| m.as_str()).trim();
            if !speaker.is_empty() {
                let rest = caps.get(2).map_or("", |m| m.as_str()).trim();
                return (speaker.to_string(), rest.to_string());
            }
        }
    }
    (UNKNOWN_SPEAKER.to_string(), text.to_string())
}

/// Check that `label` can be written as a `label: text` cue prefix and read
/// back unchanged by [`split_speaker`].
///
/// Labels must be non-empty, carry no surrounding whitespace and contain no
/// colon, square bracket or line break.
pub fn validate_speaker_label(label: &str) -> Result<()> {
    let invalid = |message: &str| CaptionError::SpeakerLabel {
        label: label.to_string(),
        message: message.to_string(),
    };
    if label.trim().is_empty() {
        return Err(invalid("label is empty"));
    }
    if label.trim() != label {
        return Err(invalid("label has leading or trailing whitespace"));
    }
    if let Some(c) = label.chars().find(|c| matches!(c, ':' | '[' | ']' | '\r' | '\n')) {
        return Err(invalid(&format!("label contains {c:?}")));
    }
    Ok(())
}

/// An ordered transcript table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TranscriptTable {
    rows: Vec<TranscriptRow>,
}

impl TranscriptTable {
    pub fn new(rows: Vec<TranscriptRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[TranscriptRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<TranscriptRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Build a table from cues, extracting speaker tags from the text.
    pub fn from_cues(cues: &[Cue]) -> Self {
        let rows = cues
            .iter()
            .map(|cue| {
                let (speaker, text) = split_speaker(&cue.text);
                TranscriptRow {
                    start: cue.range.start,
                    end: cue.range.end,
                    speaker,
                    text,
                }
            })
            .collect();
        Self { rows }
    }

    pub fn from_srt(content: &str) -> Result<Self> {
        Ok(Self::from_cues(&parse_cues(content)?))
    }

    /// Cues numbered by row position, text rendered as `speaker: text`.
    ///
    /// Text is normalized on the way out: line breaks become spaces and
    /// reading the cue back trims surrounding whitespace. An empty speaker is
    /// written as `Unknown`.
    pub fn to_cues(&self) -> Vec<Cue> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let speaker = if row.speaker.trim().is_empty() {
                    UNKNOWN_SPEAKER
                } else {
                    row.speaker.trim()
                };
                let text = row.text.replace(['\r', '\n'], " ");
                Cue {
                    index: i + 1,
                    range: row.range(),
                    text: format!("{speaker}: {text}"),
                }
            })
            .collect()
    }

    pub fn to_srt(&self) -> String {
        render_cues(&self.to_cues())
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let rows = csv_reader
            .deserialize()
            .collect::<std::result::Result<Vec<TranscriptRow>, csv::Error>>()?;
        Ok(Self { rows })
    }

    pub fn to_csv_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        if self.rows.is_empty() {
            csv_writer.write_record(["Start", "End", "Speaker", "Text"])?;
        }
        for row in &self.rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let file = fs::File::open(path).map_err(|e| CaptionError::fs(path, e))?;
        Self::from_csv_reader(file)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path).map_err(|e| CaptionError::fs(path, e))?;
        self.to_csv_writer(file)
    }

    pub fn read_srt(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| CaptionError::fs(path, e))?;
        Self::from_srt(&content)
    }

    pub fn write_srt(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_srt()).map_err(|e| CaptionError::fs(path, e))
    }

    /// Rename speakers according to `mapping`. Returns the number of rows
    /// whose label actually changed.
    ///
    /// Every new label is validated before any row is touched.
    pub fn remap_speakers(&mut self, mapping: &HashMap<String, String>) -> Result<usize> {
        for new in mapping.values() {
            validate_speaker_label(new)?;
        }
        let mut changed = 0;
        for row in &mut self.rows {
            if let Some(new) = mapping.get(&row.speaker)
                && *new != row.speaker
            {
                row.speaker = new.clone();
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Distinct speaker labels in order of first appearance.
    pub fn speakers(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.speaker.as_str()) {
                seen.push(row.speaker.as_str());
            }
        }
        seen
    }

    /// Time range of the first row spoken by `speaker`.
    pub fn first_occurrence(&self, speaker: &str) -> Option<TimeRange> {
        self.rows
            .iter()
            .find(|row| row.speaker == speaker)
            .map(TranscriptRow::range)
    }

    /// Build a new table with the same timing and speakers but different text.
    ///
    /// `texts` must yield exactly one entry per row.
    pub fn with_texts<I>(&self, texts: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let texts: Vec<String> = texts.into_iter().collect();
        if texts.len() != self.rows.len() {
            return Err(CaptionError::Other(format!(
                "expected {} texts, got {}",
                self.rows.len(),
                texts.len()
            )));
        }
        let rows = self
            .rows
            .iter()
            .zip(texts)
            .map(|(row, text)| TranscriptRow {
                text,
                ..row.clone()
            })
            .collect();
        Ok(Self { rows })
    }
}

/// Convert an SRT file into a CSV table.
pub fn srt_to_csv(srt_path: &Path, csv_path: &Path) -> Result<TranscriptTable> {
    let table = TranscriptTable::read_srt(srt_path)?;
    table.write_csv(csv_path)?;
    tracing::info!(
        srt = %srt_path.display(),
        csv = %csv_path.display(),
        rows = table.len(),
        "tabulated subtitles"
    );
    Ok(table)
}

/// Convert a CSV table into an SRT file.
pub fn csv_to_srt(csv_path: &Path, srt_path: &Path) -> Result<TranscriptTable> {
    let table = TranscriptTable::read_csv(csv_path)?;
    table.write_srt(srt_path)?;
    tracing::info!(
        csv = %csv_path.display(),
        srt = %srt_path.display(),
        rows = table.len(),
        "rendered table as subtitles"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_lenient(s).unwrap()
    }

    fn sample_table() -> TranscriptTable {
        TranscriptTable::new(vec![
            TranscriptRow::new(ts("00:00:01.000"), ts("00:00:02.000"), "A", "hello"),
            TranscriptRow::new(ts("00:00:02.500"), ts("00:00:04.250"), "Lex Fridman", "what is power?"),
            TranscriptRow::new(ts("01:00:00.000"), ts("01:00:01.999"), "Unknown", "Time: 12:30"),
        ])
    }

    #[test]
    fn split_speaker_variants() {
        assert_eq!(
            split_speaker("[SPEAKER_00]: Hello there"),
            ("SPEAKER_00".to_string(), "Hello there".to_string())
        );
        assert_eq!(
            split_speaker("[SPEAKER_01] Hi"),
            ("SPEAKER_01".to_string(), "Hi".to_string())
        );
        assert_eq!(
            split_speaker("Elon: rockets"),
            ("Elon".to_string(), "rockets".to_string())
        );
        assert_eq!(
            split_speaker("Lex Fridman: welcome"),
            ("Lex Fridman".to_string(), "welcome".to_string())
        );
        assert_eq!(
            split_speaker("no tag here"),
            ("Unknown".to_string(), "no tag here".to_string())
        );
        assert_eq!(
            split_speaker("meet at 12:30 please"),
            ("Unknown".to_string(), "meet at 12:30 please".to_string())
        );
        assert_eq!(split_speaker("A:"), ("A".to_string(), String::new()));
    }

    #[test]
    fn table_to_subtitle_format() {
        let srt = sample_table().to_srt();
        assert!(srt.starts_with("1\n00:00:01,000 --> 00:00:02,000\nA: hello\n\n2\n"));
        assert!(srt.contains("3\n01:00:00,000 --> 01:00:01,999\nUnknown: Time: 12:30\n\n"));
    }

    #[test]
    fn table_subtitle_table_round_trip() {
        let table = sample_table();
        let back = TranscriptTable::from_srt(&table.to_srt()).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn single_row_round_trip() {
        let table = TranscriptTable::new(vec![TranscriptRow::new(
            ts("00:00:01.000"),
            ts("00:00:02.000"),
            "A",
            "hello",
        )]);
        let back = TranscriptTable::from_srt(&table.to_srt()).unwrap();
        assert_eq!(back.rows()[0], table.rows()[0]);
    }

    #[test]
    fn subtitle_table_subtitle_preserves_semantics() {
        let srt = "1\n00:00:00,000 --> 00:00:01,500\n[SPEAKER_00]: Hello there.\n\n\
                   2\n00:00:01,500 --> 00:00:03,000\nplain text\nsecond line\n\n";
        let table = TranscriptTable::from_srt(srt).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].speaker, "SPEAKER_00");
        assert_eq!(table.rows()[1].speaker, "Unknown");
        assert_eq!(table.rows()[1].text, "plain text second line");

        let normalized = table.to_srt();
        assert_eq!(
            normalized,
            "1\n00:00:00,000 --> 00:00:01,500\nSPEAKER_00: Hello there.\n\n\
             2\n00:00:01,500 --> 00:00:03,000\nUnknown: plain text second line\n\n"
        );
        assert_eq!(TranscriptTable::from_srt(&normalized).unwrap(), table);
    }

    #[test]
    fn csv_round_trip_uses_period_separator() {
        let table = sample_table();
        let mut buffer = Vec::new();
        table.to_csv_writer(&mut buffer).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("Start,End,Speaker,Text\n00:00:01.000,00:00:02.000,A,hello\n"));

        let back = TranscriptTable::from_csv_reader(buffer.as_slice()).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn csv_reader_tolerates_index_column_and_comma_times() {
        let csv = ",Start,End,Speaker,Text\n0,\"00:00:01,000\",\"00:00:02,000\",SPEAKER_00,hi\n";
        let table = TranscriptTable::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].start, ts("00:00:01.000"));
        assert_eq!(table.rows()[0].speaker, "SPEAKER_00");
    }

    #[test]
    fn csv_reader_rejects_bad_timestamp() {
        let csv = "Start,End,Speaker,Text\nsoon,later,A,hi\n";
        assert!(TranscriptTable::from_csv_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn empty_table_writes_header() {
        let mut buffer = Vec::new();
        TranscriptTable::default().to_csv_writer(&mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "Start,End,Speaker,Text\n");
    }

    #[test]
    fn remap_speakers_counts_changes() {
        let mut table = sample_table();
        let mapping = HashMap::from([
            ("A".to_string(), "Alice".to_string()),
            ("Lex Fridman".to_string(), "Lex Fridman".to_string()),
            ("Nobody".to_string(), "X".to_string()),
        ]);
        assert_eq!(table.remap_speakers(&mapping).unwrap(), 1);
        assert_eq!(table.rows()[0].speaker, "Alice");
        assert_eq!(table.rows()[1].speaker, "Lex Fridman");
    }

    #[test]
    fn noop_remap_leaves_table_unchanged() {
        let mut table = sample_table();
        let before = table.clone();
        let mapping = HashMap::from([("A".to_string(), "A".to_string())]);
        assert_eq!(table.remap_speakers(&mapping).unwrap(), 0);
        assert_eq!(table, before);
        assert_eq!(table.to_srt(), before.to_srt());
    }

    #[test]
    fn remap_rejects_labels_that_cannot_round_trip() {
        let mut table = sample_table();
        let before = table.clone();
        for bad in ["[Host]", "Q&A: panel", "", "  ", " Host", "Host]", "two\nlines"] {
            let mapping = HashMap::from([
                ("Lex Fridman".to_string(), "Lex".to_string()),
                ("A".to_string(), bad.to_string()),
            ]);
            let err = table.remap_speakers(&mapping).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::Table, "{bad:?}");
            assert_eq!(table, before, "{bad:?} partially applied");
        }
    }

    #[test]
    fn valid_labels_survive_subtitle_round_trip() {
        for label in ["Host", "Lex Fridman", "Q&A panel", "SPEAKER_07", "Dr. Who?", "Unknown"] {
            validate_speaker_label(label).unwrap();
            let mut table = sample_table();
            let mapping = HashMap::from([("A".to_string(), label.to_string())]);
            table.remap_speakers(&mapping).unwrap();
            let back = TranscriptTable::from_srt(&table.to_srt()).unwrap();
            assert_eq!(back, table, "{label:?}");
        }
    }

    #[test]
    fn text_whitespace_is_normalized_through_subtitles() {
        let table = TranscriptTable::new(vec![TranscriptRow::new(
            ts("00:00:01.000"),
            ts("00:00:02.000"),
            "A",
            " lead\nnext ",
        )]);
        let back = TranscriptTable::from_srt(&table.to_srt()).unwrap();
        assert_eq!(back.rows()[0].speaker, "A");
        assert_eq!(back.rows()[0].text, "lead next");
    }

    #[test]
    fn speakers_and_first_occurrence() {
        let table = sample_table();
        assert_eq!(table.speakers(), vec!["A", "Lex Fridman", "Unknown"]);
        let range = table.first_occurrence("Lex Fridman").unwrap();
        assert_eq!(range.to_string(), "00:00:02,500 --> 00:00:04,250");
        assert!(table.first_occurrence("Nobody").is_none());
    }

    #[test]
    fn with_texts_replaces_only_text() {
        let table = sample_table();
        let translated = table
            .with_texts(vec!["a".to_string(), "b".to_string(), "c".to_string()])
            .unwrap();
        assert_eq!(translated.rows()[1].text, "b");
        assert_eq!(translated.rows()[1].speaker, "Lex Fridman");
        assert_eq!(translated.rows()[1].start, table.rows()[1].start);
        assert!(table.with_texts(vec!["only one".to_string()]).is_err());
    }

    #[test]
    fn file_conversions() {
        let dir = TempDir::new().unwrap();
        let srt = dir.path().join("result.srt");
        let csv = dir.path().join("result.csv");
        let srt_again = dir.path().join("again.srt");
        fs::write(&srt, "1\n00:00:00,000 --> 00:00:01,000\n[SPEAKER_00]: hi\n\n").unwrap();

        let table = srt_to_csv(&srt, &csv).unwrap();
        assert_eq!(table.len(), 1);
        let back = csv_to_srt(&csv, &srt_again).unwrap();
        assert_eq!(back, table);
        assert_eq!(
            fs::read_to_string(&srt_again).unwrap(),
            "1\n00:00:00,000 --> 00:00:01,000\nSPEAKER_00: hi\n\n"
        );
    }
}
