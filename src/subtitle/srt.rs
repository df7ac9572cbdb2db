//! SRT cue parsing and rendering.

use crate::error::{CaptionError, Result};
use crate::subtitle::timestamp::Timestamp;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Separator between the two endpoints of a time-range line.
pub const ARROW: &str = " --> ";

static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^(\d{2,}:\d{2}:\d{2},\d{3}) --> (\d{2,}:\d{2}:\d{2},\d{3})$")
        .expect("time range pattern is valid")
});

/// Start and end of one cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    /// Parse a line of the exact form `HH:MM:SS,mmm --> HH:MM:SS,mmm`.
    pub fn parse(line: &str) -> Result<Self> {
        let caps = TIME_RANGE
            .captures(line.trim_end())
            .ok_or_else(|| CaptionError::SubtitleParse {
                message: format!("not a time range: '{line}'"),
            })?;
        Ok(Self {
            start: Timestamp::parse(&caps[1])?,
            end: Timestamp::parse(&caps[2])?,
        })
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{ARROW}{}", self.start, self.end)
    }
}

/// Classification of a single subtitle line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// A lone non-negative integer.
    Index(u64),
    /// A `start --> end` line.
    TimeRange(TimeRange),
    /// Cue text or a blank separator.
    Text(&'a str),
}

/// Classify one line of an SRT file.
///
/// A line that contains the arrow but is not a valid time range is an error:
/// silently copying it would leave a cue on the wrong timeline.
pub fn classify_line(line: &str) -> Result<Line<'_>> {
    let trimmed = line.trim_end();
    if !trimmed.is_empty()
        && trimmed.bytes().all(|b| b.is_ascii_digit())
        && let Ok(index) = trimmed.parse()
    {
        return Ok(Line::Index(index));
    }
    if trimmed.contains("-->") {
        return TimeRange::parse(trimmed).map(Line::TimeRange);
    }
    Ok(Line::Text(line))
}

/// One timed subtitle entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub index: usize,
    pub range: TimeRange,
    pub text: String,
}

/// Parse SRT content into cues.
///
/// Blocks are separated by blank lines. A block needs an index line, a time
/// range and at least one text line; multi-line text is joined with a space.
/// Shorter blocks are skipped. Cues are renumbered by position.
pub fn parse_cues(content: &str) -> Result<Vec<Cue>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut cues = Vec::new();

    for block in blocks(content) {
        if block.len() < 3 {
            tracing::warn!(lines = ?block, "skipping incomplete subtitle block");
            continue;
        }
        let range = TimeRange::parse(block[1])?;
        let text = block[2..]
            .iter()
            .map(|l| l.trim())
            .collect::<Vec<_>>()
            .join(" ");
        cues.push(Cue {
            index: cues.len() + 1,
            range,
            text,
        });
    }

    Ok(cues)
}

fn blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Render cues as SRT, numbering them by position.
pub fn render_cues(cues: &[Cue]) -> String {
    let mut out = String::new();
    for (i, cue) in cues.iter().enumerate() {
        out.push_str(&format!("{}\n{}\n{}\n\n", i + 1, cue.range, cue.text));
    }
    out
}
