//! Command-line interface for captioncraft
//!
//! Provides argument parsing using clap derive macros.

use crate::language::Language;
use crate::table::validate_speaker_label;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Chunked transcription, subtitle tables and translation
#[derive(Parser, Debug)]
#[command(
    name = "captioncraft",
    version,
    about = "Transcribe long media in segments and reassemble subtitles"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: stage details, -vv: full trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a slice length.
///
/// Bare numbers are minutes, matching `audio.split_length_minutes`. Anything
/// else goes through `humantime` (`90s`, `5m`, `1h`).
pub fn parse_slice(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let duration = match s.parse::<u64>() {
        Ok(minutes) => Duration::from_secs(minutes * 60),
        Err(_) => humantime::parse_duration(s).map_err(|e| e.to_string())?,
    };
    if duration.as_millis() == 0 {
        return Err("slice must be longer than zero".to_string());
    }
    Ok(duration)
}

/// Parse a language name or code.
pub fn parse_language(s: &str) -> Result<Language, String> {
    s.parse::<Language>().map_err(|e| e.to_string())
}

/// Parse an `OLD=NEW` speaker rename.
///
/// `OLD` may be any existing label; `NEW` must be a label that survives the
/// subtitle round trip.
pub fn parse_speaker_pair(s: &str) -> Result<(String, String), String> {
    let (old, new) = s
        .split_once('=')
        .ok_or_else(|| format!("expected OLD=NEW, got '{s}'"))?;
    let (old, new) = (old.trim(), new.trim());
    if old.is_empty() || new.is_empty() {
        return Err(format!("speaker names must not be empty in '{s}'"));
    }
    validate_speaker_label(new).map_err(|e| e.to_string())?;
    Ok((old.to_string(), new.to_string()))
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the whole pipeline on a local file or URL
    Run {
        /// Media file path or http(s) URL
        input: String,

        /// Spoken language (name or code); defaults to transcribe.language
        #[arg(long, short = 'l', value_name = "LANG", value_parser = parse_language)]
        language: Option<Language>,

        /// Also translate the transcript into this language
        #[arg(long, short = 't', value_name = "LANG", value_parser = parse_language)]
        translate_to: Option<Language>,

        /// Working directory (default: the media file's directory)
        #[arg(long, short = 'w', value_name = "DIR")]
        workdir: Option<PathBuf>,

        /// Segment length (e.g. 5, 5m, 300s)
        #[arg(long, short = 's', value_name = "DURATION", value_parser = parse_slice)]
        slice: Option<Duration>,

        /// Segments transcribed in parallel
        #[arg(long, value_name = "N")]
        workers: Option<usize>,

        /// Delete chunks/ and transcribe_results/ after success
        #[arg(long)]
        delete_intermediate: bool,

        /// Rename a speaker afterwards (repeatable)
        #[arg(long = "remap", value_name = "OLD=NEW", value_parser = parse_speaker_pair)]
        remap: Vec<(String, String)>,

        /// Burn the final subtitles into the video
        #[arg(long)]
        burn: bool,

        /// Print the session outputs as JSON
        #[arg(long)]
        json: bool,
    },

    /// Split a WAV file into fixed-length segments
    Split {
        /// Source WAV file
        audio: PathBuf,

        /// Directory receiving chunk_NNNN.wav files
        out_dir: PathBuf,

        /// Segment length (e.g. 5, 5m, 300s)
        #[arg(long, short = 's', value_name = "DURATION", value_parser = parse_slice)]
        slice: Option<Duration>,
    },

    /// Merge per-segment SRT files into one subtitle
    Merge {
        /// Directory of chunk_NNNN.srt files
        dir: PathBuf,

        /// Segment length the files were produced with
        #[arg(long, short = 's', value_name = "DURATION", value_parser = parse_slice)]
        slice: Option<Duration>,

        /// Output file (default: <DIR>/../result.srt)
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Convert an SRT file into a CSV table
    ToTable {
        srt: PathBuf,
        csv: PathBuf,
    },

    /// Convert a CSV table into an SRT file
    ToSrt {
        csv: PathBuf,
        srt: PathBuf,
    },

    /// Translate a CSV table, writing result_<code>.csv/.srt beside it
    Translate {
        csv: PathBuf,

        #[arg(long, value_name = "LANG", value_parser = parse_language)]
        from: Language,

        #[arg(long, value_name = "LANG", value_parser = parse_language)]
        to: Language,
    },

    /// Rename speakers in a finished working directory
    Remap {
        /// Working directory of an earlier run
        workdir: PathBuf,

        /// Renames as OLD=NEW
        #[arg(value_name = "OLD=NEW", value_parser = parse_speaker_pair)]
        pairs: Vec<(String, String)>,

        /// Operate on the translated outputs for this language
        #[arg(long, value_name = "LANG", value_parser = parse_language)]
        translated: Option<Language>,

        /// List speakers with their first line instead of renaming
        #[arg(long)]
        list: bool,
    },

    /// Burn subtitles from a finished working directory into a video
    Burn {
        /// Working directory of an earlier run
        workdir: PathBuf,

        /// Source video
        #[arg(long, value_name = "FILE")]
        video: PathBuf,

        /// Use the translated subtitles for this language
        #[arg(long, value_name = "LANG", value_parser = parse_language)]
        translated: Option<Language>,
    },

    /// List supported languages
    Languages,

    /// Check that external tools are installed
    Check,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Dump,
    /// Print the default configuration file path
    Path,
}
