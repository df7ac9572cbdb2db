//! Default configuration constants and working-directory layout.
//!
//! The relative paths below are the on-disk contract between pipeline stages
//! and any external caller that picks up the results.

/// Default slice length for segmenting source audio, in minutes.
pub const SPLIT_LENGTH_MINUTES: u64 = 5;

/// Default number of segments transcribed concurrently.
pub const TRANSCRIBE_WORKERS: usize = 1;

/// Default source language for transcription.
pub const DEFAULT_LANGUAGE: &str = "english";

/// Subdirectory holding the per-segment audio files.
pub const CHUNKS_DIR: &str = "chunks";

/// Subdirectory holding the per-segment subtitle files.
pub const TRANSCRIBE_RESULTS_DIR: &str = "transcribe_results";

/// Merged subtitle file name.
pub const RESULT_SRT: &str = "result.srt";

/// Transcript table file name.
pub const RESULT_CSV: &str = "result.csv";

/// Burned-in output video file name.
pub const SUBTITLED_VIDEO: &str = "subtitled.mp4";

/// Prefix shared by segment audio and segment subtitle file stems.
pub const SEGMENT_PREFIX: &str = "chunk_";

/// Speaker label used when a cue carries no speaker tag.
pub const UNKNOWN_SPEAKER: &str = "Unknown";

/// Default font for burned-in subtitles.
pub const FONT_NAME: &str = "Futura";

/// Default font size for burned-in subtitles.
pub const FONT_SIZE: u32 = 14;

/// Default directory remote downloads are stored under.
pub const DOWNLOADS_DIR: &str = "youtube";

/// Extracts 16 kHz mono PCM audio from any container ffmpeg can read.
pub const EXTRACT_COMMAND: &str =
    "ffmpeg -y -loglevel error -i {input} -vn -ar 16000 -ac 1 -c:a pcm_s16le {output}";

/// Transcribes one segment with alignment and diarization.
pub const TRANSCRIBE_COMMAND: &str = "whisperx {input} --language {language} --diarize \
     --output_format srt --output_dir {output_dir}";

/// Translates one row of text, printing the translation to stdout.
pub const TRANSLATE_COMMAND: &str =
    "argos-translate --from-lang {source} --to-lang {target} {text}";

/// Burns subtitles into a copy of the video.
pub const RENDER_COMMAND: &str = "ffmpeg -y -loglevel error -i {input} \
     -vf subtitles={subtitles}:force_style='{style}' -c:a copy {output}";

/// Downloads a video as mp4.
pub const FETCH_COMMAND: &str = "yt-dlp -f bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4] \
     --merge-output-format mp4 -o {output} {input}";

/// Prints the title of a remote video.
pub const FETCH_TITLE_COMMAND: &str = "yt-dlp --skip-download --print title {input}";

/// Translated table file name for a language code, e.g. `result_hi.csv`.
pub fn translated_csv(code: &str) -> String {
    format!("result_{code}.csv")
}

/// Translated subtitle file name for a language code, e.g. `result_hi.srt`.
pub fn translated_srt(code: &str) -> String {
    format!("result_{code}.srt")
}

/// File stem for the segment with the given ordinal, e.g. `chunk_0003`.
pub fn segment_stem(ordinal: usize) -> String {
    format!("{SEGMENT_PREFIX}{ordinal:04}")
}
