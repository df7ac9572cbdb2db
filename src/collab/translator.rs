//! Row-by-row transcript translation.

use super::CommandTemplate;
use crate::error::{CaptionError, Result};
use crate::language::Language;
use crate::table::TranscriptTable;
use crate::workdir::{discard, write_atomic};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Translates a single piece of text between two languages.
pub trait Translator: Send + Sync {
    fn translate(&self, text: &str, source: Language, target: Language) -> Result<String>;
}

/// Translate every row of `table`, keeping timing, speaker and order.
///
/// Both languages are checked before any row is translated. Blank rows are
/// passed through without calling the translator.
pub fn translate_table(
    table: &TranscriptTable,
    source: Language,
    destination: Language,
    translator: &dyn Translator,
) -> Result<TranscriptTable> {
    source.ensure_translatable()?;
    destination.ensure_translatable()?;

    let mut texts = Vec::with_capacity(table.len());
    for (i, row) in table.rows().iter().enumerate() {
        if row.text.trim().is_empty() {
            texts.push(row.text.clone());
            continue;
        }
        let translated = translator.translate(&row.text, source, destination)?;
        tracing::trace!(row = i, "translated row");
        texts.push(translated);
    }

    tracing::info!(
        rows = table.len(),
        from = source.code(),
        to = destination.code(),
        "translated transcript"
    );
    table.with_texts(texts)
}

/// Translate `table` and write the result as CSV and SRT.
///
/// Nothing is written unless every row translated, and the CSV is removed
/// again if the SRT cannot be written.
pub fn translate_to_files(
    table: &TranscriptTable,
    source: Language,
    destination: Language,
    translator: &dyn Translator,
    csv_path: &Path,
    srt_path: &Path,
) -> Result<TranscriptTable> {
    let translated = translate_table(table, source, destination, translator)?;
    write_atomic(csv_path, |tmp| translated.write_csv(tmp))?;
    if let Err(e) = write_atomic(srt_path, |tmp| translated.write_srt(tmp)) {
        discard(csv_path);
        return Err(e);
    }
    Ok(translated)
}

/// Translates by running an external tool once per row.
#[derive(Debug, Clone)]
pub struct CommandTranslator {
    command: CommandTemplate,
}

impl CommandTranslator {
    pub fn new(command: &str) -> Self {
        Self {
            command: CommandTemplate::new("translate", command),
        }
    }
}

impl Translator for CommandTranslator {
    fn translate(&self, text: &str, source: Language, target: Language) -> Result<String> {
        self.command.run(&[
            ("text", text),
            ("source", source.code()),
            ("target", target.code()),
        ])
    }
}

/// Mock translator for testing
///
/// Prefixes each text with the target code, e.g. `[es] hello`.
#[derive(Debug, Default)]
pub struct MockTranslator {
    fail_on_call: Option<usize>,
    calls: AtomicUsize,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail on the n-th call (0-based)
    pub fn with_failure_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Translator for MockTranslator {
    fn translate(&self, text: &str, _source: Language, target: Language) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_call == Some(call) {
            return Err(CaptionError::ExternalService {
                service: "translate",
                message: "mock translation failure".to_string(),
            });
        }
        Ok(format!("[{}] {}", target.code(), text))
    }
}
