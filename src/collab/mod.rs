//! External collaborators: acquisition, audio extraction, transcription,
//! translation and rendering.
//!
//! Each collaborator is a trait so the pipeline can run against mocks. The
//! production implementations shell out to configurable command templates.

pub mod extract;
pub mod fetch;
pub mod renderer;
pub mod transcriber;
pub mod translator;

pub use extract::{AudioExtractor, CommandExtractor};
pub use fetch::{CommandFetcher, FetchedMedia, MediaFetcher, slugify};
pub use renderer::{CommandRenderer, Renderer, SubtitleStyle};
pub use transcriber::{CommandTranscriber, MockTranscriber, SegmentTranscriber};
pub use translator::{
    CommandTranslator, MockTranslator, Translator, translate_table, translate_to_files,
};

use crate::error::{CaptionError, Result};
use std::process::Command;

/// Maximum number of stderr bytes carried into an error message.
const STDERR_TAIL: usize = 600;

/// A whitespace-separated command line with `{name}` placeholders.
///
/// Placeholders are substituted per argument after splitting, so a value
/// containing spaces stays a single argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    service: &'static str,
    template: String,
}

impl CommandTemplate {
    pub fn new(service: &'static str, template: impl Into<String>) -> Self {
        Self {
            service,
            template: template.into(),
        }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Program name, the first word of the template.
    pub fn program(&self) -> Option<&str> {
        self.template.split_whitespace().next()
    }

    /// Expand the template into program arguments.
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<Vec<String>> {
        let args: Vec<String> = self
            .template
            .split_whitespace()
            .map(|word| substitute(word, vars))
            .collect();
        if args.is_empty() {
            return Err(CaptionError::ConfigInvalidValue {
                key: format!("{}.command", self.service),
                message: "command template is empty".to_string(),
            });
        }
        Ok(args)
    }

    /// Run the command and return its trimmed stdout.
    pub fn run(&self, vars: &[(&str, &str)]) -> Result<String> {
        let args = self.render(vars)?;
        tracing::debug!(service = self.service, command = ?args, "running external command");

        let output = match Command::new(&args[0]).args(&args[1..]).output() {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CaptionError::ExternalService {
                    service: self.service,
                    message: format!("'{}' not found on PATH", args[0]),
                });
            }
            Err(e) => {
                return Err(CaptionError::ExternalService {
                    service: self.service,
                    message: format!("failed to start '{}': {}", args[0], e),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptionError::ExternalService {
                service: self.service,
                message: format!(
                    "'{}' exited with {}: {}",
                    args[0],
                    output.status,
                    tail(stderr.trim())
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

// Single pass, so substituted values are never expanded again.
fn substitute(word: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(word.len());
    let mut rest = word;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn tail(text: &str) -> &str {
    if text.len() <= STDERR_TAIL {
        return text;
    }
    let mut start = text.len() - STDERR_TAIL;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
