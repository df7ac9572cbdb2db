//! Burning subtitles into video.

use super::CommandTemplate;
use crate::defaults;
use crate::error::{CaptionError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Font settings for burned-in subtitles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleStyle {
    pub font_name: String,
    pub font_size: u32,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_name: defaults::FONT_NAME.to_string(),
            font_size: defaults::FONT_SIZE,
        }
    }
}

impl SubtitleStyle {
    /// ASS `force_style` string understood by ffmpeg's subtitles filter.
    pub fn force_style(&self) -> String {
        format!(
            "Fontname={},Fontsize={},PrimaryColour=&hFF",
            self.font_name, self.font_size
        )
    }
}

/// Produces a copy of a video with subtitles rendered into the frames.
pub trait Renderer: Send + Sync {
    fn render(&self, media: &Path, subtitles: &Path, style: &SubtitleStyle, output: &Path)
    -> Result<()>;
}

/// Renders with an external tool (`ffmpeg` by default).
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    command: CommandTemplate,
}

impl CommandRenderer {
    pub fn new(command: &str) -> Self {
        Self {
            command: CommandTemplate::new("render", command),
        }
    }
}

impl Renderer for CommandRenderer {
    fn render(
        &self,
        media: &Path,
        subtitles: &Path,
        style: &SubtitleStyle,
        output: &Path,
    ) -> Result<()> {
        let input = media.to_string_lossy().into_owned();
        let subs = subtitles.to_string_lossy().into_owned();
        let out = output.to_string_lossy().into_owned();
        let force_style = style.force_style();

        self.command.run(&[
            ("input", input.as_str()),
            ("subtitles", subs.as_str()),
            ("style", force_style.as_str()),
            ("output", out.as_str()),
        ])?;

        if !output.is_file() {
            return Err(CaptionError::ExternalService {
                service: self.command.service(),
                message: format!("no video written to {}", output.display()),
            });
        }
        tracing::info!(video = %output.display(), "burned subtitles");
        Ok(())
    }
}
