//! Remote media acquisition.

use super::CommandTemplate;
use crate::error::{CaptionError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Where a fetched video ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMedia {
    /// Directory dedicated to this video; becomes the working directory.
    pub dir: PathBuf,
    pub media: PathBuf,
}

/// Downloads remote media into a local directory.
///
/// Implementations must be idempotent: fetching the same URL twice returns
/// the same paths without downloading again.
pub trait MediaFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchedMedia>;
}

/// Lowercase alphanumerics and spaces, spaces turned into underscores.
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Best-effort video identifier from a URL: the `v` query parameter, or the
/// last path segment, or the host.
pub fn url_identifier(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let (location, query) = rest.split_once('?').unwrap_or((rest, ""));

    let from_query = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, value)| *key == "v" && !value.is_empty())
        .map(|(_, value)| value);
    if from_query.is_some() {
        return from_query;
    }

    let location = location.split('#').next().unwrap_or(location);
    location.rsplit('/').find(|segment| !segment.is_empty())
}

/// Fetches with an external downloader (`yt-dlp` by default).
#[derive(Debug, Clone)]
pub struct CommandFetcher {
    download: CommandTemplate,
    title: Option<CommandTemplate>,
    downloads_dir: PathBuf,
}

impl CommandFetcher {
    pub fn new(download: &str, title: Option<&str>, downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            download: CommandTemplate::new("fetch", download),
            title: title
                .filter(|t| !t.trim().is_empty())
                .map(|t| CommandTemplate::new("fetch", t)),
            downloads_dir: downloads_dir.into(),
        }
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    fn slug_for(&self, url: &str) -> Result<String> {
        if let Some(title_cmd) = &self.title {
            match title_cmd.run(&[("input", url)]) {
                Ok(title) => {
                    let slug = slugify(title.lines().next().unwrap_or_default());
                    if !slug.is_empty() {
                        return Ok(slug);
                    }
                }
                Err(e) => tracing::warn!(url, error = %e, "title lookup failed, using URL identifier"),
            }
        }

        url_identifier(url)
            .map(slugify)
            .filter(|slug| !slug.is_empty())
            .ok_or_else(|| CaptionError::Acquisition {
                input: url.to_string(),
                message: "cannot derive a name for the download".to_string(),
            })
    }

    /// Paths a URL will be stored under, given its slug.
    pub fn target_for(&self, slug: &str) -> FetchedMedia {
        let dir = self.downloads_dir.join(slug);
        let media = dir.join(format!("{slug}.mp4"));
        FetchedMedia { dir, media }
    }
}

impl MediaFetcher for CommandFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedMedia> {
        let slug = self.slug_for(url)?;
        let target = self.target_for(&slug);

        if target.media.is_file() {
            tracing::info!(media = %target.media.display(), "media already downloaded");
            return Ok(target);
        }

        fs::create_dir_all(&target.dir).map_err(|e| CaptionError::fs(&target.dir, e))?;
        let output = target.media.to_string_lossy().into_owned();
        self.download
            .run(&[("input", url), ("output", output.as_str())])?;

        if !target.media.is_file() {
            return Err(CaptionError::Acquisition {
                input: url.to_string(),
                message: format!("downloader produced no file at {}", target.media.display()),
            });
        }
        tracing::info!(url, media = %target.media.display(), "downloaded media");
        Ok(target)
    }
}
