use anyhow::{Context, Result};
use captioncraft::audio::SegmentSplitter;
use captioncraft::cli::{Cli, Commands, ConfigAction};
use captioncraft::collab::{CommandRenderer, CommandTranslator, translate_to_files};
use captioncraft::config::Config;
use captioncraft::diagnostics::check_dependencies;
use captioncraft::language::Language;
use captioncraft::pipeline::{
    CancelToken, Collaborators, FinalizedSession, Pipeline, PipelineConfig, RunRequest,
};
use captioncraft::table::{TranscriptTable, csv_to_srt, srt_to_csv};
use captioncraft::{defaults, reassembly};
use clap::{CommandFactory, FromArgMatches};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Cli::command()
        .version(captioncraft::version_string())
        .get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    captioncraft::logging::init(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Run {
            input,
            language,
            translate_to,
            workdir,
            slice,
            workers,
            delete_intermediate,
            remap,
            burn,
            json,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let options = RunOptions {
                input,
                language,
                translate_to,
                workdir,
                slice,
                workers,
                delete_intermediate,
                remap,
                burn,
                json,
                progress: !cli.quiet && std::io::stderr().is_terminal(),
            };
            handle_run(config, options).await?;
        }
        Commands::Split {
            audio,
            out_dir,
            slice,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let splitter = SegmentSplitter::new(slice.unwrap_or_else(|| config_slice(&config)))?;
            let segments = splitter.split(&audio, &out_dir)?;
            for segment in &segments {
                println!(
                    "{}  {}",
                    segment.path.display(),
                    humantime::format_duration(whole_millis(segment.duration)).dimmed()
                );
            }
            println!("{} segments written", segments.len());
        }
        Commands::Merge { dir, slice, output } => {
            let config = load_config(cli.config.as_deref())?;
            let output = output.unwrap_or_else(|| {
                dir.parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(defaults::RESULT_SRT)
            });
            let merged = reassembly::reassemble_dir(
                &dir,
                slice.unwrap_or_else(|| config_slice(&config)),
                &output,
            )?;
            println!(
                "Merged {} segments ({} cues) into {}",
                merged.segments,
                merged.cues,
                merged.path.display()
            );
        }
        Commands::ToTable { srt, csv } => {
            let table = srt_to_csv(&srt, &csv)?;
            println!("{} rows written to {}", table.len(), csv.display());
        }
        Commands::ToSrt { csv, srt } => {
            let table = csv_to_srt(&csv, &srt)?;
            println!("{} cues written to {}", table.len(), srt.display());
        }
        Commands::Translate { csv, from, to } => {
            let config = load_config(cli.config.as_deref())?;
            handle_translate(&config, &csv, from, to)?;
        }
        Commands::Remap {
            workdir,
            pairs,
            translated,
            list,
        } => {
            let mut session = FinalizedSession::from_workdir(workdir, None, translated)?;
            if list || pairs.is_empty() {
                print_speakers(&session)?;
            } else {
                let mapping: HashMap<String, String> = pairs.into_iter().collect();
                let changed = session.remap_speakers(&mapping)?;
                println!(
                    "{} rows renamed in {}",
                    changed,
                    session.table_path().display()
                );
            }
        }
        Commands::Burn {
            workdir,
            video,
            translated,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let session = FinalizedSession::from_workdir(workdir, Some(video), translated)?;
            let renderer = CommandRenderer::new(&config.render.command);
            let output = session.burn(&renderer, &config.render.style())?;
            println!("{}", output.display());
        }
        Commands::Languages => {
            list_languages();
        }
        Commands::Check => {
            let config = load_config(cli.config.as_deref())?;
            if !check_dependencies(&config) {
                std::process::exit(1);
            }
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "captioncraft",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/captioncraft/config.toml)
/// 3. Built-in defaults
///
/// Environment variable overrides apply on top, then the result is validated.
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path())?,
    };

    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn config_slice(config: &Config) -> Duration {
    Duration::from_secs(config.audio.split_length_minutes * 60)
}

fn whole_millis(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}

struct RunOptions {
    input: String,
    language: Option<Language>,
    translate_to: Option<Language>,
    workdir: Option<PathBuf>,
    slice: Option<Duration>,
    workers: Option<usize>,
    delete_intermediate: bool,
    remap: Vec<(String, String)>,
    burn: bool,
    json: bool,
    progress: bool,
}

#[derive(Serialize)]
struct RunReport {
    #[serde(flatten)]
    session: FinalizedSession,
    subtitled_video: Option<PathBuf>,
}

/// Run the pipeline on a blocking thread, cancelling it on Ctrl+C.
async fn handle_run(config: Config, options: RunOptions) -> Result<()> {
    let source = match options.language {
        Some(language) => language,
        None => config.language()?,
    };

    let mut pipeline_config = PipelineConfig::from_config(&config);
    if let Some(slice) = options.slice {
        pipeline_config.slice = slice;
    }
    if let Some(workers) = options.workers {
        pipeline_config.workers = workers.max(1);
    }
    pipeline_config.delete_intermediate |= options.delete_intermediate;
    pipeline_config.progress = options.progress;

    let mut request = RunRequest::new(options.input, source);
    if let Some(destination) = options.translate_to {
        request = request.with_destination(destination);
    }
    if let Some(workdir) = options.workdir {
        request = request.with_workdir(workdir);
    }

    let cancel = CancelToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current step");
            ctrl_c_token.cancel();
        }
    });

    let pipeline = Pipeline::new(pipeline_config, Collaborators::from_config(&config));
    let mapping: HashMap<String, String> = options.remap.into_iter().collect();
    let burn = options.burn;
    let render_command = config.render.command.clone();
    let style = config.render.style();

    let report = tokio::task::spawn_blocking(move || -> captioncraft::Result<RunReport> {
        let mut session = pipeline.run(&request, &cancel)?;
        if !mapping.is_empty() {
            let changed = session.remap_speakers(&mapping)?;
            tracing::info!(changed, "speakers renamed");
        }
        let subtitled_video = if burn {
            cancel.checkpoint("burn")?;
            Some(session.burn(&CommandRenderer::new(&render_command), &style)?)
        } else {
            None
        };
        Ok(RunReport {
            session,
            subtitled_video,
        })
    })
    .await
    .context("pipeline task failed")??;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let session = &report.session;
    println!("{}", "✓ Done".green());
    println!("  {}  {}", "Subtitle:".dimmed(), session.subtitle_path().display());
    println!("  {}     {}", "Table:".dimmed(), session.table_path().display());
    if let Some(language) = session.translated() {
        println!("  {}  {}", "Language:".dimmed(), language);
    }
    if let Some(video) = &report.subtitled_video {
        println!("  {}     {}", "Video:".dimmed(), video.display());
    }
    Ok(())
}

/// Translate a table and write `result_<code>.csv/.srt` next to it.
fn handle_translate(config: &Config, csv: &Path, from: Language, to: Language) -> Result<()> {
    let table = TranscriptTable::read_csv(csv)?;
    let dir = csv.parent().unwrap_or_else(|| Path::new("."));
    let csv_out = dir.join(defaults::translated_csv(to.code()));
    let srt_out = dir.join(defaults::translated_srt(to.code()));

    let translator = CommandTranslator::new(&config.translate.command);
    let translated = translate_to_files(&table, from, to, &translator, &csv_out, &srt_out)?;
    println!(
        "{} rows translated to {} ({}, {})",
        translated.len(),
        to,
        csv_out.display(),
        srt_out.display()
    );
    Ok(())
}

fn print_speakers(session: &FinalizedSession) -> Result<()> {
    let overview = session.speaker_overview()?;
    if overview.is_empty() {
        println!("No speakers in {}", session.table_path().display());
        return Ok(());
    }
    println!("Speakers (first line):");
    for (speaker, range) in overview {
        println!("  {} {}", speaker.green(), range.to_string().dimmed());
    }
    Ok(())
}

fn list_languages() {
    println!("Languages:");
    for language in Language::ALL {
        let marker = if language.is_translatable() {
            "●".green().to_string()
        } else {
            "○".dimmed().to_string()
        };
        println!("  {} {:<4} {}", marker, language.code(), language.name());
    }
    println!();
    println!("{} translatable  ○ transcription only", "●".green());
}

/// Handle configuration commands.
fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Dump => {
            let config = load_config(custom_path)?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Path => {
            let path = custom_path
                .map(PathBuf::from)
                .unwrap_or_else(Config::default_path);
            println!("{}", path.display());
        }
    }
    Ok(())
}
