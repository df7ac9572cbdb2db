//! System diagnostics and dependency checking.
//!
//! Verifies that the external tools named by the configured command
//! templates are installed.

use crate::collab::CommandTemplate;
use crate::config::Config;
use owo_colors::OwoColorize;
use std::process::Command;

/// Result of a dependency check.
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Tool is installed and working
    Ok,
    /// Tool is not found
    NotFound,
    /// Tool is found but has issues
    Warning(String),
}

/// One external tool and the pipeline stages that need it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub program: String,
    pub used_by: Vec<&'static str>,
}

/// Check if a command exists and is executable.
fn check_command(command: &str) -> CheckResult {
    match Command::new(command).arg("--version").output() {
        Ok(output) if output.status.success() => CheckResult::Ok,
        Ok(_) => CheckResult::Warning(format!("'{}' found but --version failed", command)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckResult::NotFound,
        Err(e) => CheckResult::Warning(format!("Error checking '{}': {}", command, e)),
    }
}

/// Programs invoked by the configured commands, deduplicated in first-use order.
pub fn dependencies(config: &Config) -> Vec<Dependency> {
    let templates = [
        ("fetch", config.fetch.command.as_str()),
        ("fetch", config.fetch.title_command.as_str()),
        ("extract-audio", config.audio.extract_command.as_str()),
        ("transcribe", config.transcribe.command.as_str()),
        ("translate", config.translate.command.as_str()),
        ("burn", config.render.command.as_str()),
    ];

    let mut deps: Vec<Dependency> = Vec::new();
    for (stage, template) in templates {
        let template = CommandTemplate::new("check", template);
        let Some(program) = template.program() else {
            continue;
        };
        match deps.iter_mut().find(|d| d.program == program) {
            Some(dep) => {
                if !dep.used_by.contains(&stage) {
                    dep.used_by.push(stage);
                }
            }
            None => deps.push(Dependency {
                program: program.to_string(),
                used_by: vec![stage],
            }),
        }
    }
    deps
}

/// Run all dependency checks and print results.
///
/// Returns `true` when every tool was found.
pub fn check_dependencies(config: &Config) -> bool {
    println!("Checking external tools...\n");

    let mut all_found = true;
    for dep in dependencies(config) {
        print!("{} ({}): ", dep.program, dep.used_by.join(", "));
        match check_command(&dep.program) {
            CheckResult::Ok => println!("{}", "✓ OK".green()),
            CheckResult::NotFound => {
                all_found = false;
                println!("{}", "✗ NOT FOUND".red());
                if let Some(hint) = install_hint(&dep.program) {
                    println!("  Install: {}", hint);
                }
            }
            CheckResult::Warning(msg) => println!("{} {}", "⚠ WARNING:".yellow(), msg),
        }
    }

    println!();
    if all_found {
        println!("{}", "✓ All external tools available.".green());
    } else {
        println!(
            "{}",
            "⚠ Some tools are missing; stages that need them will fail.".yellow()
        );
    }
    all_found
}

fn install_hint(program: &str) -> Option<&'static str> {
    match program {
        "ffmpeg" => Some("sudo apt install ffmpeg  (Debian/Ubuntu), sudo pacman -S ffmpeg  (Arch)"),
        "yt-dlp" => Some("pipx install yt-dlp"),
        "whisperx" => Some("pipx install whisperx"),
        "argos-translate" => Some("pipx install argostranslate"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_equality() {
        assert_eq!(CheckResult::Ok, CheckResult::Ok);
        assert_eq!(CheckResult::NotFound, CheckResult::NotFound);
        assert_ne!(
            CheckResult::Warning("a".to_string()),
            CheckResult::Warning("b".to_string())
        );
    }

    #[test]
    fn test_check_command_nonexistent() {
        let result = check_command("nonexistent-command-xyz-12345");
        assert_eq!(result, CheckResult::NotFound);
    }

    #[test]
    fn test_default_dependencies() {
        let deps = dependencies(&Config::default());
        let programs: Vec<&str> = deps.iter().map(|d| d.program.as_str()).collect();
        assert_eq!(
            programs,
            vec!["yt-dlp", "ffmpeg", "whisperx", "argos-translate"]
        );
        let ffmpeg = &deps[1];
        assert_eq!(ffmpeg.used_by, vec!["extract-audio", "burn"]);
        assert_eq!(deps[0].used_by, vec!["fetch"]);
    }

    #[test]
    fn test_empty_title_command_is_skipped() {
        let mut config = Config::default();
        config.fetch.title_command = String::new();
        config.fetch.command = "curl -o {output} {input}".to_string();
        let deps = dependencies(&config);
        assert_eq!(deps[0].program, "curl");
        assert!(!deps.iter().any(|d| d.program == "yt-dlp"));
    }

    #[test]
    fn test_missing_tool_reports_false() {
        let mut config = Config::default();
        config.fetch.command = "nonexistent-fetcher-xyz-12345 {input}".to_string();
        assert!(!check_dependencies(&config));
    }

    #[test]
    fn test_install_hint_known_tools() {
        assert!(install_hint("ffmpeg").is_some());
        assert!(install_hint("made-up").is_none());
    }
}
