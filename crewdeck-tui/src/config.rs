//! Persistent configuration for crewdeck-tui.
//!
//! Config file lives at `~/.config/crewdeck/tui.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::buffer::DEFAULT_CAPACITY;

/// Coding assistant launched when nothing else is configured.
pub const DEFAULT_CODER: &str = "aider";
/// Flag that carries the task to the coder.
pub const DEFAULT_MESSAGE_FLAG: &str = "--message";
/// Appended to the task before it is handed to the coder.
pub const DEFAULT_FOCUS_HINT: &str = "always focus on the test_codebase";

/// Arguments passed to aider ahead of the message.
pub fn default_aider_args() -> Vec<String> {
    ["--sonnet", "--no-auto-commits", "--map-tokens", "2048", "--yes"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// User configuration (persisted in tui.toml).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Claude model for the supervisor.
    pub model: Option<String>,
    /// Coder program.
    pub coder: Option<String>,
    /// Arguments placed before the message flag.
    pub coder_args: Option<Vec<String>>,
    /// Flag preceding the task text. Empty string passes the task bare.
    pub message_flag: Option<String>,
    /// Text appended to the task.
    pub focus_hint: Option<String>,
    /// Lines held for the supervisor before the oldest are dropped.
    pub buffer_capacity: Option<usize>,
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crewdeck")
}

pub fn config_path() -> PathBuf {
    config_dir().join("tui.toml")
}

/// Log file; the terminal belongs to the UI.
pub fn log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crewdeck")
        .join("tui.log")
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &std::path::Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(s) => match toml::from_str(&s) {
                    Ok(c) => return c,
                    Err(e) => eprintln!("Warning: bad config file {}: {e}", path.display()),
                },
                Err(e) => eprintln!("Warning: can't read {}: {e}", path.display()),
            }
        }
        Self::default()
    }
}

/// Effective values after merging CLI args > config file > defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub model: String,
    pub coder: String,
    pub coder_args: Vec<String>,
    pub message_flag: String,
    pub focus_hint: String,
    pub buffer_capacity: usize,
}

impl Resolved {
    pub fn merge(cli: &super::Cli, config: &Config) -> Self {
        let model = cli
            .model
            .clone()
            .or_else(|| config.model.clone())
            .unwrap_or_else(|| crewdeck_bots::llm::DEFAULT_MODEL.to_string());

        let coder = cli
            .coder
            .clone()
            .or_else(|| config.coder.clone())
            .unwrap_or_else(|| DEFAULT_CODER.to_string());

        // aider's flags only make sense for aider
        let coder_args = config.coder_args.clone().unwrap_or_else(|| {
            if coder == DEFAULT_CODER {
                default_aider_args()
            } else {
                Vec::new()
            }
        });

        let message_flag = config
            .message_flag
            .clone()
            .unwrap_or_else(|| DEFAULT_MESSAGE_FLAG.to_string());
        let focus_hint = config
            .focus_hint
            .clone()
            .unwrap_or_else(|| DEFAULT_FOCUS_HINT.to_string());

        let buffer_capacity = cli
            .buffer_capacity
            .or(config.buffer_capacity)
            .unwrap_or(DEFAULT_CAPACITY);

        Self {
            model,
            coder,
            coder_args,
            message_flag,
            focus_hint,
            buffer_capacity,
        }
    }
}
