//! Crew configuration.
//!
//! Loaded from `--config <path>`, or `crewdeck.toml` in the working
//! directory when present. CLI flags override file values, which override
//! the defaults below.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::crew::TaskCount;
use crate::llm::DEFAULT_MODEL;

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "crewdeck.toml";
/// Where the workflow writes its results.
pub const DEFAULT_OUTPUT: &str = "supervisor_output.json";
/// Turn cap for a single agent conversation.
pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// Brand guidelines every generated snippet is checked against.
pub const GUIDELINES: &str = r#"
Brand Guidelines: Colors, Fonts, and Language

Color Palette:

Primary: #007BFF (Blue)
Secondary: #6C757D (Gray)
Accent: #28A745 (Green)
Background: #F8F9FA (Light Gray)
Text: #333333 (Dark Gray)


Typography:

Headings: Montserrat, sans-serif
H1: 32px, Bold
H2: 24px, Semi-bold
H3: 20px, Semi-bold
Body: Open Sans, sans-serif
Regular: 16px
Small: 14px
Line height: 1.5


Language and Tone:

Clear and concise
Friendly but professional
"#;

/// A deliberately non-compliant snippet, evaluated by `crewdeck-bots evaluate`
/// when no file is given.
pub const SAMPLE_CODE: &str = r#"
<button class="non-compliant-button">Click Me Now!</button>

.non-compliant-button {
    background-color: #FF00FF;
    color: #FFFF00;
    font-family: "Comic Sans MS", cursive;
    font-size: 24px;
    padding: 25px 50px;
    border: 5px dashed #00FFFF;
    border-radius: 0;
    text-transform: uppercase;
    box-shadow: 10px 10px 5px #888888;
    animation: wiggle 0.5s infinite;
}

@keyframes wiggle {
    0% { transform: rotate(0deg); }
    25% { transform: rotate(5deg); }
    75% { transform: rotate(-5deg); }
    100% { transform: rotate(0deg); }
}

.non-compliant-button:hover {
    background-color: #00FFFF;
    color: #FF00FF;
}
"#;

/// Values as they appear in the config file. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub model: Option<String>,
    pub num_tasks: Option<i64>,
    pub output: Option<PathBuf>,
    pub max_iterations: Option<usize>,
    pub guidelines: Option<String>,
}

impl FileConfig {
    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Load an explicit path, or the default file if it exists.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Command-line overrides, already parsed by clap.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub num_tasks: Option<i64>,
    pub output: Option<PathBuf>,
}

/// Effective crew configuration.
#[derive(Debug, Clone)]
pub struct CrewConfig {
    pub model: String,
    pub num_tasks: TaskCount,
    pub output: PathBuf,
    pub max_iterations: usize,
    pub guidelines: String,
}

impl Default for CrewConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            num_tasks: TaskCount::default(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            guidelines: GUIDELINES.to_string(),
        }
    }
}

impl CrewConfig {
    /// Merge: CLI overrides > config file > defaults.
    pub fn resolve(file: FileConfig, cli: Overrides) -> Result<Self> {
        let defaults = Self::default();

        let num_tasks = match cli.num_tasks.or(file.num_tasks) {
            Some(n) => TaskCount::new(n)?,
            None => defaults.num_tasks,
        };

        Ok(Self {
            model: cli.model.or(file.model).unwrap_or(defaults.model),
            num_tasks,
            output: cli.output.or(file.output).unwrap_or(defaults.output),
            max_iterations: file.max_iterations.unwrap_or(defaults.max_iterations),
            guidelines: file.guidelines.unwrap_or(defaults.guidelines),
        })
    }
}
