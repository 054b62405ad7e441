//! Series configuration types.
//!
//! A series is configured by a `bookforge.toml` file at its root. Every
//! section except `[series]` defaults sensibly, so a file containing only a
//! series name is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

/// Name of the marker/config file at the root of every series.
pub const CONFIG_FILE_NAME: &str = "bookforge.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root series configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesConfig {
    pub series: SeriesSection,
    #[serde(default, alias = "gemini_cli")]
    pub engine: EngineConfig,
    #[serde(default)]
    pub splitter: SplitterConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
}

impl SeriesConfig {
    /// A default configuration for a new series.
    pub fn new(
        name: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            series: SeriesSection {
                name: name.into(),
                source_lang: source_lang.into(),
                target_lang: target_lang.into(),
            },
            engine: EngineConfig::default(),
            splitter: SplitterConfig::default(),
            workers: WorkersConfig::default(),
        }
    }

    /// Deserialize a `SeriesConfig` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Serialize to TOML, as written by `bookforge init`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(format!("config encode error: {e}")))
    }

    /// Read, parse and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml(&contents)?;

        let problems = config.validate();
        if !problems.is_empty() {
            return Err(Error::Config(problems.join("; ")));
        }
        tracing::debug!(path = %path.display(), series = %config.series.name, "Loaded series config");
        Ok(config)
    }

    /// Return a list of validation problems. An empty list means the config
    /// is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.series.name.trim().is_empty() {
            problems.push("series.name is required".into());
        }
        if self.series.source_lang.trim().is_empty() || self.series.target_lang.trim().is_empty() {
            problems.push("series.source_lang and series.target_lang must be set".into());
        }

        if !(self.engine.max_rate.is_finite() && self.engine.max_rate > 0.0) {
            problems.push(format!(
                "engine.max_rate must be a positive number (got {})",
                self.engine.max_rate
            ));
        }
        if self.engine.max_attempts == 0 {
            problems.push("engine.max_attempts must be at least 1".into());
        }
        if self.engine.timeout_secs == 0 || self.engine.global_timeout_secs == 0 {
            problems.push("engine timeouts must be non-zero".into());
        }
        if self.engine.program.trim().is_empty() {
            problems.push("engine.program is empty".into());
        }

        if self.splitter.target_chunk_size == 0 {
            problems.push("splitter.target_chunk_size must be non-zero".into());
        }
        if self.splitter.target_chunk_size > self.splitter.max_part_chars {
            problems.push(format!(
                "splitter.target_chunk_size ({}) exceeds splitter.max_part_chars ({})",
                self.splitter.target_chunk_size, self.splitter.max_part_chars
            ));
        }

        if self.workers.max_concurrent == 0 {
            problems.push("workers.max_concurrent must be at least 1".into());
        }

        problems
    }
}

/// Walk up from `start` looking for a directory containing
/// [`CONFIG_FILE_NAME`].
pub fn find_series_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE_NAME).is_file())
        .map(Path::to_path_buf)
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Series identity and language pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesSection {
    pub name: String,
    #[serde(default = "default_source_lang")]
    pub source_lang: String,
    #[serde(default = "default_target_lang")]
    pub target_lang: String,
}

fn default_source_lang() -> String {
    "ja".into()
}

fn default_target_lang() -> String {
    "ru".into()
}

/// Generation engine invocation, throttling and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Executable invoked for every generation call.
    pub program: String,
    pub model: String,
    /// Per-chunk call deadline.
    pub timeout_secs: u64,
    /// Deadline for the single whole-chapter proofreading call.
    pub global_timeout_secs: u64,
    /// Maximum calls started per second, across all workers.
    pub max_rate: f64,
    pub max_attempts: u32,
    pub backoff_base_secs: u64,
    pub backoff_max_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "gemini".into(),
            model: "gemini-2.5-pro".into(),
            timeout_secs: 120,
            global_timeout_secs: 300,
            max_rate: 2.0,
            max_attempts: 3,
            backoff_base_secs: 4,
            backoff_max_secs: 10,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn global_timeout(&self) -> Duration {
        Duration::from_secs(self.global_timeout_secs)
    }
}

/// Document splitting thresholds, in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    pub target_chunk_size: usize,
    pub max_part_chars: usize,
    pub min_chunk_size: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            target_chunk_size: 600,
            max_part_chars: 800,
            min_chunk_size: 300,
        }
    }
}

/// Worker pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub max_concurrent: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self { max_concurrent: 50 }
    }
}
