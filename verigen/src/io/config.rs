//! Agent configuration stored in `verigen.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::state::LoopLimits;

/// Default config location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "verigen.toml";

/// Agent configuration (TOML).
///
/// Every field has a default so a missing file or a partial file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Step budget per run. A final reply counts as a step.
    pub max_steps: u32,

    /// Consecutive unparseable replies tolerated before the run fails early.
    pub max_consecutive_unparseable: u32,

    /// Consecutive tool errors tolerated before the run fails. Unset means
    /// tool errors never end a run on their own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_consecutive_tool_errors: Option<u32>,

    /// Prompt size cap in bytes. Unset sends the whole transcript.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_budget_bytes: Option<usize>,

    /// Characters of an unparseable reply quoted back to the model.
    pub excerpt_chars: usize,

    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Program and leading arguments; the model name is appended.
    pub command: Vec<String>,

    pub model: String,

    /// Wall-clock budget for one model call.
    pub timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            command: vec!["ollama".to_string(), "run".to_string()],
            model: "phi3".to_string(),
            timeout_secs: 1000,
            output_limit_bytes: 100_000,
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        let limits = LoopLimits::default();
        Self {
            max_steps: limits.max_steps,
            max_consecutive_unparseable: limits.max_consecutive_unparseable,
            max_consecutive_tool_errors: limits.max_consecutive_tool_errors,
            history_budget_bytes: None,
            excerpt_chars: 200,
            generator: GeneratorConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(anyhow!("max_steps must be > 0"));
        }
        if self.max_consecutive_unparseable == 0 {
            return Err(anyhow!("max_consecutive_unparseable must be > 0"));
        }
        if self.max_consecutive_tool_errors == Some(0) {
            return Err(anyhow!("max_consecutive_tool_errors must be > 0 when set"));
        }
        if self.history_budget_bytes == Some(0) {
            return Err(anyhow!("history_budget_bytes must be > 0 when set"));
        }
        if self.generator.timeout_secs == 0 {
            return Err(anyhow!("generator.timeout_secs must be > 0"));
        }
        if self.generator.output_limit_bytes == 0 {
            return Err(anyhow!("generator.output_limit_bytes must be > 0"));
        }
        if self.generator.command.is_empty() || self.generator.command[0].trim().is_empty() {
            return Err(anyhow!("generator.command must be a non-empty array"));
        }
        if self.generator.model.trim().is_empty() {
            return Err(anyhow!("generator.model must be non-empty"));
        }
        Ok(())
    }

    pub fn limits(&self) -> LoopLimits {
        LoopLimits {
            max_steps: self.max_steps,
            max_consecutive_unparseable: self.max_consecutive_unparseable,
            max_consecutive_tool_errors: self.max_consecutive_tool_errors,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AgentConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

/// Write `contents` to a sibling temp file and rename it over `path`.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let file_name = path
        .file_name()
        .with_context(|| format!("path missing file name {}", path.display()))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
