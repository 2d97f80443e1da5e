//! Project configuration stored in `stepcheck.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "stepcheck.toml";

/// Validator configuration (TOML).
///
/// Missing fields default to values that work for a conventional project
/// layout (`specs/` plus a parser-produced `.stepcheck/suite.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StepcheckConfig {
    /// Directory validated when no spec paths are given.
    pub specs_dir: String,

    /// Parsed suite document, relative to the project root.
    pub suite_path: PathBuf,

    /// Per-step wait for a runner response, in milliseconds.
    pub runner_request_timeout_ms: u64,

    pub runner: RunnerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Command that starts the runner (e.g. `["java-runner", "--stdio"]`).
    pub command: Vec<String>,

    /// Grace period for the runner to exit after a kill request.
    pub kill_timeout_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command: vec!["step-runner".to_string()],
            kill_timeout_ms: 2_000,
        }
    }
}

impl Default for StepcheckConfig {
    fn default() -> Self {
        Self {
            specs_dir: "specs".to_string(),
            suite_path: PathBuf::from(".stepcheck/suite.json"),
            runner_request_timeout_ms: 30_000,
            runner: RunnerConfig::default(),
        }
    }
}

impl StepcheckConfig {
    pub fn validate(&self) -> Result<()> {
        if self.runner_request_timeout_ms == 0 {
            return Err(anyhow!("runner_request_timeout_ms must be > 0"));
        }
        if self.runner.kill_timeout_ms == 0 {
            return Err(anyhow!("runner.kill_timeout_ms must be > 0"));
        }
        if self.runner.command.is_empty() || self.runner.command[0].trim().is_empty() {
            return Err(anyhow!("runner.command must be a non-empty array"));
        }
        if self.specs_dir.trim().is_empty() {
            return Err(anyhow!("specs_dir must not be empty"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.runner_request_timeout_ms)
    }

    pub fn kill_timeout(&self) -> Duration {
        Duration::from_millis(self.runner.kill_timeout_ms)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `StepcheckConfig::default()`.
pub fn load_config(path: &Path) -> Result<StepcheckConfig> {
    if !path.exists() {
        let cfg = StepcheckConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: StepcheckConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Write config to disk (creating the parent directory).
pub fn write_config(path: &Path, cfg: &StepcheckConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}
