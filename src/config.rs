//! Configuration for the travel workflow
//!
//! Defaults, then an optional TOML file, then `TRAVEL_AGENT_*` environment
//! overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, WorkflowError};

pub const CONFIG_FILE_VAR: &str = "TRAVEL_AGENT_CONFIG";

/// Where finished traces go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExporterKind {
    File,
    Console,
    Memory,
}

impl FromStr for ExporterKind {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(ExporterKind::File),
            "console" => Ok(ExporterKind::Console),
            "memory" => Ok(ExporterKind::Memory),
            other => Err(WorkflowError::ConfigError(format!(
                "unknown exporter: {}",
                other
            ))),
        }
    }
}

/// Settings for one process running the workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Model used by every agent
    pub model: String,

    pub temperature: Option<f32>,

    /// Turns allowed per request before the run fails
    pub max_turns: usize,

    /// Name traces are tagged with
    pub workflow_name: String,

    pub exporters: Vec<ExporterKind>,

    /// Directory for the file exporter
    pub trace_dir: PathBuf,

    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: None,
            max_turns: 20,
            workflow_name: "travel-agent-lmx-wf-05".to_string(),
            exporters: vec![ExporterKind::File],
            trace_dir: PathBuf::from(crate::trace::DEFAULT_TRACE_DIR),
            log_level: "warn".to_string(),
        }
    }
}

impl WorkflowConfig {
    /// Applies `TRAVEL_AGENT_*` overrides read through `lookup`.
    ///
    /// Unset variables keep the current value; unparsable ones are errors.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("TRAVEL_AGENT_MODEL") {
            self.model = model;
        }

        if let Some(temp) = lookup("TRAVEL_AGENT_TEMPERATURE") {
            let temp = temp.parse::<f32>().map_err(|e| {
                WorkflowError::ConfigError(format!("TRAVEL_AGENT_TEMPERATURE: {}", e))
            })?;
            self.temperature = Some(temp);
        }

        if let Some(turns) = lookup("TRAVEL_AGENT_MAX_TURNS") {
            self.max_turns = turns.parse::<usize>().map_err(|e| {
                WorkflowError::ConfigError(format!("TRAVEL_AGENT_MAX_TURNS: {}", e))
            })?;
        }

        if let Some(name) = lookup("TRAVEL_AGENT_WORKFLOW_NAME") {
            self.workflow_name = name;
        }

        if let Some(exporters) = lookup("TRAVEL_AGENT_EXPORTERS") {
            self.exporters = exporters
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse)
                .collect::<Result<Vec<_>>>()?;
        }

        if let Some(dir) = lookup("TRAVEL_AGENT_TRACE_DIR") {
            self.trace_dir = PathBuf::from(dir);
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_turns == 0 {
            return Err(WorkflowError::ConfigError(
                "max_turns must be at least 1".to_string(),
            ));
        }
        if self.workflow_name.trim().is_empty() {
            return Err(WorkflowError::ConfigError(
                "workflow_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration builder
#[derive(Default)]
pub struct ConfigBuilder {
    config: WorkflowConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.temperature = Some(temp);
        self
    }

    pub fn max_turns(mut self, turns: usize) -> Self {
        self.config.max_turns = turns;
        self
    }

    pub fn workflow_name(mut self, name: impl Into<String>) -> Self {
        self.config.workflow_name = name.into();
        self
    }

    pub fn exporters(mut self, exporters: Vec<ExporterKind>) -> Self {
        self.config.exporters = exporters;
        self
    }

    pub fn trace_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.trace_dir = dir.into();
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    pub fn build(self) -> WorkflowConfig {
        self.config
    }
}

/// Load configuration from environment variables
pub fn from_env() -> Result<WorkflowConfig> {
    WorkflowConfig::default().with_overrides(|key| std::env::var(key).ok())
}

/// Load configuration from a TOML file; missing keys take their defaults
pub fn from_file(path: impl AsRef<Path>) -> Result<WorkflowConfig> {
    let contents = std::fs::read_to_string(path)?;
    let config: WorkflowConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// File named by `TRAVEL_AGENT_CONFIG` if set, then environment overrides
pub fn load() -> Result<WorkflowConfig> {
    let config = match std::env::var(CONFIG_FILE_VAR) {
        Ok(path) => from_file(path)?.with_overrides(|key| std::env::var(key).ok())?,
        Err(_) => from_env()?,
    };
    config.validate()?;
    Ok(config)
}
