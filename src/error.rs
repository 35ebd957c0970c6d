//! Error types for the travel agent workflow

use thiserror::Error;

/// Result type alias used across the crate
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Main error type for workflow setup and execution
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Error from the OpenAI API
    #[error("OpenAI API error: {0}")]
    OpenAIError(#[from] async_openai::error::OpenAIError),

    /// Maximum turns exceeded
    #[error("Maximum turns exceeded: {max_turns}")]
    MaxTurnsExceeded { max_turns: usize },

    /// Tool execution error
    #[error("Tool execution error: {message}")]
    ToolExecutionError { message: String },

    /// Handoff error
    #[error("Handoff error: {message}")]
    HandoffError { message: String },

    /// Model behavior error
    #[error("Model behavior error: {message}")]
    ModelBehaviorError { message: String },

    /// An agent name was registered twice in the same workflow
    #[error("Duplicate agent name: {name}")]
    DuplicateAgent { name: String },

    /// The root agent is not part of the workflow
    #[error("Unknown root agent: {name}")]
    UnknownRootAgent { name: String },

    /// A handoff target does not resolve to a registered agent
    #[error("Agent {agent} lists unknown handoff target: {target}")]
    UnknownHandoffTarget { agent: String, target: String },

    /// An agent lists itself as a handoff target
    #[error("Agent {agent} lists itself as a handoff target")]
    SelfHandoff { agent: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Telemetry setup or export error
    #[error("Telemetry error: {0}")]
    TelemetryError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
