//! Tool system for agents
//!
//! A tool is a named, described callable that an agent may ask the model to
//! invoke. Tools are immutable once registered; arguments arrive as the JSON
//! object the model produced and are validated against the tool's schema by
//! deserializing into a typed argument struct.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{Result, WorkflowError};

/// Result from a tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The output from the tool
    pub output: Value,
    /// Optional error message if the tool failed
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(output: Value) -> Self {
        Self {
            output,
            error: None,
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            output: Value::Null,
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Text sent back to the model as the tool reply.
    pub fn to_reply(&self) -> String {
        match (&self.error, &self.output) {
            (Some(err), _) => format!("Error: {}", err),
            (None, Value::String(s)) => s.clone(),
            (None, other) => other.to_string(),
        }
    }
}

/// Trait for all tools that can be used by agents
#[async_trait]
pub trait Tool: Send + Sync + Debug {
    /// Get the name of the tool
    fn name(&self) -> &str;

    /// Get the description of the tool
    fn description(&self) -> &str;

    /// Get the JSON schema for the tool's parameters
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments
    async fn execute(&self, arguments: Value) -> Result<ToolResult>;
}

type ToolFn = dyn Fn(Value) -> Result<Value> + Send + Sync;

/// A function-based tool
#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    description: String,
    parameters_schema: Value,
    function: Arc<ToolFn>,
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters_schema", &self.parameters_schema)
            .finish()
    }
}

impl FunctionTool {
    /// Create a new function tool over raw JSON arguments
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters_schema: Value,
        function: F,
    ) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters_schema,
            function: Arc::new(function),
        }
    }

    /// Create a tool from a function over a typed argument struct.
    ///
    /// The parameters schema is derived from `A`; the function's string
    /// return value becomes the tool output.
    pub fn typed<A, F>(name: impl Into<String>, description: impl Into<String>, function: F) -> Self
    where
        A: DeserializeOwned + JsonSchema,
        F: Fn(A) -> String + Send + Sync + 'static,
    {
        let name = name.into();
        let tool_name = name.clone();
        let wrapped = move |raw: Value| {
            let args: A =
                serde_json::from_value(raw).map_err(|e| WorkflowError::ToolExecutionError {
                    message: format!("invalid arguments for {}: {}", tool_name, e),
                })?;
            Ok(Value::String(function(args)))
        };

        Self::new(name, description, schema_for::<A>(), wrapped)
    }
}

/// JSON schema for a typed argument struct, without the root metadata.
pub fn schema_for<A: JsonSchema>() -> Value {
    let root = schemars::schema_for!(A);
    serde_json::to_value(root.schema).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.parameters_schema.clone()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult> {
        match (self.function)(arguments) {
            Ok(output) => Ok(ToolResult::success(output)),
            Err(e) => Ok(ToolResult::error(e.to_string())),
        }
    }
}

/// Create a typed [`FunctionTool`] wrapped in an `Arc<dyn Tool>`.
#[macro_export]
macro_rules! function_tool {
    ($name:expr, $description:expr, $func:expr) => {
        ::std::sync::Arc::new($crate::tool::FunctionTool::typed($name, $description, $func))
            as ::std::sync::Arc<dyn $crate::tool::Tool>
    };
}
