//! # Agent handoffs
//!
//! A handoff transfers conversational control from one agent to another.
//! Each target an agent may hand off to is advertised to the model as a tool
//! named `handoff_to_{target}`; calling it does not execute anything, the
//! workflow intercepts the call and switches the active agent.
//!
//! [`HandoffData`] carries who handed off to whom and why, and
//! [`HandoffDecision`] is the outcome of one model turn as the workflow sees
//! it.
//!
//! ```rust
//! use travel_agent_workflow::handoff::{handoff_tool_name, target_from_tool_name};
//!
//! let tool = handoff_tool_name("lmx_hotel_booking_agent_05");
//! assert_eq!(tool, "handoff_to_lmx_hotel_booking_agent_05");
//! assert_eq!(target_from_tool_name(&tool), Some("lmx_hotel_booking_agent_05"));
//! assert_eq!(target_from_tool_name("lmx_book_hotel_tool_05"), None);
//! ```

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::Agent;
use crate::error::Result;
use crate::tool::{schema_for, Tool, ToolResult};

const HANDOFF_TOOL_PREFIX: &str = "handoff_to_";

/// Tool name under which a handoff to `target` is advertised.
pub fn handoff_tool_name(target: &str) -> String {
    format!("{}{}", HANDOFF_TOOL_PREFIX, target)
}

/// The target agent named by a handoff tool, if `tool_name` is one.
pub fn target_from_tool_name(tool_name: &str) -> Option<&str> {
    tool_name
        .strip_prefix(HANDOFF_TOOL_PREFIX)
        .filter(|target| !target.is_empty())
}

/// Arguments the model passes when calling a handoff tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct HandoffArgs {
    /// Why control is being handed to the other agent.
    pub reason: Option<String>,
}

impl HandoffArgs {
    /// Lenient parse: missing or malformed arguments mean no reason.
    pub fn from_value(arguments: &Value) -> Self {
        serde_json::from_value(arguments.clone()).unwrap_or_default()
    }
}

/// Adapter exposing a handoff target as a tool to the model provider.
#[derive(Clone, Debug)]
pub struct HandoffTool {
    name: String,
    description: String,
}

impl HandoffTool {
    pub fn new(target: &Agent) -> Self {
        let description = if target.description().is_empty() {
            format!("Hand off the conversation to {}", target.name())
        } else {
            format!(
                "Hand off the conversation to {}: {}",
                target.name(),
                target.description()
            )
        };
        Self {
            name: handoff_tool_name(target.name()),
            description,
        }
    }
}

#[async_trait]
impl Tool for HandoffTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<HandoffArgs>()
    }

    async fn execute(&self, _arguments: Value) -> Result<ToolResult> {
        // Never executed directly; the workflow intercepts handoff calls.
        Ok(ToolResult::success(serde_json::json!({"handoff": true})))
    }
}

/// The data passed between agents during a handoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffData {
    /// The name of the agent initiating the handoff.
    pub from_agent: String,

    /// The name of the agent that will take over the conversation.
    pub to_agent: String,

    /// An optional explanation for why the handoff is occurring.
    pub reason: Option<String>,

    /// Id of the tool call that requested the handoff.
    pub tool_call_id: String,
}

impl HandoffData {
    pub fn new(from: impl Into<String>, to: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            from_agent: from.into(),
            to_agent: to.into(),
            reason: None,
            tool_call_id: tool_call_id.into(),
        }
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    /// Tool reply confirming the handoff, read by the receiving agent.
    pub fn acknowledgement(&self) -> String {
        format!(
            "Agent {} is now handling the request due to the following reason: {}.\nPlease continue with the current request.",
            self.to_agent,
            self.reason.as_deref().unwrap_or("no reason given")
        )
    }
}

/// Tool reply for a refused handoff.
pub fn refusal(to_agent: &str, valid_targets: &[&str]) -> String {
    format!(
        "Agent {} not found. Please select a valid agent to hand off to. Valid agents: {}",
        to_agent,
        valid_targets.join(", ")
    )
}

/// What the workflow does after one model turn.
#[derive(Debug, Clone, PartialEq)]
pub enum HandoffDecision {
    /// Stay with the current agent for another turn.
    Continue,

    /// Switch the active agent.
    HandOff(HandoffData),

    /// The run is complete with the given final response.
    Complete(String),
}
