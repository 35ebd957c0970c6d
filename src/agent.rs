//! # Agent
//!
//! An `Agent` is a configured participant in a workflow: a name, a
//! description (shown to other agents deciding whether to hand off to it), a
//! system prompt, tools, and the set of agents it may hand control to.
//! Agents are built once at setup and never mutated while a workflow runs.

use std::sync::Arc;

use crate::items::Message;
use crate::tool::Tool;

/// Defines the complete configuration for an [`Agent`].
#[derive(Clone)]
pub struct AgentConfig {
    /// The name of the agent, unique within a workflow and used in logs.
    pub name: String,

    /// A description of the agent's capabilities, used when this agent is a
    /// potential handoff target for another agent.
    pub description: String,

    /// The system prompt that defines the agent's role.
    pub system_prompt: String,

    /// Tools the agent may call.
    pub tools: Vec<Arc<dyn Tool>>,

    /// Agents this agent may hand control to. `None` allows every other
    /// agent in the workflow.
    pub can_handoff_to: Option<Vec<String>>,

    /// The model used for this agent's completions.
    pub model: String,

    pub temperature: Option<f32>,

    pub max_tokens: Option<u32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Agent".to_string(),
            description: String::new(),
            system_prompt: "You are a helpful assistant.".to_string(),
            tools: vec![],
            can_handoff_to: None,
            model: "gpt-4o".to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// An LLM-backed actor with a role, a prompt and optional tools.
///
/// ```rust
/// use std::sync::Arc;
/// use travel_agent_workflow::{booking, Agent};
///
/// let flight_agent = Agent::simple(
///     "lmx_flight_booking_agent_05",
///     "You are a flight booking agent.",
/// )
/// .with_description("Flight booking agent")
/// .with_tool(booking::flight_tool());
///
/// let coordinator = Agent::simple("lmx_coordinator_05", "You coordinate bookings.")
///     .with_handoffs_to(["lmx_flight_booking_agent_05"]);
///
/// assert_eq!(flight_agent.tools().len(), 1);
/// assert!(coordinator.can_handoff_to("lmx_flight_booking_agent_05"));
/// assert!(!coordinator.can_handoff_to("lmx_hotel_booking_agent_05"));
/// ```
#[derive(Clone)]
pub struct Agent {
    /// The configuration that defines the agent's behavior and capabilities.
    pub config: AgentConfig,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// Creates an agent with just a name and system prompt; other settings
    /// take their defaults.
    pub fn simple(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self::new(AgentConfig {
            name: name.into(),
            system_prompt: system_prompt.into(),
            ..Default::default()
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.config.description = description.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.config.tools.push(tool);
        self
    }

    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.config.tools.extend(tools);
        self
    }

    /// Restricts handoffs to the named agents.
    pub fn with_handoffs_to<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.can_handoff_to = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = Some(max_tokens);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn description(&self) -> &str {
        &self.config.description
    }

    pub fn system_prompt(&self) -> &str {
        &self.config.system_prompt
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.config.tools
    }

    /// The declared handoff set, `None` when unrestricted.
    pub fn handoff_targets(&self) -> Option<&[String]> {
        self.config.can_handoff_to.as_deref()
    }

    /// Whether this agent may hand control to `target`. An agent never hands
    /// off to itself.
    pub fn can_handoff_to(&self, target: &str) -> bool {
        if target == self.name() {
            return false;
        }
        match &self.config.can_handoff_to {
            None => true,
            Some(targets) => targets.iter().any(|t| t == target),
        }
    }

    /// Builds the system message: the prompt, then the tools and handoff
    /// targets available to the agent.
    pub fn build_system_message(&self, handoff_targets: &[&Agent]) -> Message {
        let mut content = self.config.system_prompt.clone();

        if !self.config.tools.is_empty() {
            content.push_str("\n\nYou have access to the following tools:\n");
            for tool in &self.config.tools {
                content.push_str(&format!("- {}: {}\n", tool.name(), tool.description()));
            }
        }

        if !handoff_targets.is_empty() {
            content.push_str("\n\nYou can hand off to the following agents:\n");
            for target in handoff_targets {
                content.push_str(&format!("- {}: {}\n", target.name(), target.description()));
            }
        }

        Message::system(content)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.config.name)
            .field("model", &self.config.model)
            .field("tools_count", &self.config.tools.len())
            .field("can_handoff_to", &self.config.can_handoff_to)
            .finish()
    }
}
