//! # Travel agent workflow
//!
//! A coordinator agent and two booking agents cooperating on one travel
//! request. The coordinator splits the request, hands the flight part to the
//! flight agent and the hotel part to the hotel agent, and consolidates their
//! confirmations into one reply. Which agent does what is decided by the LLM;
//! the crate supplies the agents, tools, handoff plumbing and telemetry.
//!
//! ## Core Concepts
//!
//! - **Agent**: name, description, system prompt, tools and the set of agents
//!   it may hand off to
//! - **Tools**: typed functions with schemas derived by `schemars`, routed by
//!   name through a `tower::Service`
//! - **Handoffs**: advertised to the model as `handoff_to_{agent}` tools
//! - **Telemetry**: every run is a trace, exported to files under `.monocle`
//!   by default
//!
//! ## Getting Started
//!
//! Set your OpenAI API key in the `OPENAI_API_KEY` environment variable.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use travel_agent_workflow::{config, setup_agents, setup_telemetry, OpenAIProvider};
//!
//! # async fn example() -> travel_agent_workflow::Result<()> {
//! let config = config::load()?;
//! let telemetry = setup_telemetry(&config)?;
//! let workflow = setup_agents(Arc::new(OpenAIProvider::new()), telemetry, &config)?;
//!
//! let output = workflow
//!     .run("book a flight from San Jose to Boston and a book hotel stay at Hyatt Hotel")
//!     .await?;
//! println!("{}", output);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod booking;
pub mod config;
pub mod error;
pub mod handoff;
pub mod items;
pub mod model;
pub mod routing;
pub mod telemetry;
pub mod tool;
pub mod tool_service;
pub mod trace;
pub mod travel;
pub mod usage;
pub mod workflow;

pub use agent::{Agent, AgentConfig};
pub use config::{ExporterKind, WorkflowConfig};
pub use error::{Result, WorkflowError};
pub use handoff::{HandoffData, HandoffDecision};
pub use items::{Message, ModelResponse, Role, RunItem, ToolCall};
pub use model::{ModelProvider, OpenAIProvider, ScriptedProvider};
pub use routing::{RoutingState, RoutingTracker};
pub use telemetry::{init_logging, setup_telemetry, Telemetry};
pub use tool::{FunctionTool, Tool, ToolResult};
pub use tool_service::ToolRouter;
pub use travel::setup_agents;
pub use usage::{Usage, UsageStats};
pub use workflow::{AgentWorkflow, WorkflowOutput};
