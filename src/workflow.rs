//! # Agent workflow
//!
//! An [`AgentWorkflow`] is a fixed set of agents with one root. A run starts
//! at the root with the user's message; every turn the current agent sees the
//! shared history, its own tools and one `handoff_to_{target}` tool per agent
//! it may hand off to. The run ends on the first model reply without tool
//! calls.
//!
//! Handoff sets are checked when the workflow is built, so a typo in
//! `can_handoff_to` fails at startup instead of surfacing as a refused
//! handoff mid-run.
//!
//! ```rust
//! use std::sync::Arc;
//! use travel_agent_workflow::{Agent, AgentWorkflow, ScriptedProvider, WorkflowError};
//!
//! let provider = Arc::new(ScriptedProvider::new());
//! let result = AgentWorkflow::builder()
//!     .agent(Agent::simple("coordinator", "Route requests").with_handoffs_to(["flights"]))
//!     .root_agent("coordinator")
//!     .provider(provider)
//!     .build();
//!
//! assert!(matches!(result, Err(WorkflowError::UnknownHandoffTarget { .. })));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tower::ServiceExt;
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::error::{Result, WorkflowError};
use crate::handoff::{
    refusal, target_from_tool_name, HandoffArgs, HandoffData, HandoffDecision, HandoffTool,
};
use crate::items::{Message, Role, RunItem, ToolCall};
use crate::model::{ModelProvider, ModelRequest};
use crate::routing::{RoutingEvent, RoutingState, RoutingTracker};
use crate::telemetry::Telemetry;
use crate::tool::{Tool, ToolResult};
use crate::tool_service::{ToolInvocation, ToolRouter};
use crate::trace::{self, AgentSpan, GenerationSpan, SharedContext, SpanType, ToolSpan, TracingContext};
use crate::usage::UsageStats;

pub const DEFAULT_MAX_TURNS: usize = 20;

fn truncate_for_log(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let mut out: String = s.chars().take(max).collect();
        out.push('…');
        out
    } else {
        s.to_string()
    }
}

fn format_messages_for_log(messages: &[Message]) -> String {
    messages
        .iter()
        .enumerate()
        .map(|(idx, m)| match (&m.role, &m.tool_calls) {
            (Role::Assistant, Some(calls)) => {
                let calls: Vec<String> = calls
                    .iter()
                    .map(|tc| format!("id={}, name={}", tc.id, tc.name))
                    .collect();
                format!("{:02} ASSISTANT| tool_calls: [{}]", idx, calls.join("; "))
            }
            (Role::Tool, _) => format!(
                "{:02} TOOL     | (tool_call_id={}) {}",
                idx,
                m.tool_call_id.as_deref().unwrap_or("?"),
                truncate_for_log(&m.content, 160)
            ),
            (role, _) => format!(
                "{:02} {:<9}| {}",
                idx,
                format!("{:?}", role).to_uppercase(),
                truncate_for_log(&m.content, 160)
            ),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result of one workflow run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutput {
    /// The final response text.
    pub response: String,
    /// The agent that produced the final response.
    pub agent: String,
    pub items: Vec<RunItem>,
    pub usage: UsageStats,
    /// Every routing state entered during the run, in order.
    pub routing: Vec<RoutingState>,
    pub trace_id: String,
}

impl WorkflowOutput {
    pub fn handoffs(&self) -> Vec<(&str, &str)> {
        self.items
            .iter()
            .filter_map(|item| match item {
                RunItem::Handoff(h) => Some((h.from_agent.as_str(), h.to_agent.as_str())),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for WorkflowOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.response)
    }
}

/// Mutable state of one run.
struct RunState {
    history: Vec<Message>,
    items: Vec<RunItem>,
    usage: UsageStats,
    routing: RoutingTracker,
}

/// A validated set of agents with a root, ready to run requests.
pub struct AgentWorkflow {
    agents: Vec<Agent>,
    index: HashMap<String, usize>,
    routers: Vec<ToolRouter>,
    root: usize,
    provider: Arc<dyn ModelProvider>,
    telemetry: Telemetry,
    max_turns: usize,
}

impl fmt::Debug for AgentWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentWorkflow")
            .field("agents", &self.agents)
            .field("root", &self.root_agent().name())
            .field("telemetry", &self.telemetry)
            .field("max_turns", &self.max_turns)
            .finish()
    }
}

/// Builder for [`AgentWorkflow`]; validation happens in [`build`](Self::build).
pub struct AgentWorkflowBuilder {
    agents: Vec<Agent>,
    root_agent: Option<String>,
    provider: Option<Arc<dyn ModelProvider>>,
    telemetry: Option<Telemetry>,
    max_turns: usize,
}

impl Default for AgentWorkflowBuilder {
    fn default() -> Self {
        Self {
            agents: Vec::new(),
            root_agent: None,
            provider: None,
            telemetry: None,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

impl AgentWorkflowBuilder {
    pub fn agent(mut self, agent: Agent) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn agents(mut self, agents: impl IntoIterator<Item = Agent>) -> Self {
        self.agents.extend(agents);
        self
    }

    /// Agent that receives the user's message. May be omitted when the
    /// workflow has a single agent.
    pub fn root_agent(mut self, name: impl Into<String>) -> Self {
        self.root_agent = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn build(self) -> Result<AgentWorkflow> {
        if self.agents.is_empty() {
            return Err(WorkflowError::ConfigError(
                "a workflow needs at least one agent".to_string(),
            ));
        }
        if self.max_turns == 0 {
            return Err(WorkflowError::ConfigError(
                "max_turns must be at least 1".to_string(),
            ));
        }

        let mut index = HashMap::new();
        for (i, agent) in self.agents.iter().enumerate() {
            if index.insert(agent.name().to_string(), i).is_some() {
                return Err(WorkflowError::DuplicateAgent {
                    name: agent.name().to_string(),
                });
            }
        }

        let root = match &self.root_agent {
            Some(name) => *index
                .get(name)
                .ok_or_else(|| WorkflowError::UnknownRootAgent { name: name.clone() })?,
            None if self.agents.len() == 1 => 0,
            None => {
                return Err(WorkflowError::ConfigError(
                    "root agent must be set when a workflow has several agents".to_string(),
                ))
            }
        };

        for agent in &self.agents {
            for tool in agent.tools() {
                if target_from_tool_name(tool.name()).is_some() {
                    return Err(WorkflowError::ConfigError(format!(
                        "agent {} registers tool {}, a name reserved for handoffs",
                        agent.name(),
                        tool.name()
                    )));
                }
            }
            for target in agent.handoff_targets().unwrap_or_default() {
                if target == agent.name() {
                    return Err(WorkflowError::SelfHandoff {
                        agent: agent.name().to_string(),
                    });
                }
                if !index.contains_key(target) {
                    return Err(WorkflowError::UnknownHandoffTarget {
                        agent: agent.name().to_string(),
                        target: target.clone(),
                    });
                }
            }
        }

        let provider = self.provider.ok_or_else(|| {
            WorkflowError::ConfigError("a model provider is required".to_string())
        })?;

        let routers = self
            .agents
            .iter()
            .map(|agent| ToolRouter::new(agent.tools()))
            .collect();

        let telemetry = self
            .telemetry
            .unwrap_or_else(|| Telemetry::new("agent-workflow"));

        debug!(
            agents = self.agents.len(),
            root = %self.agents[root].name(),
            "Workflow built"
        );

        Ok(AgentWorkflow {
            agents: self.agents,
            index,
            routers,
            root,
            provider,
            telemetry,
            max_turns: self.max_turns,
        })
    }
}

impl AgentWorkflow {
    pub fn builder() -> AgentWorkflowBuilder {
        AgentWorkflowBuilder::default()
    }

    pub fn root_agent(&self) -> &Agent {
        &self.agents[self.root]
    }

    pub fn agent(&self, name: &str) -> Option<&Agent> {
        self.index.get(name).map(|&i| &self.agents[i])
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Agents `from` may hand off to, in registration order.
    pub fn handoff_targets(&self, from: &Agent) -> Vec<&Agent> {
        self.agents
            .iter()
            .filter(|a| from.can_handoff_to(a.name()))
            .collect()
    }

    /// Runs one user message to completion.
    ///
    /// The trace is exported whether the run succeeds or fails. A failed run
    /// returns its own error even if the export also fails.
    pub async fn run(&self, user_msg: &str) -> Result<WorkflowOutput> {
        let context: SharedContext = Arc::new(Mutex::new(TracingContext::new()));
        let run_span = trace::start(
            &context,
            SpanType::Workflow {
                workflow_name: self.telemetry.workflow_name().to_string(),
                input: user_msg.to_string(),
            },
        );

        info!(
            root = %self.root_agent().name(),
            trace_id = %trace::trace_id(&context),
            "Starting workflow run"
        );

        let result = self.run_loop(user_msg, &context).await;

        match &result {
            Ok(output) => {
                trace::end(&context, &run_span);
                info!(agent = %output.agent, "Workflow run complete");
            }
            Err(e) => trace::fail(&context, &run_span, e.to_string()),
        }

        let exported = {
            let ctx = context.lock().unwrap_or_else(|e| e.into_inner());
            self.telemetry.export(&ctx)
        };

        match (result, exported) {
            (Ok(output), Ok(())) => Ok(output),
            (Ok(_), Err(export_err)) => Err(export_err),
            (Err(run_err), Err(export_err)) => {
                warn!(error = %export_err, "Trace export failed after run error");
                Err(run_err)
            }
            (Err(run_err), Ok(())) => Err(run_err),
        }
    }

    async fn run_loop(&self, user_msg: &str, context: &SharedContext) -> Result<WorkflowOutput> {
        let root_name = self.root_agent().name();
        let mut state = RunState {
            history: vec![Message::user(user_msg)],
            items: vec![RunItem::message(root_name, Role::User, user_msg)],
            usage: UsageStats::new(),
            routing: RoutingTracker::new(),
        };
        state.routing.apply(RoutingEvent::RequestReceived);

        let mut current = self.root;
        let mut turn = 0;

        loop {
            turn += 1;
            if turn > self.max_turns {
                return Err(WorkflowError::MaxTurnsExceeded {
                    max_turns: self.max_turns,
                });
            }

            let agent = &self.agents[current];
            debug!(turn, agent = %agent.name(), "Starting turn");

            let agent_span = AgentSpan::new(context.clone(), agent.name());
            let decision = match self.run_turn(current, &mut state, context).await {
                Ok(decision) => decision,
                Err(e) => {
                    agent_span.error(e.to_string());
                    return Err(e);
                }
            };

            match decision {
                HandoffDecision::Complete(response) => {
                    agent_span.complete();
                    state.routing.apply(RoutingEvent::FinalResponse);
                    return Ok(WorkflowOutput {
                        response,
                        agent: agent.name().to_string(),
                        items: state.items,
                        usage: state.usage,
                        routing: state.routing.into_history(),
                        trace_id: trace::trace_id(context),
                    });
                }
                HandoffDecision::HandOff(data) => {
                    let target = self.index.get(&data.to_agent).copied().ok_or_else(|| {
                        WorkflowError::HandoffError {
                            message: format!("agent {} vanished from the workflow", data.to_agent),
                        }
                    })?;
                    let span = trace::start(
                        context,
                        SpanType::Handoff {
                            from_agent: data.from_agent.clone(),
                            to_agent: data.to_agent.clone(),
                            reason: data.reason.clone(),
                        },
                    );
                    trace::end(context, &span);
                    agent_span.complete();

                    info!(from = %data.from_agent, to = %data.to_agent, "Handoff");
                    state.routing.apply(RoutingEvent::Handoff {
                        to_root: target == self.root,
                    });
                    state
                        .items
                        .push(RunItem::handoff(&data.from_agent, &data.to_agent, data.reason));
                    current = target;
                }
                HandoffDecision::Continue => agent_span.complete(),
            }
        }
    }

    /// One model call for the agent at `current`, plus its tool calls.
    async fn run_turn(
        &self,
        current: usize,
        state: &mut RunState,
        context: &SharedContext,
    ) -> Result<HandoffDecision> {
        let agent = &self.agents[current];
        let targets = self.handoff_targets(agent);

        let mut messages = Vec::with_capacity(state.history.len() + 1);
        messages.push(agent.build_system_message(&targets));
        messages.extend(state.history.iter().cloned());

        let mut tools: Vec<Arc<dyn Tool>> = agent.tools().to_vec();
        tools.extend(
            targets
                .iter()
                .map(|t| Arc::new(HandoffTool::new(t)) as Arc<dyn Tool>),
        );

        debug!(
            target: "workflow::messages",
            "\n=== Sending to provider (agent: {}, model: {}) ===\n{}\n=== end ===",
            agent.name(),
            agent.config.model,
            format_messages_for_log(&messages)
        );

        let request = ModelRequest {
            model: agent.config.model.clone(),
            messages,
            tools,
            temperature: agent.config.temperature,
            max_tokens: agent.config.max_tokens,
        };

        let gen_span = GenerationSpan::new(context.clone(), &agent.config.model);
        let (response, usage) = match self.provider.complete(request).await {
            Ok(r) => r,
            Err(e) => {
                gen_span.error(e.to_string());
                return Err(e);
            }
        };
        gen_span.complete_with_usage(&usage);
        state.usage.record(&agent.config.model, agent.name(), usage);

        let content = response.content.clone().unwrap_or_default();

        if !response.has_tool_calls() {
            state
                .history
                .push(Message::assistant(&content).from_agent(agent.name()));
            state
                .items
                .push(RunItem::message(agent.name(), Role::Assistant, &content));
            return Ok(HandoffDecision::Complete(content));
        }

        state.history.push(
            Message::assistant_with_tool_calls(&content, response.tool_calls.clone())
                .from_agent(agent.name()),
        );
        if !content.is_empty() {
            state
                .items
                .push(RunItem::message(agent.name(), Role::Assistant, &content));
        }
        for call in &response.tool_calls {
            state.items.push(RunItem::tool_call(agent.name(), call));
        }

        let (handoff_calls, tool_calls): (Vec<&ToolCall>, Vec<&ToolCall>) = response
            .tool_calls
            .iter()
            .partition(|call| target_from_tool_name(&call.name).is_some());

        // Ordinary tools run first so their replies precede any handoff.
        for call in tool_calls {
            let result = self.execute_tool(current, call, context).await;
            Self::reply(state, &call.id, &result);
            state.routing.apply(RoutingEvent::ToolCalled);
        }

        let mut decision = HandoffDecision::Continue;
        for call in handoff_calls {
            if decision != HandoffDecision::Continue {
                Self::reply(
                    state,
                    &call.id,
                    &ToolResult::error("only one handoff is applied per turn"),
                );
                continue;
            }
            match self.resolve_handoff(agent, call) {
                Ok(data) => {
                    Self::reply(
                        state,
                        &call.id,
                        &ToolResult::success(serde_json::Value::String(data.acknowledgement())),
                    );
                    decision = HandoffDecision::HandOff(data);
                }
                Err(refused) => {
                    warn!(from = %agent.name(), tool = %call.name, "Handoff refused");
                    Self::reply(
                        state,
                        &call.id,
                        &ToolResult::success(serde_json::Value::String(refused)),
                    );
                }
            }
        }

        Ok(decision)
    }

    /// Checks a handoff call against the workflow and the caller's handoff
    /// set. `Err` carries the reply for a refused handoff.
    fn resolve_handoff(
        &self,
        from: &Agent,
        call: &ToolCall,
    ) -> std::result::Result<HandoffData, String> {
        let to = target_from_tool_name(&call.name).unwrap_or_default();
        if !self.index.contains_key(to) || !from.can_handoff_to(to) {
            let valid: Vec<&str> = self
                .handoff_targets(from)
                .iter()
                .map(|a| a.name())
                .collect();
            return Err(refusal(to, &valid));
        }

        let args = HandoffArgs::from_value(&call.arguments);
        Ok(HandoffData::new(from.name(), to, &call.id).with_reason(args.reason))
    }

    async fn execute_tool(
        &self,
        current: usize,
        call: &ToolCall,
        context: &SharedContext,
    ) -> ToolResult {
        let span = ToolSpan::new(context.clone(), &call.name, call.arguments.clone());
        let invocation = ToolInvocation {
            id: call.id.clone(),
            agent: self.agents[current].name().to_string(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        };

        match self.routers[current].clone().oneshot(invocation).await {
            Ok(output) => {
                match &output.result.error {
                    Some(e) => span.error(e.clone()),
                    None => span.success(),
                }
                output.result
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool call failed");
                span.error(e.to_string());
                ToolResult::error(e.to_string())
            }
        }
    }

    fn reply(state: &mut RunState, tool_call_id: &str, result: &ToolResult) {
        state
            .history
            .push(Message::tool(result.to_reply(), tool_call_id));
        state.items.push(RunItem::tool_output(
            tool_call_id,
            result.output.clone(),
            result.error.clone(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function_tool;
    use crate::items::ModelResponse;
    use crate::model::ScriptedProvider;
    use pretty_assertions::assert_eq;
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct CityArgs {
        city: String,
    }

    fn weather_agent() -> Agent {
        Agent::simple("weather", "Report weather")
            .with_description("Weather agent")
            .with_tool(function_tool!("get_weather", "Weather for a city", |a: CityArgs| {
                format!("Sunny in {}", a.city)
            }))
    }

    fn workflow(provider: Arc<ScriptedProvider>, agents: Vec<Agent>) -> AgentWorkflow {
        AgentWorkflow::builder()
            .agents(agents)
            .root_agent("router")
            .provider(provider)
            .telemetry(Telemetry::new("test").with_memory_exporter())
            .build()
            .unwrap()
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        assert_eq!(truncate_for_log("héllo", 2), "hé…");
        assert_eq!(truncate_for_log("short", 10), "short");
    }

    #[test]
    fn test_single_agent_needs_no_root() {
        let wf = AgentWorkflow::builder()
            .agent(weather_agent())
            .provider(Arc::new(ScriptedProvider::new()))
            .build()
            .unwrap();
        assert_eq!(wf.root_agent().name(), "weather");
        assert_eq!(wf.max_turns(), DEFAULT_MAX_TURNS);
    }

    #[test]
    fn test_missing_root_with_several_agents() {
        let err = AgentWorkflow::builder()
            .agents([weather_agent(), Agent::simple("router", "Route")])
            .provider(Arc::new(ScriptedProvider::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ConfigError(_)));
    }

    #[test]
    fn test_missing_provider() {
        let err = AgentWorkflow::builder()
            .agent(weather_agent())
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: a model provider is required"
        );
    }

    #[tokio::test]
    async fn test_tool_then_answer() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_tool_call("get_weather", json!({"city": "Boston"}))
                .with_message("It is sunny in Boston."),
        );
        let wf = workflow(
            provider.clone(),
            vec![Agent::simple("router", "Route").with_tools(weather_agent().tools().to_vec())],
        );

        let output = wf.run("weather in Boston?").await.unwrap();
        assert_eq!(output.response, "It is sunny in Boston.");
        assert_eq!(output.agent, "router");
        assert_eq!(
            output.routing,
            vec![
                RoutingState::AwaitingRequest,
                RoutingState::Delegating,
                RoutingState::Done
            ]
        );
        assert!(output.items.iter().any(|item| matches!(
            item,
            RunItem::ToolOutput(o) if o.output == json!("Sunny in Boston")
        )));
        assert_eq!(output.usage.total.request_count, 2);

        // user, assistant tool call, tool reply
        assert_eq!(provider.requests()[1].message_count, 4);
    }

    #[tokio::test]
    async fn test_handoff_switches_agent_and_exports_trace() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_tool_call("handoff_to_weather", json!({"reason": "weather question"}))
                .with_message("Sunny."),
        );
        let wf = workflow(
            provider.clone(),
            vec![Agent::simple("router", "Route"), weather_agent()],
        );

        let output = wf.run("weather?").await.unwrap();
        assert_eq!(output.agent, "weather");
        assert_eq!(output.handoffs(), vec![("router", "weather")]);

        let requests = provider.requests();
        assert_eq!(requests[0].tool_names, vec!["handoff_to_weather"]);
        assert!(requests[1].system_prompt.starts_with("Report weather"));
        assert_eq!(
            requests[1].tool_names,
            vec!["get_weather", "handoff_to_router"]
        );

        let traces = wf.telemetry().exported();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].trace_id, output.trace_id);
        assert!(traces[0]
            .spans
            .iter()
            .any(|s| matches!(&s.span_type, SpanType::Handoff { to_agent, .. } if to_agent == "weather")));
    }

    #[tokio::test]
    async fn test_second_handoff_in_one_turn_is_ignored() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_response(ModelResponse::new_tool_calls(vec![
                    ToolCall::new("handoff_to_weather", json!({})),
                    ToolCall::new("handoff_to_news", json!({})),
                ]))
                .with_message("done"),
        );
        let wf = workflow(
            provider,
            vec![
                Agent::simple("router", "Route"),
                weather_agent(),
                Agent::simple("news", "News"),
            ],
        );

        let output = wf.run("hi").await.unwrap();
        assert_eq!(output.agent, "weather");
        assert_eq!(output.handoffs().len(), 1);
        assert!(output.items.iter().any(|item| matches!(
            item,
            RunItem::ToolOutput(o) if o.error.as_deref() == Some("only one handoff is applied per turn")
        )));
    }

    #[tokio::test]
    async fn test_tools_run_before_handoff_in_same_turn() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_response(ModelResponse::new_tool_calls(vec![
                    ToolCall::new("handoff_to_weather", json!({"reason": "forecast"})),
                    ToolCall::new("lookup", json!({"city": "Boston"})),
                ]))
                .with_message("Sunny."),
        );
        let router = Agent::simple("router", "Route").with_tool(function_tool!(
            "lookup",
            "Look up a city",
            |a: CityArgs| format!("Found {}", a.city)
        ));
        let wf = workflow(provider.clone(), vec![router, weather_agent()]);

        let output = wf.run("weather in Boston?").await.unwrap();
        assert_eq!(output.agent, "weather");
        assert_eq!(output.handoffs(), vec![("router", "weather")]);

        let outputs: Vec<&str> = output
            .items
            .iter()
            .filter_map(|item| match item {
                RunItem::ToolOutput(o) => o.output.as_str(),
                _ => None,
            })
            .collect();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0], "Found Boston");
        assert!(outputs[1].starts_with("Agent weather is now handling the request"));

        let handoff_pos = output
            .items
            .iter()
            .position(|item| matches!(item, RunItem::Handoff(_)))
            .unwrap();
        let lookup_pos = output
            .items
            .iter()
            .position(|item| matches!(item, RunItem::ToolOutput(o) if o.output == json!("Found Boston")))
            .unwrap();
        assert!(lookup_pos < handoff_pos);

        assert!(provider.requests()[1].system_prompt.starts_with("Report weather"));
    }

    #[test]
    fn test_tool_with_handoff_prefix_rejected() {
        let agent = Agent::simple("router", "Route").with_tool(function_tool!(
            "handoff_to_weather",
            "Not really a handoff",
            |a: CityArgs| a.city
        ));
        let err = AgentWorkflow::builder()
            .agent(agent)
            .provider(Arc::new(ScriptedProvider::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ConfigError(msg) if msg.contains("reserved for handoffs")));
    }

    #[tokio::test]
    async fn test_max_turns_exceeded() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_tool_call("get_weather", json!({"city": "a"}))
                .with_tool_call("get_weather", json!({"city": "b"}))
                .with_message("never reached"),
        );
        let wf = AgentWorkflow::builder()
            .agent(weather_agent())
            .provider(provider)
            .telemetry(Telemetry::new("test").with_memory_exporter())
            .max_turns(2)
            .build()
            .unwrap();

        let err = wf.run("loop").await.unwrap_err();
        assert!(matches!(err, WorkflowError::MaxTurnsExceeded { max_turns: 2 }));

        let traces = wf.telemetry().exported();
        assert_eq!(traces.len(), 1);
        assert!(traces[0].spans[0].error.is_some());
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let wf = AgentWorkflow::builder()
            .agent(weather_agent())
            .provider(Arc::new(ScriptedProvider::new()))
            .build()
            .unwrap();
        let err = wf.run("hello").await.unwrap_err();
        assert!(matches!(err, WorkflowError::ModelBehaviorError { .. }));
    }

    #[tokio::test]
    async fn test_unknown_tool_reported_to_model() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_tool_call("get_forecast", json!({}))
                .with_message("sorry"),
        );
        let wf = AgentWorkflow::builder()
            .agent(weather_agent())
            .provider(provider)
            .build()
            .unwrap();

        let output = wf.run("forecast").await.unwrap();
        assert!(output.items.iter().any(|item| matches!(
            item,
            RunItem::ToolOutput(o) if o.error.as_deref() == Some("unknown tool: get_forecast")
        )));
    }
}
