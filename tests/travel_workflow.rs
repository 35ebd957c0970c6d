//! End-to-end runs of the travel workflow against a scripted model.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use travel_agent_workflow::travel::{
    travel_agents, COORDINATOR, DEFAULT_REQUESTS, FLIGHT_AGENT, HOTEL_AGENT,
};
use travel_agent_workflow::{
    setup_agents, Agent, AgentWorkflow, RoutingState, RunItem, ScriptedProvider, Telemetry,
    WorkflowConfig, WorkflowError,
};

const FINAL_REPLY: &str = "Your trip is booked. Successfully booked a flight from San Jose to Boston. Successfully booked a stay at Hyatt Hotel.";

fn travel_script() -> ScriptedProvider {
    ScriptedProvider::new()
        .with_tool_call(
            format!("handoff_to_{}", FLIGHT_AGENT),
            json!({"reason": "flight booking from San Jose to Boston"}),
        )
        .with_tool_call(
            "lmx_book_flight_tool_05",
            json!({"from_airport": "San Jose", "to_airport": "Boston"}),
        )
        .with_tool_call(
            format!("handoff_to_{}", COORDINATOR),
            json!({"reason": "flight booked"}),
        )
        .with_tool_call(
            format!("handoff_to_{}", HOTEL_AGENT),
            json!({"reason": "hotel stay at Hyatt Hotel"}),
        )
        .with_tool_call("lmx_book_hotel_tool_05", json!({"hotel_name": "Hyatt Hotel"}))
        .with_tool_call(format!("handoff_to_{}", COORDINATOR), json!({}))
        .with_message(FINAL_REPLY)
}

fn travel_workflow(provider: Arc<ScriptedProvider>) -> AgentWorkflow {
    setup_agents(
        provider,
        Telemetry::new("travel-agent-lmx-wf-05").with_memory_exporter(),
        &WorkflowConfig::default(),
    )
    .unwrap()
}

fn tool_outputs(items: &[RunItem]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item {
            RunItem::ToolOutput(o) => o.output.as_str().map(str::to_string),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn books_flight_and_hotel_through_workers() {
    let provider = Arc::new(travel_script());
    let workflow = travel_workflow(provider.clone());

    let output = workflow.run(DEFAULT_REQUESTS[0]).await.unwrap();

    assert!(output
        .response
        .contains("Successfully booked a flight from San Jose to Boston."));
    assert!(output
        .response
        .contains("Successfully booked a stay at Hyatt Hotel."));
    assert_eq!(output.agent, COORDINATOR);
    assert_eq!(provider.remaining(), 0);

    assert_eq!(
        output.handoffs(),
        vec![
            (COORDINATOR, FLIGHT_AGENT),
            (FLIGHT_AGENT, COORDINATOR),
            (COORDINATOR, HOTEL_AGENT),
            (HOTEL_AGENT, COORDINATOR),
        ]
    );

    let outputs = tool_outputs(&output.items);
    assert!(outputs.contains(&"Successfully booked a flight from San Jose to Boston.".to_string()));
    assert!(outputs.contains(&"Successfully booked a stay at Hyatt Hotel.".to_string()));
    assert_eq!(
        outputs[0],
        format!(
            "Agent {} is now handling the request due to the following reason: flight booking from San Jose to Boston.\nPlease continue with the current request.",
            FLIGHT_AGENT
        )
    );
}

#[tokio::test]
async fn routing_history_for_travel_request() {
    let workflow = travel_workflow(Arc::new(travel_script()));
    let output = workflow.run(DEFAULT_REQUESTS[0]).await.unwrap();

    assert_eq!(
        output.routing,
        vec![
            RoutingState::AwaitingRequest,
            RoutingState::Delegating,
            RoutingState::AwaitingSubagentResult,
            RoutingState::Consolidating,
            RoutingState::AwaitingSubagentResult,
            RoutingState::Consolidating,
            RoutingState::Done,
        ]
    );
}

#[tokio::test]
async fn each_agent_sees_its_own_prompt_and_tools() {
    let provider = Arc::new(travel_script());
    let workflow = travel_workflow(provider.clone());
    workflow.run(DEFAULT_REQUESTS[0]).await.unwrap();

    let requests = provider.requests();
    assert_eq!(requests.len(), 7);

    assert!(requests[0]
        .system_prompt
        .starts_with("You are a coordinator agent"));
    assert_eq!(
        requests[0].tool_names,
        vec![
            "handoff_to_lmx_flight_booking_agent_05",
            "handoff_to_lmx_hotel_booking_agent_05",
        ]
    );

    assert!(requests[1]
        .system_prompt
        .starts_with("You are a flight booking agent"));
    assert_eq!(
        requests[1].tool_names,
        vec![
            "lmx_book_flight_tool_05",
            "handoff_to_lmx_coordinator_05",
            "handoff_to_lmx_hotel_booking_agent_05",
        ]
    );

    // History is shared: every request carries everything said so far.
    assert!(requests
        .windows(2)
        .all(|w| w[1].message_count > w[0].message_count));
    assert!(requests.iter().all(|r| r.model == "gpt-4o"));
}

#[tokio::test]
async fn usage_is_broken_down_per_agent() {
    let workflow = travel_workflow(Arc::new(travel_script()));
    let output = workflow.run(DEFAULT_REQUESTS[0]).await.unwrap();

    assert_eq!(output.usage.total.request_count, 7);
    assert_eq!(output.usage.by_agent[COORDINATOR].request_count, 3);
    assert_eq!(output.usage.by_agent[FLIGHT_AGENT].request_count, 2);
    assert_eq!(output.usage.by_agent[HOTEL_AGENT].request_count, 2);
}

#[tokio::test]
async fn handoff_outside_the_allowed_set_is_refused() {
    // The unsuffixed name is not an agent in this workflow.
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_tool_call("handoff_to_lmx_flight_booking_agent", json!({}))
            .with_message("I could not reach the flight agent."),
    );
    let workflow = travel_workflow(provider.clone());

    let output = workflow.run(DEFAULT_REQUESTS[0]).await.unwrap();
    assert_eq!(output.agent, COORDINATOR);
    assert!(output.handoffs().is_empty());
    assert_eq!(
        tool_outputs(&output.items),
        vec![format!(
            "Agent lmx_flight_booking_agent not found. Please select a valid agent to hand off to. Valid agents: {}, {}",
            FLIGHT_AGENT, HOTEL_AGENT
        )]
    );
    assert_eq!(
        output.routing,
        vec![
            RoutingState::AwaitingRequest,
            RoutingState::Delegating,
            RoutingState::Done
        ]
    );
    assert!(provider.requests()[1]
        .system_prompt
        .starts_with("You are a coordinator agent"));
}

#[tokio::test]
async fn worker_cannot_hand_off_to_itself() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_tool_call(format!("handoff_to_{}", HOTEL_AGENT), json!({}))
            .with_tool_call(format!("handoff_to_{}", HOTEL_AGENT), json!({}))
            .with_message("Hotel agent done."),
    );
    let workflow = travel_workflow(provider);

    let output = workflow.run("book a hotel").await.unwrap();
    assert_eq!(output.agent, HOTEL_AGENT);
    assert_eq!(output.handoffs(), vec![(COORDINATOR, HOTEL_AGENT)]);
    assert!(tool_outputs(&output.items)[1].starts_with("Agent lmx_hotel_booking_agent_05 not found."));
}

#[test]
fn dangling_handoff_target_fails_at_build() {
    let coordinator = Agent::simple(COORDINATOR, "coordinate")
        .with_handoffs_to(["lmx_flight_booking_agent", "lmx_hotel_booking_agent"]);
    let mut agents = travel_agents(&WorkflowConfig::default());
    agents[0] = coordinator;

    let err = AgentWorkflow::builder()
        .agents(agents)
        .root_agent(COORDINATOR)
        .provider(Arc::new(ScriptedProvider::new()))
        .build()
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Agent lmx_coordinator_05 lists unknown handoff target: lmx_flight_booking_agent"
    );
}

#[test]
fn listing_itself_as_target_fails_at_build() {
    let mut agents = travel_agents(&WorkflowConfig::default());
    agents[0] = Agent::simple(COORDINATOR, "coordinate")
        .with_handoffs_to([COORDINATOR, FLIGHT_AGENT, HOTEL_AGENT]);

    let err = AgentWorkflow::builder()
        .agents(agents)
        .root_agent(COORDINATOR)
        .provider(Arc::new(ScriptedProvider::new()))
        .build()
        .unwrap_err();
    assert!(matches!(err, WorkflowError::SelfHandoff { agent } if agent == COORDINATOR));
}

#[test]
fn duplicate_agent_names_fail_at_build() {
    let mut agents = travel_agents(&WorkflowConfig::default());
    agents.push(Agent::simple(HOTEL_AGENT, "another hotel agent"));

    let err = AgentWorkflow::builder()
        .agents(agents)
        .root_agent(COORDINATOR)
        .provider(Arc::new(ScriptedProvider::new()))
        .build()
        .unwrap_err();
    assert!(matches!(err, WorkflowError::DuplicateAgent { name } if name == HOTEL_AGENT));
}

#[test]
fn unknown_root_fails_at_build() {
    let err = AgentWorkflow::builder()
        .agents(travel_agents(&WorkflowConfig::default()))
        .root_agent("lmx_coordinator")
        .provider(Arc::new(ScriptedProvider::new()))
        .build()
        .unwrap_err();
    assert!(matches!(err, WorkflowError::UnknownRootAgent { name } if name == "lmx_coordinator"));
}
