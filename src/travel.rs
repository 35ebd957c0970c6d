//! The travel booking agents
//!
//! A coordinator that splits a request into flight and hotel parts, and one
//! worker agent per booking tool. Workers may hand off to any other agent;
//! their prompts tell them to return to the coordinator.

use std::sync::Arc;

use crate::agent::Agent;
use crate::booking::{flight_tool, hotel_tool};
use crate::config::WorkflowConfig;
use crate::error::Result;
use crate::model::ModelProvider;
use crate::telemetry::Telemetry;
use crate::workflow::AgentWorkflow;

pub const COORDINATOR: &str = "lmx_coordinator_05";
pub const FLIGHT_AGENT: &str = "lmx_flight_booking_agent_05";
pub const HOTEL_AGENT: &str = "lmx_hotel_booking_agent_05";

pub const COORDINATOR_PROMPT: &str = "You are a coordinator agent who manages the flight and hotel booking agents. Separate hotel booking and flight booking tasks clearly from the input query.
Delegate only hotel booking to the hotel booking agent and only flight booking to the flight booking agent.
Once they complete their tasks, you collect their responses and provide consolidated response to the user.";

pub const FLIGHT_PROMPT: &str = "You are a flight booking agent who books flights as per the request. Once you complete the task, you handoff back to the coordinator agent only.";

pub const HOTEL_PROMPT: &str = "You are a hotel booking agent who books hotels as per the request. Once you complete the task, you handoff back to the coordinator agent only.";

/// Requests run by the `travel-agent` binary.
pub const DEFAULT_REQUESTS: &[&str] =
    &["book a flight from San Jose to Boston and a book hotel stay at Hyatt Hotel"];

/// The three travel agents, coordinator first.
pub fn travel_agents(config: &WorkflowConfig) -> Vec<Agent> {
    let configure = |agent: Agent| {
        let agent = agent.with_model(config.model.clone());
        match config.temperature {
            Some(t) => agent.with_temperature(t),
            None => agent,
        }
    };

    vec![
        configure(
            Agent::simple(COORDINATOR, COORDINATOR_PROMPT)
                .with_description("Travel booking coordinator agent")
                .with_handoffs_to([FLIGHT_AGENT, HOTEL_AGENT]),
        ),
        configure(
            Agent::simple(FLIGHT_AGENT, FLIGHT_PROMPT)
                .with_description("Flight booking agent")
                .with_tool(flight_tool()),
        ),
        configure(
            Agent::simple(HOTEL_AGENT, HOTEL_PROMPT)
                .with_description("Hotel booking agent")
                .with_tool(hotel_tool()),
        ),
    ]
}

/// Builds the travel workflow rooted at the coordinator.
pub fn setup_agents(
    provider: Arc<dyn ModelProvider>,
    telemetry: Telemetry,
    config: &WorkflowConfig,
) -> Result<AgentWorkflow> {
    AgentWorkflow::builder()
        .agents(travel_agents(config))
        .root_agent(COORDINATOR)
        .provider(provider)
        .telemetry(telemetry)
        .max_turns(config.max_turns)
        .build()
}
