//! Coordinator routing state.
//!
//! Which agent handles which sub-task is decided by the model; this module
//! only tracks where a run is in the coordinator's cycle of delegating to
//! workers and consolidating their results. The workflow feeds it one
//! [`RoutingEvent`] per observable step and records every state it enters.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where a run is in the coordinator's delegate/consolidate cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingState {
    AwaitingRequest,
    /// The root agent holds the request and has not delegated yet.
    Delegating,
    /// A worker agent is handling a sub-task.
    AwaitingSubagentResult,
    /// Control is back with the root agent after at least one delegation.
    Consolidating,
    Done,
}

/// Step of a run that can move the routing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingEvent {
    RequestReceived,
    /// Control moved between agents; `to_root` is true when the receiving
    /// agent is the workflow's root.
    Handoff { to_root: bool },
    ToolCalled,
    FinalResponse,
}

impl RoutingState {
    /// The state after `event`. Events that do not apply leave the state
    /// unchanged; `Done` is terminal.
    pub fn next(self, event: RoutingEvent) -> RoutingState {
        use RoutingEvent::*;
        use RoutingState::*;

        match (self, event) {
            (Done, _) => Done,
            (AwaitingRequest, RequestReceived) => Delegating,
            (AwaitingRequest, _) => AwaitingRequest,
            (_, FinalResponse) => Done,
            (_, Handoff { to_root: true }) => Consolidating,
            (_, Handoff { to_root: false }) => AwaitingSubagentResult,
            (state, RequestReceived | ToolCalled) => state,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == RoutingState::Done
    }
}

/// Current routing state plus every state entered so far.
#[derive(Debug, Clone)]
pub struct RoutingTracker {
    state: RoutingState,
    history: Vec<RoutingState>,
}

impl Default for RoutingTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingTracker {
    pub fn new() -> Self {
        Self {
            state: RoutingState::AwaitingRequest,
            history: vec![RoutingState::AwaitingRequest],
        }
    }

    pub fn state(&self) -> RoutingState {
        self.state
    }

    pub fn history(&self) -> &[RoutingState] {
        &self.history
    }

    pub fn into_history(self) -> Vec<RoutingState> {
        self.history
    }

    pub fn apply(&mut self, event: RoutingEvent) -> RoutingState {
        let next = self.state.next(event);
        if next != self.state {
            debug!(from = ?self.state, to = ?next, event = ?event, "Routing state changed");
            self.history.push(next);
            self.state = next;
        }
        next
    }
}
