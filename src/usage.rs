//! # Token usage accounting
//!
//! [`Usage`] is the token count of one model call; [`UsageStats`] aggregates
//! those across a workflow run with a breakdown per model and per agent, so a
//! run through the coordinator and both booking agents reports how much each
//! of them consumed.
//!
//! ```rust
//! use travel_agent_workflow::usage::{Usage, UsageStats};
//!
//! let mut stats = UsageStats::new();
//! stats.record("gpt-4o", "lmx_coordinator_05", Usage::new(1200, 300));
//! stats.record("gpt-4o", "lmx_hotel_booking_agent_05", Usage::new(500, 150));
//!
//! assert_eq!(stats.total.total_tokens, 2150);
//! assert_eq!(stats.by_agent.len(), 2);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Add;

/// Token usage for a single LLM API call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    /// The number of tokens in the input prompt.
    pub prompt_tokens: usize,

    /// The number of tokens in the generated completion.
    pub completion_tokens: usize,

    /// The total number of tokens (prompt + completion).
    pub total_tokens: usize,

    /// The number of API requests made.
    pub request_count: usize,
}

impl Usage {
    /// Creates a new `Usage` for one request.
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            request_count: 1,
        }
    }

    /// Creates an empty `Usage` with all fields set to zero.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds the values from another `Usage` to this one.
    pub fn add_usage(&mut self, other: &Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.request_count += other.request_count;
    }
}

impl Add for Usage {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self.add_usage(&other);
        self
    }
}

/// Aggregated usage across a workflow run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageStats {
    /// The total usage across all models and agents.
    pub total: Usage,

    /// Usage broken down by model name.
    pub by_model: HashMap<String, Usage>,

    /// Usage broken down by agent name.
    pub by_agent: HashMap<String, Usage>,
}

impl UsageStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one model call, updating the total and the breakdowns.
    pub fn record(&mut self, model: &str, agent: &str, usage: Usage) {
        self.total.add_usage(&usage);

        self.by_model
            .entry(model.to_string())
            .and_modify(|u| u.add_usage(&usage))
            .or_insert(usage.clone());

        self.by_agent
            .entry(agent.to_string())
            .and_modify(|u| u.add_usage(&usage))
            .or_insert(usage);
    }

    /// Human-readable summary, agents listed in name order.
    pub fn summary(&self) -> String {
        let mut report = format!(
            "Usage Summary:\n\
             Total Tokens: {}\n\
             Total Requests: {}\n",
            self.total.total_tokens, self.total.request_count,
        );

        if !self.by_agent.is_empty() {
            report.push_str("\nBy Agent:\n");
            let mut agents: Vec<_> = self.by_agent.iter().collect();
            agents.sort_by(|a, b| a.0.cmp(b.0));
            for (agent, usage) in agents {
                report.push_str(&format!(
                    "  {}: {} tokens, {} requests\n",
                    agent, usage.total_tokens, usage.request_count
                ));
            }
        }

        report
    }
}
