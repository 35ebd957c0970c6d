//! # Run traces
//!
//! Every workflow run is recorded as a trace: a tree of spans covering the
//! run itself, each agent turn, each model call, each tool call and each
//! handoff. When the run ends the finished trace is handed to the configured
//! [`TraceExporter`]s.
//!
//! - **[`TracingContext`]** owns the spans of one trace and tracks the current
//!   parent span.
//! - **[`AgentSpan`]**, **[`GenerationSpan`]**, **[`ToolSpan`]** start a span on
//!   creation and close it when completed or failed.
//! - **[`FileExporter`]** writes one JSON file per trace, **[`ConsoleExporter`]**
//!   prints a summary, **[`InMemoryExporter`]** keeps traces for inspection.
//!
//! ```rust
//! use travel_agent_workflow::trace::{SpanType, TracingContext};
//!
//! let mut context = TracingContext::new();
//! let agent_span = context.start_span(SpanType::Agent {
//!     agent_name: "lmx_coordinator_05".to_string(),
//! });
//! let tool_span = context.start_span(SpanType::Tool {
//!     tool_name: "lmx_book_hotel_tool_05".to_string(),
//!     arguments: serde_json::json!({"hotel_name": "Hyatt Hotel"}),
//! });
//! context.end_span(&tool_span);
//! context.end_span(&agent_span);
//!
//! assert_eq!(context.spans().len(), 2);
//! assert_eq!(context.spans()[1].parent_id, Some(agent_span));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::Result;
use crate::usage::Usage;

/// Unique identifier of one end-to-end workflow run.
pub type TraceId = String;

/// Unique identifier of one unit of work inside a trace.
pub type SpanId = String;

pub fn gen_trace_id() -> TraceId {
    Uuid::new_v4().simple().to_string()
}

pub fn gen_span_id() -> SpanId {
    Uuid::new_v4().simple().to_string()
}

/// The kinds of work recorded as spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SpanType {
    /// The whole workflow run for one user message.
    Workflow { workflow_name: String, input: String },
    /// One turn of an agent.
    Agent { agent_name: String },
    /// A call to the LLM.
    Generation {
        model: String,
        prompt_tokens: usize,
        completion_tokens: usize,
    },
    /// A tool execution.
    Tool {
        tool_name: String,
        arguments: serde_json::Value,
    },
    /// Control moving between agents.
    Handoff {
        from_agent: String,
        to_agent: String,
        reason: Option<String>,
    },
}

/// A single span in a trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub id: SpanId,
    pub trace_id: TraceId,
    pub parent_id: Option<SpanId>,
    pub span_type: SpanType,
    pub start_time: DateTime<Utc>,
    /// `None` while the span is in progress.
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Span {
    pub fn new(trace_id: TraceId, parent_id: Option<SpanId>, span_type: SpanType) -> Self {
        Self {
            id: gen_span_id(),
            trace_id,
            parent_id,
            span_type,
            start_time: Utc::now(),
            end_time: None,
            error: None,
        }
    }

    pub fn complete(&mut self) {
        self.end_time = Some(Utc::now());
    }

    pub fn fail(&mut self, error: String) {
        self.error = Some(error);
        self.complete();
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds())
    }
}

/// Spans of one trace and the currently open parent.
#[derive(Debug)]
pub struct TracingContext {
    trace_id: TraceId,
    current_span_id: Option<SpanId>,
    spans: Vec<Span>,
}

impl TracingContext {
    pub fn new() -> Self {
        let trace_id = gen_trace_id();
        debug!(trace_id = %trace_id, "Starting new trace");

        Self {
            trace_id,
            current_span_id: None,
            spans: Vec::new(),
        }
    }

    /// Starts a span as a child of the current span and makes it current.
    pub fn start_span(&mut self, span_type: SpanType) -> SpanId {
        let span = Span::new(
            self.trace_id.clone(),
            self.current_span_id.clone(),
            span_type,
        );
        let span_id = span.id.clone();

        match &span.span_type {
            SpanType::Agent { agent_name } => {
                debug!(span_id = %span_id, agent = %agent_name, "Starting agent span");
            }
            SpanType::Tool { tool_name, .. } => {
                debug!(span_id = %span_id, tool = %tool_name, "Starting tool span");
            }
            _ => {
                debug!(span_id = %span_id, "Starting span");
            }
        }

        self.spans.push(span);
        self.current_span_id = Some(span_id.clone());
        span_id
    }

    /// Ends a span; its parent becomes current again.
    pub fn end_span(&mut self, span_id: &str) {
        if let Some(span) = self.spans.iter_mut().find(|s| s.id == span_id) {
            span.complete();

            if let Some(duration) = span.duration_ms() {
                debug!(span_id = %span_id, duration_ms = duration, "Span completed");
            }

            if self.current_span_id.as_deref() == Some(span_id) {
                self.current_span_id = span.parent_id.clone();
            }
        }
    }

    /// Records an error on a span and ends it.
    pub fn record_error(&mut self, span_id: &str, error: String) {
        if let Some(span) = self.spans.iter_mut().find(|s| s.id == span_id) {
            error!(span_id = %span_id, error = %error, "Span failed");
            span.fail(error);
            if self.current_span_id.as_deref() == Some(span_id) {
                self.current_span_id = span.parent_id.clone();
            }
        }
    }

    fn span_mut(&mut self, span_id: &str) -> Option<&mut Span> {
        self.spans.iter_mut().find(|s| s.id == span_id)
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Packages the spans for export under `workflow_name`.
    pub fn to_record(&self, workflow_name: &str) -> TraceRecord {
        TraceRecord {
            workflow_name: workflow_name.to_string(),
            trace_id: self.trace_id.clone(),
            exported_at: Utc::now(),
            spans: self.spans.clone(),
        }
    }
}

impl Default for TracingContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to a run's tracing context.
pub type SharedContext = Arc<Mutex<TracingContext>>;

fn lock(context: &SharedContext) -> MutexGuard<'_, TracingContext> {
    context.lock().unwrap_or_else(|e| e.into_inner())
}

/// Starts a span on a shared context, returning its id.
pub fn start(context: &SharedContext, span_type: SpanType) -> SpanId {
    lock(context).start_span(span_type)
}

/// Ends a span on a shared context.
pub fn end(context: &SharedContext, span_id: &str) {
    lock(context).end_span(span_id)
}

/// Fails a span on a shared context.
pub fn fail(context: &SharedContext, span_id: &str, error: String) {
    lock(context).record_error(span_id, error)
}

/// Trace id of a shared context.
pub fn trace_id(context: &SharedContext) -> TraceId {
    lock(context).trace_id().to_string()
}

/// Snapshot of a shared context, ready for export.
pub fn snapshot(context: &SharedContext, workflow_name: &str) -> TraceRecord {
    lock(context).to_record(workflow_name)
}

/// Span covering one agent turn.
pub struct AgentSpan {
    context: SharedContext,
    span_id: SpanId,
}

impl AgentSpan {
    pub fn new(context: SharedContext, agent_name: &str) -> Self {
        let span_id = start(
            &context,
            SpanType::Agent {
                agent_name: agent_name.to_string(),
            },
        );
        Self { context, span_id }
    }

    pub fn complete(self) {
        end(&self.context, &self.span_id);
    }

    pub fn error(self, error: String) {
        fail(&self.context, &self.span_id, error);
    }
}

/// Span covering one tool execution.
pub struct ToolSpan {
    context: SharedContext,
    span_id: SpanId,
}

impl ToolSpan {
    pub fn new(context: SharedContext, tool_name: &str, arguments: serde_json::Value) -> Self {
        let span_id = start(
            &context,
            SpanType::Tool {
                tool_name: tool_name.to_string(),
                arguments,
            },
        );
        Self { context, span_id }
    }

    pub fn success(self) {
        end(&self.context, &self.span_id);
    }

    pub fn error(self, error: String) {
        fail(&self.context, &self.span_id, error);
    }
}

/// Span covering one LLM call; records token usage on completion.
pub struct GenerationSpan {
    context: SharedContext,
    span_id: SpanId,
}

impl GenerationSpan {
    pub fn new(context: SharedContext, model: &str) -> Self {
        let span_id = start(
            &context,
            SpanType::Generation {
                model: model.to_string(),
                prompt_tokens: 0,
                completion_tokens: 0,
            },
        );
        Self { context, span_id }
    }

    pub fn complete_with_usage(self, usage: &Usage) {
        let mut ctx = lock(&self.context);
        if let Some(span) = ctx.span_mut(&self.span_id) {
            if let SpanType::Generation {
                prompt_tokens,
                completion_tokens,
                ..
            } = &mut span.span_type
            {
                *prompt_tokens = usage.prompt_tokens;
                *completion_tokens = usage.completion_tokens;
            }
        }
        ctx.end_span(&self.span_id);
    }

    pub fn error(self, error: String) {
        fail(&self.context, &self.span_id, error);
    }
}

/// A finished trace as handed to exporters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    pub workflow_name: String,
    pub trace_id: TraceId,
    pub exported_at: DateTime<Utc>,
    pub spans: Vec<Span>,
}

/// Destination for finished traces.
pub trait TraceExporter: Send + Sync {
    fn export(&self, trace: &TraceRecord) -> Result<()>;
}

/// Prints a span summary to stdout.
pub struct ConsoleExporter;

impl TraceExporter for ConsoleExporter {
    fn export(&self, trace: &TraceRecord) -> Result<()> {
        println!("=== Trace {} ({}) ===", trace.trace_id, trace.workflow_name);
        for span in &trace.spans {
            println!(
                "  [{:?}] {} -> {} ({}ms)",
                span.span_type,
                span.start_time.format("%H:%M:%S%.3f"),
                span.end_time
                    .map(|t| t.format("%H:%M:%S%.3f").to_string())
                    .unwrap_or_else(|| "ongoing".to_string()),
                span.duration_ms().unwrap_or(0)
            );
            if let Some(error) = &span.error {
                println!("    ERROR: {}", error);
            }
        }
        Ok(())
    }
}

pub const DEFAULT_TRACE_DIR: &str = ".monocle";
const TRACE_FILE_PREFIX: &str = "monocle_trace_";

/// Writes each trace as a pretty-printed JSON file in a directory.
///
/// Files are named `monocle_trace_{workflow}_{trace_id}_{timestamp}.json`.
#[derive(Debug, Clone)]
pub struct FileExporter {
    dir: PathBuf,
}

impl Default for FileExporter {
    fn default() -> Self {
        Self::new(DEFAULT_TRACE_DIR)
    }
}

impl FileExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for `trace`. Characters not safe in a file name, path
    /// separators included, become `_`.
    pub fn file_name(trace: &TraceRecord) -> String {
        let workflow: String = trace
            .workflow_name
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!(
            "{}{}_{}_{}.json",
            TRACE_FILE_PREFIX,
            workflow,
            trace.trace_id,
            trace.exported_at.format("%Y-%m-%d_%H.%M.%S")
        )
    }
}

impl TraceExporter for FileExporter {
    fn export(&self, trace: &TraceRecord) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(Self::file_name(trace));
        let body = serde_json::to_vec_pretty(trace)?;
        std::fs::write(&path, body)?;
        info!(path = %path.display(), spans = trace.spans.len(), "Trace written");
        Ok(())
    }
}

/// Keeps exported traces in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExporter {
    traces: Arc<Mutex<Vec<TraceRecord>>>,
}

impl InMemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn traces(&self) -> Vec<TraceRecord> {
        self.traces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl TraceExporter for InMemoryExporter {
    fn export(&self, trace: &TraceRecord) -> Result<()> {
        self.traces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(trace.clone());
        Ok(())
    }
}
