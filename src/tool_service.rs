//! Tool routing as a Tower service.
//!
//! The workflow never calls a [`Tool`] directly: each agent's tools are
//! collected into a [`ToolRouter`], a `tower::Service<ToolInvocation>` that
//! dispatches by tool name. Unknown names fail the call with a `BoxError`,
//! which the workflow turns into an error reply to the model.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde_json::Value;
use tower::{BoxError, Service};
use tracing::debug;

use crate::tool::{Tool, ToolResult};

/// A single tool call routed through the tool stack.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// Id of the model's tool call.
    pub id: String,
    /// Agent on whose behalf the tool runs.
    pub agent: String,
    pub name: String,
    pub arguments: Value,
}

/// Output of a routed tool call.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Same as the invocation id.
    pub id: String,
    pub result: ToolResult,
}

/// Dispatches [`ToolInvocation`]s to the tool registered under the same name.
#[derive(Clone, Default)]
pub struct ToolRouter {
    tools: Arc<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRouter {
    pub fn new(tools: &[Arc<dyn Tool>]) -> Self {
        let tools = tools
            .iter()
            .map(|t| (t.name().to_string(), t.clone()))
            .collect();
        Self {
            tools: Arc::new(tools),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.tools.keys().collect();
        names.sort();
        f.debug_struct("ToolRouter").field("tools", &names).finish()
    }
}

impl Service<ToolInvocation> for ToolRouter {
    type Response = ToolOutput;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ToolInvocation) -> Self::Future {
        let tool = self.tools.get(&req.name).cloned();
        Box::pin(async move {
            let tool = tool.ok_or_else(|| format!("unknown tool: {}", req.name))?;
            debug!(agent = %req.agent, tool = %req.name, "Executing tool");
            let result = tool.execute(req.arguments).await?;
            Ok(ToolOutput { id: req.id, result })
        })
    }
}
