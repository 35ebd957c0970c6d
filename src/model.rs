//! Model abstraction for LLM interactions
//!
//! Wraps the async-openai crate behind [`ModelProvider`] so the workflow can
//! run against the hosted model or against a [`ScriptedProvider`] that replays
//! canned responses.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType,
        CreateChatCompletionRequestArgs, FunctionCall, FunctionObjectArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::{Result, WorkflowError};
use crate::items::{Message, ModelResponse, Role, ToolCall};
use crate::tool::Tool;
use crate::usage::Usage;

/// One chat completion request issued on behalf of an agent.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<Arc<dyn Tool>>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Trait for model providers
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Generate a completion
    async fn complete(&self, request: ModelRequest) -> Result<(ModelResponse, Usage)>;
}

/// OpenAI model provider using async-openai
#[derive(Clone)]
pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
}

impl Default for OpenAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAIProvider {
    /// Create a provider reading `OPENAI_API_KEY` from the environment
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Create with a custom client, e.g. one pointed at a compatible endpoint
    pub fn with_client(client: Client<OpenAIConfig>) -> Self {
        Self { client }
    }

    fn convert_message(msg: &Message) -> Result<ChatCompletionRequestMessage> {
        let converted = match msg.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(msg.content.clone())
                .build()?
                .into(),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(msg.content.clone())
                .build()?
                .into(),
            Role::Assistant => {
                let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                if !msg.content.is_empty() {
                    builder.content(msg.content.clone());
                }
                if let Some(tool_calls) = &msg.tool_calls {
                    let openai_tool_calls: Vec<_> = tool_calls
                        .iter()
                        .map(|tc| ChatCompletionMessageToolCall {
                            id: tc.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: tc.name.clone(),
                                arguments: tc.arguments.to_string(),
                            },
                        })
                        .collect();
                    builder.tool_calls(openai_tool_calls);
                }
                builder.build()?.into()
            }
            Role::Tool => ChatCompletionRequestToolMessageArgs::default()
                .content(msg.content.clone())
                .tool_call_id(msg.tool_call_id.clone().unwrap_or_default())
                .build()?
                .into(),
        };
        Ok(converted)
    }

    fn convert_tools(tools: &[Arc<dyn Tool>]) -> Result<Vec<ChatCompletionTool>> {
        tools
            .iter()
            .map(|tool| {
                let function = FunctionObjectArgs::default()
                    .name(tool.name())
                    .description(tool.description())
                    .parameters(tool.parameters_schema())
                    .build()?;
                Ok(ChatCompletionToolArgs::default()
                    .r#type(ChatCompletionToolType::Function)
                    .function(function)
                    .build()?)
            })
            .collect()
    }
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    async fn complete(&self, request: ModelRequest) -> Result<(ModelResponse, Usage)> {
        let openai_messages = request
            .messages
            .iter()
            .map(Self::convert_message)
            .collect::<Result<Vec<_>>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&request.model).messages(openai_messages);

        if !request.tools.is_empty() {
            args.tools(Self::convert_tools(&request.tools)?);
        }
        if let Some(temp) = request.temperature {
            args.temperature(temp);
        }
        if let Some(max) = request.max_tokens {
            args.max_completion_tokens(max);
        }

        let response = self.client.chat().create(args.build()?).await?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| WorkflowError::ModelBehaviorError {
                message: "No choices in response".to_string(),
            })?;

        let tool_calls = choice
            .message
            .tool_calls
            .iter()
            .flatten()
            .map(|tc| ToolCall {
                id: tc.id.clone(),
                name: tc.function.name.clone(),
                arguments: serde_json::from_str(&tc.function.arguments).unwrap_or(Value::Null),
            })
            .collect();

        let model_response = ModelResponse {
            id: response.id.clone(),
            content: choice.message.content.clone(),
            tool_calls,
            finish_reason: choice.finish_reason.as_ref().map(|r| format!("{:?}", r)),
            created_at: chrono::Utc::now(),
        };

        let usage = response
            .usage
            .map(|u| Usage::new(u.prompt_tokens as usize, u.completion_tokens as usize))
            .unwrap_or_else(Usage::empty);

        Ok((model_response, usage))
    }
}

/// What a [`ScriptedProvider`] saw for one request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: String,
    pub system_prompt: String,
    pub tool_names: Vec<String>,
    pub message_count: usize,
}

/// Provider that replays a fixed script of responses, in order.
///
/// Used by tests and offline demos in place of the hosted model. Every
/// request is recorded so callers can check which agent was asked what.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<ModelResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, response: ModelResponse) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
        self
    }

    pub fn with_message(self, content: impl Into<String>) -> Self {
        self.with_response(ModelResponse::new_message(content))
    }

    pub fn with_tool_call(self, tool_name: impl Into<String>, args: Value) -> Self {
        self.with_response(ModelResponse::new_tool_calls(vec![ToolCall::new(
            tool_name, args,
        )]))
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn complete(&self, request: ModelRequest) -> Result<(ModelResponse, Usage)> {
        let system_prompt = request
            .messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedRequest {
                model: request.model.clone(),
                system_prompt,
                tool_names: request.tools.iter().map(|t| t.name().to_string()).collect(),
                message_count: request.messages.len(),
            });

        let next = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(response) => Ok((response, Usage::new(10, 5))),
            None => Err(WorkflowError::ModelBehaviorError {
                message: "scripted provider has no responses left".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::FunctionTool;

    fn request(messages: Vec<Message>) -> ModelRequest {
        ModelRequest {
            model: "gpt-4o".to_string(),
            messages,
            tools: vec![],
            temperature: None,
            max_tokens: None,
        }
    }

    #[test]
    fn test_message_conversion() {
        let messages = vec![
            Message::system("You are helpful"),
            Message::user("Hello"),
            Message::assistant("Hi there"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall::new("lmx_book_hotel_tool_05", serde_json::json!({}))],
            ),
            Message::tool("Result", "call_123"),
        ];
        for msg in &messages {
            assert!(OpenAIProvider::convert_message(msg).is_ok());
        }
        assert!(matches!(
            OpenAIProvider::convert_message(&messages[4]).unwrap(),
            ChatCompletionRequestMessage::Tool(_)
        ));
    }

    #[test]
    fn test_tool_conversion() {
        let tool: Arc<dyn Tool> = Arc::new(FunctionTool::new(
            "test_tool",
            "Test description",
            serde_json::json!({"type": "object"}),
            |args| Ok(args),
        ));

        let converted = OpenAIProvider::convert_tools(&[tool]).unwrap();
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].function.name, "test_tool");
        assert_eq!(
            converted[0].function.description.as_deref(),
            Some("Test description")
        );
    }

    #[tokio::test]
    async fn test_scripted_provider_replays_in_order() {
        let provider = ScriptedProvider::new()
            .with_message("First")
            .with_tool_call("lmx_book_flight_tool_05", serde_json::json!({}));
        assert_eq!(provider.remaining(), 2);

        let (first, usage) = provider
            .complete(request(vec![Message::system("sys"), Message::user("hi")]))
            .await
            .unwrap();
        assert_eq!(first.content.as_deref(), Some("First"));
        assert_eq!(usage.total_tokens, 15);

        let (second, _) = provider.complete(request(vec![])).await.unwrap();
        assert_eq!(second.tool_calls[0].name, "lmx_book_flight_tool_05");

        let recorded = provider.requests();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].system_prompt, "sys");
        assert_eq!(recorded[0].message_count, 2);
    }

    #[tokio::test]
    async fn test_scripted_provider_exhaustion_is_an_error() {
        let provider = ScriptedProvider::new();
        let err = provider.complete(request(vec![])).await.unwrap_err();
        assert!(matches!(err, WorkflowError::ModelBehaviorError { .. }));
    }
}
