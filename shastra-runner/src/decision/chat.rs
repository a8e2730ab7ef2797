//! Chat-completions decision maker.
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint. Capabilities
//! are advertised as function tools built from their JSON schemas; the first
//! tool call in a reply becomes the invocation, otherwise the reply text is
//! the final response. Requests are bounded by a client-side timeout.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{AnalysisContext, Decision, DecisionError, DecisionMaker, FinalResponse};
use crate::capability::{Capability, CapabilityInvocation};
use crate::message::Message;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatCompletionsConfig {
    pub model: String,
    pub base_url: String,
    /// Environment variable holding the bearer token.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: Option<f32>,
}

impl Default for ChatCompletionsConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            timeout_secs: 60,
            temperature: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    id: String,
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

pub struct ChatCompletionsDecisionMaker {
    client: reqwest::blocking::Client,
    config: ChatCompletionsConfig,
    api_key: String,
}

impl ChatCompletionsDecisionMaker {
    /// Build a client, reading the API key from `config.api_key_env`.
    pub fn from_env(config: ChatCompletionsConfig) -> Result<Self, DecisionError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| DecisionError::MissingCredentials {
            var: config.api_key_env.clone(),
        })?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: ChatCompletionsConfig, api_key: impl Into<String>) -> Result<Self, DecisionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DecisionError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            config,
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Request body for one decision step.
    pub(crate) fn request_body(&self, context: &AnalysisContext, capabilities: &[Capability]) -> Value {
        let messages: Vec<Value> = context.transcript().iter().map(wire_message).collect();

        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
        });
        if !capabilities.is_empty() {
            let tools: Vec<Value> = capabilities
                .iter()
                .map(|cap| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": cap.name(),
                            "description": cap.description(),
                            "parameters": cap.parameters_schema(),
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
            body["tool_choice"] = json!("auto");
        }
        if let Some(temperature) = self.config.temperature {
            body["temperature"] = json!(temperature);
        }
        body
    }
}

fn wire_message(message: &Message) -> Value {
    match message {
        Message::System { content } => json!({ "role": "system", "content": content }),
        Message::User { content } => json!({ "role": "user", "content": content }),
        Message::Assistant {
            content,
            invocation: Some(inv),
        } => {
            let arguments = match &inv.arguments {
                Value::String(raw) => raw.clone(),
                other => other.to_string(),
            };
            json!({
                "role": "assistant",
                "content": content,
                "tool_calls": [{
                    "id": inv.id,
                    "type": "function",
                    "function": { "name": inv.name, "arguments": arguments }
                }]
            })
        }
        Message::Assistant {
            content,
            invocation: None,
        } => json!({ "role": "assistant", "content": content }),
        Message::Tool {
            invocation_id,
            outcome,
            ..
        } => json!({
            "role": "tool",
            "tool_call_id": invocation_id,
            "content": outcome.content().to_string(),
        }),
    }
}

fn parse_decision(response: ChatResponse) -> Result<Decision, DecisionError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| DecisionError::ResponseFormat("no choices in response".into()))?;

    let mut calls = choice.message.tool_calls.into_iter();
    if let Some(call) = calls.next() {
        let ignored = calls.count();
        if ignored > 0 {
            warn!(ignored, "reply requested several tool calls; only the first is honoured");
        }
        let arguments = serde_json::from_str(&call.function.arguments)
            .unwrap_or(Value::String(call.function.arguments));
        return Ok(Decision::Invoke(CapabilityInvocation {
            id: call.id,
            name: call.function.name,
            arguments,
        }));
    }

    choice
        .message
        .content
        .map(|content| Decision::Final(FinalResponse::text(content)))
        .ok_or_else(|| DecisionError::ResponseFormat("reply has neither content nor tool calls".into()))
}

impl DecisionMaker for ChatCompletionsDecisionMaker {
    fn name(&self) -> &str {
        "chat_completions"
    }

    fn decide(
        &self,
        context: &AnalysisContext,
        capabilities: &[Capability],
    ) -> Result<Decision, DecisionError> {
        let body = self.request_body(context, capabilities);
        debug!(
            model = %self.config.model,
            messages = context.transcript().len(),
            tools = capabilities.len(),
            "requesting decision"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| DecisionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DecisionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| DecisionError::ResponseFormat(e.to_string()))?;
        parse_decision(parsed)
    }
}
