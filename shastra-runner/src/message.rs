//! Run transcript: the messages exchanged with the decision maker.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use shastra_core::indicators::IndicatorResult;

use crate::capability::CapabilityInvocation;

/// Result of executing one capability invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Computed { result: IndicatorResult },
    Failed { error: String },
}

impl ToolOutcome {
    /// What the decision maker is shown for this outcome.
    pub fn content(&self) -> Value {
        match self {
            ToolOutcome::Computed { result } => result.to_payload(),
            ToolOutcome::Failed { error } => json!({ "error": error }),
        }
    }

    pub fn result(&self) -> Option<&IndicatorResult> {
        match self {
            ToolOutcome::Computed { result } => Some(result),
            ToolOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        invocation: Option<CapabilityInvocation>,
    },
    Tool {
        invocation_id: String,
        name: String,
        outcome: ToolOutcome,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: Some(content.into()),
            invocation: None,
        }
    }

    pub fn assistant_invocation(invocation: CapabilityInvocation) -> Self {
        Message::Assistant {
            content: None,
            invocation: Some(invocation),
        }
    }

    pub fn tool(invocation: &CapabilityInvocation, outcome: ToolOutcome) -> Self {
        Message::Tool {
            invocation_id: invocation.id.clone(),
            name: invocation.name.clone(),
            outcome,
        }
    }
}
