//! Decision makers.
//!
//! The pipeline hands an [`AnalysisContext`] and the currently available
//! capabilities to a [`DecisionMaker`], which either concludes the run or asks
//! for one capability to be executed. Two backends ship with the crate: a
//! deterministic rule engine and an OpenAI-compatible chat-completions client.

pub mod chat;
pub mod rules;

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shastra_core::domain::timestamp;
use shastra_core::domain::PriceSeries;
use shastra_core::indicators::{Crossover, IndicatorKind};

use crate::capability::{Capability, CapabilityInvocation};
use crate::message::{Message, ToolOutcome};

pub use chat::{ChatCompletionsConfig, ChatCompletionsDecisionMaker};
pub use rules::{RuleBasedDecisionMaker, RulesConfig};

#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("environment variable '{var}' with the API key is not set")]
    MissingCredentials { var: String },

    #[error("decision backend request failed: {0}")]
    Transport(String),

    #[error("decision backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("decision backend response format changed: {0}")]
    ResponseFormat(String),
}

/// Everything the decision maker sees at one Analyze step.
///
/// Each stage produces a new context; nothing is mutated in place.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    series: Arc<PriceSeries>,
    transcript: Vec<Message>,
    invocations_used: usize,
    max_invocations: usize,
}

impl AnalysisContext {
    pub fn new(series: Arc<PriceSeries>, max_invocations: usize, transcript: Vec<Message>) -> Self {
        Self {
            series,
            transcript,
            invocations_used: 0,
            max_invocations,
        }
    }

    pub fn series(&self) -> &PriceSeries {
        &self.series
    }

    pub fn symbol(&self) -> &str {
        self.series.symbol()
    }

    pub fn timeframe(&self) -> &str {
        self.series.timeframe()
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn invocations_used(&self) -> usize {
        self.invocations_used
    }

    pub fn invocations_remaining(&self) -> usize {
        self.max_invocations.saturating_sub(self.invocations_used)
    }

    /// Outcome of the most recent capability call.
    pub fn last_outcome(&self) -> Option<&ToolOutcome> {
        self.transcript.iter().rev().find_map(|m| match m {
            Message::Tool { outcome, .. } => Some(outcome),
            _ => None,
        })
    }

    pub(crate) fn with_invocation(
        mut self,
        invocation: CapabilityInvocation,
        outcome: ToolOutcome,
    ) -> Self {
        let tool = Message::tool(&invocation, outcome);
        self.transcript.push(Message::assistant_invocation(invocation));
        self.transcript.push(tool);
        self.invocations_used += 1;
        self
    }

    pub(crate) fn with_message(mut self, message: Message) -> Self {
        self.transcript.push(message);
        self
    }

    pub(crate) fn into_transcript(self) -> Vec<Message> {
        self.transcript
    }
}

/// Directional reading of a spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

impl Bias {
    pub fn from_spread(spread: f64) -> Self {
        if spread > 0.0 {
            Bias::Bullish
        } else if spread < 0.0 {
            Bias::Bearish
        } else {
            Bias::Neutral
        }
    }
}

impl std::fmt::Display for Bias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Bias::Bullish => "bullish",
            Bias::Bearish => "bearish",
            Bias::Neutral => "neutral",
        })
    }
}

/// Normalized trading signal read off one spread series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSignal {
    pub bias: Bias,
    pub indicator: IndicatorKind,
    pub spread: f64,
    #[serde(with = "timestamp::single")]
    pub as_of: NaiveDateTime,
    pub last_crossover: Option<Crossover>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResponse {
    pub content: String,
    pub signal: Option<TradingSignal>,
}

impl FinalResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            signal: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Final(FinalResponse),
    Invoke(CapabilityInvocation),
}

/// A collaborator that reads the analysis context and decides what to do next.
///
/// `capabilities` lists what may be invoked at this step; it is empty once
/// the run's invocation budget is spent.
pub trait DecisionMaker: Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    fn decide(
        &self,
        context: &AnalysisContext,
        capabilities: &[Capability],
    ) -> Result<Decision, DecisionError>;
}
