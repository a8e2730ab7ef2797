//! Shastra Runner — pipeline controller and decision makers.
//!
//! This crate builds on `shastra-core` to provide:
//! - The Load → Analyze → Tools → Terminate controller with a structural
//!   cap on capability invocations
//! - The indicator capability surface offered to decision makers
//! - Decision makers: a deterministic rule engine and a chat-completions client
//! - TOML configuration

pub mod capability;
pub mod config;
pub mod decision;
pub mod message;
pub mod pipeline;
pub mod prompt;

pub use capability::{execute, Capability, CapabilityError, CapabilityInvocation};
pub use config::{ConfigError, DataConfig, DecisionConfig, ShastraConfig};
pub use decision::{
    AnalysisContext, Bias, ChatCompletionsConfig, ChatCompletionsDecisionMaker, Decision,
    DecisionError, DecisionMaker, FinalResponse, RuleBasedDecisionMaker, RulesConfig, TradingSignal,
};
pub use message::{Message, ToolOutcome};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, RunReport, RunRequest, Stage, ToolRecord};
