//! Pipeline controller: Load → Analyze → (Tools → Analyze)* → Terminate.
//!
//! Each run owns its price series for the run's duration. The analysis
//! context is rebuilt at every transition instead of being mutated, and the
//! number of capability invocations is capped structurally: once the budget
//! is spent the decision maker is consulted with no capabilities, and a
//! further request fails the run without being executed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use shastra_core::data::{DataError, PriceSource};
use shastra_core::domain::timestamp::format_timestamp;

use crate::capability::{self, Capability, CapabilityInvocation};
use crate::decision::{AnalysisContext, Decision, DecisionError, DecisionMaker, FinalResponse};
use crate::message::{Message, ToolOutcome};
use crate::prompt::{system_instruction, OPENING_REQUEST};

/// Symbol and timeframe for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub symbol: String,
    pub timeframe: String,
}

impl RunRequest {
    pub fn new(symbol: impl Into<String>, timeframe: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
        }
    }
}

/// Controller states. A failed run ends in the error state, reported as
/// [`PipelineError`] together with the stage it failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Load,
    Analyze,
    Tools,
    Terminate,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Load => "load",
            Stage::Analyze => "analyze",
            Stage::Tools => "tools",
            Stage::Terminate => "terminate",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Capability invocations allowed per run.
    pub max_invocations: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { max_invocations: 1 }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("price data unavailable for {symbol} ({timeframe}): {source}")]
    DataUnavailable {
        symbol: String,
        timeframe: String,
        #[source]
        source: DataError,
    },

    #[error("decision maker failed: {0}")]
    Decision(#[from] DecisionError),

    #[error("capability '{requested}' requested after the limit of {limit} invocation(s) was reached")]
    InvocationLimitExceeded { limit: usize, requested: String },
}

impl PipelineError {
    /// Stage the run was in when it failed.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::DataUnavailable { .. } => Stage::Load,
            PipelineError::Decision(_) | PipelineError::InvocationLimitExceeded { .. } => Stage::Analyze,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    pub invocation: CapabilityInvocation,
    pub outcome: ToolOutcome,
}

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub symbol: String,
    pub timeframe: String,
    pub source: String,
    pub decision_maker: String,
    pub bar_count: usize,
    pub start_date: String,
    pub end_date: String,
    pub dataset_hash: String,
    pub stages: Vec<Stage>,
    pub tool_calls: Vec<ToolRecord>,
    pub response: FinalResponse,
    pub transcript: Vec<Message>,
}

impl RunReport {
    /// Human-readable summary for terminal output.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} {} | {} bars {} .. {} | source {} | decision {}\n",
            self.symbol,
            self.timeframe,
            self.bar_count,
            self.start_date,
            self.end_date,
            self.source,
            self.decision_maker
        );
        let stages: Vec<String> = self.stages.iter().map(Stage::to_string).collect();
        out.push_str(&format!("stages: {}\n", stages.join(" -> ")));
        for record in &self.tool_calls {
            let status = match &record.outcome {
                ToolOutcome::Computed { result } => {
                    format!("ok, {} of {} points defined", result.defined_count(), result.len())
                }
                ToolOutcome::Failed { error } => format!("failed: {error}"),
            };
            out.push_str(&format!(
                "tool {} {} -> {}\n",
                record.invocation.name, record.invocation.arguments, status
            ));
        }
        if let Some(signal) = &self.response.signal {
            out.push_str(&format!(
                "signal: {} ({} {:+.4})\n",
                signal.bias,
                signal.indicator.key(),
                signal.spread
            ));
        }
        out.push('\n');
        out.push_str(&self.response.content);
        out
    }
}

pub struct Pipeline<'a> {
    source: &'a dyn PriceSource,
    decision_maker: &'a dyn DecisionMaker,
    config: PipelineConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(source: &'a dyn PriceSource, decision_maker: &'a dyn DecisionMaker) -> Self {
        Self {
            source,
            decision_maker,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn run(&self, request: &RunRequest) -> Result<RunReport, PipelineError> {
        let max_invocations = self.config.max_invocations;
        let mut stages = vec![Stage::Load];
        info!(
            symbol = %request.symbol,
            timeframe = %request.timeframe,
            source = self.source.name(),
            "loading price data"
        );

        let series = self
            .source
            .read_price_data(&request.symbol, &request.timeframe)
            .and_then(|series| {
                if series.is_empty() {
                    Err(DataError::EmptySeries {
                        symbol: request.symbol.clone(),
                        timeframe: request.timeframe.clone(),
                    })
                } else {
                    Ok(series)
                }
            })
            .map_err(|source| {
                error!(symbol = %request.symbol, error = %source, "load failed");
                PipelineError::DataUnavailable {
                    symbol: request.symbol.clone(),
                    timeframe: request.timeframe.clone(),
                    source,
                }
            })?;
        let series = Arc::new(series);
        let columns = series.to_columns();
        info!(bars = series.len(), "price data loaded");

        let transcript = vec![
            Message::system(system_instruction(&series, &Capability::ALL, max_invocations)),
            Message::user(OPENING_REQUEST),
        ];
        let mut context = AnalysisContext::new(Arc::clone(&series), max_invocations, transcript);
        let mut tool_calls = Vec::new();

        loop {
            stages.push(Stage::Analyze);
            let available: &[Capability] = if context.invocations_remaining() > 0 {
                &Capability::ALL
            } else {
                &[]
            };
            debug!(
                used = context.invocations_used(),
                available = available.len(),
                "consulting decision maker"
            );

            let decision = self.decision_maker.decide(&context, available).map_err(|e| {
                error!(backend = self.decision_maker.name(), error = %e, "decision failed");
                PipelineError::from(e)
            })?;

            match decision {
                Decision::Final(response) => {
                    stages.push(Stage::Terminate);
                    info!(
                        invocations = context.invocations_used(),
                        signal = ?response.signal.as_ref().map(|s| s.bias),
                        "run finished"
                    );
                    let transcript = context
                        .with_message(Message::assistant_text(response.content.clone()))
                        .into_transcript();
                    let (start_date, end_date) = match (series.bars().first(), series.last_bar()) {
                        (Some(first), Some(last)) => (format_timestamp(&first.date), format_timestamp(&last.date)),
                        _ => (String::new(), String::new()),
                    };

                    return Ok(RunReport {
                        symbol: series.symbol().to_string(),
                        timeframe: series.timeframe().to_string(),
                        source: self.source.name().to_string(),
                        decision_maker: self.decision_maker.name().to_string(),
                        bar_count: series.len(),
                        start_date,
                        end_date,
                        dataset_hash: series.content_hash(),
                        stages,
                        tool_calls,
                        response,
                        transcript,
                    });
                }
                Decision::Invoke(invocation) => {
                    if context.invocations_remaining() == 0 {
                        warn!(
                            capability = %invocation.name,
                            limit = max_invocations,
                            "invocation refused: limit reached"
                        );
                        return Err(PipelineError::InvocationLimitExceeded {
                            limit: max_invocations,
                            requested: invocation.name,
                        });
                    }

                    stages.push(Stage::Tools);
                    let outcome = match capability::execute(&invocation, &columns) {
                        Ok(result) => {
                            info!(
                                capability = %invocation.name,
                                points = result.len(),
                                defined = result.defined_count(),
                                "capability executed"
                            );
                            ToolOutcome::Computed { result }
                        }
                        Err(e) => {
                            warn!(capability = %invocation.name, error = %e, "capability failed");
                            ToolOutcome::Failed { error: e.to_string() }
                        }
                    };

                    tool_calls.push(ToolRecord {
                        invocation: invocation.clone(),
                        outcome: outcome.clone(),
                    });
                    context = context.with_invocation(invocation, outcome);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::RuleBasedDecisionMaker;
    use shastra_core::data::InMemorySource;

    #[test]
    fn error_stage_follows_variant() {
        let err = PipelineError::DataUnavailable {
            symbol: "X".into(),
            timeframe: "1d".into(),
            source: DataError::SymbolNotFound { symbol: "X".into() },
        };
        assert_eq!(err.stage(), Stage::Load);
        let err = PipelineError::InvocationLimitExceeded {
            limit: 1,
            requested: "ma_crossover".into(),
        };
        assert_eq!(err.stage(), Stage::Analyze);
    }

    #[test]
    fn missing_symbol_stops_at_load() {
        let source = InMemorySource::new();
        let rules = RuleBasedDecisionMaker::default();
        let err = Pipeline::new(&source, &rules)
            .run(&RunRequest::new("NOPE", "1d"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::DataUnavailable { .. }));
    }

    #[test]
    fn empty_load_stops_at_load() {
        let source = InMemorySource::new().with_bars("EMPTY", Vec::new());
        let rules = RuleBasedDecisionMaker::default();
        let err = Pipeline::new(&source, &rules)
            .run(&RunRequest::new("EMPTY", "1d"))
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Load);
        assert!(matches!(
            err,
            PipelineError::DataUnavailable { source: DataError::EmptySeries { .. }, .. }
        ));
    }

    #[test]
    fn summary_mentions_stages_and_signal() {
        let source = shastra_core::data::SyntheticSource::default();
        let rules = RuleBasedDecisionMaker::default();
        let report = Pipeline::new(&source, &rules)
            .run(&RunRequest::new("SPY", "1d"))
            .unwrap();
        let summary = report.summary();
        assert!(summary.contains("load -> analyze -> tools -> analyze -> terminate"));
        assert!(summary.contains("tool price_crossover"));
        assert!(summary.contains("signal:"));
    }
}
