//! Deterministic rule-based decision maker.
//!
//! Asks for one indicator, then reads the latest spread off the result:
//! above zero is bullish, below zero bearish. Windows come from config or,
//! when unset, scale with the amount of history loaded.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use shastra_core::domain::timestamp::format_timestamp;
use shastra_core::indicators::{IndicatorRequest, IndicatorResult};

use super::{AnalysisContext, Bias, Decision, DecisionError, DecisionMaker, FinalResponse, TradingSignal};
use crate::capability::{Capability, CapabilityInvocation};
use crate::message::ToolOutcome;

/// Which indicator the rule engine asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferredIndicator {
    #[default]
    PriceCrossover,
    MaCrossover,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub indicator: PreferredIndicator,
    /// Moving-average window for the price crossover.
    pub ma: Option<usize>,
    pub fast_ma: Option<usize>,
    pub slow_ma: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct RuleBasedDecisionMaker {
    config: RulesConfig,
}

impl RuleBasedDecisionMaker {
    pub fn new(config: RulesConfig) -> Self {
        Self { config }
    }

    /// The request this engine makes for a series of `len` bars.
    pub fn request_for(&self, len: usize) -> IndicatorRequest {
        match self.config.indicator {
            PreferredIndicator::PriceCrossover => IndicatorRequest::PriceCrossover {
                ma: self.config.ma.unwrap_or_else(|| (len / 6).clamp(2, 50)),
            },
            PreferredIndicator::MaCrossover => {
                let fast_ma = self.config.fast_ma.unwrap_or_else(|| (len / 12).max(2));
                let slow_ma = self.config.slow_ma.unwrap_or_else(|| (len / 4).max(fast_ma + 1));
                IndicatorRequest::MaCrossover { fast_ma, slow_ma }
            }
        }
    }

    fn invocation(&self, context: &AnalysisContext, capabilities: &[Capability]) -> Option<CapabilityInvocation> {
        let request = self.request_for(context.series().len());
        let (capability, arguments) = as_capability_call(request);
        if !capabilities.contains(&capability) {
            return None;
        }
        let id = format!("call-{}", context.invocations_used() + 1);
        Some(CapabilityInvocation::new(id, capability, arguments))
    }
}

fn as_capability_call(request: IndicatorRequest) -> (Capability, Value) {
    match request {
        IndicatorRequest::MaCrossover { fast_ma, slow_ma } => (
            Capability::MaCrossover,
            json!({ "fast_ma": fast_ma, "slow_ma": slow_ma }),
        ),
        IndicatorRequest::PriceCrossover { ma } => (Capability::PriceCrossover, json!({ "ma": ma })),
    }
}

/// Read a final signal off a computed spread series.
pub fn conclude(symbol: &str, timeframe: &str, result: &IndicatorResult) -> FinalResponse {
    let Some((as_of, spread)) = result.latest() else {
        return FinalResponse::text(format!(
            "{symbol} {timeframe}: {} has no defined values; history is shorter than the window. No signal.",
            result.kind.key()
        ));
    };

    let bias = Bias::from_spread(spread);
    let last_crossover = result.crossovers().pop();

    let mut content = format!(
        "{symbol} {timeframe}: {} {:+.2}% as of {} -> {bias}.",
        result.kind.key(),
        spread * 100.0,
        format_timestamp(&as_of)
    );
    match &last_crossover {
        Some(cross) => content.push_str(&format!(
            " Last crossover {:?} on {}.",
            cross.direction,
            format_timestamp(&cross.date)
        )),
        None => content.push_str(" No crossover in the window."),
    }

    FinalResponse {
        content,
        signal: Some(TradingSignal {
            bias,
            indicator: result.kind,
            spread,
            as_of,
            last_crossover,
        }),
    }
}

impl DecisionMaker for RuleBasedDecisionMaker {
    fn name(&self) -> &str {
        "rules"
    }

    fn decide(
        &self,
        context: &AnalysisContext,
        capabilities: &[Capability],
    ) -> Result<Decision, DecisionError> {
        let (symbol, timeframe) = (context.symbol(), context.timeframe());

        match context.last_outcome() {
            Some(ToolOutcome::Computed { result }) => {
                Ok(Decision::Final(conclude(symbol, timeframe, result)))
            }
            Some(ToolOutcome::Failed { error }) => Ok(Decision::Final(FinalResponse::text(format!(
                "{symbol} {timeframe}: indicator failed ({error}). No signal."
            )))),
            None => Ok(match self.invocation(context, capabilities) {
                Some(invocation) => Decision::Invoke(invocation),
                None => Decision::Final(FinalResponse::text(format!(
                    "{symbol} {timeframe}: no indicator available. No signal."
                ))),
            }),
        }
    }
}
