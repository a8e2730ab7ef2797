//! Property tests for the controller and the rule engine.
//!
//! Uses proptest to verify:
//! 1. Derived rule-engine windows are always usable (positive, fast < slow)
//! 2. However many calls a decision maker asks for, no more than the cap execute

use std::sync::atomic::{AtomicUsize, Ordering};

use proptest::prelude::*;
use serde_json::json;
use shastra_core::data::SyntheticSource;
use shastra_core::indicators::IndicatorRequest;
use shastra_runner::decision::rules::PreferredIndicator;
use shastra_runner::{
    AnalysisContext, Capability, CapabilityInvocation, Decision, DecisionError, DecisionMaker,
    FinalResponse, Pipeline, PipelineConfig, PipelineError, RuleBasedDecisionMaker, RulesConfig,
    RunRequest,
};

/// Requests `wanted` invocations back to back, then concludes.
struct Greedy {
    wanted: usize,
    asked: AtomicUsize,
}

impl DecisionMaker for Greedy {
    fn name(&self) -> &str {
        "greedy"
    }

    fn decide(&self, context: &AnalysisContext, _: &[Capability]) -> Result<Decision, DecisionError> {
        let asked = self.asked.fetch_add(1, Ordering::SeqCst);
        if asked < self.wanted {
            let id = format!("call-{}", context.invocations_used() + 1);
            Ok(Decision::Invoke(CapabilityInvocation::new(
                id,
                Capability::PriceCrossover,
                json!({"ma": 5}),
            )))
        } else {
            Ok(Decision::Final(FinalResponse::text("done")))
        }
    }
}

proptest! {
    #[test]
    fn derived_windows_are_usable(len in 1usize..5_000) {
        let price = RuleBasedDecisionMaker::default().request_for(len);
        let IndicatorRequest::PriceCrossover { ma } = price else {
            panic!("expected a price crossover request");
        };
        prop_assert!((2..=50).contains(&ma));

        let rules = RuleBasedDecisionMaker::new(RulesConfig {
            indicator: PreferredIndicator::MaCrossover,
            ..RulesConfig::default()
        });
        let IndicatorRequest::MaCrossover { fast_ma, slow_ma } = rules.request_for(len) else {
            panic!("expected an ma crossover request");
        };
        prop_assert!(fast_ma >= 2);
        prop_assert!(slow_ma > fast_ma);
    }

    #[test]
    fn executed_calls_never_exceed_cap(wanted in 0usize..6, cap in 1usize..4) {
        let source = SyntheticSource::default();
        let greedy = Greedy { wanted, asked: AtomicUsize::new(0) };
        let outcome = Pipeline::new(&source, &greedy)
            .with_config(PipelineConfig { max_invocations: cap })
            .run(&RunRequest::new("SPY", "1d"));

        if wanted <= cap {
            let report = outcome.unwrap();
            prop_assert_eq!(report.tool_calls.len(), wanted);
        } else {
            let is_limit = matches!(
                outcome,
                Err(PipelineError::InvocationLimitExceeded { limit, .. }) if limit == cap
            );
            prop_assert!(is_limit);
        }
    }
}
