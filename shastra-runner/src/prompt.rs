//! Instruction text handed to the decision maker at the start of a run.

use shastra_core::domain::PriceSeries;

use crate::capability::Capability;

/// First user turn of every run.
pub const OPENING_REQUEST: &str = "Begin indicator analysis.";

/// Build the system instruction for one run.
///
/// The loaded series is embedded as pretty-printed column JSON so a model
/// backend can both read it and pass it back as `ohlcv_data`.
pub fn system_instruction(series: &PriceSeries, capabilities: &[Capability], max_invocations: usize) -> String {
    let columns = serde_json::to_string_pretty(&series.to_columns()).unwrap_or_else(|_| "{}".to_string());

    let mut text = String::from(
        "You are a trading analyst assistant. Analyze technical indicators for the \
         instrument below and finish with a short, concrete trading bias.\n\n",
    );

    text.push_str("Available tools:\n");
    for cap in capabilities {
        text.push_str(&format!("- {}: {}\n", cap.name(), cap.description()));
    }
    text.push_str(
        "Arguments are `fast_ma`/`slow_ma` or `ma` (positive integers). `ohlcv_data` may be \
         omitted; the loaded series is used in that case.\n\n",
    );

    text.push_str(&format!(
        "Symbol {} on {} bars, {} bars of recent history:\n{}\n\n",
        series.symbol(),
        series.timeframe(),
        series.len(),
        columns
    ));

    let calls = if max_invocations == 1 {
        "once".to_string()
    } else {
        format!("at most {max_invocations} times")
    };
    text.push_str(&format!(
        "Call tools strictly {calls} and then analyze the results. Keep lookback windows \
         appropriate for the amount of data provided."
    ));
    text
}
