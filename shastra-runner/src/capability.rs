//! Indicator capabilities exposed to the decision maker.
//!
//! A decision maker never calls the indicator engine directly. It names a
//! capability and hands over JSON arguments; this module checks the
//! arguments against the capability's shape and runs the computation.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use shastra_core::domain::OhlcvColumns;
use shastra_core::indicators::{IndicatorError, IndicatorRequest, IndicatorResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    MaCrossover,
    PriceCrossover,
}

impl Capability {
    pub const ALL: [Capability; 2] = [Capability::MaCrossover, Capability::PriceCrossover];

    pub fn name(&self) -> &'static str {
        match self {
            Capability::MaCrossover => "ma_crossover",
            Capability::PriceCrossover => "price_crossover",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Capability::MaCrossover => {
                "Moving-average crossover: percent deviation of the fast simple moving average \
                 from the slow one (fast / slow - 1) over the closes. Positive means the fast \
                 average is above the slow one (bullish), negative below (bearish); sign changes \
                 mark crossovers. Returns the last 66 points; points inside the warmup window are null."
            }
            Capability::PriceCrossover => {
                "Price crossover: percent deviation of the close from its simple moving average \
                 (close / ma - 1). Positive means price is above the average (bullish), negative \
                 below (bearish); sign changes mark crossovers. Returns the last 66 points; points \
                 inside the warmup window are null."
            }
        }
    }

    /// JSON schema of the capability arguments.
    pub fn parameters_schema(&self) -> Value {
        let ohlcv_data = json!({
            "type": "object",
            "description": "Column-oriented price data. Must include `date` and `close` arrays of equal length. \
                            Optional: omit to use the series already loaded for this run.",
            "properties": {
                "date": { "type": "array", "items": { "type": "string" } },
                "close": { "type": "array", "items": { "type": "number" } }
            },
            "required": ["date", "close"]
        });
        let window = |description: &str| {
            json!({ "type": "integer", "minimum": 1, "description": description })
        };

        match self {
            Capability::MaCrossover => json!({
                "type": "object",
                "properties": {
                    "ohlcv_data": ohlcv_data,
                    "fast_ma": window("Window length for the fast moving average."),
                    "slow_ma": window("Window length for the slow moving average.")
                },
                "required": ["fast_ma", "slow_ma"],
                "additionalProperties": false
            }),
            Capability::PriceCrossover => json!({
                "type": "object",
                "properties": {
                    "ohlcv_data": ohlcv_data,
                    "ma": window("Window length for the moving average.")
                },
                "required": ["ma"],
                "additionalProperties": false
            }),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("unknown capability '{name}'")]
    Unknown { name: String },

    #[error("malformed arguments for '{capability}': {reason}")]
    MalformedArguments {
        capability: Capability,
        reason: String,
    },

    #[error("{capability} failed: {source}")]
    Indicator {
        capability: Capability,
        #[source]
        source: IndicatorError,
    },
}

/// A decision maker's request to run one capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityInvocation {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MaCrossoverArgs {
    #[serde(default)]
    ohlcv_data: Option<OhlcvColumns>,
    fast_ma: usize,
    slow_ma: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PriceCrossoverArgs {
    #[serde(default)]
    ohlcv_data: Option<OhlcvColumns>,
    ma: usize,
}

/// Invocation arguments checked against the capability shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInvocation {
    pub capability: Capability,
    pub request: IndicatorRequest,
    /// Data supplied with the call, if any.
    pub data: Option<OhlcvColumns>,
}

impl CapabilityInvocation {
    pub fn new(id: impl Into<String>, capability: Capability, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: capability.name().to_string(),
            arguments,
        }
    }

    pub fn resolve(&self) -> Result<ResolvedInvocation, CapabilityError> {
        let capability = Capability::from_name(&self.name).ok_or_else(|| CapabilityError::Unknown {
            name: self.name.clone(),
        })?;

        match capability {
            Capability::MaCrossover => {
                let args: MaCrossoverArgs = self.parse_arguments(capability)?;
                Ok(ResolvedInvocation {
                    capability,
                    request: IndicatorRequest::MaCrossover {
                        fast_ma: args.fast_ma,
                        slow_ma: args.slow_ma,
                    },
                    data: args.ohlcv_data,
                })
            }
            Capability::PriceCrossover => {
                let args: PriceCrossoverArgs = self.parse_arguments(capability)?;
                Ok(ResolvedInvocation {
                    capability,
                    request: IndicatorRequest::PriceCrossover { ma: args.ma },
                    data: args.ohlcv_data,
                })
            }
        }
    }

    /// Model backends often send arguments as a JSON-encoded string.
    fn parse_arguments<T: DeserializeOwned>(&self, capability: Capability) -> Result<T, CapabilityError> {
        let malformed = |e: serde_json::Error| CapabilityError::MalformedArguments {
            capability,
            reason: e.to_string(),
        };
        match &self.arguments {
            Value::String(raw) => serde_json::from_str(raw).map_err(malformed),
            other => T::deserialize(other).map_err(malformed),
        }
    }
}

/// Run an invocation. `loaded` is used when the call carries no data.
pub fn execute(
    invocation: &CapabilityInvocation,
    loaded: &OhlcvColumns,
) -> Result<IndicatorResult, CapabilityError> {
    let resolved = invocation.resolve()?;
    let data = resolved.data.as_ref().unwrap_or(loaded);
    resolved
        .request
        .compute(data)
        .map_err(|source| CapabilityError::Indicator {
            capability: resolved.capability,
            source,
        })
}
