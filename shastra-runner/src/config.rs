//! TOML run configuration.
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration that reads `data/PriceData.csv` and uses the rule engine.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shastra_core::data::{default_min_date, CsvPriceSource, DEFAULT_MAX_BARS};

use crate::decision::{
    ChatCompletionsConfig, ChatCompletionsDecisionMaker, DecisionError, DecisionMaker,
    RuleBasedDecisionMaker, RulesConfig,
};
use crate::pipeline::PipelineConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub path: PathBuf,
    /// Bars dated before this are ignored.
    pub min_date: NaiveDate,
    pub max_bars: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/PriceData.csv"),
            min_date: default_min_date(),
            max_bars: DEFAULT_MAX_BARS,
        }
    }
}

impl DataConfig {
    pub fn csv_source(&self) -> CsvPriceSource {
        CsvPriceSource::new(self.path.clone())
            .with_min_date(self.min_date)
            .with_max_bars(self.max_bars)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum DecisionConfig {
    Rules(RulesConfig),
    ChatCompletions(ChatCompletionsConfig),
}

impl Default for DecisionConfig {
    fn default() -> Self {
        DecisionConfig::Rules(RulesConfig::default())
    }
}

impl DecisionConfig {
    pub fn build(&self) -> Result<Box<dyn DecisionMaker>, DecisionError> {
        Ok(match self {
            DecisionConfig::Rules(rules) => Box::new(RuleBasedDecisionMaker::new(rules.clone())),
            DecisionConfig::ChatCompletions(chat) => {
                Box::new(ChatCompletionsDecisionMaker::from_env(chat.clone())?)
            }
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShastraConfig {
    pub data: DataConfig,
    pub pipeline: PipelineConfig,
    pub decision: DecisionConfig,
}

impl ShastraConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.max_bars == 0 {
            return Err(ConfigError::Invalid("data.max_bars must be at least 1".into()));
        }
        if self.pipeline.max_invocations == 0 {
            return Err(ConfigError::Invalid("pipeline.max_invocations must be at least 1".into()));
        }
        match &self.decision {
            DecisionConfig::Rules(rules) => {
                for (name, window) in [("ma", rules.ma), ("fast_ma", rules.fast_ma), ("slow_ma", rules.slow_ma)] {
                    if window == Some(0) {
                        return Err(ConfigError::Invalid(format!("decision.{name} must be positive")));
                    }
                }
            }
            DecisionConfig::ChatCompletions(chat) => {
                if chat.timeout_secs == 0 {
                    return Err(ConfigError::Invalid("decision.timeout_secs must be positive".into()));
                }
                if chat.model.trim().is_empty() {
                    return Err(ConfigError::Invalid("decision.model must not be empty".into()));
                }
            }
        }
        Ok(())
    }
}
