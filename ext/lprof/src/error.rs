use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Setup-time failures. Per-event anomalies never surface as errors.
#[derive(Debug, Error)]
pub enum ProfilerError {
    #[error("could not open trace output {}: {source}", path.display())]
    SinkUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("filter rule set is full (capacity {capacity})")]
    FilterRuleOverflow { capacity: usize },

    #[error("invalid filter rule: {0:?}")]
    InvalidFilterRule(String),

    #[error("invalid value {value:?} for option `{option}`")]
    InvalidOption { option: &'static str, value: String },

    #[error("invalid configuration document: {0}")]
    InvalidConfiguration(#[from] serde_json::Error),
}
