use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ProfilerError;
use crate::filter::{FilterRule, MAX_FILTER_RULES};

pub const DEFAULT_TIME_MODE: TimeMode = TimeMode::WallTime;
pub const DEFAULT_FORMAT: TraceFormat = TraceFormat::Text;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Where `Session::init` writes the trace.
    pub output: Option<PathBuf>,
    pub time_mode: TimeMode,
    pub format: TraceFormat,
    /// Write the column header at the top of a text trace.
    pub print_header: bool,
    /// Estimated instrumentation cost of one call (see `timer::calibrate`).
    #[serde(with = "crate::util::duration_secs")]
    pub call_overhead: Duration,
    /// Subtract `call_overhead` from every frame's exclusive time.
    pub compensate_call_overhead: bool,
    pub filter_rules: Vec<FilterRule>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            output: None,
            time_mode: DEFAULT_TIME_MODE,
            format: DEFAULT_FORMAT,
            print_header: true,
            call_overhead: Duration::ZERO,
            compensate_call_overhead: false,
            filter_rules: vec![],
        }
    }
}

impl Configuration {
    pub fn from_json(document: &str) -> Result<Self, ProfilerError> {
        Ok(serde_json::from_str(document)?)
    }

    pub fn add_filter_rule(&mut self, rule: FilterRule) -> Result<(), ProfilerError> {
        if self.filter_rules.len() >= MAX_FILTER_RULES {
            return Err(ProfilerError::FilterRuleOverflow {
                capacity: MAX_FILTER_RULES,
            });
        }
        self.filter_rules.push(rule);
        Ok(())
    }

    /// The amount actually subtracted per frame.
    pub fn effective_call_overhead(&self) -> Duration {
        if self.compensate_call_overhead {
            self.call_overhead
        } else {
            Duration::ZERO
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeMode {
    #[serde(rename = "cpu")]
    CpuTime,
    #[serde(rename = "wall")]
    WallTime,
}

impl FromStr for TimeMode {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(Self::CpuTime),
            "wall" => Ok(Self::WallTime),
            _ => Err(ProfilerError::InvalidOption {
                option: "time_mode",
                value: s.to_owned(),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceFormat {
    /// Pipe-delimited lines, one per frame.
    Text,
    /// One nested call tree document per line.
    Json,
}

impl FromStr for TraceFormat {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ProfilerError::InvalidOption {
                option: "format",
                value: s.to_owned(),
            }),
        }
    }
}
