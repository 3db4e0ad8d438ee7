use std::str::FromStr;

use crate::error::ProfilerError;

/// Upper bound on registered rules.
pub const MAX_FILTER_RULES: usize = 50;

pub const WILDCARD: &str = "*";

/// An allow rule. Each side is either a literal name or `*`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub function: String,
    #[serde(default = "wildcard")]
    pub source: String,
}

fn wildcard() -> String {
    WILDCARD.to_owned()
}

impl FilterRule {
    pub fn new(function: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            source: source.into(),
        }
    }

    /// Rule accepting every named call.
    pub fn any() -> Self {
        Self::new(WILDCARD, WILDCARD)
    }

    /// A call without source information matches any source pattern.
    pub fn matches(&self, function: &str, source: Option<&str>) -> bool {
        let function_matches = self.function == WILDCARD || self.function == function;
        let source_matches = self.source == WILDCARD || source.map_or(true, |s| s == self.source);
        function_matches && source_matches
    }
}

/// Parses `function` or `function@source`.
impl FromStr for FilterRule {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (function, source) = match s.split_once('@') {
            Some((function, source)) => (function.trim(), source.trim()),
            None => (s.trim(), WILDCARD),
        };
        if function.is_empty() || source.is_empty() {
            return Err(ProfilerError::InvalidFilterRule(s.to_owned()));
        }
        Ok(Self::new(function, source))
    }
}

/// Ordered, bounded set of allow rules. With no rules nothing is tracked.
#[derive(Clone, Debug, Default)]
pub struct CallFilter {
    rules: Vec<FilterRule>,
}

impl CallFilter {
    pub fn new() -> Self {
        Self { rules: vec![] }
    }

    pub fn from_rules<I>(rules: I) -> Result<Self, ProfilerError>
    where
        I: IntoIterator<Item = FilterRule>,
    {
        let mut filter = Self::new();
        for rule in rules {
            filter.add_rule(rule)?;
        }
        Ok(filter)
    }

    pub fn add_rule(&mut self, rule: FilterRule) -> Result<(), ProfilerError> {
        if self.rules.len() >= MAX_FILTER_RULES {
            return Err(ProfilerError::FilterRuleOverflow {
                capacity: MAX_FILTER_RULES,
            });
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn should_track(&self, function: Option<&str>, source: Option<&str>) -> bool {
        match function {
            Some(function) if !function.is_empty() => {
                self.rules.iter().any(|rule| rule.matches(function, source))
            }
            _ => false,
        }
    }

    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
