use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::RadarError;

/// Tri-state result of a single check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The check found something suspicious.
    Positive { evidence: Option<String> },
    /// The check ran and found nothing suspicious.
    Negative,
    /// The check could not be evaluated.
    Indeterminate { cause: String },
}

impl CheckOutcome {
    pub fn positive() -> Self {
        CheckOutcome::Positive { evidence: None }
    }

    pub fn positive_with(evidence: impl Into<String>) -> Self {
        CheckOutcome::Positive {
            evidence: Some(evidence.into()),
        }
    }

    pub fn indeterminate(cause: impl Into<String>) -> Self {
        CheckOutcome::Indeterminate {
            cause: cause.into(),
        }
    }

    /// Positive when `flag` is set, Negative otherwise.
    pub fn flag(flag: bool) -> Self {
        if flag {
            CheckOutcome::positive()
        } else {
            CheckOutcome::Negative
        }
    }

    /// Collapse a fallible evaluation; errors never become Negative.
    pub fn from_result(result: Result<CheckOutcome, RadarError>) -> Self {
        match result {
            Ok(outcome) => outcome,
            Err(RadarError::Timeout) => CheckOutcome::indeterminate("timeout"),
            Err(err) => CheckOutcome::indeterminate(err.to_string()),
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, CheckOutcome::Positive { .. })
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, CheckOutcome::Indeterminate { .. })
    }

    /// Positive → 1, Negative → 0, Indeterminate → -1.
    pub fn encode(&self) -> i8 {
        match self {
            CheckOutcome::Positive { .. } => 1,
            CheckOutcome::Negative => 0,
            CheckOutcome::Indeterminate { .. } => -1,
        }
    }
}

/// Outcomes keyed by check name. Keys may be missing.
pub type NamedResultSet = BTreeMap<String, CheckOutcome>;

/// Numeric encoding of every check in the registry schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureVector {
    pub schema: Vec<String>,
    pub values: BTreeMap<String, i8>,
}

impl FeatureVector {
    pub fn from_results(schema: &[&str], results: &NamedResultSet) -> Self {
        let values = schema
            .iter()
            .map(|name| {
                let value = results.get(*name).map(CheckOutcome::encode).unwrap_or(-1);
                (name.to_string(), value)
            })
            .collect();
        Self {
            schema: schema.iter().map(|s| s.to_string()).collect(),
            values,
        }
    }

    pub fn get(&self, name: &str) -> Option<i8> {
        self.values.get(name).copied()
    }

    /// Values in schema order.
    pub fn ordered(&self) -> Vec<i8> {
        self.schema
            .iter()
            .map(|name| self.values.get(name).copied().unwrap_or(-1))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_never_negative() {
        let out = CheckOutcome::from_result(Err(RadarError::Transport("refused".into())));
        assert!(out.is_indeterminate());
        let out = CheckOutcome::from_result(Err(RadarError::Timeout));
        assert_eq!(out, CheckOutcome::indeterminate("timeout"));
    }

    #[test]
    fn missing_keys_encode_as_sentinel() {
        let mut results = NamedResultSet::new();
        results.insert("a".into(), CheckOutcome::positive());
        results.insert("b".into(), CheckOutcome::Negative);
        let vector = FeatureVector::from_results(&["a", "b", "c"], &results);
        assert_eq!(vector.ordered(), vec![1, 0, -1]);
        assert_eq!(vector.schema.len(), 3);
    }
}
