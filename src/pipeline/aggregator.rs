use std::collections::BTreeMap;

use serde::Serialize;

use crate::checks::Registry;
use crate::config::{AggregatorConfig, IndeterminatePolicy};
use crate::core::signal::{CheckOutcome, FeatureVector, NamedResultSet};
use crate::core::types::InsufficientQuality;

/// Weighted positive score plus the reasons behind it, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreCard {
    pub score: u32,
    pub reasons: Vec<String>,
}

/// Turns a result set into a score, a feature vector, or a rejection.
///
/// Every output depends only on the registry order and the result set, so
/// completion order of the checks never leaks into a verdict.
#[derive(Debug, Clone)]
pub struct Aggregator {
    weights: BTreeMap<String, u32>,
    required: Vec<String>,
    validity_threshold: f64,
    indeterminate: IndeterminatePolicy,
}

impl Aggregator {
    pub fn new(config: &AggregatorConfig) -> Self {
        Self {
            weights: config.weights.clone(),
            required: config.required.clone(),
            validity_threshold: config.validity_threshold,
            indeterminate: config.indeterminate,
        }
    }

    pub fn score(&self, registry: &Registry, results: &NamedResultSet) -> ScoreCard {
        let mut card = ScoreCard::default();
        for check in registry.iter() {
            let weight = self
                .weights
                .get(check.name())
                .copied()
                .unwrap_or_else(|| check.weight());
            match results.get(check.name()) {
                Some(CheckOutcome::Positive { evidence }) => {
                    card.score += weight;
                    card.reasons.push(
                        evidence
                            .clone()
                            .unwrap_or_else(|| check.reason().to_string()),
                    );
                }
                Some(CheckOutcome::Negative) => {}
                Some(CheckOutcome::Indeterminate { cause }) => {
                    if self.indeterminate == IndeterminatePolicy::Suspicious {
                        card.score += weight;
                        card.reasons
                            .push(format!("Could not verify {} ({cause})", check.name()));
                    }
                }
                None => {
                    if self.indeterminate == IndeterminatePolicy::Suspicious {
                        card.score += weight;
                        card.reasons
                            .push(format!("Could not verify {} (no result)", check.name()));
                    }
                }
            }
        }
        card
    }

    pub fn feature_vector(&self, registry: &Registry, results: &NamedResultSet) -> FeatureVector {
        FeatureVector::from_results(&registry.schema(), results)
    }

    /// Fraction of required checks with a usable outcome; missing counts as unusable.
    /// Required checks that are not registered (disabled) are left out of the count.
    pub fn validity(&self, registry: &Registry, results: &NamedResultSet) -> (f64, Vec<String>) {
        let required: Vec<&String> = self
            .required
            .iter()
            .filter(|name| registry.get(name.as_str()).is_some())
            .collect();
        if required.is_empty() {
            return (1.0, Vec::new());
        }
        let missing: Vec<String> = required
            .iter()
            .filter(|name| {
                results
                    .get(name.as_str())
                    .map_or(true, CheckOutcome::is_indeterminate)
            })
            .map(|name| name.to_string())
            .collect();
        let valid = required.len() - missing.len();
        (valid as f64 / required.len() as f64, missing)
    }

    pub fn quality_gate(
        &self,
        registry: &Registry,
        results: &NamedResultSet,
    ) -> Result<(), InsufficientQuality> {
        let (valid_fraction, missing) = self.validity(registry, results);
        if valid_fraction < self.validity_threshold {
            return Err(InsufficientQuality {
                valid_fraction,
                threshold: self.validity_threshold,
                missing,
            });
        }
        Ok(())
    }
}
