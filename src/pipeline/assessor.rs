use std::{sync::Arc, time::Duration};

use tracing::info;

use crate::checks::Registry;
use crate::config::AppConfig;
use crate::core::canonical::{CanonicalUrl, Canonicalizer};
use crate::core::engine::Engine;
use crate::core::error::RadarError;
use crate::core::hash::result_fingerprint;
use crate::core::time::now_utc;
use crate::core::types::{Assessment, AssessmentOutcome, OutputMode};
use crate::pipeline::aggregator::Aggregator;
use crate::pipeline::classifier::{self, RiskClassifier};
use crate::sources::{http_client, Collaborators};

/// raw URL → canonical URL → result set → feature vector or verdict.
pub struct Assessor {
    canonicalizer: Canonicalizer,
    engine: Engine,
    aggregator: Aggregator,
    classifier: Arc<dyn RiskClassifier>,
}

impl Assessor {
    pub fn new(
        canonicalizer: Canonicalizer,
        engine: Engine,
        aggregator: Aggregator,
        classifier: Arc<dyn RiskClassifier>,
    ) -> Self {
        Self {
            canonicalizer,
            engine,
            aggregator,
            classifier,
        }
    }

    /// Wire the standard registry. Configuration errors surface here, before any URL is seen.
    pub fn from_config(
        config: &AppConfig,
        collab: Collaborators,
        no_network: bool,
    ) -> Result<Self, RadarError> {
        let registry = Registry::standard(config, &collab)?;
        let canonicalizer = if no_network {
            Canonicalizer::offline()
        } else {
            Canonicalizer::new(
                collab.http.clone(),
                Duration::from_millis(config.engine.canonicalize_timeout_ms),
            )
        };
        let engine = Engine::new(&config.engine, registry).no_network(no_network);
        let classifier = classifier::from_config(config, http_client(config)?)?;
        Ok(Self::new(
            canonicalizer,
            engine,
            Aggregator::new(&config.aggregator),
            classifier,
        ))
    }

    /// Swap the classifier chosen by configuration.
    pub fn with_classifier(mut self, classifier: Arc<dyn RiskClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn registry(&self) -> &Registry {
        self.engine.registry()
    }

    pub async fn assess(&self, raw: &str, mode: OutputMode) -> Assessment {
        let canonical = Arc::new(self.canonicalizer.canonicalize(raw).await);
        let results = self.engine.run_all(canonical.clone()).await;
        let registry = self.engine.registry();
        let features = self.aggregator.feature_vector(registry, &results);

        // Feature vectors never leave the process unless they pass the gate.
        let gated = mode == OutputMode::Features || self.classifier.consumes_features();
        let gate = if gated {
            self.aggregator.quality_gate(registry, &results)
        } else {
            Ok(())
        };

        let outcome = match (gate, mode) {
            (Err(rejected), _) => {
                info!(
                    "{}: rejected, {:.2} of required checks usable (need {:.2})",
                    raw, rejected.valid_fraction, rejected.threshold
                );
                AssessmentOutcome::InsufficientQuality(rejected)
            }
            (Ok(()), OutputMode::Features) => AssessmentOutcome::Features(features),
            (Ok(()), OutputMode::Verdict) => {
                let card = self.aggregator.score(registry, &results);
                let verdict = self.classifier.classify(&features, &card).await;
                info!(
                    "{}: {} (score {}, {} reasons)",
                    raw,
                    verdict.label.headline(),
                    verdict.score,
                    verdict.reasons.len()
                );
                AssessmentOutcome::Verdict(verdict)
            }
        };

        let fingerprint = result_fingerprint(&results);
        let canonical = Arc::try_unwrap(canonical).unwrap_or_else(|shared| CanonicalUrl::clone(&shared));
        Assessment {
            input: raw.to_string(),
            canonical,
            results,
            outcome,
            fingerprint,
            assessed_at: now_utc(),
        }
    }
}
