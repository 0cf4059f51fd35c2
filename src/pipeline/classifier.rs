use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{AggregatorConfig, AppConfig, ClassifierKind};
use crate::core::error::RadarError;
use crate::core::signal::FeatureVector;
use crate::core::types::{RiskLabel, Verdict};
use crate::pipeline::aggregator::ScoreCard;

/// Maps aggregated signals to a three-tier verdict. Never fails.
#[async_trait]
pub trait RiskClassifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the feature vector leaves the process. Such classifiers only
    /// ever see vectors that passed the data-quality gate.
    fn consumes_features(&self) -> bool {
        false
    }

    async fn classify(&self, features: &FeatureVector, card: &ScoreCard) -> Verdict;
}

/// Fixed score thresholds.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdClassifier {
    suspicious_score: u32,
    malicious_score: u32,
}

impl ThresholdClassifier {
    pub fn new(config: &AggregatorConfig) -> Self {
        Self {
            suspicious_score: config.suspicious_score,
            malicious_score: config.malicious_score,
        }
    }

    pub fn label(&self, score: u32) -> RiskLabel {
        if score >= self.malicious_score {
            RiskLabel::Malicious
        } else if score >= self.suspicious_score {
            RiskLabel::Suspicious
        } else {
            RiskLabel::Legit
        }
    }
}

#[async_trait]
impl RiskClassifier for ThresholdClassifier {
    fn name(&self) -> &'static str {
        "threshold"
    }

    async fn classify(&self, _features: &FeatureVector, card: &ScoreCard) -> Verdict {
        Verdict::new(
            self.label(card.score),
            card.reasons.clone(),
            card.score,
            self.name(),
        )
    }
}

/// External trained model returning a discrete class in {0, 1, 2}.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn predict(&self, features: &FeatureVector) -> Result<u8, RadarError>;
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    schema: &'a [String],
    features: Vec<i8>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    class: u8,
}

/// Inference service speaking `POST {schema, features}` → `{class}`.
pub struct HttpModelBackend {
    client: Client,
    endpoint: String,
}

impl HttpModelBackend {
    pub fn new(client: Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl ModelBackend for HttpModelBackend {
    async fn predict(&self, features: &FeatureVector) -> Result<u8, RadarError> {
        let body = PredictRequest {
            schema: &features.schema,
            features: features.ordered(),
        };
        let resp: PredictResponse = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.class)
    }
}

/// Delegates to a model, falling back to thresholds when the model is unusable.
pub struct ModelClassifier {
    backend: Arc<dyn ModelBackend>,
    fallback: ThresholdClassifier,
}

impl ModelClassifier {
    pub fn new(backend: Arc<dyn ModelBackend>, fallback: ThresholdClassifier) -> Self {
        Self { backend, fallback }
    }
}

#[async_trait]
impl RiskClassifier for ModelClassifier {
    fn name(&self) -> &'static str {
        "model"
    }

    fn consumes_features(&self) -> bool {
        true
    }

    async fn classify(&self, features: &FeatureVector, card: &ScoreCard) -> Verdict {
        let label = match self.backend.predict(features).await {
            Ok(class) => RiskLabel::from_class(class).ok_or(class),
            Err(err) => {
                warn!("model classifier failed: {err}; falling back to thresholds");
                return self.fallback.classify(features, card).await;
            }
        };
        match label {
            Ok(label) => Verdict::new(label, card.reasons.clone(), card.score, self.name()),
            Err(class) => {
                warn!("model returned unknown class {class}; falling back to thresholds");
                self.fallback.classify(features, card).await
            }
        }
    }
}

/// Classifier selected by configuration.
pub fn from_config(
    config: &AppConfig,
    client: Client,
) -> Result<Arc<dyn RiskClassifier>, RadarError> {
    let threshold = ThresholdClassifier::new(&config.aggregator);
    match config.classifier.kind {
        ClassifierKind::Threshold => Ok(Arc::new(threshold)),
        ClassifierKind::Model => {
            let endpoint = config.classifier.model_endpoint.as_deref().ok_or_else(|| {
                RadarError::Config("classifier.model_endpoint is required".into())
            })?;
            let backend = Arc::new(HttpModelBackend::new(client, endpoint));
            Ok(Arc::new(ModelClassifier::new(backend, threshold)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::signal::NamedResultSet;
    use crate::core::types::SeverityTag;

    struct FixedModel(Result<u8, ()>);

    #[async_trait]
    impl ModelBackend for FixedModel {
        async fn predict(&self, _features: &FeatureVector) -> Result<u8, RadarError> {
            self.0
                .map_err(|_| RadarError::Transport("model offline".into()))
        }
    }

    fn card(score: u32) -> ScoreCard {
        ScoreCard {
            score,
            reasons: vec!["reason".into(); score as usize],
        }
    }

    fn features() -> FeatureVector {
        FeatureVector::from_results(&["no_https"], &NamedResultSet::new())
    }

    #[tokio::test]
    async fn thresholds_map_scores() {
        let classifier = ThresholdClassifier::new(&AggregatorConfig::default());
        let labels: Vec<RiskLabel> = [0, 1, 2, 7].iter().map(|s| classifier.label(*s)).collect();
        assert_eq!(
            labels,
            vec![
                RiskLabel::Legit,
                RiskLabel::Suspicious,
                RiskLabel::Malicious,
                RiskLabel::Malicious
            ]
        );
        let verdict = classifier.classify(&features(), &card(1)).await;
        assert_eq!(verdict.severity, SeverityTag::Yellow);
        assert_eq!(verdict.classifier, "threshold");
    }

    #[tokio::test]
    async fn model_class_maps_to_label() {
        let fallback = ThresholdClassifier::new(&AggregatorConfig::default());
        let model = ModelClassifier::new(Arc::new(FixedModel(Ok(2))), fallback);
        let verdict = model.classify(&features(), &card(0)).await;
        assert_eq!(verdict.label, RiskLabel::Malicious);
        assert_eq!(verdict.classifier, "model");
        assert!(model.consumes_features());
        assert!(!fallback.consumes_features());
    }

    #[tokio::test]
    async fn model_failure_falls_back() {
        let fallback = ThresholdClassifier::new(&AggregatorConfig::default());
        let offline = ModelClassifier::new(Arc::new(FixedModel(Err(()))), fallback);
        let verdict = offline.classify(&features(), &card(1)).await;
        assert_eq!(verdict.label, RiskLabel::Suspicious);
        assert_eq!(verdict.classifier, "threshold");

        let confused = ModelClassifier::new(Arc::new(FixedModel(Ok(9))), fallback);
        let verdict = confused.classify(&features(), &card(0)).await;
        assert_eq!(verdict.label, RiskLabel::Legit);
        assert_eq!(verdict.classifier, "threshold");
    }
}
