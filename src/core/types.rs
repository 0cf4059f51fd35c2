use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::canonical::CanonicalUrl;
use crate::core::signal::{FeatureVector, NamedResultSet};

/// Three-tier risk label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLabel {
    Legit,
    Suspicious,
    Malicious,
}

impl RiskLabel {
    /// Map a discrete model class to a label.
    pub fn from_class(class: u8) -> Option<Self> {
        match class {
            0 => Some(RiskLabel::Legit),
            1 => Some(RiskLabel::Suspicious),
            2 => Some(RiskLabel::Malicious),
            _ => None,
        }
    }

    pub fn severity(&self) -> SeverityTag {
        match self {
            RiskLabel::Legit => SeverityTag::Green,
            RiskLabel::Suspicious => SeverityTag::Yellow,
            RiskLabel::Malicious => SeverityTag::Red,
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            RiskLabel::Legit => "Probably legitimate",
            RiskLabel::Suspicious => "Potentially suspicious",
            RiskLabel::Malicious => "High suspicion of fraudulent site",
        }
    }
}

/// Color code attached to a verdict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTag {
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    pub label: RiskLabel,
    /// Reasons in registry order of the checks that fired.
    pub reasons: Vec<String>,
    pub severity: SeverityTag,
    pub score: u32,
    /// Name of the classifier that produced the label.
    pub classifier: String,
}

impl Verdict {
    pub fn new(label: RiskLabel, reasons: Vec<String>, score: u32, classifier: &str) -> Self {
        Self {
            label,
            reasons,
            severity: label.severity(),
            score,
            classifier: classifier.to_string(),
        }
    }
}

/// Returned instead of a verdict when too many required checks were indeterminate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsufficientQuality {
    pub valid_fraction: f64,
    pub threshold: f64,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Verdict,
    Features,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssessmentOutcome {
    Verdict(Verdict),
    Features(FeatureVector),
    InsufficientQuality(InsufficientQuality),
}

/// Everything produced by one assessment call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    /// Raw input exactly as received.
    pub input: String,
    pub canonical: CanonicalUrl,
    pub results: NamedResultSet,
    pub outcome: AssessmentOutcome,
    pub fingerprint: String,
    pub assessed_at: DateTime<Utc>,
}

impl Assessment {
    pub fn verdict(&self) -> Option<&Verdict> {
        match &self.outcome {
            AssessmentOutcome::Verdict(v) => Some(v),
            _ => None,
        }
    }

    pub fn features(&self) -> Option<&FeatureVector> {
        match &self.outcome {
            AssessmentOutcome::Features(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.outcome, AssessmentOutcome::InsufficientQuality(_))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutputFormat {
    Jsonl,
    Markdown,
    Csv,
}
