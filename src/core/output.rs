use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::core::error::RadarError;
use crate::core::signal::{CheckOutcome, FeatureVector};
use crate::core::time::now_utc;
use crate::core::types::{Assessment, AssessmentOutcome, OutputFormat};

/// One assessed input line, with the dataset label it carried if any.
#[derive(Debug, Clone)]
pub struct DatasetRow {
    pub assessment: Assessment,
    pub label: Option<String>,
}

#[derive(Serialize)]
struct JsonlRecord<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
    #[serde(flatten)]
    assessment: &'a Assessment,
}

pub fn write_rows(
    rows: &[DatasetRow],
    schema: &[&str],
    format: OutputFormat,
    path: &Path,
) -> Result<(), RadarError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let body = match format {
        OutputFormat::Jsonl => render_jsonl(rows)?,
        OutputFormat::Csv => render_csv(rows, schema),
        OutputFormat::Markdown => render_markdown(rows),
    };
    fs::write(path, body)?;
    Ok(())
}

fn render_jsonl(rows: &[DatasetRow]) -> Result<String, RadarError> {
    let mut lines = String::new();
    for row in rows {
        let record = JsonlRecord {
            label: row.label.as_deref(),
            assessment: &row.assessment,
        };
        lines.push_str(&serde_json::to_string(&record)?);
        lines.push('\n');
    }
    Ok(lines)
}

/// `url,label,<schema...>`; rejected assessments are left out of the dataset.
fn render_csv(rows: &[DatasetRow], schema: &[&str]) -> String {
    let mut out = String::from("url,label");
    for name in schema {
        out.push(',');
        out.push_str(name);
    }
    out.push('\n');
    for row in rows.iter().filter(|r| !r.assessment.is_rejected()) {
        let vector = FeatureVector::from_results(schema, &row.assessment.results);
        out.push_str(&csv_field(&row.assessment.input));
        out.push(',');
        out.push_str(&csv_field(row.label.as_deref().unwrap_or("")));
        for value in vector.ordered() {
            out.push(',');
            out.push_str(&value.to_string());
        }
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn render_markdown(rows: &[DatasetRow]) -> String {
    let mut out = String::new();
    out.push_str("# URL Assessments\n\n");
    out.push_str(&format!("Generated: {}\n\n", now_utc().to_rfc3339()));
    if rows.is_empty() {
        out.push_str("_No URLs assessed._\n");
    }
    for row in rows {
        let a = &row.assessment;
        out.push_str(&format!("## {}\n", a.input));
        out.push_str(&format!(
            "- Final URL: {}\n- Fingerprint: {}\n",
            a.canonical.final_url, a.fingerprint
        ));
        if let Some(label) = &row.label {
            out.push_str(&format!("- Dataset label: {label}\n"));
        }
        match &a.outcome {
            AssessmentOutcome::Verdict(v) => {
                out.push_str(&format!(
                    "- Verdict: {} ({:?}, score {})\n",
                    v.label.headline(),
                    v.severity,
                    v.score
                ));
                if v.reasons.is_empty() {
                    out.push_str("- Reasons: none\n");
                } else {
                    out.push_str("- Reasons:\n");
                    for reason in &v.reasons {
                        out.push_str(&format!("  - {reason}\n"));
                    }
                }
            }
            AssessmentOutcome::Features(f) => {
                let fired: Vec<&str> = f
                    .schema
                    .iter()
                    .filter(|name| f.get(name) == Some(1))
                    .map(|s| s.as_str())
                    .collect();
                out.push_str(&format!(
                    "- Features: {} checks, positive: {}\n",
                    f.schema.len(),
                    if fired.is_empty() { "none".to_string() } else { fired.join(", ") }
                ));
            }
            AssessmentOutcome::InsufficientQuality(q) => {
                out.push_str(&format!(
                    "- Rejected: insufficient signal quality ({:.2} < {:.2}); unusable: {}\n",
                    q.valid_fraction,
                    q.threshold,
                    q.missing.join(", ")
                ));
            }
        }
        let unresolved: Vec<String> = a
            .results
            .iter()
            .filter_map(|(name, outcome)| match outcome {
                CheckOutcome::Indeterminate { cause } => Some(format!("{name} ({cause})")),
                _ => None,
            })
            .collect();
        if !unresolved.is_empty() {
            out.push_str(&format!("- Indeterminate: {}\n", unresolved.join("; ")));
        }
        out.push('\n');
    }
    out
}
