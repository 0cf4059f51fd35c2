use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing::info;

use crate::cli::flags::{Cli, Command};
use crate::config::{load_config, AppConfig};
use crate::core::output::{write_rows, DatasetRow};
use crate::core::types::{AssessmentOutcome, OutputFormat, OutputMode};
use crate::pipeline::assessor::Assessor;
use crate::sources::Collaborators;

pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    config.validate()?;
    let assessor = build_assessor(&config, cli.no_network)?;

    match cli.command {
        Command::Assess { url, mode } => run_assess(&assessor, &url, mode.into()).await,
        Command::Batch {
            input,
            output,
            format,
            mode,
        } => run_batch(&assessor, &input, &output, format.into(), mode.into()).await,
        Command::Checks => run_checks(&assessor, &config),
    }
}

fn build_assessor(config: &AppConfig, no_network: bool) -> Result<Assessor> {
    let collab = Collaborators::live(config)?;
    let assessor = Assessor::from_config(config, collab, no_network)?;
    if no_network {
        info!("no-network mode: network checks report indeterminate");
    }
    Ok(assessor)
}

async fn run_assess(assessor: &Assessor, url: &str, mode: OutputMode) -> Result<()> {
    let assessment = assessor.assess(url, mode).await;
    println!("{}", serde_json::to_string_pretty(&assessment)?);
    Ok(())
}

async fn run_batch(
    assessor: &Assessor,
    input: &Path,
    output: &Path,
    format: OutputFormat,
    mode: OutputMode,
) -> Result<()> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("reading url list {}", input.display()))?;
    let entries = parse_url_list(&text);
    if entries.is_empty() {
        return Err(anyhow!("no urls found in {}", input.display()));
    }

    let mut rows = Vec::with_capacity(entries.len());
    let mut tally: BTreeMap<&'static str, usize> = BTreeMap::new();
    for (url, label) in entries {
        let assessment = assessor.assess(&url, mode).await;
        let bucket = match &assessment.outcome {
            AssessmentOutcome::Verdict(v) => v.label.headline(),
            AssessmentOutcome::Features(_) => "accepted",
            AssessmentOutcome::InsufficientQuality(_) => "rejected",
        };
        *tally.entry(bucket).or_default() += 1;
        rows.push(DatasetRow { assessment, label });
    }

    let schema = assessor.registry().schema();
    write_rows(&rows, &schema, format, output)?;
    info!(
        "wrote {} assessments to {} ({:?})",
        rows.len(),
        output.display(),
        tally
    );
    Ok(())
}

fn run_checks(assessor: &Assessor, config: &AppConfig) -> Result<()> {
    for check in assessor.registry().iter() {
        let weight = config
            .aggregator
            .weights
            .get(check.name())
            .copied()
            .unwrap_or_else(|| check.weight());
        let sources: Vec<String> = check.sources().iter().map(|s| format!("{s:?}")).collect();
        println!("{:<24} weight={} sources={}", check.name(), weight, sources.join(","));
    }
    Ok(())
}

/// One URL per line, optionally followed by `,label`. Blank lines, `#` comments
/// and a `url,label` header are skipped.
pub fn parse_url_list(text: &str) -> Vec<(String, Option<String>)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| !line.eq_ignore_ascii_case("url,label") && !line.eq_ignore_ascii_case("url"))
        .map(|line| match line.rsplit_once(',') {
            Some((url, label)) if is_label(label.trim()) => {
                (url.trim().to_string(), Some(label.trim().to_string()))
            }
            _ => (line.to_string(), None),
        })
        .collect()
}

fn is_label(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 32
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_list_with_optional_labels() {
        let text = "url,label\n# seed\nhttp://a.com,1\n\nhttps://b.com/?q=a,b=c\nexample.org , legit \n";
        let entries = parse_url_list(text);
        assert_eq!(
            entries,
            vec![
                ("http://a.com".to_string(), Some("1".to_string())),
                ("https://b.com/?q=a,b=c".to_string(), None),
                ("example.org".to_string(), Some("legit".to_string())),
            ]
        );
    }
}
