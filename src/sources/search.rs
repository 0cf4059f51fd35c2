use async_trait::async_trait;
use reqwest::Client;

use crate::core::error::RadarError;
use crate::sources::IndexLookup;

/// Best-effort `site:` query against a search front end.
pub struct SearchIndexClient {
    client: Client,
    base: String,
    no_results_marker: String,
}

impl SearchIndexClient {
    pub fn new(client: Client, base: &str, no_results_marker: &str) -> Self {
        Self {
            client,
            base: base.to_string(),
            no_results_marker: no_results_marker.to_lowercase(),
        }
    }
}

#[async_trait]
impl IndexLookup for SearchIndexClient {
    async fn is_indexed(&self, domain: &str) -> Result<bool, RadarError> {
        if domain.is_empty() {
            return Err(RadarError::DataUnavailable("no registered domain".into()));
        }
        let query = format!("site:{domain}");
        let text = self
            .client
            .get(&self.base)
            .query(&[("q", query.as_str())])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(!text.to_lowercase().contains(&self.no_results_marker))
    }
}
