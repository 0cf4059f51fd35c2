use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Endpoints;
use crate::core::error::RadarError;
use crate::sources::ThreatIntel;

/// Safe Browsing v4 `threatMatches:find` client.
pub struct SafeBrowsingClient {
    client: Client,
    endpoint: String,
    api_key: String,
    client_id: String,
    client_version: String,
    threat_types: Vec<String>,
    platform_types: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FindRequest<'a> {
    client: ClientInfo<'a>,
    threat_info: ThreatInfo<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientInfo<'a> {
    client_id: &'a str,
    client_version: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreatInfo<'a> {
    threat_types: &'a [String],
    platform_types: &'a [String],
    threat_entry_types: [&'static str; 1],
    threat_entries: [ThreatEntry<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ThreatEntry<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    matches: Option<Vec<ThreatMatch>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreatMatch {
    #[serde(default)]
    threat_type: Option<String>,
}

impl SafeBrowsingClient {
    pub fn new(client: Client, endpoints: &Endpoints, api_key: String) -> Self {
        Self {
            client,
            endpoint: endpoints.safe_browsing_url.clone(),
            api_key,
            client_id: endpoints.client_id.clone(),
            client_version: endpoints.client_version.clone(),
            threat_types: endpoints.threat_types.clone(),
            platform_types: endpoints.platform_types.clone(),
        }
    }
}

#[async_trait]
impl ThreatIntel for SafeBrowsingClient {
    async fn lookup(&self, url: &str) -> Result<Vec<String>, RadarError> {
        let payload = FindRequest {
            client: ClientInfo {
                client_id: &self.client_id,
                client_version: &self.client_version,
            },
            threat_info: ThreatInfo {
                threat_types: &self.threat_types,
                platform_types: &self.platform_types,
                threat_entry_types: ["URL"],
                threat_entries: [ThreatEntry { url }],
            },
        };
        let body: FindResponse = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body
            .matches
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.threat_type.unwrap_or_else(|| "UNKNOWN".to_string()))
            .collect())
    }
}
