use std::net::IpAddr;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::core::error::RadarError;
use crate::sources::GeoLookup;

/// ipinfo-style geolocation: `GET {base}/{ip}/json` → `{"country": "US"}`.
pub struct IpInfoClient {
    client: Client,
    base: String,
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    country: Option<String>,
}

impl IpInfoClient {
    pub fn new(client: Client, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl GeoLookup for IpInfoClient {
    async fn country(&self, ip: IpAddr) -> Result<String, RadarError> {
        let url = format!("{}/{}/json", self.base, ip);
        let body: GeoResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        body.country
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| RadarError::DataUnavailable(format!("no country for {ip}")))
    }
}
