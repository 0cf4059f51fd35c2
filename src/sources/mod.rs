//! External collaborators the checks call out to.

use std::{net::IpAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::AppConfig;
use crate::core::error::RadarError;

pub mod dns;
pub mod geo;
pub mod http;
pub mod rdap;
pub mod safe_browsing;
pub mod search;

/// What a check talks to. Anything but `Offline` needs the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceKind {
    Offline,
    Http,
    Dns,
    Registration,
    Geolocation,
    SearchIndex,
    ThreatIntel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub final_url: String,
    pub hops: usize,
    pub status: u16,
    pub elapsed: Duration,
}

#[async_trait]
pub trait RedirectResolver: Send + Sync {
    /// GET `url`, following redirects, and report where it landed.
    async fn fetch(&self, url: &str) -> Result<FetchReport, RadarError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    A,
    Aaaa,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsAnswer {
    Records(Vec<String>),
    NotFound,
}

#[async_trait]
pub trait DnsLookup: Send + Sync {
    async fn resolve(&self, name: &str, kind: RecordKind) -> Result<DnsAnswer, RadarError>;
}

/// Registration dates; either may be absent when the registry omits or garbles them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationRecord {
    pub created: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait RegistrationLookup: Send + Sync {
    async fn lookup(&self, domain: &str) -> Result<RegistrationRecord, RadarError>;
}

#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// ISO country code for `ip`.
    async fn country(&self, ip: IpAddr) -> Result<String, RadarError>;
}

#[async_trait]
pub trait IndexLookup: Send + Sync {
    async fn is_indexed(&self, domain: &str) -> Result<bool, RadarError>;
}

#[async_trait]
pub trait ThreatIntel: Send + Sync {
    /// Threat types matched for `url`; empty when the service knows nothing bad.
    async fn lookup(&self, url: &str) -> Result<Vec<String>, RadarError>;
}

/// One handle per collaborator, shared read-only by every check.
#[derive(Clone)]
pub struct Collaborators {
    pub http: Arc<dyn RedirectResolver>,
    pub dns: Arc<dyn DnsLookup>,
    pub registration: Arc<dyn RegistrationLookup>,
    pub geo: Arc<dyn GeoLookup>,
    pub index: Arc<dyn IndexLookup>,
    pub threat_intel: Option<Arc<dyn ThreatIntel>>,
}

impl Collaborators {
    /// Production adapters built from configuration.
    pub fn live(config: &AppConfig) -> Result<Self, RadarError> {
        let client = http_client(config)?;

        let threat_intel: Option<Arc<dyn ThreatIntel>> = match config.safe_browsing_key() {
            Some(key) => Some(Arc::new(safe_browsing::SafeBrowsingClient::new(
                client.clone(),
                &config.endpoints,
                key,
            ))),
            None => None,
        };

        Ok(Self {
            http: Arc::new(http::HttpRedirectResolver::new(
                &config.engine.user_agent,
                Duration::from_millis(config.engine.request_timeout_ms),
                config.engine.max_redirects,
            )?),
            dns: Arc::new(dns::HickoryDns::from_system_conf()?),
            registration: Arc::new(rdap::RdapClient::new(
                client.clone(),
                &config.endpoints.rdap_base,
            )),
            geo: Arc::new(geo::IpInfoClient::new(client.clone(), &config.endpoints.geo_base)),
            index: Arc::new(search::SearchIndexClient::new(
                client,
                &config.endpoints.search_base,
                &config.endpoints.search_no_results_marker,
            )),
            threat_intel,
        })
    }
}

/// Shared client for JSON collaborators; redirects use their own client.
pub fn http_client(config: &AppConfig) -> Result<reqwest::Client, RadarError> {
    reqwest::Client::builder()
        .user_agent(config.engine.user_agent.clone())
        .timeout(Duration::from_millis(config.engine.request_timeout_ms))
        .build()
        .map_err(RadarError::from)
}

/// Resolve a host name to one address, preferring A records over AAAA.
pub async fn resolve_host(dns: &dyn DnsLookup, name: &str) -> Result<IpAddr, RadarError> {
    for kind in [RecordKind::A, RecordKind::Aaaa] {
        if let DnsAnswer::Records(records) = dns.resolve(name, kind).await? {
            if let Some(ip) = records.iter().find_map(|r| r.parse::<IpAddr>().ok()) {
                return Ok(ip);
            }
        }
    }
    Err(RadarError::DataUnavailable(format!("{name} does not resolve")))
}
