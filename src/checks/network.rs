//! Checks that call out to HTTP, DNS, geolocation, search or threat-intel services.

use std::{net::IpAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::debug;

use crate::checks::Check;
use crate::core::canonical::{with_default_scheme, CanonicalUrl};
use crate::core::error::RadarError;
use crate::core::signal::CheckOutcome;
use crate::sources::{
    resolve_host, DnsAnswer, DnsLookup, GeoLookup, IndexLookup, RecordKind, RedirectResolver,
    SourceKind, ThreatIntel,
};

pub struct SafeBrowsing {
    intel: Arc<dyn ThreatIntel>,
}

impl SafeBrowsing {
    pub fn new(intel: Arc<dyn ThreatIntel>) -> Self {
        Self { intel }
    }
}

#[async_trait]
impl Check for SafeBrowsing {
    fn name(&self) -> &'static str {
        "safe_browsing"
    }

    fn reason(&self) -> &'static str {
        "Flagged by Safe Browsing"
    }

    fn sources(&self) -> Vec<SourceKind> {
        vec![SourceKind::ThreatIntel]
    }

    fn weight(&self) -> u32 {
        2
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        let mut threats = self.intel.lookup(&url.final_url).await?;
        if threats.is_empty() {
            return Ok(CheckOutcome::Negative);
        }
        threats.sort();
        threats.dedup();
        Ok(CheckOutcome::positive_with(format!(
            "Flagged by Safe Browsing as: {}",
            threats.join(", ")
        )))
    }
}

/// Counts redirect hops starting from the URL as typed.
pub struct ManyRedirects {
    http: Arc<dyn RedirectResolver>,
    max_hops: usize,
}

impl ManyRedirects {
    pub fn new(http: Arc<dyn RedirectResolver>, max_hops: usize) -> Self {
        Self { http, max_hops }
    }
}

#[async_trait]
impl Check for ManyRedirects {
    fn name(&self) -> &'static str {
        "many_redirects"
    }

    fn reason(&self) -> &'static str {
        "Too many redirects"
    }

    fn sources(&self) -> Vec<SourceKind> {
        vec![SourceKind::Http]
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        let report = self.http.fetch(&with_default_scheme(&url.input)).await?;
        if report.hops > self.max_hops {
            Ok(CheckOutcome::positive_with(format!(
                "Too many redirects ({})",
                report.hops
            )))
        } else {
            Ok(CheckOutcome::Negative)
        }
    }
}

pub struct SlowResponse {
    http: Arc<dyn RedirectResolver>,
    limit: Duration,
}

impl SlowResponse {
    pub fn new(http: Arc<dyn RedirectResolver>, limit_ms: u64) -> Self {
        Self {
            http,
            limit: Duration::from_millis(limit_ms),
        }
    }
}

#[async_trait]
impl Check for SlowResponse {
    fn name(&self) -> &'static str {
        "slow_response"
    }

    fn reason(&self) -> &'static str {
        "Site responds slowly"
    }

    fn sources(&self) -> Vec<SourceKind> {
        vec![SourceKind::Http]
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        let report = self.http.fetch(&url.final_url).await?;
        if report.elapsed > self.limit {
            Ok(CheckOutcome::positive_with(format!(
                "Site responds slowly ({} ms)",
                report.elapsed.as_millis()
            )))
        } else {
            Ok(CheckOutcome::Negative)
        }
    }
}

/// DNS blocklist lookup of the domain's IPv4 address.
pub struct ListedInRbl {
    dns: Arc<dyn DnsLookup>,
    servers: Vec<String>,
}

impl ListedInRbl {
    pub fn new(dns: Arc<dyn DnsLookup>, servers: Vec<String>) -> Self {
        Self { dns, servers }
    }
}

#[async_trait]
impl Check for ListedInRbl {
    fn name(&self) -> &'static str {
        "listed_in_rbl"
    }

    fn reason(&self) -> &'static str {
        "Listed in a DNS blocklist"
    }

    fn sources(&self) -> Vec<SourceKind> {
        vec![SourceKind::Dns]
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        let ip = host_address(self.dns.as_ref(), url).await?;
        let IpAddr::V4(v4) = ip else {
            return Err(RadarError::DataUnavailable(format!(
                "blocklists need an IPv4 address, got {ip}"
            )));
        };
        let [a, b, c, d] = v4.octets();
        let reversed = format!("{d}.{c}.{b}.{a}");

        let mut failures = Vec::new();
        for server in &self.servers {
            let name = format!("{reversed}.{server}");
            match self.dns.resolve(&name, RecordKind::A).await {
                Ok(DnsAnswer::Records(_)) => {
                    return Ok(CheckOutcome::positive_with(format!(
                        "Listed in DNS blocklist {server}"
                    )));
                }
                Ok(DnsAnswer::NotFound) => {}
                Err(err) => {
                    debug!("blocklist {server} lookup failed: {err}");
                    failures.push(format!("{server}: {err}"));
                }
            }
        }
        // A silent server is not a clean answer.
        if failures.is_empty() {
            Ok(CheckOutcome::Negative)
        } else {
            Err(RadarError::Transport(failures.join("; ")))
        }
    }
}

pub struct UntrustedCountry {
    dns: Arc<dyn DnsLookup>,
    geo: Arc<dyn GeoLookup>,
    trusted: Vec<String>,
    untrusted: Vec<String>,
}

impl UntrustedCountry {
    pub fn new(
        dns: Arc<dyn DnsLookup>,
        geo: Arc<dyn GeoLookup>,
        trusted: &[String],
        untrusted: &[String],
    ) -> Self {
        let upper = |list: &[String]| list.iter().map(|c| c.trim().to_uppercase()).collect();
        Self {
            dns,
            geo,
            trusted: upper(trusted),
            untrusted: upper(untrusted),
        }
    }

    fn is_untrusted(&self, country: &str) -> bool {
        if self.untrusted.iter().any(|c| c == country) {
            return true;
        }
        !self.trusted.is_empty() && !self.trusted.iter().any(|c| c == country)
    }
}

#[async_trait]
impl Check for UntrustedCountry {
    fn name(&self) -> &'static str {
        "untrusted_ip_country"
    }

    fn reason(&self) -> &'static str {
        "Hosted in an untrusted country"
    }

    fn sources(&self) -> Vec<SourceKind> {
        vec![SourceKind::Dns, SourceKind::Geolocation]
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        let ip = host_address(self.dns.as_ref(), url).await?;
        let country = self.geo.country(ip).await?;
        if self.is_untrusted(&country) {
            Ok(CheckOutcome::positive_with(format!(
                "Hosted in untrusted country {country}"
            )))
        } else {
            Ok(CheckOutcome::Negative)
        }
    }
}

pub struct NotIndexed {
    index: Arc<dyn IndexLookup>,
}

impl NotIndexed {
    pub fn new(index: Arc<dyn IndexLookup>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Check for NotIndexed {
    fn name(&self) -> &'static str {
        "not_indexed"
    }

    fn reason(&self) -> &'static str {
        "Not indexed by search engines"
    }

    fn sources(&self) -> Vec<SourceKind> {
        vec![SourceKind::SearchIndex]
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        let indexed = self.index.is_indexed(&url.registered_domain).await?;
        Ok(CheckOutcome::flag(!indexed))
    }
}

/// The literal IP when the host is one, otherwise the domain's first A (then AAAA) record.
async fn host_address(dns: &dyn DnsLookup, url: &CanonicalUrl) -> Result<IpAddr, RadarError> {
    if let Some(ip) = url.host_ip() {
        return Ok(ip);
    }
    if url.registered_domain.is_empty() {
        return Err(RadarError::DataUnavailable("no domain in url".into()));
    }
    resolve_host(dns, &url.registered_domain).await
}
