//! Checks that only look at the URL text.

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};

use crate::checks::Check;
use crate::core::canonical::{default_port, with_default_scheme, CanonicalUrl};
use crate::core::error::RadarError;
use crate::core::signal::CheckOutcome;

pub struct InsecureTransport;

#[async_trait]
impl Check for InsecureTransport {
    fn name(&self) -> &'static str {
        "no_https"
    }

    fn reason(&self) -> &'static str {
        "Does not use HTTPS"
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        Ok(CheckOutcome::flag(!matches!(
            url.scheme.as_str(),
            "https" | "wss"
        )))
    }
}

pub struct ShortDomain {
    max_len: usize,
}

impl ShortDomain {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }
}

#[async_trait]
impl Check for ShortDomain {
    fn name(&self) -> &'static str {
        "short_domain"
    }

    fn reason(&self) -> &'static str {
        "Domain name is very short"
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        if url.domain_label.is_empty() {
            return Err(RadarError::DataUnavailable("no domain in url".into()));
        }
        Ok(CheckOutcome::flag(
            url.domain_label.chars().count() <= self.max_len,
        ))
    }
}

/// Case-insensitive substring match against the configured word list.
pub struct SuspiciousWords {
    matcher: Option<Regex>,
}

impl SuspiciousWords {
    pub fn new(words: &[String]) -> Result<Self, RadarError> {
        let alternatives: Vec<String> = words
            .iter()
            .map(|w| w.trim())
            .filter(|w| !w.is_empty())
            .map(regex::escape)
            .collect();
        if alternatives.is_empty() {
            return Ok(Self { matcher: None });
        }
        let matcher = RegexBuilder::new(&alternatives.join("|"))
            .case_insensitive(true)
            .build()
            .map_err(|e| RadarError::Config(format!("suspicious word list: {e}")))?;
        Ok(Self {
            matcher: Some(matcher),
        })
    }
}

#[async_trait]
impl Check for SuspiciousWords {
    fn name(&self) -> &'static str {
        "has_suspicious_words"
    }

    fn reason(&self) -> &'static str {
        "Contains suspicious words"
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        let Some(matcher) = &self.matcher else {
            return Ok(CheckOutcome::Negative);
        };
        let haystack = format!("{} {}", url.input, url.final_url).to_lowercase();
        let mut found: Vec<&str> = matcher.find_iter(&haystack).map(|m| m.as_str()).collect();
        found.sort_unstable();
        found.dedup();
        if found.is_empty() {
            Ok(CheckOutcome::Negative)
        } else {
            Ok(CheckOutcome::positive_with(format!(
                "Contains suspicious words: {}",
                found.join(", ")
            )))
        }
    }
}

pub struct IpHost;

#[async_trait]
impl Check for IpHost {
    fn name(&self) -> &'static str {
        "ip_host"
    }

    fn reason(&self) -> &'static str {
        "Host is a literal IP address"
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        Ok(CheckOutcome::flag(url.host_is_ip))
    }
}

pub struct AtSymbol;

#[async_trait]
impl Check for AtSymbol {
    fn name(&self) -> &'static str {
        "has_at_symbol"
    }

    fn reason(&self) -> &'static str {
        "URL contains an @ symbol"
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        Ok(CheckOutcome::flag(
            url.input.contains('@') || url.final_url.contains('@'),
        ))
    }
}

pub struct DoubleSlash;

#[async_trait]
impl Check for DoubleSlash {
    fn name(&self) -> &'static str {
        "has_double_slash"
    }

    fn reason(&self) -> &'static str {
        "URL contains // after the scheme"
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        let target = with_default_scheme(&url.input);
        let after_scheme = target.replacen("://", "", 1);
        Ok(CheckOutcome::flag(after_scheme.contains("//")))
    }
}

pub struct HyphenInDomain;

#[async_trait]
impl Check for HyphenInDomain {
    fn name(&self) -> &'static str {
        "hyphen_in_domain"
    }

    fn reason(&self) -> &'static str {
        "Domain name contains a hyphen"
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        Ok(CheckOutcome::flag(url.domain_label.contains('-')))
    }
}

pub struct ManySubdomains {
    max: usize,
}

impl ManySubdomains {
    pub fn new(max: usize) -> Self {
        Self { max }
    }
}

#[async_trait]
impl Check for ManySubdomains {
    fn name(&self) -> &'static str {
        "many_subdomains"
    }

    fn reason(&self) -> &'static str {
        "Too many subdomains"
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        let count = url.subdomain_count();
        if count > self.max {
            Ok(CheckOutcome::positive_with(format!(
                "Too many subdomains ({count})"
            )))
        } else {
            Ok(CheckOutcome::Negative)
        }
    }
}

pub struct ManyQueryParams {
    max: usize,
}

impl ManyQueryParams {
    pub fn new(max: usize) -> Self {
        Self { max }
    }
}

#[async_trait]
impl Check for ManyQueryParams {
    fn name(&self) -> &'static str {
        "many_query_params"
    }

    fn reason(&self) -> &'static str {
        "Too many query parameters"
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        Ok(CheckOutcome::flag(url.query_params.len() > self.max))
    }
}

pub struct PhishingQueryParams {
    params: Vec<String>,
}

impl PhishingQueryParams {
    pub fn new(params: &[String]) -> Self {
        Self {
            params: params.iter().map(|p| p.to_lowercase()).collect(),
        }
    }
}

#[async_trait]
impl Check for PhishingQueryParams {
    fn name(&self) -> &'static str {
        "phishing_query_params"
    }

    fn reason(&self) -> &'static str {
        "Query string carries phishing-associated parameters"
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        let hits: Vec<&str> = url
            .query_params
            .keys()
            .filter(|k| self.params.contains(&k.to_lowercase()))
            .map(|k| k.as_str())
            .collect();
        if hits.is_empty() {
            Ok(CheckOutcome::Negative)
        } else {
            Ok(CheckOutcome::positive_with(format!(
                "Phishing-associated query parameters: {}",
                hits.join(", ")
            )))
        }
    }
}

pub struct NonstandardPort;

#[async_trait]
impl Check for NonstandardPort {
    fn name(&self) -> &'static str {
        "nonstandard_port"
    }

    fn reason(&self) -> &'static str {
        "Uses a non-standard port"
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        match (url.port, default_port(&url.scheme)) {
            (Some(port), Some(expected)) if port != expected => Ok(CheckOutcome::positive_with(
                format!("Uses non-standard port {port} for {}", url.scheme),
            )),
            _ => Ok(CheckOutcome::Negative),
        }
    }
}

pub struct UrlShortener {
    domains: Vec<String>,
}

impl UrlShortener {
    pub fn new(domains: &[String]) -> Self {
        Self {
            domains: domains.iter().map(|d| d.to_lowercase()).collect(),
        }
    }
}

#[async_trait]
impl Check for UrlShortener {
    fn name(&self) -> &'static str {
        "url_shortener"
    }

    fn reason(&self) -> &'static str {
        "Uses a URL shortener"
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        // The canonical host is post-redirect; the shortener is the one typed in.
        let typed = CanonicalUrl::offline(&url.input);
        let hit = [&typed.registered_domain, &url.registered_domain]
            .iter()
            .any(|d| self.domains.iter().any(|s| s == *d));
        Ok(CheckOutcome::flag(hit))
    }
}
