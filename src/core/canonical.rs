//! Redirect resolution and syntactic decomposition of input URLs.

use std::{
    collections::{BTreeMap, BTreeSet},
    net::IpAddr,
    sync::Arc,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::{Host, Url};

use crate::core::error::RadarError;
use crate::sources::RedirectResolver;

/// Decomposed, redirect-resolved view of a URL. Read-only once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalUrl {
    /// Raw input exactly as received.
    pub input: String,
    pub scheme: String,
    pub host: String,
    pub host_is_ip: bool,
    /// Registrable domain, e.g. `example.co.uk`.
    pub registered_domain: String,
    /// Leftmost label of the registrable domain, e.g. `example`.
    pub domain_label: String,
    pub subdomain: String,
    /// Explicit non-default port, if any.
    pub port: Option<u16>,
    pub path: String,
    pub query_params: BTreeMap<String, BTreeSet<String>>,
    pub final_url: String,
    /// Whether `final_url` came from a successful fetch.
    pub resolved: bool,
}

impl CanonicalUrl {
    /// Decompose without touching the network.
    pub fn offline(raw: &str) -> Self {
        let target = with_default_scheme(raw);
        Self::decompose(raw, &target, false)
    }

    pub fn decompose(input: &str, final_url: &str, resolved: bool) -> Self {
        let parts = match Url::parse(final_url) {
            Ok(url) => parts_from_url(&url),
            Err(err) => {
                debug!("url parser rejected {final_url}: {err}; splitting by hand");
                parts_by_hand(final_url)
            }
        };
        let (registered_domain, domain_label, subdomain) = if parts.host_is_ip {
            (parts.host.clone(), parts.host.clone(), String::new())
        } else {
            split_domain(&parts.host)
        };
        Self {
            input: input.to_string(),
            scheme: parts.scheme,
            host: parts.host,
            host_is_ip: parts.host_is_ip,
            registered_domain,
            domain_label,
            subdomain,
            port: parts.port,
            path: parts.path,
            query_params: parts.query,
            final_url: final_url.to_string(),
            resolved,
        }
    }

    pub fn subdomain_count(&self) -> usize {
        if self.subdomain.is_empty() {
            0
        } else {
            self.subdomain.split('.').count()
        }
    }

    pub fn host_ip(&self) -> Option<IpAddr> {
        if !self.host_is_ip {
            return None;
        }
        self.host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse()
            .ok()
    }
}

/// Resolves raw input to a [`CanonicalUrl`]; never fails.
pub struct Canonicalizer {
    resolver: Option<Arc<dyn RedirectResolver>>,
    timeout: Duration,
}

impl Canonicalizer {
    pub fn new(resolver: Arc<dyn RedirectResolver>, timeout: Duration) -> Self {
        Self {
            resolver: Some(resolver),
            timeout,
        }
    }

    /// Syntactic decomposition only.
    pub fn offline() -> Self {
        Self {
            resolver: None,
            timeout: Duration::ZERO,
        }
    }

    pub async fn canonicalize(&self, raw: &str) -> CanonicalUrl {
        let target = with_default_scheme(raw);
        let Some(resolver) = &self.resolver else {
            return CanonicalUrl::decompose(raw, &target, false);
        };

        let fetched = match tokio::time::timeout(self.timeout, resolver.fetch(&target)).await {
            Ok(result) => result,
            Err(_) => Err(RadarError::Timeout),
        };
        match fetched {
            Ok(report) => {
                debug!(
                    "resolved {} -> {} in {} hops",
                    target, report.final_url, report.hops
                );
                CanonicalUrl::decompose(raw, &report.final_url, true)
            }
            Err(err) => {
                warn!("could not resolve {target}: {err}; using input as-is");
                CanonicalUrl::decompose(raw, &target, false)
            }
        }
    }
}

/// Prefix `http://` when the input carries no scheme.
pub fn with_default_scheme(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

struct Parts {
    scheme: String,
    host: String,
    host_is_ip: bool,
    port: Option<u16>,
    path: String,
    query: BTreeMap<String, BTreeSet<String>>,
}

fn parts_from_url(url: &Url) -> Parts {
    let (host, host_is_ip) = match url.host() {
        Some(Host::Domain(d)) => (d.trim_end_matches('.').to_lowercase(), false),
        Some(Host::Ipv4(ip)) => (ip.to_string(), true),
        Some(Host::Ipv6(ip)) => (ip.to_string(), true),
        None => (String::new(), false),
    };
    let mut query: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (key, value) in url.query_pairs() {
        query
            .entry(key.into_owned())
            .or_default()
            .insert(value.into_owned());
    }
    Parts {
        scheme: url.scheme().to_lowercase(),
        host,
        host_is_ip,
        port: url.port(),
        path: url.path().to_string(),
        query,
    }
}

fn parts_by_hand(target: &str) -> Parts {
    let (scheme, rest) = match target.split_once("://") {
        Some((s, r)) => (s.to_lowercase(), r),
        None => ("http".to_string(), target),
    };
    let authority_end = rest.find(&['/', '?', '#'][..]).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);
    let hostport = authority.rsplit('@').next().unwrap_or(authority);

    let (host, port) = if let Some(stripped) = hostport.strip_prefix('[') {
        match stripped.split_once(']') {
            Some((h, p)) => (h.to_string(), p.strip_prefix(':').and_then(|p| p.parse().ok())),
            None => (stripped.to_string(), None),
        }
    } else {
        match hostport.rsplit_once(':') {
            Some((h, p)) if p.chars().all(|c| c.is_ascii_digit()) && !p.is_empty() => {
                (h.to_string(), p.parse().ok())
            }
            _ => (hostport.to_string(), None),
        }
    };
    let host = host.trim_end_matches('.').to_lowercase();
    let host_is_ip = host.parse::<IpAddr>().is_ok();
    let port = port.filter(|p| Some(*p) != default_port(&scheme));

    let tail = tail.split('#').next().unwrap_or("");
    let (path, query_str) = match tail.split_once('?') {
        Some((p, q)) => (p, q),
        None => (tail, ""),
    };
    let mut query: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for pair in query_str.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        query
            .entry(key.to_string())
            .or_default()
            .insert(value.to_string());
    }

    Parts {
        scheme,
        host,
        host_is_ip,
        port,
        path: if path.is_empty() { "/".to_string() } else { path.to_string() },
        query,
    }
}

pub fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        "ftp" => Some(21),
        _ => None,
    }
}

/// Split a host into (registered domain, domain label, subdomain).
fn split_domain(host: &str) -> (String, String, String) {
    if host.is_empty() {
        return (String::new(), String::new(), String::new());
    }
    let registered = psl::domain_str(host).unwrap_or(host).to_string();
    let label = registered.split('.').next().unwrap_or("").to_string();
    let subdomain = host
        .strip_suffix(registered.as_str())
        .map(|s| s.trim_end_matches('.').to_string())
        .unwrap_or_default();
    (registered, label, subdomain)
}
