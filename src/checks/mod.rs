use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::core::canonical::CanonicalUrl;
use crate::core::error::RadarError;
use crate::core::signal::CheckOutcome;
use crate::sources::{Collaborators, SourceKind};

pub mod lexical;
pub mod network;
pub mod provenance;

/// One independent signal evaluated against a canonical URL.
#[async_trait]
pub trait Check: Send + Sync {
    /// Stable identifier; also the feature-vector key.
    fn name(&self) -> &'static str;

    /// Canned reason shown when the check fires without evidence.
    fn reason(&self) -> &'static str;

    fn sources(&self) -> Vec<SourceKind> {
        vec![SourceKind::Offline]
    }

    fn weight(&self) -> u32 {
        1
    }

    /// Errors are reported as `Indeterminate` by the engine, never as `Negative`.
    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError>;

    fn needs_network(&self) -> bool {
        self.sources().iter().any(|s| *s != SourceKind::Offline)
    }
}

/// Ordered set of checks. Order drives reason ordering and the feature schema.
#[derive(Clone, Default)]
pub struct Registry {
    checks: Vec<Arc<dyn Check>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, check: Arc<dyn Check>) -> Result<(), RadarError> {
        if self.get(check.name()).is_some() {
            return Err(RadarError::Config(format!(
                "check registered twice: {}",
                check.name()
            )));
        }
        self.checks.push(check);
        Ok(())
    }

    pub fn with(mut self, check: impl Check + 'static) -> Result<Self, RadarError> {
        self.register(Arc::new(check))?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Check>> {
        self.checks.iter().find(|c| c.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Check>> {
        self.checks.iter()
    }

    /// Feature-vector keys, in registration order.
    pub fn schema(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Every standard check enabled in `config`, wired to `collab`.
    pub fn standard(config: &AppConfig, collab: &Collaborators) -> Result<Self, RadarError> {
        use lexical::*;
        use network::*;
        use provenance::*;

        let t = &config.thresholds;
        let lists = &config.lists;
        let mut candidates: Vec<Arc<dyn Check>> = vec![
            Arc::new(InsecureTransport),
            Arc::new(ShortDomain::new(t.short_domain_len)),
            Arc::new(SuspiciousWords::new(&lists.suspicious_words)?),
        ];
        if config.check_enabled("safe_browsing") {
            let intel = collab.threat_intel.clone().ok_or_else(|| {
                RadarError::Config("safe_browsing is enabled but no threat-intel client".into())
            })?;
            candidates.push(Arc::new(SafeBrowsing::new(intel)));
        }
        let rest: Vec<Arc<dyn Check>> = vec![
            Arc::new(ManyRedirects::new(collab.http.clone(), t.max_redirect_hops)),
            Arc::new(ListedInRbl::new(collab.dns.clone(), lists.rbl_servers.clone())),
            Arc::new(UntrustedCountry::new(
                collab.dns.clone(),
                collab.geo.clone(),
                &lists.trusted_countries,
                &lists.untrusted_countries,
            )),
            Arc::new(NotIndexed::new(collab.index.clone())),
            Arc::new(YoungDomain::new(
                collab.registration.clone(),
                t.min_domain_age_days,
            )),
            Arc::new(ExpiringDomain::new(
                collab.registration.clone(),
                t.min_days_to_expiry,
            )),
            Arc::new(IpHost),
            Arc::new(AtSymbol),
            Arc::new(DoubleSlash),
            Arc::new(HyphenInDomain),
            Arc::new(ManySubdomains::new(t.max_subdomains)),
            Arc::new(ManyQueryParams::new(t.max_query_params)),
            Arc::new(PhishingQueryParams::new(&lists.phishing_params)),
            Arc::new(NonstandardPort),
            Arc::new(UrlShortener::new(&lists.shorteners)),
            Arc::new(SlowResponse::new(collab.http.clone(), t.slow_response_ms)),
        ];
        candidates.extend(rest);

        let mut registry = Registry::new();
        for check in candidates {
            if config.check_enabled(check.name()) {
                registry.register(check)?;
            }
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::lexical::{HyphenInDomain, InsecureTransport};
    use super::*;

    #[test]
    fn duplicate_names_are_rejected() {
        let registry = Registry::new().with(InsecureTransport).unwrap();
        assert!(matches!(
            registry.with(InsecureTransport),
            Err(RadarError::Config(_))
        ));
    }

    #[test]
    fn schema_follows_registration_order() {
        let registry = Registry::new()
            .with(HyphenInDomain)
            .unwrap()
            .with(InsecureTransport)
            .unwrap();
        assert_eq!(registry.schema(), vec!["hyphen_in_domain", "no_https"]);
        assert!(!registry.get("no_https").unwrap().needs_network());
    }
}
