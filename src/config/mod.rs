use std::{collections::BTreeMap, fs, path::Path};

use serde::Deserialize;

use crate::core::error::RadarError;

/// Names of every check the standard registry knows, in registry order.
pub const CHECK_NAMES: [&str; 20] = [
    "no_https",
    "short_domain",
    "has_suspicious_words",
    "safe_browsing",
    "many_redirects",
    "listed_in_rbl",
    "untrusted_ip_country",
    "not_indexed",
    "young_domain",
    "expiring_domain",
    "ip_host",
    "has_at_symbol",
    "has_double_slash",
    "hyphen_in_domain",
    "many_subdomains",
    "many_query_params",
    "phishing_query_params",
    "nonstandard_port",
    "url_shortener",
    "slow_response",
];

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub lists: WordLists,
    #[serde(default)]
    pub checks: ChecksConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_check_timeout_ms")]
    pub check_timeout_ms: u64,
    #[serde(default = "default_canonicalize_timeout_ms")]
    pub canonicalize_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_short_domain_len")]
    pub short_domain_len: usize,
    #[serde(default = "default_max_subdomains")]
    pub max_subdomains: usize,
    #[serde(default = "default_max_query_params")]
    pub max_query_params: usize,
    #[serde(default = "default_max_redirect_hops")]
    pub max_redirect_hops: usize,
    #[serde(default = "default_slow_response_ms")]
    pub slow_response_ms: u64,
    #[serde(default = "default_min_domain_age_days")]
    pub min_domain_age_days: i64,
    #[serde(default = "default_min_days_to_expiry")]
    pub min_days_to_expiry: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WordLists {
    #[serde(default = "default_suspicious_words")]
    pub suspicious_words: Vec<String>,
    #[serde(default = "default_phishing_params")]
    pub phishing_params: Vec<String>,
    #[serde(default = "default_shorteners")]
    pub shorteners: Vec<String>,
    #[serde(default = "default_rbl_servers")]
    pub rbl_servers: Vec<String>,
    /// When non-empty, any country outside this list is suspicious.
    #[serde(default)]
    pub trusted_countries: Vec<String>,
    #[serde(default)]
    pub untrusted_countries: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ChecksConfig {
    #[serde(default)]
    pub disabled: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndeterminatePolicy {
    /// Indeterminate outcomes contribute nothing to the score.
    #[default]
    Ignore,
    /// Indeterminate outcomes count as positives.
    Suspicious,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Per-check weight overrides; unlisted checks use their own default.
    #[serde(default)]
    pub weights: BTreeMap<String, u32>,
    #[serde(default = "default_required")]
    pub required: Vec<String>,
    #[serde(default = "default_validity_threshold")]
    pub validity_threshold: f64,
    #[serde(default = "default_suspicious_score")]
    pub suspicious_score: u32,
    #[serde(default = "default_malicious_score")]
    pub malicious_score: u32,
    #[serde(default)]
    pub indeterminate: IndeterminatePolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_rdap_base")]
    pub rdap_base: String,
    #[serde(default = "default_geo_base")]
    pub geo_base: String,
    #[serde(default = "default_search_base")]
    pub search_base: String,
    #[serde(default = "default_no_results_marker")]
    pub search_no_results_marker: String,
    #[serde(default = "default_safe_browsing_url")]
    pub safe_browsing_url: String,
    #[serde(default = "default_safe_browsing_key_env")]
    pub safe_browsing_key_env: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_client_version")]
    pub client_version: String,
    #[serde(default = "default_threat_types")]
    pub threat_types: Vec<String>,
    #[serde(default = "default_platform_types")]
    pub platform_types: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    #[default]
    Threshold,
    Model,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub kind: ClassifierKind,
    #[serde(default)]
    pub model_endpoint: Option<String>,
}

pub fn load_config(path: Option<&str>) -> Result<AppConfig, RadarError> {
    let default_path = Path::new("config/url-radar.toml");
    let path = path.map(Path::new).unwrap_or(default_path);

    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| RadarError::Config(e.to_string()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig, RadarError> {
    toml::from_str(content).map_err(|e| RadarError::Config(e.to_string()))
}

impl AppConfig {
    pub fn check_enabled(&self, name: &str) -> bool {
        !self
            .checks
            .disabled
            .iter()
            .any(|d| d == name)
    }

    /// Read the threat-intel credential from the environment.
    pub fn safe_browsing_key(&self) -> Option<String> {
        std::env::var(&self.endpoints.safe_browsing_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    /// Start-up validation. Any error here is fatal.
    pub fn validate(&self) -> Result<(), RadarError> {
        if self.engine.max_concurrency == 0 {
            return Err(RadarError::Config(
                "engine.max_concurrency must be at least 1".into(),
            ));
        }
        let threshold = self.aggregator.validity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(RadarError::Config(format!(
                "aggregator.validity_threshold must be within [0, 1], got {threshold}"
            )));
        }
        if self.aggregator.malicious_score < self.aggregator.suspicious_score {
            return Err(RadarError::Config(
                "aggregator.malicious_score must not be below suspicious_score".into(),
            ));
        }
        for name in self
            .aggregator
            .required
            .iter()
            .chain(self.aggregator.weights.keys())
            .chain(self.checks.disabled.iter())
        {
            // Names are matched exactly everywhere they are used.
            if !CHECK_NAMES.contains(&name.as_str()) {
                return Err(RadarError::Config(format!("unknown check: {name}")));
            }
        }
        if self.endpoints.search_no_results_marker.trim().is_empty() {
            return Err(RadarError::Config(
                "endpoints.search_no_results_marker must not be empty".into(),
            ));
        }
        if self.check_enabled("safe_browsing") && self.safe_browsing_key().is_none() {
            return Err(RadarError::Config(format!(
                "safe_browsing is enabled but {} is not set",
                self.endpoints.safe_browsing_key_env
            )));
        }
        if self.classifier.kind == ClassifierKind::Model && self.classifier.model_endpoint.is_none()
        {
            return Err(RadarError::Config(
                "classifier.kind = \"model\" requires classifier.model_endpoint".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            check_timeout_ms: default_check_timeout_ms(),
            canonicalize_timeout_ms: default_canonicalize_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_concurrency: default_max_concurrency(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            short_domain_len: default_short_domain_len(),
            max_subdomains: default_max_subdomains(),
            max_query_params: default_max_query_params(),
            max_redirect_hops: default_max_redirect_hops(),
            slow_response_ms: default_slow_response_ms(),
            min_domain_age_days: default_min_domain_age_days(),
            min_days_to_expiry: default_min_days_to_expiry(),
        }
    }
}

impl Default for WordLists {
    fn default() -> Self {
        Self {
            suspicious_words: default_suspicious_words(),
            phishing_params: default_phishing_params(),
            shorteners: default_shorteners(),
            rbl_servers: default_rbl_servers(),
            trusted_countries: vec![],
            untrusted_countries: vec![],
        }
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            weights: BTreeMap::new(),
            required: default_required(),
            validity_threshold: default_validity_threshold(),
            suspicious_score: default_suspicious_score(),
            malicious_score: default_malicious_score(),
            indeterminate: IndeterminatePolicy::Ignore,
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            rdap_base: default_rdap_base(),
            geo_base: default_geo_base(),
            search_base: default_search_base(),
            search_no_results_marker: default_no_results_marker(),
            safe_browsing_url: default_safe_browsing_url(),
            safe_browsing_key_env: default_safe_browsing_key_env(),
            client_id: default_client_id(),
            client_version: default_client_version(),
            threat_types: default_threat_types(),
            platform_types: default_platform_types(),
        }
    }
}

fn default_check_timeout_ms() -> u64 {
    15_000
}

fn default_canonicalize_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_max_concurrency() -> usize {
    8
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    format!("url-radar/{}", env!("CARGO_PKG_VERSION"))
}

fn default_short_domain_len() -> usize {
    3
}

fn default_max_subdomains() -> usize {
    3
}

fn default_max_query_params() -> usize {
    5
}

fn default_max_redirect_hops() -> usize {
    3
}

fn default_slow_response_ms() -> u64 {
    1_000
}

fn default_min_domain_age_days() -> i64 {
    180
}

fn default_min_days_to_expiry() -> i64 {
    90
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_suspicious_words() -> Vec<String> {
    strings(&[
        "login", "secure", "account", "update", "bank", "verify", "password", "confirm",
        "signin", "urgent", "alert", "bonus", "free", "prize", "winner", "claim", "webscr",
        "paypal", "ebay", "support", "service", "limited", "billing", "gift", "security",
        "reset", "wallet", "crypto",
    ])
}

fn default_phishing_params() -> Vec<String> {
    strings(&["token", "session", "auth", "password", "login", "verify"])
}

fn default_shorteners() -> Vec<String> {
    strings(&[
        "bit.ly",
        "tinyurl.com",
        "goo.gl",
        "ow.ly",
        "t.co",
        "is.gd",
        "buff.ly",
        "adf.ly",
    ])
}

fn default_rbl_servers() -> Vec<String> {
    strings(&["zen.spamhaus.org", "bl.spamcop.net"])
}

fn default_required() -> Vec<String> {
    strings(&[
        "safe_browsing",
        "many_redirects",
        "listed_in_rbl",
        "young_domain",
        "expiring_domain",
        "slow_response",
    ])
}

fn default_validity_threshold() -> f64 {
    0.7
}

fn default_suspicious_score() -> u32 {
    1
}

fn default_malicious_score() -> u32 {
    2
}

fn default_rdap_base() -> String {
    "https://rdap.org".to_string()
}

fn default_geo_base() -> String {
    "https://ipinfo.io".to_string()
}

fn default_search_base() -> String {
    "https://www.google.com/search".to_string()
}

fn default_no_results_marker() -> String {
    "did not match any documents".to_string()
}

fn default_safe_browsing_url() -> String {
    "https://safebrowsing.googleapis.com/v4/threatMatches:find".to_string()
}

fn default_safe_browsing_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_client_id() -> String {
    "url-radar".to_string()
}

fn default_client_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_threat_types() -> Vec<String> {
    strings(&[
        "MALWARE",
        "SOCIAL_ENGINEERING",
        "UNWANTED_SOFTWARE",
        "POTENTIALLY_HARMFUL_APPLICATION",
    ])
}

fn default_platform_types() -> Vec<String> {
    strings(&["ANY_PLATFORM"])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.checks.disabled = vec!["safe_browsing".into()];
        cfg
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = parse_config(
            r#"
            [thresholds]
            max_subdomains = 5

            [aggregator]
            validity_threshold = 0.5
            indeterminate = "suspicious"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.thresholds.max_subdomains, 5);
        assert_eq!(cfg.thresholds.short_domain_len, 3);
        assert_eq!(cfg.aggregator.indeterminate, IndeterminatePolicy::Suspicious);
        assert_eq!(cfg.lists.suspicious_words.len(), 28);
        assert_eq!(cfg.aggregator.required.len(), 6);
    }

    #[test]
    fn example_file_parses_and_validates() {
        let mut cfg = parse_config(include_str!("../../config/url-radar.example.toml")).unwrap();
        assert_eq!(cfg.aggregator.weights.get("safe_browsing"), Some(&2));
        assert_eq!(cfg.engine.max_redirects, 10);
        cfg.checks.disabled.push("safe_browsing".into());
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_unknown_check_names() {
        let mut cfg = offline_config();
        cfg.aggregator.required.push("bogus".into());
        assert!(matches!(cfg.validate(), Err(RadarError::Config(_))));
    }

    #[test]
    fn check_names_are_case_sensitive() {
        let mut cfg = offline_config();
        cfg.aggregator.required = vec!["No_Https".into()];
        assert!(cfg.validate().is_err());

        let mut cfg = offline_config();
        cfg.checks.disabled.push("NOT_INDEXED".into());
        assert!(cfg.validate().is_err());
        assert!(cfg.check_enabled("not_indexed"));
    }

    #[test]
    fn rejects_empty_search_marker() {
        let mut cfg = offline_config();
        cfg.endpoints.search_no_results_marker = "  ".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("search_no_results_marker"));
    }

    #[test]
    fn rejects_out_of_range_validity_threshold() {
        let mut cfg = offline_config();
        cfg.aggregator.validity_threshold = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_threat_intel_key_is_fatal() {
        let mut cfg = AppConfig::default();
        cfg.endpoints.safe_browsing_key_env = "URL_RADAR_TEST_UNSET_KEY".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("URL_RADAR_TEST_UNSET_KEY"));
    }

    #[test]
    fn model_classifier_needs_endpoint() {
        let mut cfg = offline_config();
        cfg.classifier.kind = ClassifierKind::Model;
        assert!(cfg.validate().is_err());
        cfg.classifier.model_endpoint = Some("http://localhost:9000/predict".into());
        assert!(cfg.validate().is_ok());
    }
}
