use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use url_radar::config::Endpoints;
use url_radar::core::error::RadarError;
use url_radar::core::signal::{FeatureVector, NamedResultSet};
use url_radar::pipeline::classifier::{HttpModelBackend, ModelBackend};
use url_radar::sources::http::HttpRedirectResolver;
use url_radar::sources::rdap::RdapClient;
use url_radar::sources::safe_browsing::SafeBrowsingClient;
use url_radar::sources::search::SearchIndexClient;
use url_radar::sources::{IndexLookup, RedirectResolver, RegistrationLookup, ThreatIntel};

fn resolver(max_hops: usize) -> HttpRedirectResolver {
    HttpRedirectResolver::new("url-radar-test", Duration::from_secs(2), max_hops).unwrap()
}

#[tokio::test]
async fn redirect_resolver_counts_hops() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/start");
        then.status(302).header("Location", "/middle");
    });
    server.mock(|when, then| {
        when.method(GET).path("/middle");
        then.status(301).header("Location", "/end");
    });
    let end = server.mock(|when, then| {
        when.method(GET).path("/end");
        then.status(200).body("landed");
    });

    let report = resolver(10).fetch(&server.url("/start")).await.unwrap();
    end.assert();
    assert_eq!(report.hops, 2);
    assert_eq!(report.status, 200);
    assert_eq!(report.final_url, server.url("/end"));
}

#[tokio::test]
async fn redirect_resolver_stops_at_hop_cap() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/loop");
        then.status(302).header("Location", "/loop");
    });

    let report = resolver(3).fetch(&server.url("/loop")).await.unwrap();
    assert_eq!(report.hops, 3);
    assert_eq!(report.status, 302);
}

#[tokio::test]
async fn redirect_resolver_reports_transport_errors() {
    // Nothing listens on port 9 locally.
    let err = resolver(3).fetch("http://127.0.0.1:9/").await.unwrap_err();
    assert!(matches!(err, RadarError::Transport(_) | RadarError::Timeout));
}

fn safe_browsing(server: &MockServer) -> SafeBrowsingClient {
    let endpoints = Endpoints {
        safe_browsing_url: server.url("/v4/threatMatches:find"),
        ..Endpoints::default()
    };
    SafeBrowsingClient::new(reqwest::Client::new(), &endpoints, "test-key".into())
}

#[tokio::test]
async fn safe_browsing_reports_threat_types() {
    let server = MockServer::start();
    let find = server.mock(|when, then| {
        when.method(POST)
            .path("/v4/threatMatches:find")
            .query_param("key", "test-key")
            .body_contains("\"threatEntries\":[{\"url\":\"http://evil.test/\"}]")
            .body_contains("\"threatEntryTypes\":[\"URL\"]");
        then.status(200).json_body(json!({
            "matches": [
                {"threatType": "SOCIAL_ENGINEERING"},
                {"threatType": "MALWARE"}
            ]
        }));
    });

    let threats = safe_browsing(&server).lookup("http://evil.test/").await.unwrap();
    find.assert();
    assert_eq!(threats, vec!["SOCIAL_ENGINEERING", "MALWARE"]);
}

#[tokio::test]
async fn safe_browsing_empty_body_means_no_match() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v4/threatMatches:find");
        then.status(200).json_body(json!({}));
    });
    let threats = safe_browsing(&server).lookup("https://example.com/").await.unwrap();
    assert!(threats.is_empty());
}

#[tokio::test]
async fn safe_browsing_auth_failure_is_an_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v4/threatMatches:find");
        then.status(403).body("API key not valid");
    });
    let err = safe_browsing(&server)
        .lookup("https://example.com/")
        .await
        .unwrap_err();
    assert!(matches!(err, RadarError::Http(_)), "{err:?}");
}

#[tokio::test]
async fn rdap_reads_registration_events() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/domain/example.com");
        then.status(200).json_body(json!({
            "ldhName": "EXAMPLE.COM",
            "events": [
                {"eventAction": "registration", "eventDate": "1995-08-14T04:00:00Z"},
                {"eventAction": "expiration", "eventDate": "2030-08-13T04:00:00Z"}
            ]
        }));
    });

    let client = RdapClient::new(reqwest::Client::new(), &server.base_url());
    let record = client.lookup("example.com").await.unwrap();
    assert_eq!(record.created.unwrap().to_rfc3339(), "1995-08-14T04:00:00+00:00");
    assert!(record.expires.is_some());
}

#[tokio::test]
async fn rdap_not_found_is_an_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/domain/unregistered.test");
        then.status(404);
    });
    let client = RdapClient::new(reqwest::Client::new(), &server.base_url());
    assert!(client.lookup("unregistered.test").await.is_err());
}

#[tokio::test]
async fn search_index_uses_no_results_marker() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/search").query_param("q", "site:ghost.test");
        then.status(200).body("<p>No results found for site:ghost.test</p>");
    });
    server.mock(|when, then| {
        when.method(GET).path("/search").query_param("q", "site:example.com");
        then.status(200).body("<a href=\"https://example.com/\">Example Domain</a>");
    });

    let client = SearchIndexClient::new(
        reqwest::Client::new(),
        &server.url("/search"),
        "No results found",
    );
    assert!(!client.is_indexed("ghost.test").await.unwrap());
    assert!(client.is_indexed("example.com").await.unwrap());
}

#[tokio::test]
async fn model_backend_posts_ordered_features() {
    let server = MockServer::start();
    let predict = server.mock(|when, then| {
        when.method(POST)
            .path("/predict")
            .json_body(json!({"schema": ["no_https", "ip_host"], "features": [-1, -1]}));
        then.status(200).json_body(json!({"class": 1}));
    });

    let backend = HttpModelBackend::new(reqwest::Client::new(), &server.url("/predict"));
    let features = FeatureVector::from_results(&["no_https", "ip_host"], &NamedResultSet::new());
    assert_eq!(backend.predict(&features).await.unwrap(), 1);
    predict.assert();
}
