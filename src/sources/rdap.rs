use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::core::error::RadarError;
use crate::sources::{RegistrationLookup, RegistrationRecord};

/// Registration data over RDAP (`GET {base}/domain/{name}`).
pub struct RdapClient {
    client: Client,
    base: String,
}

#[derive(Debug, Deserialize)]
struct RdapDomain {
    #[serde(default)]
    events: Vec<RdapEvent>,
}

#[derive(Debug, Deserialize)]
struct RdapEvent {
    #[serde(rename = "eventAction")]
    action: String,
    #[serde(rename = "eventDate", default)]
    date: Option<String>,
}

impl RdapClient {
    pub fn new(client: Client, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RegistrationLookup for RdapClient {
    async fn lookup(&self, domain: &str) -> Result<RegistrationRecord, RadarError> {
        if domain.is_empty() {
            return Err(RadarError::DataUnavailable("no registered domain".into()));
        }
        let url = format!("{}/domain/{}", self.base, domain);
        let body: RdapDomain = self
            .client
            .get(&url)
            .header("Accept", "application/rdap+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(record_from_events(&body.events))
    }
}

fn record_from_events(events: &[RdapEvent]) -> RegistrationRecord {
    let find = |action: &str| {
        events
            .iter()
            .find(|e| e.action.eq_ignore_ascii_case(action))
            .and_then(|e| e.date.as_deref())
            .and_then(parse_event_date)
    };
    RegistrationRecord {
        created: find("registration"),
        expires: find("expiration"),
    }
}

fn parse_event_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbled_dates_become_absent() {
        let events: Vec<RdapEvent> = serde_json::from_str(
            r#"[
                {"eventAction": "registration", "eventDate": "1995-08-14T04:00:00Z"},
                {"eventAction": "expiration", "eventDate": "sometime next year"},
                {"eventAction": "last changed", "eventDate": "2024-08-14"}
            ]"#,
        )
        .unwrap();
        let record = record_from_events(&events);
        assert!(record.created.is_some());
        assert!(record.expires.is_none());
    }

    #[test]
    fn accepts_plain_dates() {
        assert!(parse_event_date("2031-01-05").is_some());
        assert!(parse_event_date("05/01/2031").is_none());
    }
}
