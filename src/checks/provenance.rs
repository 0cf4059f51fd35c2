//! Registration-date checks backed by RDAP.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::checks::Check;
use crate::core::canonical::CanonicalUrl;
use crate::core::error::RadarError;
use crate::core::signal::CheckOutcome;
use crate::core::time::now_utc;
use crate::sources::{RegistrationLookup, SourceKind};

pub struct YoungDomain {
    registry: Arc<dyn RegistrationLookup>,
    min_age_days: i64,
}

impl YoungDomain {
    pub fn new(registry: Arc<dyn RegistrationLookup>, min_age_days: i64) -> Self {
        Self {
            registry,
            min_age_days,
        }
    }
}

#[async_trait]
impl Check for YoungDomain {
    fn name(&self) -> &'static str {
        "young_domain"
    }

    fn reason(&self) -> &'static str {
        "Domain was registered recently"
    }

    fn sources(&self) -> Vec<SourceKind> {
        vec![SourceKind::Registration]
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        let record = self.registry.lookup(registrable(url)?).await?;
        let created = required(record.created, "creation", url)?;
        let age = (now_utc() - created).num_days();
        if age < self.min_age_days {
            Ok(CheckOutcome::positive_with(format!(
                "Domain registered {age} days ago"
            )))
        } else {
            Ok(CheckOutcome::Negative)
        }
    }
}

pub struct ExpiringDomain {
    registry: Arc<dyn RegistrationLookup>,
    min_days_left: i64,
}

impl ExpiringDomain {
    pub fn new(registry: Arc<dyn RegistrationLookup>, min_days_left: i64) -> Self {
        Self {
            registry,
            min_days_left,
        }
    }
}

#[async_trait]
impl Check for ExpiringDomain {
    fn name(&self) -> &'static str {
        "expiring_domain"
    }

    fn reason(&self) -> &'static str {
        "Domain registration expires soon"
    }

    fn sources(&self) -> Vec<SourceKind> {
        vec![SourceKind::Registration]
    }

    async fn evaluate(&self, url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
        let record = self.registry.lookup(registrable(url)?).await?;
        let expires = required(record.expires, "expiration", url)?;
        let left = (expires - now_utc()).num_days();
        if left < self.min_days_left {
            Ok(CheckOutcome::positive_with(format!(
                "Domain registration expires in {left} days"
            )))
        } else {
            Ok(CheckOutcome::Negative)
        }
    }
}

fn registrable(url: &CanonicalUrl) -> Result<&str, RadarError> {
    if url.host_is_ip {
        return Err(RadarError::DataUnavailable(
            "ip hosts have no registration record".into(),
        ));
    }
    if url.registered_domain.is_empty() {
        return Err(RadarError::DataUnavailable("no domain in url".into()));
    }
    Ok(&url.registered_domain)
}

fn required(
    date: Option<DateTime<Utc>>,
    what: &str,
    url: &CanonicalUrl,
) -> Result<DateTime<Utc>, RadarError> {
    date.ok_or_else(|| {
        RadarError::DataUnavailable(format!(
            "no {what} date for {}",
            url.registered_domain
        ))
    })
}
