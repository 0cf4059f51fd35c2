use async_trait::async_trait;
use hickory_resolver::{
    error::ResolveErrorKind,
    proto::rr::RecordType,
    TokioAsyncResolver,
};

use crate::core::error::RadarError;
use crate::sources::{DnsAnswer, DnsLookup, RecordKind};

pub struct HickoryDns {
    resolver: TokioAsyncResolver,
}

impl HickoryDns {
    /// Use the host's resolver configuration (`/etc/resolv.conf` on unix).
    pub fn from_system_conf() -> Result<Self, RadarError> {
        let resolver = TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|e| RadarError::Config(format!("dns resolver: {e}")))?;
        Ok(Self { resolver })
    }
}

#[async_trait]
impl DnsLookup for HickoryDns {
    async fn resolve(&self, name: &str, kind: RecordKind) -> Result<DnsAnswer, RadarError> {
        let record_type = match kind {
            RecordKind::A => RecordType::A,
            RecordKind::Aaaa => RecordType::AAAA,
        };
        // Trailing dot keeps search domains out of RBL queries.
        let fqdn = if name.ends_with('.') {
            name.to_string()
        } else {
            format!("{name}.")
        };
        match self.resolver.lookup(fqdn.as_str(), record_type).await {
            Ok(lookup) => {
                let records: Vec<String> = lookup.iter().map(|r| r.to_string()).collect();
                if records.is_empty() {
                    Ok(DnsAnswer::NotFound)
                } else {
                    Ok(DnsAnswer::Records(records))
                }
            }
            Err(err) => match err.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => Ok(DnsAnswer::NotFound),
                _ => Err(RadarError::from(err)),
            },
        }
    }
}
