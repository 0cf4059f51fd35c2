use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{header::LOCATION, redirect::Policy, Client};
use tracing::debug;
use url::Url;

use crate::core::error::RadarError;
use crate::sources::{FetchReport, RedirectResolver};

/// Follows redirects one hop at a time so the hop count is observable.
pub struct HttpRedirectResolver {
    client: Client,
    max_hops: usize,
}

impl HttpRedirectResolver {
    pub fn new(user_agent: &str, timeout: Duration, max_hops: usize) -> Result<Self, RadarError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(RadarError::from)?;
        Ok(Self { client, max_hops })
    }
}

#[async_trait]
impl RedirectResolver for HttpRedirectResolver {
    async fn fetch(&self, url: &str) -> Result<FetchReport, RadarError> {
        let started = Instant::now();
        let mut current = Url::parse(url)
            .map_err(|e| RadarError::Transport(format!("invalid url {url}: {e}")))?;
        let mut hops = 0usize;

        loop {
            let resp = self.client.get(current.clone()).send().await?;
            let status = resp.status();
            // Stop at the cap and report the chain so far.
            if status.is_redirection() && hops < self.max_hops {
                let next = resp
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|loc| current.join(loc).ok());
                if let Some(next) = next {
                    debug!("redirect {} -> {}", current, next);
                    hops += 1;
                    current = next;
                    continue;
                }
            }
            return Ok(FetchReport {
                final_url: current.to_string(),
                hops,
                status: status.as_u16(),
                elapsed: started.elapsed(),
            });
        }
    }
}
