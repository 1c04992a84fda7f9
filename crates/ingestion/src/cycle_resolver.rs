//! Latest-cycle resolution.
//!
//! GFS cycles appear upstream a few hours after their nominal run time. The
//! resolver starts from the latest run not later than `now - lag` and walks
//! back one cycle per failed probe, for a bounded number of probes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gfs_common::{ForecastCycle, GfsSource};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{IngestionError, Result};

/// Checks whether an upstream file is published.
#[async_trait]
pub trait AvailabilityProbe: Send + Sync {
    /// True on a success status. Any failure, including timeouts, is `false`.
    async fn is_available(&self, url: &str) -> bool;
}

/// [`AvailabilityProbe`] issuing a GET and reading only the status line.
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IngestionError::InvalidConfig(format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AvailabilityProbe for HttpProbe {
    async fn is_available(&self, url: &str) -> bool {
        // The response body is never read; dropping it closes the stream
        match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                debug!(url = %url, status = %status, "Probe response");
                status.is_success()
            }
            Err(e) => {
                debug!(url = %url, error = %e, "Probe failed");
                false
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// How far behind `now` the first candidate is taken.
    pub lag: Duration,
    /// Upper bound on probes per resolution.
    pub max_attempts: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            lag: Duration::from_secs(2 * 3600),
            max_attempts: 6,
        }
    }
}

/// Outcome of a resolution.
///
/// `confirmed` is false when every probe failed; `cycle` is then the last one
/// probed, and callers proceed with it as a best guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleResolution {
    pub cycle: ForecastCycle,
    pub probe_url: String,
    pub confirmed: bool,
    pub attempts: u32,
}

pub struct CycleResolver {
    probe: Arc<dyn AvailabilityProbe>,
    source: GfsSource,
    config: ResolverConfig,
}

impl CycleResolver {
    pub fn new(
        probe: Arc<dyn AvailabilityProbe>,
        source: GfsSource,
        config: ResolverConfig,
    ) -> Self {
        Self {
            probe,
            source,
            config,
        }
    }

    pub fn source(&self) -> &GfsSource {
        &self.source
    }

    /// Find the most recent cycle whose lead-0 file is published.
    #[instrument(skip(self), fields(max_attempts = self.config.max_attempts))]
    pub async fn resolve(&self, now: DateTime<Utc>) -> CycleResolution {
        let lag = chrono::Duration::from_std(self.config.lag)
            .unwrap_or_else(|_| chrono::Duration::hours(2));
        let max_attempts = self.config.max_attempts.max(1);

        let mut cycle = ForecastCycle::candidate(now, lag);
        let mut attempts = 0;

        loop {
            let url = self.source.url(&cycle, 0);
            attempts += 1;

            if self.probe.is_available(&url).await {
                info!(cycle = %cycle, attempts, url = %url, "Resolved latest cycle");
                return CycleResolution {
                    cycle,
                    probe_url: url,
                    confirmed: true,
                    attempts,
                };
            }

            if attempts >= max_attempts {
                warn!(
                    cycle = %cycle,
                    attempts,
                    "No published cycle found, using last probed cycle"
                );
                return CycleResolution {
                    cycle,
                    probe_url: url,
                    confirmed: false,
                    attempts,
                };
            }

            debug!(cycle = %cycle, "Cycle not published yet, stepping back");
            cycle = cycle.previous();
        }
    }
}
