//! Periodic telemetry upload
//!
//! Every upload period the aggregated means are sent to the telemetry
//! service as a single `GET /update?api_key=...&field1=...` request. The
//! aggregate is reset only when the service accepts the update; on any
//! failure it keeps accumulating and the next period sends the longer
//! average instead of losing the data.

use alloc::string::String;
use core::fmt::Write;

use log::{debug, info, warn};

use crate::aggregator::{AggregateMeans, Aggregator};
use crate::net::{HttpClient, NetError, push_query_value};
use crate::timer::{Cadence, Millis};

/// Result of one [`Uploader::maybe_upload`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The upload period has not elapsed.
    NotDue,
    /// Due, but the network is down; retried on a later tick.
    Skipped,
    /// Accepted with a 2xx status; the aggregate was reset.
    Sent { status: u16 },
    /// The service answered with a non-2xx status.
    Rejected { status: u16 },
    Failed(NetError),
}

impl UploadOutcome {
    /// Whether a request was actually issued.
    pub fn attempted(&self) -> bool {
        matches!(
            self,
            Self::Sent { .. } | Self::Rejected { .. } | Self::Failed(_)
        )
    }
}

/// Build the update URL; channels without data are left out.
pub fn telemetry_url(base_url: &str, api_key: &str, means: &AggregateMeans) -> String {
    let mut url = String::with_capacity(base_url.len() + 96);
    url.push_str(base_url.trim_end_matches('/'));
    url.push_str("/update?api_key=");
    push_query_value(&mut url, api_key);

    let fields = [
        ("field1", means.outdoor_temperature),
        ("field2", means.indoor_temperature),
        ("field3", means.humidity),
    ];
    for (name, value) in fields {
        if let Some(v) = value {
            let _ = write!(url, "&{}={:.2}", name, v);
        }
    }
    url
}

pub struct Uploader<'a> {
    base_url: &'a str,
    api_key: &'a str,
    cadence: Cadence,
}

impl<'a> Uploader<'a> {
    pub fn new(base_url: &'a str, api_key: &'a str, period: Millis, now: Millis) -> Self {
        Self {
            base_url,
            api_key,
            cadence: Cadence::new(now, period),
        }
    }

    pub fn is_due(&self, now: Millis) -> bool {
        self.cadence.is_due(now)
    }

    /// Upload the current means if the period has elapsed and the network
    /// is up.
    ///
    /// While disconnected the timer is left running, so the upload happens
    /// on the first connected tick after the period.
    pub async fn maybe_upload<N: HttpClient>(
        &mut self,
        now: Millis,
        net: &mut N,
        aggregator: &mut Aggregator,
    ) -> UploadOutcome {
        if !self.cadence.is_due(now) {
            return UploadOutcome::NotDue;
        }
        if !net.is_connected() {
            debug!("Upload due but network is down");
            return UploadOutcome::Skipped;
        }

        let means = aggregator.means();
        let url = telemetry_url(self.base_url, self.api_key, &means);
        debug!("Uploading {}", means);

        let outcome = match net.get(&url).await {
            Ok(response) if response.is_success() => {
                aggregator.reset();
                info!("Telemetry accepted ({})", response.status);
                UploadOutcome::Sent {
                    status: response.status,
                }
            }
            Ok(response) => {
                warn!("Telemetry rejected with status {}", response.status);
                UploadOutcome::Rejected {
                    status: response.status,
                }
            }
            Err(e) => {
                warn!("Telemetry upload failed: {}", e);
                UploadOutcome::Failed(e)
            }
        };

        self.cadence.restart(now);
        outcome
    }
}
