//! Best-effort terminal-outcome notification.

use std::time::Duration;

use loopcast_models::{Job, JobStatus};
use serde::Serialize;
use tracing::{debug, warn};

/// Payload delivered to a job's webhook.
#[derive(Debug, Serialize)]
struct NotifyPayload<'a> {
    job_id: &'a str,
    status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<&'a str>,
}

/// Fires the terminal-outcome webhook, at most once per job.
///
/// Delivery is best effort: failures are logged and never change the
/// recorded job status.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
    timeout: Duration,
}

impl Notifier {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Deliver the terminal outcome of a job to its webhook, if it has
    /// one. Call sites invoke this exactly once per job.
    pub async fn notify(&self, job: &Job) {
        let Some(url) = job.spec.notify_url.as_deref() else {
            return;
        };

        let payload = NotifyPayload {
            job_id: job.id.as_str(),
            status: job.status,
            output_path: job
                .output_path
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            error_message: job.error_message.as_deref(),
        };

        match self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                debug!(job_id = %job.id, url = url, "Delivered terminal notification");
            }
            Ok(response) => {
                warn!(
                    job_id = %job.id,
                    url = url,
                    status = %response.status(),
                    "Notification endpoint returned non-success"
                );
            }
            Err(e) => {
                warn!(job_id = %job.id, url = url, error = %e, "Notification delivery failed");
            }
        }
    }
}
