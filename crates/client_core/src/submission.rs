//! Upload plumbing and the synthetic progress ticker.

use std::{future::Future, sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use shared::protocol::{AnalysisResponse, UPLOAD_PATH, VIDEO_FIELD};
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, warn};
use url::Url;

/// Shape of the synthetic progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressPolicy {
    pub interval: Duration,
    pub step: u8,
    /// Highest value the ticker may reach; only a response moves past it.
    pub cap: u8,
}

impl Default for ProgressPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(200),
            step: 10,
            cap: 90,
        }
    }
}

impl ProgressPolicy {
    /// Next value after one tick. Never decreases and never passes the cap.
    pub fn advance(&self, current: u8) -> u8 {
        current
            .saturating_add(self.step)
            .min(self.cap.min(100))
            .max(current)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// Repeating task that runs `on_tick` every `policy.interval` until it asks
/// to stop or is cancelled. Dropping the ticker aborts it.
pub struct ProgressTicker {
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    pub fn start<F, Fut>(policy: ProgressPolicy, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = TickControl> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + policy.interval, policy.interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if on_tick().await == TickControl::Stop {
                    break;
                }
            }
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Aborts the task and waits until it has fully stopped, so no tick can
    /// run after this returns.
    pub async fn cancel(mut self) {
        self.handle.abort();
        match (&mut self.handle).await {
            Ok(()) => debug!("progress ticker had already stopped"),
            Err(err) if err.is_cancelled() => debug!("progress ticker cancelled"),
            Err(err) => warn!(error = %err, "progress ticker failed"),
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The file as sent to the analysis service.
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Sends one video and returns the parsed body. Errors mean the request
    /// failed or the body could not be read; service-reported errors arrive
    /// as `Ok` with the `error` field set.
    async fn analyze(&self, upload: VideoUpload) -> Result<AnalysisResponse>;
}

pub struct HttpAnalysisService {
    http: Client,
    endpoint: Url,
}

impl HttpAnalysisService {
    pub fn new(server_url: &str) -> Result<Self> {
        Self::with_upload_path(server_url, UPLOAD_PATH)
    }

    pub fn with_upload_path(server_url: &str, upload_path: &str) -> Result<Self> {
        let base = Url::parse(server_url.trim())
            .with_context(|| format!("invalid analysis server url '{server_url}'"))?;
        let endpoint = base
            .join(upload_path)
            .with_context(|| format!("invalid upload path '{upload_path}'"))?;
        Ok(Self {
            http: Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn analyze(&self, upload: VideoUpload) -> Result<AnalysisResponse> {
        let part = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)
            .with_context(|| format!("invalid mime type '{}'", upload.mime_type))?;
        let form = Form::new().part(VIDEO_FIELD, part);

        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("failed to reach analysis service at {}", self.endpoint))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .context("failed to read analysis response body")?;

        // Validation failures come back as 4xx with an `error` body, so the
        // body is parsed before the status is looked at.
        match AnalysisResponse::from_slice(&body) {
            Ok(parsed) => {
                debug!(%status, file = %upload.file_name, "analysis response received");
                Ok(parsed)
            }
            Err(err) if !status.is_success() => {
                Err(anyhow!("analysis service returned {status}: {err}"))
            }
            Err(err) => Err(anyhow!(err).context("unreadable analysis response")),
        }
    }
}

#[cfg(test)]
#[path = "tests/submission_tests.rs"]
mod tests;
