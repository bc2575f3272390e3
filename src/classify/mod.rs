// src/classify/mod.rs
//! Classification pipeline entry: local classifier + external adapter → combiner.
//!
//! Order per call:
//! 1) precondition: non-empty description (the only error surfaced to callers)
//! 2) local keyword classification (always)
//! 3) adapter call, bounded by a timeout, with at most one retry on transport failure
//! 4) combine both signals; adapter failures degrade to the local result
//!
//! The adapter is the only source of non-determinism: identical adapter output and the
//! static taxonomy always give an identical `Analysis`.

pub mod adapter;
pub mod combine;
pub mod local;
pub mod markers;

use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::analysis::Analysis;
use crate::config::analysis::{AnalysisConfig, DEFAULT_TIMEOUT_MS, MAX_RETRIES};
use crate::error::{AdapterFailure, ClassifyError};
use crate::logging::anon_hash;

// Re-export convenient types.
pub use crate::classify::adapter::{
    build_client_from_config, AnalysisClient, AnalysisRequest, DynAnalysisClient,
    ExternalResult, ReportContext,
};
pub use crate::classify::combine::combine;
pub use crate::classify::local::{classify, LocalResult};
pub use crate::classify::markers::Markers;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("classify_requests_total", "Classification requests accepted.");
        describe_counter!(
            "classify_degraded_total",
            "Classifications that fell back to the local classifier."
        );
        describe_counter!(
            "classify_precondition_failures_total",
            "Requests rejected because the description was empty."
        );
        describe_counter!(
            "adapter_failures_total",
            "External adapter failures by kind (configuration/transport/malformed)."
        );
        describe_histogram!("adapter_call_ms", "External adapter call time in milliseconds.");
    });
}

/// Orchestrates one classification per report. Holds no mutable state, so a single
/// instance can be shared (e.g. behind `Arc`) across concurrent requests.
#[derive(Clone)]
pub struct ClassificationPipeline {
    client: DynAnalysisClient,
    timeout: Duration,
    attempts: u32,
}

impl ClassificationPipeline {
    /// Injected adapter, default 5s timeout, no retries.
    pub fn new(client: DynAnalysisClient) -> Self {
        Self {
            client,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            attempts: 1,
        }
    }

    /// Build the adapter from config; timeout/retries come from the same config.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            client: build_client_from_config(config),
            timeout: config.timeout(),
            attempts: config.attempts(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retries apply to transport failures only and are capped at one. Each attempt gets the
    /// full timeout, so the adapter may take up to `timeout × (1 + retries)`: two timeouts
    /// with one retry.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.attempts = 1 + retries.min(MAX_RETRIES);
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.client.provider_name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Classify a report description. Fails only on an empty description.
    pub async fn classify_report(&self, description: &str) -> Result<Analysis, ClassifyError> {
        self.classify_report_with_context(description, &ReportContext::default())
            .await
    }

    /// Same as [`classify_report`](Self::classify_report), forwarding caller context
    /// (category hint, location) to the external adapter.
    pub async fn classify_report_with_context(
        &self,
        description: &str,
        context: &ReportContext,
    ) -> Result<Analysis, ClassifyError> {
        ensure_metrics_described();

        if description.trim().is_empty() {
            counter!("classify_precondition_failures_total").increment(1);
            return Err(ClassifyError::EmptyDescription);
        }
        counter!("classify_requests_total").increment(1);

        let id = anon_hash(description);
        let local = classify(description);

        let request = AnalysisRequest {
            description,
            context,
        };
        let external = self.call_adapter(request).await;

        if let Err(failure) = &external {
            counter!("adapter_failures_total", "kind" => failure.kind()).increment(1);
            counter!("classify_degraded_total").increment(1);
            match failure {
                AdapterFailure::Configuration(_) => {
                    debug!(%id, provider = self.provider_name(), "adapter not configured; local only")
                }
                _ => warn!(
                    %id,
                    provider = self.provider_name(),
                    kind = failure.kind(),
                    error = %failure,
                    "adapter failed; degrading to local classifier"
                ),
            }
        }

        let analysis = combine(&local, &external);
        info!(
            %id,
            category = %analysis.category(),
            confidence = analysis.confidence(),
            external = analysis.used_external(),
            "report classified"
        );
        Ok(analysis)
    }

    async fn call_adapter(
        &self,
        request: AnalysisRequest<'_>,
    ) -> Result<ExternalResult, AdapterFailure> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let started = Instant::now();
            let outcome = match tokio::time::timeout(self.timeout, self.client.analyze(request)).await
            {
                Ok(res) => res,
                Err(_) => Err(AdapterFailure::Transport(format!(
                    "timed out after {} ms",
                    self.timeout.as_millis()
                ))),
            };
            histogram!("adapter_call_ms").record(started.elapsed().as_secs_f64() * 1000.0);

            match outcome {
                Err(failure) if failure.is_retryable() && attempt < self.attempts => {
                    debug!(attempt, error = %failure, "retrying adapter call");
                }
                other => return other,
            }
        }
    }
}
