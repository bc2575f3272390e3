// src/bootstrap.rs
use crate::classify::ClassificationPipeline;
use crate::config::analysis::AnalysisConfig;
use tracing::{info, warn};

/// Config + pipeline built once at startup and shared by request handlers.
pub struct AnalysisRuntime {
    pub cfg: AnalysisConfig,
    pub pipeline: ClassificationPipeline,
}

impl AnalysisRuntime {
    /// Load config (file or env defaults) and build the pipeline. Never fails: without a
    /// credential the pipeline runs local-only.
    pub fn load() -> Self {
        Self::from_config(AnalysisConfig::load())
    }

    pub fn from_path(path: &str) -> anyhow::Result<Self> {
        Ok(Self::from_config(AnalysisConfig::load_from_file(path)?))
    }

    pub fn from_config(cfg: AnalysisConfig) -> Self {
        // Safe diagnostics: only provider + enabled + key length
        info!(
            "analysis cfg loaded: provider={}, enabled={}, key_len={}, timeout_ms={}, retries={}",
            cfg.provider.as_str(),
            cfg.enabled,
            cfg.api_key.as_ref().map_or(0, |k| k.len()),
            cfg.timeout_ms,
            cfg.max_retries
        );
        let pipeline = ClassificationPipeline::from_config(&cfg);
        Self { cfg, pipeline }
    }

    /// One-off smoke test of the external adapter; logs the outcome, never panics.
    pub async fn quick_probe(&self) {
        if !self.cfg.enabled {
            warn!("analysis quick_probe skipped: external analysis is disabled in config");
            return;
        }
        let sample = "Large pothole on the road outside the library, cars swerving into traffic.";
        match self.pipeline.classify_report(sample).await {
            Ok(a) => info!(
                provider = self.pipeline.provider_name(),
                category = %a.category(),
                confidence = a.confidence(),
                external = a.used_external(),
                "analysis quick_probe finished"
            ),
            Err(e) => warn!(error = %e, "analysis quick_probe failed"),
        }
    }
}
