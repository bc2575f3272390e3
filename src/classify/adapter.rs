//! External analysis adapter: provider abstraction + payload shaping.
//!
//! A `Provider` does the raw remote call and returns the payload text. `ProviderClient`
//! wraps any provider, builds the prompt and turns the payload into a typed `ExternalResult`:
//! markers are read from a sanitized copy, while the payload itself is kept verbatim. Everything else in the crate talks to `dyn AnalysisClient`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::markers::Markers;
use crate::config::analysis::{AnalysisConfig, Provider as ProviderKind};
use crate::error::AdapterFailure;

/// Maximum payload length scanned for markers (chars).
pub const MAX_PAYLOAD_CHARS: usize = 4000;

pub const DEFAULT_WOLFRAM_ENDPOINT: &str = "https://api.wolframalpha.com/v1/result";
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

const USER_AGENT: &str = "civic-report-classifier/0.1";

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Optional structured context supplied by the report-creation workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportContext {
    pub category_hint: Option<String>,
    pub location: Option<String>,
}

/// One adapter call: the raw description plus whatever context the caller has.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub description: &'a str,
    pub context: &'a ReportContext,
}

impl AnalysisRequest<'_> {
    /// Prompt sent to the remote endpoint.
    pub fn prompt(&self) -> String {
        let mut out = format!("Analyze this civic issue: {}", self.description.trim());
        if let Some(hint) = non_blank(self.context.category_hint.as_deref()) {
            out.push_str(&format!(" (reported category: {hint})"));
        }
        if let Some(loc) = non_blank(self.context.location.as_deref()) {
            out.push_str(&format!(" (location: {loc})"));
        }
        out
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Successful external answer. Marker-bearing payloads are `Structured`; `raw` is always the
/// payload exactly as the provider returned it.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalResult {
    Structured { markers: Markers, raw: String },
    FreeText { raw: String },
}

impl ExternalResult {
    /// Classify a payload by whether any marker line is present in its sanitized form.
    pub fn from_payload(raw: String) -> Self {
        let markers = Markers::parse(&sanitize_payload(&raw));
        if markers.is_empty() {
            ExternalResult::FreeText { raw }
        } else {
            ExternalResult::Structured { markers, raw }
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            ExternalResult::Structured { raw, .. } | ExternalResult::FreeText { raw } => raw,
        }
    }
}

pub type AdapterFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ExternalResult, AdapterFailure>> + Send + 'a>>;

/// Trait object used by the pipeline (and test doubles).
pub trait AnalysisClient: Send + Sync {
    fn analyze<'a>(&'a self, request: AnalysisRequest<'a>) -> AdapterFuture<'a>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynAnalysisClient = Arc<dyn AnalysisClient>;

/// Factory: build a client according to config and environment variables.
///
/// * If `ANALYSIS_TEST_MODE=mock` (or provider `mock`), returns a deterministic mock client.
/// * Else if the config is disabled or lacks a credential, returns a `DisabledClient`
///   (every call yields `AdapterFailure::Configuration`).
/// * Else builds the real provider.
pub fn build_client_from_config(config: &AnalysisConfig) -> DynAnalysisClient {
    let test_mock = std::env::var("ANALYSIS_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false);
    if test_mock || config.provider == ProviderKind::Mock {
        return Arc::new(ProviderClient::new(MockProvider::default()));
    }

    if !config.enabled || config.provider == ProviderKind::Disabled {
        return Arc::new(DisabledClient::new("analysis disabled in config"));
    }

    let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) else {
        let var = config.provider.key_env_var().unwrap_or("api_key");
        warn!(
            provider = config.provider.as_str(),
            "{var} not provided; external analysis unavailable, using local classifier only"
        );
        return Arc::new(DisabledClient::new(format!("missing credential {var}")));
    };

    let built = match config.provider {
        ProviderKind::Wolfram => WolframProvider::new(
            key,
            config.endpoint.as_deref().unwrap_or(DEFAULT_WOLFRAM_ENDPOINT),
            config.timeout(),
        )
        .map(|p| Arc::new(ProviderClient::new(p)) as DynAnalysisClient),
        ProviderKind::OpenAi => OpenAiProvider::new(
            key,
            config.endpoint.as_deref().unwrap_or(DEFAULT_OPENAI_ENDPOINT),
            config.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL),
            config.timeout(),
        )
        .map(|p| Arc::new(ProviderClient::new(p)) as DynAnalysisClient),
        ProviderKind::Mock => Ok(Arc::new(ProviderClient::new(MockProvider::default())) as _),
        ProviderKind::Disabled => Ok(Arc::new(DisabledClient::new("analysis disabled")) as _),
    };

    match built {
        Ok(client) => client,
        Err(e) => {
            warn!(error = ?e, "failed to build analysis http client");
            Arc::new(DisabledClient::new(format!("http client: {e}")))
        }
    }
}

// ------------------------------------------------------------
// Provider abstraction + concrete providers
// ------------------------------------------------------------

pub type PayloadFuture<'a> = Pin<Box<dyn Future<Output = Result<String, AdapterFailure>> + Send + 'a>>;

/// Low-level provider: does the *real* remote call and returns the payload text.
pub trait Provider: Send + Sync + 'static {
    fn fetch<'a>(&'a self, prompt: &'a str) -> PayloadFuture<'a>;
    fn name(&self) -> &'static str;
}

fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(timeout.min(Duration::from_secs(4)))
        .timeout(timeout)
        .build()
}

/// Wolfram Alpha Short Answers API. Plain-text answers; HTTP 501 means "no answer".
pub struct WolframProvider {
    http: reqwest::Client,
    app_id: String,
    endpoint: String,
}

impl WolframProvider {
    pub fn new(app_id: &str, endpoint: &str, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            app_id: app_id.to_string(),
            endpoint: endpoint.to_string(),
        })
    }
}

impl Provider for WolframProvider {
    fn fetch<'a>(&'a self, prompt: &'a str) -> PayloadFuture<'a> {
        Box::pin(async move {
            let resp = self
                .http
                .get(&self.endpoint)
                .query(&[("appid", self.app_id.as_str()), ("i", prompt)])
                .send()
                .await?;

            let status = resp.status();
            if status == StatusCode::NOT_IMPLEMENTED {
                return Err(AdapterFailure::Malformed(
                    "no short answer available".to_string(),
                ));
            }
            if !status.is_success() {
                return Err(AdapterFailure::Transport(format!("HTTP {status}")));
            }
            Ok(resp.text().await?)
        })
    }

    fn name(&self) -> &'static str {
        "wolfram"
    }
}

/// OpenAI-compatible chat completions endpoint, prompted to answer in marker lines.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(
        api_key: &str,
        endpoint: &str,
        model: &str,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
            model: model.to_string(),
        })
    }
}

const MARKER_SYSTEM_PROMPT: &str = "You triage civic issue reports. Answer with exactly four lines:\n\
Category: <infrastructure|environmental|safety|services|transportation|other>\n\
Urgency: <low|medium|high|critical>\n\
Impact: <number from 1 to 10>\n\
Required resources: <comma-separated list>";

impl Provider for OpenAiProvider {
    fn fetch<'a>(&'a self, prompt: &'a str) -> PayloadFuture<'a> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: Option<String>,
            }

            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: MARKER_SYSTEM_PROMPT,
                    },
                    Msg {
                        role: "user",
                        content: prompt,
                    },
                ],
                temperature: 0.0,
                max_tokens: 120,
            };

            let resp = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await?;

            if !resp.status().is_success() {
                return Err(AdapterFailure::Transport(format!("HTTP {}", resp.status())));
            }
            let body: Resp = resp.json().await?;
            body.choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| AdapterFailure::Malformed("response has no choices".to_string()))
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Deterministic provider for tests/local runs. Carries no `Category:` marker by default,
/// so the category comes from the weighted keyword vote.
#[derive(Clone)]
pub struct MockProvider {
    pub payload: String,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            payload: "Urgency: medium\nRequired resources: site inspection".to_string(),
        }
    }
}

impl MockProvider {
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

impl Provider for MockProvider {
    fn fetch<'a>(&'a self, _prompt: &'a str) -> PayloadFuture<'a> {
        let out = self.payload.clone();
        Box::pin(async move { Ok(out) })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Clients
// ------------------------------------------------------------

/// Always fails with `AdapterFailure::Configuration`; used when no provider is usable.
pub struct DisabledClient {
    reason: String,
}

impl DisabledClient {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl AnalysisClient for DisabledClient {
    fn analyze<'a>(&'a self, _request: AnalysisRequest<'a>) -> AdapterFuture<'a> {
        let reason = self.reason.clone();
        Box::pin(async move { Err(AdapterFailure::Configuration(reason)) })
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Wraps a provider: prompt building, empty-payload rejection and result typing.
pub struct ProviderClient<P: Provider> {
    inner: P,
}

impl<P: Provider> ProviderClient<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    async fn analyze_impl(&self, request: AnalysisRequest<'_>) -> Result<ExternalResult, AdapterFailure> {
        let prompt = request.prompt();
        let payload = self.inner.fetch(&prompt).await?;
        if payload.trim().is_empty() {
            return Err(AdapterFailure::Malformed("empty payload".to_string()));
        }
        Ok(ExternalResult::from_payload(payload))
    }
}

impl<P: Provider> AnalysisClient for ProviderClient<P> {
    fn analyze<'a>(&'a self, request: AnalysisRequest<'a>) -> AdapterFuture<'a> {
        Box::pin(self.analyze_impl(request))
    }

    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// Sanitization
// ------------------------------------------------------------

/// Normalize line endings, trim, and cap at `MAX_PAYLOAD_CHARS`. Used for marker parsing only.
pub fn sanitize_payload(input: &str) -> String {
    let normalized = input.replace("\r\n", "\n").replace('\r', "\n");
    let trimmed = normalized.trim();
    if trimmed.chars().count() > MAX_PAYLOAD_CHARS {
        trimmed.chars().take(MAX_PAYLOAD_CHARS).collect()
    } else {
        trimmed.to_string()
    }
}
