use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish a static build-info gauge.
    /// Fails if another global recorder is already installed.
    pub fn init() -> anyhow::Result<Self> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = PrometheusBuilder::new().install_recorder()?;

        gauge!("classifier_build_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

        Ok(Self { handle })
    }

    /// Prometheus exposition text for whoever serves it (the HTTP layer lives elsewhere).
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
