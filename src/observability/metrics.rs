use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use tracing::{info, warn};
use std::sync::Arc;
use tokio::sync::OnceCell;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> prometheus::Result<&'static Arc<Metrics>> {
    METRICS_INSTANCE.get_or_try_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}

/// Record through the shared registry; a registry that failed to build only costs the sample.
pub async fn with_metrics<F: FnOnce(&Metrics)>(record: F) {
    match get_metrics().await {
        Ok(metrics) => record(metrics),
        Err(e) => warn!(error = %e, "metrics registry unavailable"),
    }
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Cache metrics
    pub cache_hits: IntCounterVec,
    pub cache_misses: IntCounterVec,
    pub cache_failures: IntCounterVec,

    // Upstream metrics
    pub upstream_requests: IntCounterVec,
    pub upstream_failures: IntCounterVec,
    pub upstream_duration: HistogramVec,
}

impl Metrics {
    fn new() -> prometheus::Result<Arc<Self>> {
        let metrics = Arc::new(Self {
            cache_hits: IntCounterVec::new(Opts::new("cache_hits_total", "Token cache hits by flow"), &["flow"])?,
            cache_misses: IntCounterVec::new(Opts::new("cache_misses_total", "Token cache misses by flow"), &["flow"])?,
            cache_failures: IntCounterVec::new(Opts::new("cache_failures_total", "Token cache provider failures"), &["flow", "operation"])?,

            upstream_requests: IntCounterVec::new(Opts::new("upstream_requests_total", "Requests sent to the authority or exchange platform"), &["flow", "environment"])?,
            upstream_failures: IntCounterVec::new(Opts::new("upstream_failures_total", "Failed upstream requests by reason"), &["flow", "reason"])?,
            upstream_duration: HistogramVec::new(HistogramOpts::new("upstream_duration_seconds", "Upstream request duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]), &["flow"])?,

            registry: Registry::new_custom(Some("maskinporten".into()), None)?,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(metrics.cache_hits.clone()),
            Box::new(metrics.cache_misses.clone()),
            Box::new(metrics.cache_failures.clone()),
            Box::new(metrics.upstream_requests.clone()),
            Box::new(metrics.upstream_failures.clone()),
            Box::new(metrics.upstream_duration.clone()),
        ];
        for collector in collectors {
            reg.register(collector)?;
        }

        Ok(metrics)
    }

    /// Text exposition of every registered metric.
    pub fn gather_text(&self) -> anyhow::Result<String> {
        use prometheus::{Encoder, TextEncoder};
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exposition_carries_namespace() {
        let metrics = get_metrics().await.unwrap();
        metrics.cache_misses.with_label_values(&["issue"]).inc();
        let text = metrics.gather_text().unwrap();
        assert!(text.contains("maskinporten_cache_misses_total"));
    }
}
