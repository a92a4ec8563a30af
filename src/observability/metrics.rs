use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;


// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Request metrics
    pub api_requests: IntCounterVec,
    pub api_failures: IntCounterVec,
    pub api_request_duration: HistogramVec,
    pub invalid_payloads: IntCounter,

    // Credential metrics
    pub credential_resolutions: IntCounterVec,

    // Config/runtime
    pub parse_failures: IntCounter,
    pub config_validation_errors: IntCounter,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("leaveclient".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Requests
            api_requests: IntCounterVec::new(Opts::new("api_requests_total", "Total API requests by method"), &["method"]).unwrap(),
            api_failures: IntCounterVec::new(Opts::new("api_failures_total", "API transport failures by reason"), &["reason"]).unwrap(),
            api_request_duration: HistogramVec::new(HistogramOpts::new("api_request_duration_seconds", "API request duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 15.0]), &["method"]).unwrap(),

            invalid_payloads: IntCounter::new("api_invalid_payloads_total", "Responses whose body was not a payload object").unwrap(),

            // Credentials
            credential_resolutions: IntCounterVec::new(Opts::new("credential_resolutions_total", "Credential resolutions by winning source"), &["source"]).unwrap(),

            // Config/runtime
            parse_failures: IntCounter::new("config_parse_failures_total", "Config parse failures").unwrap(),
            config_validation_errors: IntCounter::new("config_validation_errors_total", "Validation errors during startup").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.api_requests.clone())).unwrap();
        reg.register(Box::new(metrics.api_failures.clone())).unwrap();
        reg.register(Box::new(metrics.api_request_duration.clone())).unwrap();
        reg.register(Box::new(metrics.invalid_payloads.clone())).unwrap();
        reg.register(Box::new(metrics.credential_resolutions.clone())).unwrap();
        reg.register(Box::new(metrics.parse_failures.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();

        metrics
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            return format!("# metrics encoding failed: {}\n", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
