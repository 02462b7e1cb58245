use opentelemetry::{
    global,
    metrics::{Counter, Histogram, MeterProvider},
    KeyValue,
};
use prometheus::Registry;

pub struct Metrics {
    request_counter: Counter<u64>,
    analysis_duration: Histogram<u64>,
    stale_results: Counter<u64>,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        // TODO: deprecated crate to be replaced with an OLTP exporter
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .unwrap();

        let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
            .with_reader(exporter)
            .build();

        let meter = provider.meter("lesion_gateway");
        global::set_meter_provider(provider);

        let request_counter = meter
            .u64_counter("requests_total")
            .with_description("Total number of requests")
            .build();

        let analysis_duration = meter
            .u64_histogram("analysis_duration_ms")
            .with_boundaries(vec![
                50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
            ])
            .with_description("Duration of normalize-and-classify runs in milliseconds")
            .build();

        let stale_results = meter
            .u64_counter("stale_results_total")
            .with_description("Completed analyses discarded because the selection moved on")
            .build();

        Metrics {
            request_counter,
            analysis_duration,
            stale_results,
            registry,
        }
    }

    pub fn record_request(&self, route: &str) {
        let attributes = vec![KeyValue::new("route", route.to_string())];
        self.request_counter.add(1, &attributes);
    }

    pub fn record_analysis_duration(&self, duration_ms: u64, source: &str) {
        let attributes = vec![KeyValue::new("source", source.to_string())];
        self.analysis_duration.record(duration_ms, &attributes);
    }

    pub fn record_stale_drop(&self) {
        self.stale_results.add(1, &[]);
    }
}
