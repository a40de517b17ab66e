//! Metric names and recording helpers for image generation

use std::time::Instant;

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Generation requests served, by `mode` and `outcome`
pub const IMAGEGEN_REQUEST_COUNT: &str = "imagegen.request.count";
/// End-to-end generation latency in seconds, by `mode`
pub const IMAGEGEN_REQUEST_DURATION: &str = "imagegen.request.duration";
/// Upstream call attempts, by `mode` and `result`
pub const IMAGEGEN_UPSTREAM_ATTEMPTS: &str = "imagegen.upstream.attempts";
/// Images persisted and returned, by `mode`
pub const IMAGEGEN_IMAGES_PRODUCED: &str = "imagegen.images.produced";

/// Instruments used by the image generation pipeline
#[derive(Clone)]
pub struct ImageGenMetrics {
    pub requests: Counter<u64>,
    pub duration: Histogram<f64>,
    pub attempts: Counter<u64>,
    pub images: Counter<u64>,
}

impl ImageGenMetrics {
    /// Create the instruments on the given meter
    pub fn new(meter: &Meter) -> Self {
        Self {
            requests: meter
                .u64_counter(IMAGEGEN_REQUEST_COUNT)
                .with_description("Image generation requests served")
                .build(),
            duration: meter
                .f64_histogram(IMAGEGEN_REQUEST_DURATION)
                .with_unit("s")
                .with_description("Image generation request duration")
                .build(),
            attempts: meter
                .u64_counter(IMAGEGEN_UPSTREAM_ATTEMPTS)
                .with_description("Upstream provider call attempts")
                .build(),
            images: meter
                .u64_counter(IMAGEGEN_IMAGES_PRODUCED)
                .with_description("Images persisted and returned to clients")
                .build(),
        }
    }

    /// Instruments on the process-wide meter provider
    ///
    /// Recording is a no-op until a meter provider is installed.
    pub fn global() -> Self {
        Self::new(&opentelemetry::global::meter("pictor"))
    }
}

/// Record a duration measurement on a histogram
pub fn record_duration(histogram: &Histogram<f64>, start: Instant, attributes: &[opentelemetry::KeyValue]) {
    histogram.record(start.elapsed().as_secs_f64(), attributes);
}
