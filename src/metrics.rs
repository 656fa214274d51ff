//! Prometheus metrics for request counting and latency tracking.
//!
//! The registry is an explicit handle rather than a global recorder: it is
//! built once at startup, cloned into the router state, and every update is
//! routed to its own recorder through [`metrics::with_local_recorder`]. This
//! keeps independent registries (one per test router, for instance) from
//! observing each other.
//!
//! Tracked families:
//! - `app_requests_total{method, endpoint, status}`
//! - `app_process_duration_seconds`
//! - `app_db_query_duration_seconds{operation}`
//! - `process_*` runtime gauges, refreshed on every render
//!
//! The exporter buffers histogram samples until they are drained, so a
//! [`spawn_upkeep`] task must run alongside the registry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};
use metrics_process::Collector;
use tokio::task::JoinHandle;
use tracing::debug;

// === Metric Name Constants ===

/// Request counter metric name.
pub const METRIC_REQUESTS_TOTAL: &str = "app_requests_total";
/// `/process` handler duration metric name.
pub const METRIC_PROCESS_DURATION: &str = "app_process_duration_seconds";
/// Database query duration metric name.
pub const METRIC_DB_QUERY_DURATION: &str = "app_db_query_duration_seconds";

/// Bucket upper bounds for [`METRIC_PROCESS_DURATION`], in seconds.
pub const PROCESS_DURATION_BUCKETS: [f64; 7] = [0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];
/// Bucket upper bounds for [`METRIC_DB_QUERY_DURATION`], in seconds.
pub const DB_QUERY_DURATION_BUCKETS: [f64; 7] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5];

/// Content type of [`Metrics::render`] output.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Interval between exporter upkeep runs, matching the exporter's own default.
pub const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// `(name, type, help)` of every application family.
const FAMILIES: [(&str, &str, &str); 3] = [
    (METRIC_REQUESTS_TOTAL, "counter", "Total application requests"),
    (METRIC_PROCESS_DURATION, "histogram", "Duration of /process endpoint"),
    (METRIC_DB_QUERY_DURATION, "histogram", "Duration of database queries"),
];

/// Process-wide metrics registry. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Metrics {
    recorder: Arc<PrometheusRecorder>,
    handle: PrometheusHandle,
    process: Arc<Collector>,
}

impl Metrics {
    /// Build the registry and register every metric description.
    pub fn new() -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(METRIC_PROCESS_DURATION.to_string()),
                &PROCESS_DURATION_BUCKETS,
            )?
            .set_buckets_for_metric(
                Matcher::Full(METRIC_DB_QUERY_DURATION.to_string()),
                &DB_QUERY_DURATION_BUCKETS,
            )?
            .build_recorder();
        let handle = recorder.handle();

        let metrics = Self {
            recorder: Arc::new(recorder),
            handle,
            process: Arc::new(Collector::default()),
        };
        metrics.init();
        Ok(metrics)
    }

    fn init(&self) {
        self.scoped(|| {
            let [requests, process, db] = FAMILIES;
            describe_counter!(requests.0, requests.2);
            describe_histogram!(process.0, Unit::Seconds, process.2);
            describe_histogram!(db.0, Unit::Seconds, db.2);
            self.process.describe();

            // The unlabeled histogram has exactly one series, so it can be
            // materialised up front and show up with zero traffic.
            let _ = histogram!(METRIC_PROCESS_DURATION);
        });

        debug!("Metrics initialized");
    }

    fn scoped<T>(&self, f: impl FnOnce() -> T) -> T {
        metrics::with_local_recorder(self.recorder.as_ref(), f)
    }

    /// Increment the request counter for one completed request.
    pub fn increment_request_counter(&self, method: &str, path: &str, status: u16) {
        self.scoped(|| {
            counter!(
                METRIC_REQUESTS_TOTAL,
                "method" => method.to_string(),
                "endpoint" => path.to_string(),
                "status" => status.to_string()
            )
            .increment(1);
        });
    }

    /// Record one `/process` duration sample.
    pub fn observe_process_duration(&self, seconds: f64) {
        self.scoped(|| histogram!(METRIC_PROCESS_DURATION).record(seconds));
    }

    /// Record one database query duration sample for `operation`.
    pub fn observe_db_duration(&self, operation: &str, seconds: f64) {
        self.scoped(|| {
            histogram!(METRIC_DB_QUERY_DURATION, "operation" => operation.to_string())
                .record(seconds)
        });
    }

    /// Record `/process` duration measured from `start`.
    pub fn record_process_duration(&self, start: Instant) {
        self.observe_process_duration(start.elapsed().as_secs_f64());
    }

    /// Record database query duration measured from `start`.
    pub fn record_db_duration(&self, operation: &str, start: Instant) {
        self.observe_db_duration(operation, start.elapsed().as_secs_f64());
    }

    /// Render every family in the Prometheus text exposition format.
    ///
    /// Labeled families with no series yet are still listed, as
    /// `# HELP`/`# TYPE` headers without samples.
    pub fn render(&self) -> String {
        self.scoped(|| self.process.collect());
        let mut text = self.handle.render();

        for (name, kind, help) in FAMILIES {
            if !text.contains(&format!("# TYPE {name} ")) {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push_str(&format!("# HELP {name} {help}\n# TYPE {name} {kind}\n\n"));
            }
        }
        text
    }

    /// Drain buffered histogram samples into their buckets.
    pub fn run_upkeep(&self) {
        self.handle.run_upkeep();
    }
}

/// Run [`Metrics::run_upkeep`] every `period` until the task is aborted.
pub fn spawn_upkeep(metrics: Metrics, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            metrics.run_upkeep();
        }
    })
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

/// Read a single sample value out of rendered exposition text.
///
/// Picks the first sample line for `name` that contains every entry of
/// `label_fragments`, e.g.
/// `sample_value(text, "app_requests_total", &["endpoint=\"/health\""])`.
pub fn sample_value(exposition: &str, name: &str, label_fragments: &[&str]) -> Option<f64> {
    exposition
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter(|line| {
            line.strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('{') || rest.starts_with(' '))
        })
        .find(|line| label_fragments.iter().all(|frag| line.contains(frag)))
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}
