//! Prometheus metrics for the clinic server

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, register_int_gauge_vec,
    HistogramVec, IntCounterVec, IntGauge, IntGaugeVec,
};
use std::time::Instant;

lazy_static! {
    // HTTP Request Metrics

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "clinic_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("Failed to register HTTP_REQUESTS_TOTAL");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "clinic_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");

    pub static ref HTTP_REQUESTS_IN_FLIGHT: IntGaugeVec = register_int_gauge_vec!(
        "clinic_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
        &["method", "path"]
    )
    .expect("Failed to register HTTP_REQUESTS_IN_FLIGHT");

    /// Requests rejected by the rate limiter
    pub static ref HTTP_REQUESTS_THROTTLED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "clinic_http_requests_throttled_total",
        "Total number of requests rejected by the rate limiter",
        &["path"]
    )
    .expect("Failed to register HTTP_REQUESTS_THROTTLED_TOTAL");

    // Doctor Cache Metrics

    /// Doctor lookups by outcome: hit, miss, error, corrupt
    pub static ref DOCTOR_CACHE_LOOKUPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "clinic_doctor_cache_lookups_total",
        "Doctor cache lookups by outcome",
        &["outcome"]
    )
    .expect("Failed to register DOCTOR_CACHE_LOOKUPS_TOTAL");

    pub static ref DOCTOR_CACHE_WRITES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "clinic_doctor_cache_writes_total",
        "Doctor cache population attempts by status",
        &["status"]
    )
    .expect("Failed to register DOCTOR_CACHE_WRITES_TOTAL");

    // Database Metrics

    pub static ref DB_QUERY_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "clinic_db_query_duration_seconds",
        "Database query duration in seconds",
        &["query_type"],
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
    )
    .expect("Failed to register DB_QUERY_DURATION_SECONDS");

    pub static ref DB_QUERY_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "clinic_db_query_errors_total",
        "Total number of database query errors",
        &["query_type"]
    )
    .expect("Failed to register DB_QUERY_ERRORS_TOTAL");

    /// Writes that matched or changed zero rows
    pub static ref DB_NOOP_WRITES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "clinic_db_noop_writes_total",
        "Writes that affected zero rows",
        &["operation"]
    )
    .expect("Failed to register DB_NOOP_WRITES_TOTAL");

    pub static ref DEPENDENCY_TIMEOUTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "clinic_dependency_timeouts_total",
        "Calls to the database or cache that exceeded their deadline",
        &["dependency"]
    )
    .expect("Failed to register DEPENDENCY_TIMEOUTS_TOTAL");

    pub static ref DB_CONNECTIONS_ACTIVE: IntGauge = register_int_gauge!(
        "clinic_db_connections_active",
        "Number of active database connections"
    )
    .expect("Failed to register DB_CONNECTIONS_ACTIVE");

    pub static ref DB_CONNECTIONS_IDLE: IntGauge = register_int_gauge!(
        "clinic_db_connections_idle",
        "Number of idle database connections"
    )
    .expect("Failed to register DB_CONNECTIONS_IDLE");
}

/// Records the duration of one store query when dropped.
pub struct QueryTimer {
    query_type: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn start(query_type: &'static str) -> Self {
        Self {
            query_type,
            start: Instant::now(),
        }
    }
}

impl Drop for QueryTimer {
    fn drop(&mut self) {
        DB_QUERY_DURATION_SECONDS
            .with_label_values(&[self.query_type])
            .observe(self.start.elapsed().as_secs_f64());
    }
}

/// Replace numeric token ids and UUIDs in a path so labels stay low-cardinality.
pub fn sanitize_path(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_string();
    }

    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                "{token_id}"
            } else if uuid::Uuid::parse_str(segment).is_ok() {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
