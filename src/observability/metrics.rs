// Copyright PingCAP Inc. 2025.
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; version 2 of the License.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

/// Prometheus metrics definitions for estado
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Gauge,
    HistogramVec, TextEncoder,
};

lazy_static! {
    // ============================================================================
    // HTTP Metrics
    // ============================================================================

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "estado_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "endpoint", "status"],
        vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0]
    ).unwrap();

    /// HTTP request count
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "estado_http_requests_total",
        "Total number of HTTP requests",
        &["method", "endpoint", "status"]
    ).unwrap();

    // ============================================================================
    // Authentication Metrics
    // ============================================================================

    /// Authentication duration in seconds
    pub static ref AUTH_DURATION: HistogramVec = register_histogram_vec!(
        "estado_auth_duration_seconds",
        "Authentication duration in seconds",
        &["auth_type"],
        vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100]
    ).unwrap();

    /// Authentication attempt count
    pub static ref AUTH_TOTAL: CounterVec = register_counter_vec!(
        "estado_auth_total",
        "Total authentication attempts",
        &["result", "auth_type"]
    ).unwrap();

    // ============================================================================
    // Lock Metrics
    // ============================================================================

    /// Lock operations by outcome (granted, denied, error)
    pub static ref LOCK_OPERATIONS_TOTAL: CounterVec = register_counter_vec!(
        "estado_lock_operations_total",
        "Total lock actor operations by outcome",
        &["operation", "result"]
    ).unwrap();

    /// Time an actor spends on one command, including record I/O
    pub static ref LOCK_ACTOR_OP_DURATION: HistogramVec = register_histogram_vec!(
        "estado_lock_actor_operation_duration_seconds",
        "Lock actor command duration in seconds",
        &["operation"],
        vec![0.00001, 0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500]
    ).unwrap();

    /// Live lock actors
    pub static ref LOCK_ACTORS_ACTIVE: Gauge = register_gauge!(
        "estado_lock_actors_active",
        "Number of live lock actors"
    ).unwrap();

    // ============================================================================
    // Storage Metrics
    // ============================================================================

    /// Blob store operation duration in seconds
    pub static ref STORAGE_OP_DURATION: HistogramVec = register_histogram_vec!(
        "estado_storage_operation_duration_seconds",
        "Blob store operation duration in seconds",
        &["operation", "backend"],
        vec![0.0001, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5]
    ).unwrap();

    // ============================================================================
    // Error Metrics
    // ============================================================================

    /// Error count by type and component
    pub static ref ERROR_TOTAL: CounterVec = register_counter_vec!(
        "estado_error_total",
        "Total number of errors",
        &["error_type", "component"]
    ).unwrap();
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Record authentication duration
pub fn record_auth_duration(auth_type: &str, duration: f64) {
    AUTH_DURATION.with_label_values(&[auth_type]).observe(duration);
}

/// Increment successful authentication counter
pub fn increment_auth_success(auth_type: &str) {
    AUTH_TOTAL
        .with_label_values(&["success", auth_type])
        .inc();
}

/// Increment failed authentication counter
pub fn increment_auth_failure(auth_type: &str) {
    AUTH_TOTAL
        .with_label_values(&["failure", auth_type])
        .inc();
}

/// Record the outcome of a lock actor operation
pub fn record_lock_op(operation: &str, result: &str) {
    LOCK_OPERATIONS_TOTAL
        .with_label_values(&[operation, result])
        .inc();
}

/// Record how long an actor took to process one command
pub fn record_actor_op(operation: &str, duration: f64) {
    LOCK_ACTOR_OP_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn set_lock_actors_active(count: usize) {
    LOCK_ACTORS_ACTIVE.set(count as f64);
}

/// Record blob store operation duration
pub fn record_storage_op(operation: &str, backend: &str, duration: f64) {
    STORAGE_OP_DURATION
        .with_label_values(&[operation, backend])
        .observe(duration);
}

/// Increment error counter
pub fn increment_error(error_type: &str, component: &str) {
    ERROR_TOTAL
        .with_label_values(&[error_type, component])
        .inc();
}

/// Increment HTTP request counter
pub fn increment_http_request(method: &str, endpoint: &str, status: &str) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, status])
        .inc();
}

/// Record HTTP request duration
pub fn record_http_duration(method: &str, endpoint: &str, status: &str, duration: f64) {
    HTTP_REQUEST_DURATION
        .with_label_values(&[method, endpoint, status])
        .observe(duration);
}

/// Gather all metrics for Prometheus exposition
pub fn gather_metrics() -> Vec<u8> {
    use prometheus::Encoder;
    let encoder = TextEncoder::new();
    // Use the default registry since our metrics are registered there
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
    }
    buffer
}
