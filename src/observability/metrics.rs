//! Metrics collection and exposition.
//!
//! # Metrics
//! - `board_question_loads_total` (counter): question collection loads by outcome
//! - `board_questions` (gauge): size of the last published question collection
//! - `board_answer_fetches_total` (counter): per-question answer fetches by outcome
//! - `board_transactions_total` (counter): writes by kind (question, answer, accept) and outcome
//!
//! Recording is a no-op until a recorder is installed, so tests need no setup.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_question_load(outcome: &'static str) {
    metrics::counter!("board_question_loads_total", "outcome" => outcome).increment(1);
}

pub fn record_question_count(count: usize) {
    metrics::gauge!("board_questions").set(count as f64);
}

pub fn record_answer_fetch(outcome: &'static str) {
    metrics::counter!("board_answer_fetches_total", "outcome" => outcome).increment(1);
}

pub fn record_transaction(kind: &'static str, outcome: &'static str) {
    metrics::counter!("board_transactions_total", "kind" => kind, "outcome" => outcome).increment(1);
}
