//! Prometheus metrics collection.
//!
//! Exposed in text format at `GET /metrics` on the main HTTP server.
//! Tracks scrape throughput, session population, and send failures.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

/// Total scrape cycles started (across all sessions).
pub static SCRAPE_CYCLES: OnceLock<IntCounter> = OnceLock::new();

/// Scrape cycles whose listing fetch failed.
pub static SCRAPE_FAILURES: OnceLock<IntCounter> = OnceLock::new();

/// Articles newly inserted into the store.
pub static ARTICLES_INSERTED: OnceLock<IntCounter> = OnceLock::new();

/// WebSocket messages successfully sent to clients.
pub static MESSAGES_SENT: OnceLock<IntCounter> = OnceLock::new();

/// Failed WebSocket sends (each one closes its session).
pub static SEND_FAILURES: OnceLock<IntCounter> = OnceLock::new();

/// Currently connected sessions.
pub static CONNECTED_SESSIONS: OnceLock<IntGauge> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at startup before any metrics are recorded.
/// Recording before (or without) init is a no-op, which keeps unit tests
/// free of global setup.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(
        SCRAPE_CYCLES,
        IntCounter::new("newswired_scrape_cycles_total", "Scrape cycles started")
    );
    register!(
        SCRAPE_FAILURES,
        IntCounter::new(
            "newswired_scrape_failures_total",
            "Scrape cycles whose listing fetch failed"
        )
    );
    register!(
        ARTICLES_INSERTED,
        IntCounter::new(
            "newswired_articles_inserted_total",
            "Articles newly inserted into the store"
        )
    );
    register!(
        MESSAGES_SENT,
        IntCounter::new(
            "newswired_messages_sent_total",
            "WebSocket messages sent to clients"
        )
    );
    register!(
        SEND_FAILURES,
        IntCounter::new("newswired_send_failures_total", "Failed WebSocket sends")
    );
    register!(
        CONNECTED_SESSIONS,
        IntGauge::new("newswired_connected_sessions", "Currently connected sessions")
    );
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

#[inline]
pub fn record_scrape_cycle() {
    if let Some(c) = SCRAPE_CYCLES.get() {
        c.inc();
    }
}

#[inline]
pub fn record_scrape_failure() {
    if let Some(c) = SCRAPE_FAILURES.get() {
        c.inc();
    }
}

#[inline]
pub fn record_articles_inserted(count: usize) {
    if let Some(c) = ARTICLES_INSERTED.get() {
        c.inc_by(count as u64);
    }
}

#[inline]
pub fn record_message_sent() {
    if let Some(c) = MESSAGES_SENT.get() {
        c.inc();
    }
}

#[inline]
pub fn record_send_failure() {
    if let Some(c) = SEND_FAILURES.get() {
        c.inc();
    }
}

#[inline]
pub fn session_connected() {
    if let Some(g) = CONNECTED_SESSIONS.get() {
        g.inc();
    }
}

#[inline]
pub fn session_disconnected() {
    if let Some(g) = CONNECTED_SESSIONS.get() {
        g.dec();
    }
}
