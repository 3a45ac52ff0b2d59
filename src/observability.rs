use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: changes accepted by `enqueue`. Labels: none.
pub const ENQUEUED_TOTAL: &str = "mailpool_enqueued_total";

/// Counter: enqueues that merged into an existing entry instead of
/// creating a new one.
pub const MERGED_TOTAL: &str = "mailpool_merged_total";

/// Counter: fast-track flushes requested.
pub const FAST_TRACKED_TOTAL: &str = "mailpool_fast_tracked_total";

/// Counter: appointments dropped without notification.
pub const DROPPED_TOTAL: &str = "mailpool_dropped_total";

// ── Sweep metrics ───────────────────────────────────────────────

/// Counter: sweeps that found work (empty-pool ticks are not counted).
pub const SWEEPS_TOTAL: &str = "mailpool_sweeps_total";

/// Histogram: sweep duration in seconds, collaborator calls included.
pub const SWEEP_DURATION_SECONDS: &str = "mailpool_sweep_duration_seconds";

/// Counter: entries re-queued because they were updated too recently.
pub const REQUEUED_TOTAL: &str = "mailpool_requeued_total";

// ── Mail metrics ────────────────────────────────────────────────

/// Counter: mails handed to the sender successfully.
pub const MAILS_SENT_TOTAL: &str = "mailpool_mails_sent_total";

/// Counter: compose or transport failures (logged and swallowed).
pub const MAIL_FAILURES_TOTAL: &str = "mailpool_mail_failures_total";

/// Gauge: entries currently pending in the pool.
pub const PENDING_ENTRIES: &str = "mailpool_pending_entries";

/// Install a default fmt tracing subscriber, honoring `RUST_LOG`. For hosts
/// that embed the pool without their own tracing setup; call once at startup.
pub fn init_tracing() {
    tracing_subscriber::fmt::init();
}

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
