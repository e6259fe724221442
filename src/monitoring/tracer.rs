/*!
 * Structured Tracing
 * Subscriber setup and spans for host calls made on behalf of guest code
 *
 * Features:
 * - Env-filtered output, human readable or JSON
 * - Per-call trace IDs for correlating policy decisions with host work
 * - Slow host call warnings
 */

use crate::core::limits::{ENV_TRACE_JSON, SLOW_HOST_CALL_MS};
use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - MEMBRANE_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns false if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Structured tracing initialized");
    }
    installed
}

/// Generate a unique trace ID for request correlation
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span around one host invocation triggered from the sandbox
pub struct HostCallSpan {
    span: tracing::Span,
    start: Instant,
    callee: String,
    trace_id: String,
}

impl HostCallSpan {
    pub fn new(callee: &str, args: usize) -> Self {
        let trace_id = generate_trace_id();

        let span = span!(
            Level::DEBUG,
            "host_call",
            trace_id = %trace_id,
            callee = callee,
            args = args,
            duration_us = tracing::field::Empty,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            callee: callee.to_string(),
            trace_id,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn record_result(&self, success: bool) {
        self.span
            .record("result", if success { "success" } else { "error" });
    }

    pub fn record_error(&self, error: &str) {
        self.span.record("error", error);
        self.span.record("result", "error");
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for HostCallSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_us", duration.as_micros() as u64);

        if duration.as_millis() > SLOW_HOST_CALL_MS {
            warn!(
                trace_id = %self.trace_id,
                callee = %self.callee,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow host call"
            );
        } else {
            debug!(
                trace_id = %self.trace_id,
                callee = %self.callee,
                duration_us = duration.as_micros() as u64,
                "host call completed"
            );
        }
    }
}

/// Helper to create a host call span
#[inline]
pub fn span_host_call(callee: &str, args: usize) -> HostCallSpan {
    HostCallSpan::new(callee, args)
}
