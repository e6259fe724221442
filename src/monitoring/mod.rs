/*!
 * Monitoring
 * Tracing setup and spans for boundary activity
 */

mod tracer;

pub use tracer::{generate_trace_id, init_tracing, span_host_call, HostCallSpan};
