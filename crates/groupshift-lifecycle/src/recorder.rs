//! Provider call accounting.
//!
//! A recorder is injected per facade instead of living in global state.

use tracing::debug;

/// Observes every provider call an operation issues.
pub trait CallRecorder: Send + Sync {
    fn record(&self, call: &'static str);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl CallRecorder for NoopRecorder {
    fn record(&self, _call: &'static str) {}
}

/// Emits one debug event per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl CallRecorder for TracingRecorder {
    fn record(&self, call: &'static str) {
        debug!(target: "groupshift::calls", call, "provider call");
    }
}
