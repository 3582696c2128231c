//! Per-operation context handed to every component.

use groupshift_client::GroupClient;
use groupshift_core::LifecycleConfig;

use crate::log::ExecutionLog;
use crate::recorder::CallRecorder;

/// Everything one lifecycle operation needs: the session it acquired, the
/// operator log, the call recorder, and the effective configuration.
#[derive(Clone, Copy)]
pub struct OpContext<'a> {
    pub client: &'a dyn GroupClient,
    pub log: &'a ExecutionLog,
    pub recorder: &'a dyn CallRecorder,
    pub config: &'a LifecycleConfig,
}

impl<'a> OpContext<'a> {
    pub fn new(
        client: &'a dyn GroupClient,
        log: &'a ExecutionLog,
        recorder: &'a dyn CallRecorder,
        config: &'a LifecycleConfig,
    ) -> Self {
        Self {
            client,
            log,
            recorder,
            config,
        }
    }

    /// Record one outgoing provider call.
    pub fn track(&self, call: &'static str) {
        self.recorder.record(call);
    }
}
