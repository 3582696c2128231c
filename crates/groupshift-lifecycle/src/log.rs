//! Operator-facing execution log.
//!
//! Messages go to an optional injected sink (the deployment step's log
//! stream) and are always mirrored to `tracing`. With no sink attached the
//! operator stream is a no-op.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Receives operator-facing messages.
pub type LogSink = Arc<dyn Fn(&str, LogLevel) + Send + Sync>;

#[derive(Clone, Default)]
pub struct ExecutionLog {
    sink: Option<LogSink>,
}

impl fmt::Debug for ExecutionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionLog")
            .field("attached", &self.sink.is_some())
            .finish()
    }
}

impl ExecutionLog {
    pub fn new(sink: Option<LogSink>) -> Self {
        Self { sink }
    }

    pub fn is_attached(&self) -> bool {
        self.sink.is_some()
    }

    pub fn info(&self, message: &str) {
        self.emit(message, LogLevel::Info);
    }

    pub fn warn(&self, message: &str) {
        self.emit(message, LogLevel::Warn);
    }

    pub fn error(&self, message: &str) {
        self.emit(message, LogLevel::Error);
    }

    pub fn emit(&self, message: &str, level: LogLevel) {
        match level {
            LogLevel::Info => info!(target: "groupshift::execution", "{message}"),
            LogLevel::Warn => warn!(target: "groupshift::execution", "{message}"),
            LogLevel::Error => error!(target: "groupshift::execution", "{message}"),
        }
        if let Some(sink) = &self.sink {
            sink(message, level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn detached_log_is_a_no_op() {
        let log = ExecutionLog::default();
        assert!(!log.is_attached());
        log.info("nobody hears this");
    }

    #[test]
    fn attached_sink_receives_level() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = lines.clone();
        let log = ExecutionLog::new(Some(Arc::new(move |msg: &str, level: LogLevel| {
            captured.lock().unwrap().push((msg.to_string(), level));
        })));

        log.error("Request timeout");
        assert_eq!(
            lines.lock().unwrap().as_slice(),
            &[("Request timeout".to_string(), LogLevel::Error)]
        );
    }
}
