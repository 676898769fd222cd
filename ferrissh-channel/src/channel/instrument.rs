//! Read/write instrumentation: debug logging and session recording.
//!
//! Every backend owns an [`IoLog`] and calls [`IoLog::on_read`] /
//! [`IoLog::on_write`] at its read and write call sites.

use std::fmt;
use std::sync::Arc;

use log::{Level, debug, log_enabled};

/// Append-only sink receiving a copy of channel traffic.
///
/// The sink is owned by the caller; channels only append to it.
pub trait SessionLog: Send + Sync {
    /// Append text to the log.
    fn write(&self, data: &str);

    /// The log has been finalized.
    fn fin(&self) -> bool;

    /// Writes (not only reads) should be recorded.
    fn record_writes(&self) -> bool;
}

/// Logging handle injected into each backend.
#[derive(Clone)]
pub struct IoLog {
    target: String,
    enabled: bool,
    session_log: Option<Arc<dyn SessionLog>>,
}

impl IoLog {
    /// Default `log` target for channel traffic.
    pub const DEFAULT_TARGET: &'static str = "ferrissh_channel::io";

    /// Log traffic under `target`.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            enabled: true,
            session_log: None,
        }
    }

    /// No traffic logging and no session log.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Attach a session log.
    pub fn with_session_log(mut self, session_log: Arc<dyn SessionLog>) -> Self {
        self.session_log = Some(session_log);
        self
    }

    /// Turn traffic logging on or off. The session log is unaffected.
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// The `log` target traffic is emitted under.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The attached session log, if any.
    pub fn session_log(&self) -> Option<&Arc<dyn SessionLog>> {
        self.session_log.as_ref()
    }

    /// Record data returned from a read.
    pub fn on_read(&self, data: &str) {
        if data.is_empty() {
            return;
        }
        if self.enabled {
            debug!(target: self.target.as_str(), "read_channel: {:?}", data);
        }
        if let Some(session_log) = &self.session_log {
            session_log.write(data);
        }
    }

    /// Record data that was written. `raw` is the encoded form.
    pub fn on_write(&self, raw: &[u8], data: &str) {
        if self.enabled && log_enabled!(target: self.target.as_str(), Level::Debug) {
            debug!(target: self.target.as_str(), "write_channel: b\"{}\"", raw.escape_ascii());
        }
        if let Some(session_log) = &self.session_log {
            if session_log.fin() || session_log.record_writes() {
                session_log.write(data);
            }
        }
    }
}

impl Default for IoLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TARGET)
    }
}

impl fmt::Debug for IoLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoLog")
            .field("target", &self.target)
            .field("enabled", &self.enabled)
            .field("session_log", &self.session_log.is_some())
            .finish()
    }
}
