//! Telemetry Failure Taxonomy
//!
//! Telemetry must never crash, block, or visibly degrade the host
//! application. Every failure mode here degrades to "telemetry silently
//! incomplete": occurrences are classified, logged once through the `log`
//! facade, and absorbed. Nothing in this module is ever surfaced to a
//! `track()` or `enqueue()` caller.

/// Classified, non-fatal telemetry failures
#[derive(Debug, Clone)]
pub enum TelemetryFailure {
    /// Identity file could not be written; an ephemeral id is used
    /// for the current process
    IdentityPersistence(String),

    /// A log line could not be appended; that event is absent from the
    /// durable log only
    LogWrite(String),

    /// The rotate-and-rename step failed; the log keeps growing past the
    /// threshold until a later rotation succeeds
    Rotation(String),

    /// The transport rejected or failed a batch; the batch is lost
    NetworkSend(String),
}

impl std::fmt::Display for TelemetryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdentityPersistence(e) => write!(f, "identity persistence failed: {}", e),
            Self::LogWrite(e) => write!(f, "log write failed: {}", e),
            Self::Rotation(e) => write!(f, "log rotation failed: {}", e),
            Self::NetworkSend(e) => write!(f, "network send failed: {}", e),
        }
    }
}

impl std::error::Error for TelemetryFailure {}

/// Log a classified failure to the diagnostic sink and move on
pub(crate) fn report(failure: TelemetryFailure) {
    log::warn!("telemetry: {}", failure);
}
