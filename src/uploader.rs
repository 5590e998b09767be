//! Remote Uploader
//!
//! Optionally and safely forwards a privacy-filtered subset of events to a
//! remote destination: bounded in-memory queue, sanitize-and-batch on a
//! timer or size trigger, wholly inert unless sharing is enabled and a
//! destination is configured. Producers never block; flushing runs
//! independently on the runtime.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL_MS, QUEUE_HARD_CAP};
use crate::error::{report, TelemetryFailure};
use crate::event::TelemetryEvent;
use crate::sanitize::sanitize;
use crate::settings::TelemetrySettings;
use crate::transport::Transport;

/// Uploader tuning knobs
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    /// Events per batch; reaching this queue length triggers an immediate flush
    pub batch_size: usize,
    /// Interval between background flushes
    pub flush_interval: Duration,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
        }
    }
}

/// Flush state machine. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadState {
    Idle,
    Flushing,
    Stopped,
}

/// Gated, batching remote uploader
///
/// Sharing configuration is queried fresh from the injected
/// [`TelemetrySettings`] on every operation, never cached, so runtime
/// toggling takes effect immediately.
pub struct Uploader {
    settings: Arc<dyn TelemetrySettings>,
    transport: Arc<dyn Transport>,
    config: UploaderConfig,
    queue: Mutex<VecDeque<TelemetryEvent>>,
    state: Mutex<UploadState>,
    flush_now: Notify,
    shutdown: Notify,
}

impl Uploader {
    /// Create the uploader and start its background flush loop.
    ///
    /// The loop waits `flush_interval`, invokes [`flush`](Self::flush), and
    /// repeats until [`stop`](Self::stop) is called. Must run inside a
    /// tokio runtime.
    pub fn spawn(
        settings: Arc<dyn TelemetrySettings>,
        transport: Arc<dyn Transport>,
        config: UploaderConfig,
    ) -> Arc<Self> {
        let uploader = Arc::new(Self {
            settings,
            transport,
            config,
            queue: Mutex::new(VecDeque::new()),
            state: Mutex::new(UploadState::Idle),
            flush_now: Notify::new(),
            shutdown: Notify::new(),
        });

        let looper = Arc::clone(&uploader);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(looper.config.flush_interval) => {}
                    _ = looper.flush_now.notified() => {}
                    _ = looper.shutdown.notified() => break,
                }
                if looper.is_stopped() {
                    break;
                }
                looper.flush().await;
            }
            log::debug!("Uploader flush loop ended");
        });

        uploader
    }

    /// Queue one event for transmission.
    ///
    /// No-op while sharing is disabled or after [`stop`](Self::stop).
    /// Reaching `batch_size` wakes the background loop for an immediate
    /// flush; the queue never exceeds [`QUEUE_HARD_CAP`] (oldest entries
    /// are dropped).
    pub fn enqueue(&self, event: TelemetryEvent) {
        if self.is_stopped() || !self.settings.share_enabled() {
            return;
        }

        let should_flush = {
            let mut queue = self.queue.lock();
            queue.push_back(event);
            while queue.len() > QUEUE_HARD_CAP {
                queue.pop_front();
            }
            queue.len() >= self.config.batch_size
        };

        if should_flush {
            // Permit is stored if the loop is mid-flush, so the trigger
            // is never lost
            self.flush_now.notify_one();
        }
    }

    /// Drain up to `batch_size` events, sanitize them, and hand the batch
    /// to the transport.
    ///
    /// No-op when a flush is already in progress, sharing is disabled, no
    /// endpoint is configured, the queue is empty, or the uploader is
    /// stopped. The batch leaves the queue before the transport call; a
    /// transport failure loses that batch.
    pub async fn flush(&self) {
        {
            let mut state = self.state.lock();
            if *state != UploadState::Idle {
                return;
            }
            *state = UploadState::Flushing;
        }

        if !self.settings.share_enabled() {
            self.finish_flush();
            return;
        }
        let endpoint = match self.settings.endpoint() {
            Some(endpoint) => endpoint,
            None => {
                self.finish_flush();
                return;
            }
        };

        let batch: Vec<TelemetryEvent> = {
            let mut queue = self.queue.lock();
            let take = queue.len().min(self.config.batch_size);
            queue.drain(..take).collect()
        };
        if batch.is_empty() {
            self.finish_flush();
            return;
        }

        let whitelist = self.settings.whitelist();
        let batch: Vec<TelemetryEvent> = batch
            .iter()
            .map(|event| sanitize(event, whitelist.as_deref()))
            .collect();

        log::debug!("Flushing {} events to {}", batch.len(), endpoint);
        if let Err(e) = self.transport.send(&endpoint, &batch).await {
            report(TelemetryFailure::NetworkSend(e.to_string()));
        }

        self.finish_flush();
    }

    /// Stop the uploader. Idempotent and terminal: the background loop
    /// ends and `flush()` permanently becomes a no-op. A flush already in
    /// flight is not cancelled.
    pub fn stop(&self) {
        *self.state.lock() = UploadState::Stopped;
        self.shutdown.notify_one();
    }

    pub fn is_stopped(&self) -> bool {
        *self.state.lock() == UploadState::Stopped
    }

    /// Number of events currently awaiting transmission
    pub fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    fn finish_flush(&self) {
        let mut state = self.state.lock();
        // stop() during an in-flight flush stays terminal
        if *state == UploadState::Flushing {
            *state = UploadState::Idle;
        }
    }

    #[cfg(test)]
    pub(crate) fn queued_seqs(&self) -> Vec<u64> {
        self.queue.lock().iter().map(|e| e.seq).collect()
    }
}
