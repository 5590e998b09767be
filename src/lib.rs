//! Story Editor Telemetry
//!
//! Local append-only event logging plus a gated, batching remote uploader.
//! Telemetry never crashes, blocks, or visibly degrades the host editor:
//! every failure mode degrades to "telemetry silently incomplete".
//!
//! ## Structure
//! - `event.rs` - TelemetryEvent wire struct (immutable, timestamped)
//! - `identity.rs` - stable per-installation identifier store
//! - `recorder.rs` - ordered JSONL writer with size-based rotation
//! - `sanitize.rs` - whitelist filtering + long-string hashing
//! - `uploader.rs` - bounded queue, flush state machine, background loop
//! - `transport.rs` - upload contract + HTTP implementation
//! - `settings.rs` - live sharing flags, re-read on every operation
//!
//! ## Usage
//! ```ignore
//! use story_telemetry::{AppInfo, Recorder, TelemetryPaths};
//!
//! // Initialize at app start (inside the tokio runtime)
//! let recorder = Recorder::init(TelemetryPaths::default_paths(), &AppInfo {
//!     version: env!("CARGO_PKG_VERSION").into(),
//!     locale: "en-US".into(),
//! });
//!
//! // Instrument call sites throughout the app
//! recorder.track("story.new", None);
//!
//! // Optionally attach the uploader once settings are available
//! let uploader = Uploader::spawn(settings, Arc::new(HttpTransport::new()),
//!     UploaderConfig::default());
//! recorder.attach_uploader(uploader);
//! ```

pub mod constants;
pub mod error;
pub mod event;
pub mod identity;
pub mod recorder;
pub mod sanitize;
pub mod settings;
pub mod transport;
pub mod uploader;

pub use error::TelemetryFailure;
pub use event::{Props, TelemetryEvent};
pub use identity::InstallationRecord;
pub use recorder::{AppInfo, Recorder, TelemetryPaths};
pub use sanitize::sanitize;
pub use settings::{SharedSettings, TelemetrySettings};
pub use transport::{HttpTransport, Transport, TransportError};
pub use uploader::{Uploader, UploaderConfig};
