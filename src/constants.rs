//! Central Configuration Constants
//!
//! Single source of truth for the pipeline's fixed thresholds and defaults.
//! To change a rotation or batching default, only edit this file.

/// Maximum log file size before rotation (bytes)
pub const ROTATE_THRESHOLD_BYTES: u64 = 1_000_000;

/// Canonical log file name (rotated files get a timestamp suffix)
pub const LOG_FILE_NAME: &str = "telemetry.log";

/// Installation identity file name
pub const IDENTITY_FILE_NAME: &str = "install_id.json";

/// Default data directory name under the platform-local data dir
pub const DATA_DIR_NAME: &str = "story-editor";

/// Default number of events per upload batch
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default interval between background flushes (milliseconds)
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 15_000;

/// Hard cap on the upload queue; oldest entries beyond this are dropped
pub const QUEUE_HARD_CAP: usize = 500;

/// String property values longer than this are hashed before transmission
pub const MAX_STRING_PROP_LEN: usize = 100;

/// HTTP transport request timeout (seconds)
pub const TRANSPORT_TIMEOUT_SECS: u64 = 30;
