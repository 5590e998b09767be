//! Event Recorder
//!
//! Owns the session identifier and monotonic sequence counter, builds
//! [`TelemetryEvent`] records and appends them, in order, to the local
//! JSONL log. A single worker task serializes every append with the
//! rotation check, so log order always equals `track()` call order and an
//! event can never be split across a rotated-out file and its successor.
//! `track()` never blocks the caller and never fails.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::constants::{
    DATA_DIR_NAME, IDENTITY_FILE_NAME, LOG_FILE_NAME, ROTATE_THRESHOLD_BYTES,
};
use crate::error::{report, TelemetryFailure};
use crate::event::{Props, TelemetryEvent};
use crate::identity;
use crate::uploader::Uploader;

/// Locations of the log and identity files
#[derive(Debug, Clone)]
pub struct TelemetryPaths {
    pub log_file: PathBuf,
    pub identity_file: PathBuf,
}

impl TelemetryPaths {
    /// Default locations under the platform-local data directory
    pub fn default_paths() -> Self {
        let dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DATA_DIR_NAME);
        Self::in_dir(&dir)
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self {
            log_file: dir.join(LOG_FILE_NAME),
            identity_file: dir.join(IDENTITY_FILE_NAME),
        }
    }
}

/// Host application facts carried by the session-start event
#[derive(Debug, Clone)]
pub struct AppInfo {
    pub version: String,
    pub locale: String,
}

enum WriteJob {
    Line(String),
    /// Ack once every previously submitted line has been processed
    Sync(oneshot::Sender<()>),
}

/// Sequence counter and worker hand-off, guarded together so that seq
/// assignment order equals write-queue order
struct Producer {
    seq: u64,
    tx: mpsc::UnboundedSender<WriteJob>,
}

/// Ordered, durable event recorder
///
/// One instance owns one log file; two instances must never target the
/// same path (single-writer assumption, not enforced across processes).
pub struct Recorder {
    install_id: String,
    session_id: String,
    log_file: PathBuf,
    producer: Mutex<Producer>,
    uploader: RwLock<Option<Arc<Uploader>>>,
}

impl Recorder {
    /// Initialize the recorder: load the installation id, generate a fresh
    /// session id, spawn the write worker and emit the two bootstrap
    /// events. Must run inside a tokio runtime.
    pub fn init(paths: TelemetryPaths, app: &AppInfo) -> Self {
        let install_id = identity::load(&paths.identity_file);
        let session_id = Uuid::new_v4().to_string();

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_worker(paths.log_file.clone(), rx));

        let recorder = Self {
            install_id,
            session_id,
            log_file: paths.log_file,
            producer: Mutex::new(Producer { seq: 0, tx }),
            uploader: RwLock::new(None),
        };

        log::info!(
            "Telemetry session {} started, log at {:?}",
            recorder.session_id,
            recorder.log_file
        );

        recorder.track("session.start", Some(session_start_props(app)));
        recorder.track("session.env", Some(environment_props()));
        recorder
    }

    /// Record one event.
    ///
    /// Stamps timestamp, identity and the next sequence number, hands the
    /// serialized line to the write worker and returns immediately. A copy
    /// goes to the attached uploader, if any. Never raises.
    pub fn track(&self, event: &str, props: Option<Props>) {
        let record = {
            let mut producer = self.producer.lock();
            producer.seq += 1;
            let record = TelemetryEvent {
                ts: Utc::now().to_rfc3339(),
                event: event.to_string(),
                props,
                install_id: self.install_id.clone(),
                session_id: self.session_id.clone(),
                seq: producer.seq,
            };
            match record.to_json_line() {
                Ok(line) => {
                    // Worker gone means process shutdown; nothing to do
                    let _ = producer.tx.send(WriteJob::Line(line));
                }
                Err(e) => report(TelemetryFailure::LogWrite(e.to_string())),
            }
            record
        };

        if let Some(uploader) = self.uploader.read().as_ref() {
            uploader.enqueue(record);
        }
    }

    /// Bind a remote uploader; before attachment events are recorded
    /// locally only.
    pub fn attach_uploader(&self, uploader: Arc<Uploader>) {
        *self.uploader.write() = Some(uploader);
    }

    /// The resolved installation identifier, for diagnostic display
    pub fn install_id(&self) -> &str {
        &self.install_id
    }

    /// Identifier of this process run
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Path of the active log file
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Wait until every event tracked so far is durably appended
    pub async fn sync(&self) {
        let ack = {
            let producer = self.producer.lock();
            let (tx, rx) = oneshot::channel();
            if producer.tx.send(WriteJob::Sync(tx)).is_err() {
                return;
            }
            rx
        };
        let _ = ack.await;
    }
}

// ============================================================================
// WRITE WORKER
// ============================================================================

struct WriterState {
    path: PathBuf,
    file: Option<File>,
    size: u64,
}

/// Single-consumer worker: strictly FIFO, one append (and at most one
/// rotation decision) at a time.
async fn write_worker(path: PathBuf, mut rx: mpsc::UnboundedReceiver<WriteJob>) {
    let mut state = WriterState {
        path,
        file: None,
        size: 0,
    };

    while let Some(job) = rx.recv().await {
        match job {
            WriteJob::Line(line) => {
                if let Err(e) = append_line(&mut state, &line) {
                    report(TelemetryFailure::LogWrite(e.to_string()));
                }
            }
            WriteJob::Sync(ack) => {
                let _ = ack.send(());
            }
        }
    }
    log::debug!("Telemetry write worker ended");
}

fn append_line(state: &mut WriterState, line: &str) -> std::io::Result<()> {
    if state.file.is_none() {
        let file = open_log(&state.path)?;
        state.size = file.metadata()?.len();
        state.file = Some(file);
    }

    if let Some(file) = state.file.as_mut() {
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        state.size += line.len() as u64 + 1;
    }

    if state.size > ROTATE_THRESHOLD_BYTES {
        rotate(state);
    }
    Ok(())
}

/// Rename the oversized file to a timestamp-suffixed sibling and reopen a
/// fresh file at the canonical path. Failure is non-fatal: the log keeps
/// growing and rotation is retried after the next append.
fn rotate(state: &mut WriterState) {
    // Close the handle before renaming
    state.file = None;

    let rotated = rotated_path(&state.path, Utc::now().timestamp_millis());
    match std::fs::rename(&state.path, &rotated) {
        Ok(()) => {
            log::info!("Rotated telemetry log to {:?}", rotated);
            state.size = 0;
            match open_log(&state.path) {
                Ok(file) => state.file = Some(file),
                Err(e) => report(TelemetryFailure::Rotation(e.to_string())),
            }
        }
        Err(e) => report(TelemetryFailure::Rotation(e.to_string())),
    }
}

fn rotated_path(path: &Path, ts_millis: i64) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("telemetry");
    let name = match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => format!("{}-{}.{}", stem, ts_millis, ext),
        None => format!("{}-{}", stem, ts_millis),
    };
    path.with_file_name(name)
}

fn open_log(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

// ============================================================================
// BOOTSTRAP EVENTS
// ============================================================================

fn session_start_props(app: &AppInfo) -> Props {
    let mut props = Props::new();
    props.insert("version".to_string(), json!(app.version));
    props.insert("locale".to_string(), json!(app.locale));
    props
}

fn environment_props() -> Props {
    use sysinfo::System;

    let mut sys = System::new();
    sys.refresh_all();

    let mut props = Props::new();
    props.insert("platform".to_string(), json!(std::env::consts::OS));
    props.insert("arch".to_string(), json!(std::env::consts::ARCH));
    props.insert("cpus".to_string(), json!(sys.cpus().len()));
    if let Some(cpu) = sys.cpus().first() {
        props.insert("cpuModel".to_string(), json!(cpu.brand().trim()));
    }
    props.insert("memBytes".to_string(), json!(sys.total_memory()));
    props
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SharedSettings;
    use crate::transport::HttpTransport;
    use crate::uploader::UploaderConfig;
    use std::time::Duration;
    use tempfile::TempDir;

    fn app() -> AppInfo {
        AppInfo {
            version: "2.4.0".to_string(),
            locale: "en-US".to_string(),
        }
    }

    fn read_log(path: &Path) -> Vec<TelemetryEvent> {
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_seq_is_gapless_and_ordered() {
        let _ = env_logger::builder().is_test(true).try_init();
        let temp_dir = TempDir::new().unwrap();
        let recorder = Recorder::init(TelemetryPaths::in_dir(temp_dir.path()), &app());

        for i in 0..25 {
            recorder.track("story.edit", Some(Props::from_iter([(
                "pass".to_string(),
                json!(i),
            )])));
        }
        recorder.sync().await;

        let events = read_log(recorder.log_file());
        // 2 bootstrap events + 25 tracked
        assert_eq!(events.len(), 27);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.seq, i as u64 + 1);
        }
        assert_eq!(events[0].event, "session.start");
        assert_eq!(events[1].event, "session.env");
        assert_eq!(events[2].event, "story.edit");
    }

    #[tokio::test]
    async fn test_bootstrap_events_carry_app_and_environment() {
        let temp_dir = TempDir::new().unwrap();
        let recorder = Recorder::init(TelemetryPaths::in_dir(temp_dir.path()), &app());
        recorder.sync().await;

        let events = read_log(recorder.log_file());
        let start = events[0].props.as_ref().unwrap();
        assert_eq!(start.get("version"), Some(&json!("2.4.0")));
        assert_eq!(start.get("locale"), Some(&json!("en-US")));

        let env = events[1].props.as_ref().unwrap();
        assert_eq!(env.get("platform"), Some(&json!(std::env::consts::OS)));
        assert!(env.get("cpus").unwrap().as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn test_install_id_survives_sessions() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TelemetryPaths::in_dir(temp_dir.path());

        let first = Recorder::init(paths.clone(), &app());
        let install_id = first.install_id().to_string();
        let session_id = first.session_id().to_string();
        first.sync().await;
        drop(first);

        let second = Recorder::init(paths, &app());
        assert_eq!(second.install_id(), install_id);
        assert_ne!(second.session_id(), session_id);
        second.sync().await;
    }

    #[tokio::test]
    async fn test_rotation_past_threshold_leaves_fresh_canonical_file() {
        let temp_dir = TempDir::new().unwrap();
        let recorder = Recorder::init(TelemetryPaths::in_dir(temp_dir.path()), &app());

        let filler = "x".repeat(10_000);
        // ~1.1 MB of lines: exactly one rotation
        for _ in 0..110 {
            recorder.track(
                "story.save",
                Some(Props::from_iter([("body".to_string(), json!(filler.clone()))])),
            );
        }
        recorder.sync().await;

        let canonical_len = std::fs::metadata(recorder.log_file()).unwrap().len();
        assert!(canonical_len < ROTATE_THRESHOLD_BYTES);

        let rotated: Vec<PathBuf> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                let name = p.file_name().unwrap().to_string_lossy().to_string();
                name.starts_with("telemetry-") && name.ends_with(".log")
            })
            .collect();
        assert_eq!(rotated.len(), 1);
        assert!(std::fs::metadata(&rotated[0]).unwrap().len() > ROTATE_THRESHOLD_BYTES);

        // Post-rotation events keep their session-wide seq ordering
        recorder.track("story.close", None);
        recorder.sync().await;
        let tail = read_log(recorder.log_file());
        assert_eq!(tail.last().unwrap().event, "story.close");
        assert_eq!(tail.last().unwrap().seq, 113);
    }

    #[test]
    fn test_rotated_name_keeps_stem_and_extension() {
        let path = Path::new("/data/story-editor/telemetry.log");
        let rotated = rotated_path(path, 1_750_000_000_000);
        assert_eq!(
            rotated,
            PathBuf::from("/data/story-editor/telemetry-1750000000000.log")
        );
    }

    #[tokio::test]
    async fn test_events_flow_to_attached_uploader() {
        let temp_dir = TempDir::new().unwrap();
        let recorder = Recorder::init(TelemetryPaths::in_dir(temp_dir.path()), &app());

        let settings = Arc::new(SharedSettings::new());
        settings.set_share_enabled(true);
        let uploader = Uploader::spawn(
            settings,
            Arc::new(HttpTransport::new()),
            UploaderConfig {
                batch_size: 50,
                flush_interval: Duration::from_secs(600),
            },
        );
        recorder.attach_uploader(Arc::clone(&uploader));

        recorder.track("story.new", None);
        recorder.track("story.edit", None);
        recorder.sync().await;

        // Bootstrap events predate attachment; only the two tracked after
        // attachment reach the queue
        assert_eq!(uploader.queue_len(), 2);
        uploader.stop();
    }
}
