//! Installation Identity Store
//!
//! Persists a stable per-installation random identifier as a small JSON
//! file (`{ "id": "<uuid>" }`). Created once, read on every subsequent
//! startup. A persistence failure is non-fatal: the process runs with an
//! ephemeral identifier and a new one may be generated on the next run.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{report, TelemetryFailure};

/// Persisted identity record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationRecord {
    pub id: String,
}

/// Load the installation identifier, generating and persisting one if the
/// record is absent, unparsable, or empty.
///
/// The returned identifier is never empty.
pub fn load(path: &Path) -> String {
    if let Ok(content) = fs::read_to_string(path) {
        if let Ok(record) = serde_json::from_str::<InstallationRecord>(&content) {
            if !record.id.is_empty() {
                log::debug!("Installation id loaded from {:?}", path);
                return record.id;
            }
        }
        log::warn!("Installation id file unreadable, regenerating: {:?}", path);
    }

    let id = Uuid::new_v4().to_string();
    if let Err(e) = persist(path, &id) {
        report(TelemetryFailure::IdentityPersistence(e.to_string()));
    } else {
        log::info!("New installation id persisted to {:?}", path);
    }
    id
}

/// Best-effort write of a fresh identity record
fn persist(path: &Path, id: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let record = InstallationRecord { id: id.to_string() };
    let content = serde_json::to_string_pretty(&record)?;
    fs::write(path, content)
}
