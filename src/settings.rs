//! Live Feature-Flag Source
//!
//! The uploader never caches sharing configuration: the predicate, endpoint
//! and whitelist are re-read on every operation so that runtime toggling in
//! the host application's settings takes effect immediately.

use parking_lot::RwLock;

/// Sharing configuration queried fresh on every uploader operation
pub trait TelemetrySettings: Send + Sync {
    /// Whether remote sharing is currently enabled
    fn share_enabled(&self) -> bool;

    /// Upload destination, if one is configured
    fn endpoint(&self) -> Option<String>;

    /// Permitted top-level property keys; `None` or empty means no
    /// whitelist filtering
    fn whitelist(&self) -> Option<Vec<String>>;
}

/// Mutable in-process settings, for hosts that manage flags directly
/// and for tests
#[derive(Default)]
pub struct SharedSettings {
    inner: RwLock<SettingsState>,
}

#[derive(Default)]
struct SettingsState {
    share_enabled: bool,
    endpoint: Option<String>,
    whitelist: Option<Vec<String>>,
}

impl SharedSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_share_enabled(&self, enabled: bool) {
        self.inner.write().share_enabled = enabled;
    }

    pub fn set_endpoint(&self, endpoint: Option<String>) {
        self.inner.write().endpoint = endpoint;
    }

    pub fn set_whitelist(&self, whitelist: Option<Vec<String>>) {
        self.inner.write().whitelist = whitelist;
    }
}

impl TelemetrySettings for SharedSettings {
    fn share_enabled(&self) -> bool {
        self.inner.read().share_enabled
    }

    fn endpoint(&self) -> Option<String> {
        self.inner.read().endpoint.clone()
    }

    fn whitelist(&self) -> Option<Vec<String>> {
        self.inner.read().whitelist.clone()
    }
}
