use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Short-lived reference to a locally renderable copy of a file's bytes.
///
/// Handles are created at ingestion and must be revoked through the
/// [`PreviewStore`] that issued them once the file is removed or the batch cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviewHandle(Uuid);

impl PreviewHandle {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "preview:{}", self.0)
    }
}

/// Registry of live previews. Cloning shares the same registry.
#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    entries: Arc<Mutex<HashMap<Uuid, Arc<[u8]>>>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, bytes: Arc<[u8]>) -> PreviewHandle {
        let id = Uuid::new_v4();
        self.lock().insert(id, bytes);
        PreviewHandle(id)
    }

    /// Bytes behind a live handle; `None` once revoked.
    pub fn resolve(&self, handle: &PreviewHandle) -> Option<Arc<[u8]>> {
        self.lock().get(&handle.0).cloned()
    }

    /// Release a handle. Returns `false` if it was already revoked.
    pub fn revoke(&self, handle: &PreviewHandle) -> bool {
        let removed = self.lock().remove(&handle.0).is_some();
        if removed {
            tracing::debug!("Revoked {handle}");
        }
        removed
    }

    pub fn is_live(&self, handle: &PreviewHandle) -> bool {
        self.lock().contains_key(&handle.0)
    }

    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<[u8]>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
