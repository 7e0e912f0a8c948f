//! Tracks running scans so a client can cancel one by id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use crate::matching::CancelSignal;

#[derive(Debug, Clone, Default)]
pub struct ScanRegistry {
    running: Arc<Mutex<HashMap<Uuid, CancelSignal>>>,
}

/// Deregisters the scan when dropped, so a scan that errors out or whose
/// request is dropped does not linger in the registry.
pub struct ScanGuard {
    registry: ScanRegistry,
    id: Uuid,
    signal: CancelSignal,
}

impl ScanGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn signal(&self) -> &CancelSignal {
        &self.signal
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

impl ScanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scan under `id`. Returns `None` if that id is already running.
    pub fn register(&self, id: Uuid) -> Option<ScanGuard> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.contains_key(&id) {
            return None;
        }
        let signal = CancelSignal::new();
        running.insert(id, signal.clone());
        Some(ScanGuard {
            registry: self.clone(),
            id,
            signal,
        })
    }

    /// Signals cancellation. Returns false when no scan with this id is running.
    pub fn cancel(&self, id: Uuid) -> bool {
        let running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        match running.get(&id) {
            Some(signal) => {
                signal.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, id: Uuid) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    fn remove(&self, id: Uuid) {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}
