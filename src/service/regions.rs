//! Region registry
//!
//! One [`InspectorBackend`] per served region, built once at startup and kept
//! for the life of the process. Each backend sits behind its own mutex: the
//! backend has no internal synchronization, so every request holds the lock
//! of its region for the whole (synchronous) operation.

use crate::inspector::{InspectorBackend, InspectorError, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

pub struct RegionRegistry {
    backends: HashMap<String, Mutex<InspectorBackend>>,
    default_region: String,
}

impl RegionRegistry {
    /// Build a backend for every region.
    /// The default region is always served, even if not listed.
    pub fn new<S: AsRef<str>>(regions: &[S], default_region: &str, account_id: &str) -> Self {
        let mut backends: HashMap<String, Mutex<InspectorBackend>> = regions
            .iter()
            .map(|region| {
                let region = region.as_ref();
                (
                    region.to_string(),
                    Mutex::new(InspectorBackend::new(region, account_id)),
                )
            })
            .collect();

        backends
            .entry(default_region.to_string())
            .or_insert_with(|| Mutex::new(InspectorBackend::new(default_region, account_id)));

        tracing::info!(
            "Region registry ready: {} regions, default {}",
            backends.len(),
            default_region
        );

        Self {
            backends,
            default_region: default_region.to_string(),
        }
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    pub fn contains(&self, region: &str) -> bool {
        self.backends.contains_key(region)
    }

    /// Served regions, sorted
    pub fn regions(&self) -> Vec<&str> {
        let mut regions: Vec<&str> = self.backends.keys().map(|r| r.as_str()).collect();
        regions.sort_unstable();
        regions
    }

    /// Lock the backend of a region
    pub fn backend(&self, region: &str) -> Result<MutexGuard<'_, InspectorBackend>> {
        let backend = self
            .backends
            .get(region)
            .ok_or_else(|| InspectorError::UnsupportedRegion(region.to_string()))?;
        // Poisoned locks are recovered: operations never leave partial state
        Ok(backend.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Reset every region in place
    pub fn reset_all(&self) {
        for backend in self.backends.values() {
            backend.lock().unwrap_or_else(|e| e.into_inner()).reset();
        }
    }
}
