//! Trigger funneling for sync passes.
//!
//! The host environment owns connectivity callbacks, lifecycle events, and
//! timers; this module only decides whether a given trigger should request a
//! pass. Redundant concurrent triggers are already safe no-ops thanks to the
//! coordinator's single-flight guard.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::db::RecordStore;
use crate::error::Result;
use crate::sync::coordinator::{PassResult, SyncCoordinator};

/// Minimum interval hosts may register for the periodic trigger
pub const MIN_PERIODIC_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// External events that request a sync pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// Connectivity transitioned from offline to online
    ConnectivityRestored,
    /// The application returned to the foreground
    Foreground,
    /// A coarse-grained periodic timer fired
    PeriodicTimer,
    /// An explicit caller request
    Manual,
}

/// Funnels host triggers into coordinator passes
pub struct SyncScheduler {
    store: Arc<dyn RecordStore>,
    coordinator: Arc<SyncCoordinator>,
}

impl SyncScheduler {
    pub fn new(store: Arc<dyn RecordStore>, coordinator: Arc<SyncCoordinator>) -> Self {
        Self { store, coordinator }
    }

    /// Clamp a host-proposed periodic interval to the supported minimum
    #[must_use]
    pub fn clamp_periodic_interval(requested: Duration) -> Duration {
        requested.max(MIN_PERIODIC_INTERVAL)
    }

    /// Handle one trigger; every accepted trigger becomes the same pass
    /// request on the coordinator.
    pub async fn trigger(&self, trigger: SyncTrigger) -> Result<PassResult> {
        if trigger == SyncTrigger::Foreground {
            let counts = self.store.counts().await?;
            if counts.pending + counts.syncing + counts.failed == 0 {
                debug!("Foreground trigger with nothing to deliver; skipping");
                return Ok(PassResult::skipped());
            }
        }

        debug!(?trigger, "Sync pass requested");
        self.coordinator.sync_now().await
    }
}
