//! The change dispatcher: one background worker per active replica.
//!
//! Workers run independently and never block one another; the only
//! state a worker owns is its replica's cursor. Deactivating a replica
//! stops its worker cleanly without touching the cursor.

mod cursor;
mod transport;
mod worker;

pub use cursor::{CursorError, CursorStore, FsCursorStore};
pub use transport::{DeliveryError, HttpTransport, SyncDelivery, SyncTransport};
pub use worker::{ReplicaStatus, SyncState, WorkerHandle, spawn_worker};

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::SyncTuning;
use crate::replica::ReplicaRegistry;
use crate::store::{ChangeLog, DocumentStore};

/// Shared handles a worker needs. Cloning is cheap; every handle is
/// passed explicitly rather than read from ambient state.
#[derive(Clone)]
pub struct DispatchContext {
    pub store: Arc<dyn DocumentStore>,
    pub changes: Arc<dyn ChangeLog>,
    pub cursors: Arc<dyn CursorStore>,
    pub transport: Arc<dyn SyncTransport>,
    pub tuning: SyncTuning,
}

/// Owns the worker set for a registry of replicas.
pub struct Dispatcher {
    workers: BTreeMap<String, WorkerHandle>,
}

impl Dispatcher {
    /// Spawn one worker per active registry entry.
    pub fn start(registry: &ReplicaRegistry, ctx: DispatchContext) -> Self {
        let mut workers = BTreeMap::new();
        for replica in registry.active() {
            tracing::debug!(replica = %replica.name, url = %replica.url, "starting sync worker");
            workers.insert(
                replica.name.clone(),
                spawn_worker(replica.clone(), ctx.clone()),
            );
        }
        Self { workers }
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.workers.contains_key(name)
    }

    pub fn status(&self) -> BTreeMap<String, ReplicaStatus> {
        self.workers
            .iter()
            .map(|(name, handle)| (name.clone(), handle.status()))
            .collect()
    }

    /// Stop one replica's worker (deactivation). Its cursor stays where
    /// delivery was last confirmed.
    pub fn stop(&mut self, name: &str) {
        if let Some(handle) = self.workers.remove(name) {
            handle.shutdown();
        }
    }

    /// Signal every worker and wait for all of them to finish.
    pub fn shutdown(self) {
        for (_, handle) in self.workers {
            handle.shutdown();
        }
    }
}
