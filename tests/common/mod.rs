//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::json;

use folio::config::SyncTuning;
use folio::dispatcher::{DeliveryError, DispatchContext, FsCursorStore, SyncDelivery, SyncTransport};
use folio::{
    ChangeLog, ChangeRecord, DocumentStore, MemoryStore, Namespace, Policy, ReplicaEntry,
    Timestamp,
};

/// Transport that records deliveries in memory, optionally rejecting
/// the first `fail_next` pushes with a 503.
#[derive(Default)]
pub struct RecordingTransport {
    fail_next: AtomicUsize,
    deliveries: Mutex<Vec<SyncDelivery>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(times: usize) -> Arc<Self> {
        let transport = Self::default();
        transport.fail_next.store(times, Ordering::SeqCst);
        Arc::new(transport)
    }

    pub fn deliveries(&self) -> Vec<SyncDelivery> {
        self.deliveries.lock().expect("deliveries lock").clone()
    }

    pub fn delivered_ids(&self) -> Vec<String> {
        self.deliveries()
            .into_iter()
            .map(|d| d.record_id)
            .collect()
    }
}

impl SyncTransport for RecordingTransport {
    fn push(&self, url: &str, delivery: &SyncDelivery) -> Result<(), DeliveryError> {
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(DeliveryError::Rejected {
                url: url.to_string(),
                status: 503,
            });
        }
        self.deliveries
            .lock()
            .expect("deliveries lock")
            .push(delivery.clone());
        Ok(())
    }
}

pub fn fast_tuning() -> SyncTuning {
    SyncTuning {
        poll_interval_ms: 10,
        batch_size: 50,
        request_timeout_ms: 1_000,
        backoff_base_ms: 5,
        backoff_max_ms: 40,
    }
}

pub fn context(
    store: &Arc<MemoryStore>,
    transport: &Arc<RecordingTransport>,
    cursor_dir: &std::path::Path,
    tuning: SyncTuning,
) -> DispatchContext {
    DispatchContext {
        store: Arc::clone(store) as Arc<dyn DocumentStore>,
        changes: Arc::clone(store) as Arc<dyn ChangeLog>,
        cursors: Arc::new(FsCursorStore::new(cursor_dir)),
        transport: Arc::clone(transport) as Arc<dyn SyncTransport>,
        tuning,
    }
}

pub fn replica(name: &str, policy: Policy) -> ReplicaEntry {
    ReplicaEntry {
        name: name.to_string(),
        url: "https://replica.test".to_string(),
        active: true,
        policy,
    }
}

pub fn change(ts: u64, namespace: Namespace, id: &str) -> ChangeRecord {
    ChangeRecord {
        timestamp: Timestamp::new(ts),
        namespace,
        record_id: id.to_string(),
        deleted: false,
    }
}

pub fn deletion(ts: u64, namespace: Namespace, id: &str) -> ChangeRecord {
    ChangeRecord {
        deleted: true,
        ..change(ts, namespace, id)
    }
}

/// Seed a store with the "case" template: two text properties and one
/// relationship property pointing at relation type `r1`.
pub fn seed_case_template(store: &MemoryStore) {
    store.put_template(
        serde_json::from_value(json!({
            "id": "t1",
            "name": "Case",
            "common_properties": [
                { "id": "cp1", "name": "title", "label": "Title", "type": "text" }
            ],
            "properties": [
                { "id": "p1", "name": "summary", "label": "Summary", "type": "text" },
                { "id": "p2", "name": "location", "label": "Location", "type": "text" },
                { "id": "p3", "name": "involved", "label": "Involved", "type": "relationship",
                  "relation_type": "r1", "content": "" }
            ]
        }))
        .unwrap(),
    );
}

pub fn put_entity(store: &MemoryStore, id: &str, template: &str) {
    store.put_entity(serde_json::from_value(json!({ "id": id, "template": template })).unwrap());
}

pub fn put_connection(
    store: &MemoryStore,
    id: &str,
    entity: &str,
    template: Option<&str>,
    hub: &str,
) {
    let mut value = json!({ "id": id, "entity": entity, "hub": hub });
    if let Some(template) = template {
        value["template"] = json!(template);
    }
    store.put_connection(serde_json::from_value(value).unwrap());
}

/// Poll `cond` until it holds or a 5s deadline passes.
pub fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("timed out waiting for {what}");
}
