//! Dispatcher behavior: ordering, cursor durability, retries, shutdown.

mod common;

use std::sync::Arc;

use common::{
    RecordingTransport, change, context, deletion, fast_tuning, put_connection, put_entity,
    replica, seed_case_template, wait_for,
};
use serde_json::json;

use folio::dispatcher::{CursorStore, Dispatcher, FsCursorStore, spawn_worker};
use folio::{Cursor, MemoryStore, Namespace, Policy, ReplicaRegistry, Timestamp};

fn case_policy() -> Policy {
    serde_json::from_value(json!({ "templates": { "t1": { "properties": ["p1"] } } })).unwrap()
}

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    seed_case_template(&store);
    store
}

#[test]
fn delivers_in_order_and_advances_the_cursor() {
    let store = seeded_store();
    put_entity(&store, "e1", "t1");
    put_entity(&store, "e2", "t1");
    store.log_change(change(10, Namespace::Entities, "e1"));
    store.log_change(change(20, Namespace::Entities, "e2"));

    let transport = RecordingTransport::new();
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(&store, &transport, dir.path(), fast_tuning());

    let handle = spawn_worker(replica("alpha", case_policy()), ctx);
    wait_for("both records delivered", || {
        transport.deliveries().len() == 2
    });
    handle.shutdown();

    assert_eq!(transport.delivered_ids(), ["e1", "e2"]);
    let cursors = FsCursorStore::new(dir.path());
    assert_eq!(
        cursors.load("alpha").unwrap(),
        Cursor::at(Timestamp::new(20))
    );
}

#[test]
fn skipped_records_still_advance_the_cursor() {
    let store = seeded_store();
    // The entity behind the change no longer exists.
    store.log_change(change(10, Namespace::Entities, "already-gone"));

    let transport = RecordingTransport::new();
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(&store, &transport, dir.path(), fast_tuning());

    let handle = spawn_worker(replica("alpha", case_policy()), ctx);
    wait_for("cursor to advance past the skip", || {
        handle.status().cursor == Cursor::at(Timestamp::new(10))
    });
    handle.shutdown();

    assert!(transport.deliveries().is_empty());
}

#[test]
fn deletions_are_forwarded_as_markers() {
    let store = seeded_store();
    store.log_change(deletion(10, Namespace::Entities, "e-gone"));

    let transport = RecordingTransport::new();
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(&store, &transport, dir.path(), fast_tuning());

    let handle = spawn_worker(replica("alpha", case_policy()), ctx);
    wait_for("deletion marker delivered", || {
        !transport.deliveries().is_empty()
    });
    handle.shutdown();

    let deliveries = transport.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert!(deliveries[0].deleted);
    assert_eq!(deliveries[0].payload, None);
    assert_eq!(deliveries[0].record_id, "e-gone");
}

#[test]
fn transient_delivery_failures_retry_without_loss() {
    let store = seeded_store();
    put_entity(&store, "e1", "t1");
    store.log_change(change(10, Namespace::Entities, "e1"));

    // First two pushes are rejected with 503.
    let transport = RecordingTransport::failing(2);
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(&store, &transport, dir.path(), fast_tuning());

    let handle = spawn_worker(replica("alpha", case_policy()), ctx);
    wait_for("record delivered after retries", || {
        !transport.deliveries().is_empty()
    });
    wait_for("cursor advanced after delivery", || {
        handle.status().cursor == Cursor::at(Timestamp::new(10))
    });
    handle.shutdown();

    // Delivered exactly once; the failed attempts never reached the
    // replica.
    assert_eq!(transport.delivered_ids(), ["e1"]);
}

#[test]
fn fatal_projection_halts_the_batch_until_the_store_heals() {
    let store = seeded_store();
    // A connection whose entity is missing: store inconsistency.
    put_connection(&store, "c1", "ghost", None, "h1");
    store.log_change(change(10, Namespace::Connections, "c1"));
    put_entity(&store, "e2", "t1");
    store.log_change(change(20, Namespace::Entities, "e2"));

    let transport = RecordingTransport::new();
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(&store, &transport, dir.path(), fast_tuning());

    // The relationship property is whitelisted, so the healed edge is
    // visible through the left-hand rule.
    let policy: Policy =
        serde_json::from_value(json!({ "templates": { "t1": { "properties": ["p1", "p3"] } } }))
            .unwrap();
    let handle = spawn_worker(replica("alpha", policy), ctx);
    wait_for("worker to record the failure", || {
        handle.status().consecutive_failures > 0
    });

    // Nothing was delivered and the cursor did not move: the later
    // record must not overtake the halted one.
    assert!(transport.deliveries().is_empty());
    assert_eq!(handle.status().cursor, Cursor::ZERO);

    // Heal the store; the worker retries from the same cursor. The
    // t1 entity owns a whitelisted relationship property, so the edge
    // becomes visible.
    put_entity(&store, "ghost", "t1");
    wait_for("both records delivered after healing", || {
        transport.deliveries().len() == 2
    });
    handle.shutdown();

    assert_eq!(transport.delivered_ids(), ["c1", "e2"]);
}

#[test]
fn cursor_survives_restart_without_redelivery() {
    let store = seeded_store();
    put_entity(&store, "e1", "t1");
    store.log_change(change(10, Namespace::Entities, "e1"));

    let transport = RecordingTransport::new();
    let dir = tempfile::tempdir().expect("tempdir");

    let handle = spawn_worker(
        replica("alpha", case_policy()),
        context(&store, &transport, dir.path(), fast_tuning()),
    );
    wait_for("first run delivered", || !transport.deliveries().is_empty());
    handle.shutdown();

    // "Restart": a new worker over the same cursor directory.
    let handle = spawn_worker(
        replica("alpha", case_policy()),
        context(&store, &transport, dir.path(), fast_tuning()),
    );
    wait_for("restarted worker loads the cursor", || {
        handle.status().cursor == Cursor::at(Timestamp::new(10))
    });

    // Only a genuinely new record is delivered.
    put_entity(&store, "e2", "t1");
    store.log_change(change(30, Namespace::Entities, "e2"));
    wait_for("new record delivered", || transport.deliveries().len() == 2);
    handle.shutdown();

    assert_eq!(transport.delivered_ids(), ["e1", "e2"]);
}

#[test]
fn full_pages_are_drained_without_waiting_for_the_poll_tick() {
    let store = seeded_store();
    let mut tuning = fast_tuning();
    tuning.batch_size = 2;
    // A poll interval far beyond the wait deadline: pagination must not
    // depend on it.
    tuning.poll_interval_ms = 60_000;

    for i in 1..=5u64 {
        let id = format!("e{i}");
        put_entity(&store, &id, "t1");
        store.log_change(change(i * 10, Namespace::Entities, &id));
    }

    let transport = RecordingTransport::new();
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(&store, &transport, dir.path(), tuning);

    let handle = spawn_worker(replica("alpha", case_policy()), ctx);
    wait_for("all five records delivered", || {
        transport.deliveries().len() == 5
    });
    handle.shutdown();

    assert_eq!(transport.delivered_ids(), ["e1", "e2", "e3", "e4", "e5"]);
}

#[test]
fn dispatcher_runs_only_active_replicas() {
    let store = seeded_store();
    let transport = RecordingTransport::new();
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(&store, &transport, dir.path(), fast_tuning());

    let registry = ReplicaRegistry::from_toml_str(
        r#"
[[replicas]]
name = "alpha"
url = "https://alpha.test"

[[replicas]]
name = "beta"
url = "https://beta.test"
active = false
"#,
    )
    .unwrap();

    let mut dispatcher = Dispatcher::start(&registry, ctx);
    assert!(dispatcher.is_running("alpha"));
    assert!(!dispatcher.is_running("beta"));
    assert_eq!(dispatcher.status().len(), 1);

    // Deactivation stops the worker and leaves the cursor file alone.
    dispatcher.stop("alpha");
    assert!(!dispatcher.is_running("alpha"));
    dispatcher.shutdown();
}
