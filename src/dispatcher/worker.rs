//! Per-replica sync worker.
//!
//! Each worker replays the change log for one replica: fetch a batch
//! past the cursor, project every record, push what is visible, and
//! persist the cursor after each confirmed step. Failures freeze the
//! cursor and retry with capped, jittered backoff, which gives
//! at-least-once delivery as long as replicas apply records
//! idempotently.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};
use rand::Rng;
use serde_json::Value;
use thiserror::Error;

use super::DispatchContext;
use super::cursor::CursorError;
use super::transport::{DeliveryError, SyncDelivery};
use crate::core::{ChangeRecord, Cursor};
use crate::projector::{ProjectError, Projector, Verdict};
use crate::replica::ReplicaEntry;
use crate::store::StoreError;

/// Dispatcher states, per replica.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    FetchingBatch,
    Projecting,
    Pushing,
    AdvancingCursor,
    RetryBackoff,
}

/// Point-in-time view of one worker, for observability.
#[derive(Clone, Debug)]
pub struct ReplicaStatus {
    pub state: SyncState,
    pub cursor: Cursor,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

impl ReplicaStatus {
    fn initial() -> Self {
        Self {
            state: SyncState::Idle,
            cursor: Cursor::ZERO,
            consecutive_failures: 0,
            last_error: None,
        }
    }
}

/// Handle to a running worker. Dropping it does not stop the worker;
/// call [`WorkerHandle::shutdown`].
pub struct WorkerHandle {
    name: String,
    shutdown: Sender<()>,
    status: Arc<Mutex<ReplicaStatus>>,
    thread: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> ReplicaStatus {
        match self.status.lock() {
            Ok(status) => status.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Signal the worker and wait for it to finish its current record.
    /// The cursor is left exactly where the worker confirmed it.
    pub fn shutdown(self) {
        let _ = self.shutdown.send(());
        if self.thread.join().is_err() {
            tracing::warn!(replica = %self.name, "sync worker panicked");
        }
    }
}

pub fn spawn_worker(replica: ReplicaEntry, ctx: DispatchContext) -> WorkerHandle {
    let (shutdown_tx, shutdown_rx) = bounded(1);
    let status = Arc::new(Mutex::new(ReplicaStatus::initial()));
    let name = replica.name.clone();
    let worker = Worker {
        backoff: Backoff::new(ctx.tuning.backoff_base_ms, ctx.tuning.backoff_max_ms),
        replica,
        ctx,
        shutdown: shutdown_rx,
        status: Arc::clone(&status),
    };
    let thread = std::thread::spawn(move || worker.run());
    WorkerHandle {
        name,
        shutdown: shutdown_tx,
        status,
        thread,
    }
}

#[derive(Debug, Error)]
enum CycleError {
    #[error(transparent)]
    Cursor(#[from] CursorError),
    #[error(transparent)]
    Log(#[from] StoreError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

enum CycleOutcome {
    /// The log is drained up to the cursor; sleep until the next poll.
    Drained,
    /// A full page was processed; fetch again immediately.
    MorePending,
    /// Shutdown was requested mid-batch.
    Stop,
}

struct Worker {
    replica: ReplicaEntry,
    ctx: DispatchContext,
    shutdown: Receiver<()>,
    status: Arc<Mutex<ReplicaStatus>>,
    backoff: Backoff,
}

impl Worker {
    fn run(mut self) {
        tracing::debug!(replica = %self.replica.name, "sync worker started");
        loop {
            let wait = match self.sync_cycle() {
                Ok(CycleOutcome::Stop) => break,
                Ok(CycleOutcome::MorePending) => {
                    self.backoff.reset();
                    self.note_ok();
                    Duration::ZERO
                }
                Ok(CycleOutcome::Drained) => {
                    self.backoff.reset();
                    self.note_ok();
                    self.set_state(SyncState::Idle);
                    self.ctx.tuning.poll_interval()
                }
                Err(err) => {
                    let delay = self.backoff.next_delay();
                    tracing::warn!(
                        replica = %self.replica.name,
                        error = %err,
                        backoff_ms = delay.as_millis() as u64,
                        "sync cycle failed, backing off"
                    );
                    self.note_failure(&err);
                    self.set_state(SyncState::RetryBackoff);
                    delay
                }
            };

            match self.shutdown.recv_timeout(wait) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
        tracing::debug!(replica = %self.replica.name, "sync worker stopped");
    }

    fn sync_cycle(&self) -> Result<CycleOutcome, CycleError> {
        self.set_state(SyncState::FetchingBatch);
        let mut cursor = self.ctx.cursors.load(&self.replica.name)?;
        self.set_cursor(cursor);

        let batch = self
            .ctx
            .changes
            .changes_since(cursor, self.ctx.tuning.batch_size)?;
        if batch.is_empty() {
            return Ok(CycleOutcome::Drained);
        }
        let full_page = batch.len() == self.ctx.tuning.batch_size;
        tracing::debug!(
            replica = %self.replica.name,
            records = batch.len(),
            from = %cursor,
            "processing change batch"
        );

        let projector = Projector::new(self.ctx.store.as_ref(), &self.replica.policy);
        for record in &batch {
            if self.shutdown_requested() {
                return Ok(CycleOutcome::Stop);
            }

            self.set_state(SyncState::Projecting);
            match projector.project(record)? {
                Verdict::Skip(reason) => {
                    tracing::trace!(
                        replica = %self.replica.name,
                        namespace = %record.namespace,
                        id = %record.record_id,
                        %reason,
                        "record skipped"
                    );
                }
                Verdict::Publish(payload) => self.push(record, Some(payload))?,
                Verdict::Delete => self.push(record, None)?,
            }

            // Confirmed (or invisible): the cursor may move past this
            // record, durably, before the next one is touched.
            self.set_state(SyncState::AdvancingCursor);
            cursor.advance_to(record.timestamp);
            self.ctx.cursors.store(&self.replica.name, cursor)?;
            self.set_cursor(cursor);
        }

        Ok(if full_page {
            CycleOutcome::MorePending
        } else {
            CycleOutcome::Drained
        })
    }

    fn push(&self, record: &ChangeRecord, payload: Option<Value>) -> Result<(), CycleError> {
        self.set_state(SyncState::Pushing);
        let delivery = SyncDelivery {
            namespace: record.namespace.clone(),
            record_id: record.record_id.clone(),
            deleted: record.deleted,
            payload,
        };
        self.ctx.transport.push(&self.replica.url, &delivery)?;
        tracing::trace!(
            replica = %self.replica.name,
            namespace = %record.namespace,
            id = %record.record_id,
            deleted = record.deleted,
            "record delivered"
        );
        Ok(())
    }

    fn shutdown_requested(&self) -> bool {
        match self.shutdown.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        }
    }

    fn set_state(&self, state: SyncState) {
        if let Ok(mut status) = self.status.lock() {
            status.state = state;
        }
    }

    fn set_cursor(&self, cursor: Cursor) {
        if let Ok(mut status) = self.status.lock() {
            status.cursor = cursor;
        }
    }

    fn note_ok(&self) {
        if let Ok(mut status) = self.status.lock() {
            status.consecutive_failures = 0;
            status.last_error = None;
        }
    }

    fn note_failure(&self, err: &CycleError) {
        if let Ok(mut status) = self.status.lock() {
            status.consecutive_failures = status.consecutive_failures.saturating_add(1);
            status.last_error = Some(err.to_string());
        }
    }
}

/// Exponential backoff with jitter, capped at `max`.
struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base: Duration::from_millis(base_ms.max(1)),
            max: Duration::from_millis(max_ms.max(1)),
            attempt: 0,
        }
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next_delay(&mut self) -> Duration {
        let factor = 2u32.saturating_pow(self.attempt);
        let capped = self.base.saturating_mul(factor).min(self.max);
        self.attempt = self.attempt.saturating_add(1);
        // Up to 25% jitter so stalled replicas do not retry in lockstep.
        let jitter_ms = (capped.as_millis() as u64 / 4).max(1);
        capped + Duration::from_millis(rand::rng().random_range(0..jitter_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let mut backoff = Backoff::new(100, 1_000);
        let first = backoff.next_delay();
        let second = backoff.next_delay();
        assert!(first >= Duration::from_millis(100));
        assert!(second >= Duration::from_millis(200));

        for _ in 0..32 {
            let delay = backoff.next_delay();
            // Cap plus the 25% jitter allowance.
            assert!(delay <= Duration::from_millis(1_250));
        }
    }

    #[test]
    fn backoff_resets() {
        let mut backoff = Backoff::new(100, 1_000);
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        let delay = backoff.next_delay();
        assert!(delay < Duration::from_millis(200));
    }
}
