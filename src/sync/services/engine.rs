//! Timer-driven drain of the operation queue against the remote store.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{ApplyOutcome, Outbox, Replicator};
use crate::sync::{
    domain::{
        CycleReport, DiscardReason, DrainReport, PullReport, SyncAction, SyncNotice,
        SyncOperation, SyncStatus,
    },
    ports::{
        OperationQueue, QueueError, RemoteStore, RemoteStoreError, RemoteStoreResult, WriteOutcome,
    },
};
use crate::workspace::{
    domain::{ChangeSet, EntityKind, INITIAL_VERSION},
    ports::{LocalStore, LocalStoreError},
};

const NOTICE_CAPACITY: usize = 64;

/// Timing knobs for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Delay between sync cycles.
    pub drain_interval: Duration,
    /// Upper bound for any single remote call.
    pub remote_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            drain_interval: Duration::from_secs(10),
            remote_timeout: Duration::from_secs(5),
        }
    }
}

/// Local failures that stop a sync pass.
///
/// Remote failures never appear here during a drain: conflicts are
/// discarded and transient errors leave work queued.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The queue could not be read or updated.
    #[error(transparent)]
    Queue(#[from] QueueError),
    /// The local store could not be read or updated.
    #[error(transparent)]
    Store(#[from] LocalStoreError),
    /// The remote could not be reached during a pull.
    #[error(transparent)]
    Remote(#[from] RemoteStoreError),
}

/// Result type for sync engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Outcome of pushing one operation.
enum PushOutcome {
    Acked { version: u64 },
    Discarded(DiscardReason),
}

type EntityKey = (EntityKind, Uuid);

/// Owner of the operation queue's drain side.
///
/// Cycles are single-flight: a cycle requested while another runs returns
/// immediately with a skipped report.
pub struct SyncEngine<S, Q, R>
where
    S: LocalStore,
    Q: OperationQueue,
    R: RemoteStore,
{
    queue: Arc<Q>,
    remote: Arc<R>,
    store: Arc<S>,
    replicator: Replicator<S>,
    settings: EngineSettings,
    gate: tokio::sync::Mutex<()>,
    cursors: Mutex<HashMap<EntityKind, i64>>,
    status: watch::Sender<SyncStatus>,
    notices: broadcast::Sender<SyncNotice>,
}

impl<S, Q, R> SyncEngine<S, Q, R>
where
    S: LocalStore,
    Q: OperationQueue,
    R: RemoteStore,
{
    /// Creates an idle engine.
    #[must_use]
    pub fn new(store: Arc<S>, queue: Arc<Q>, remote: Arc<R>, settings: EngineSettings) -> Self {
        let (status, _) = watch::channel(SyncStatus::Idle);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            replicator: Replicator::new(Arc::clone(&store)),
            queue,
            remote,
            store,
            settings,
            gate: tokio::sync::Mutex::new(()),
            cursors: Mutex::new(HashMap::new()),
            status,
            notices,
        }
    }

    /// Returns an enabled outbox appending to this engine's queue.
    #[must_use]
    pub fn outbox(&self) -> Outbox<Q> {
        Outbox::new(Arc::clone(&self.queue))
    }

    /// Returns the current aggregate status.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    /// Subscribes to status changes.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Subscribes to conflict notices.
    #[must_use]
    pub fn subscribe_notices(&self) -> broadcast::Receiver<SyncNotice> {
        self.notices.subscribe()
    }

    /// Returns a snapshot of entity ids with queued operations.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Queue`] when the queue cannot be read.
    pub fn pending_entity_ids(&self) -> SyncResult<BTreeSet<Uuid>> {
        Ok(self.queue.pending_entity_ids()?)
    }

    /// Runs one drain pass and one pull pass.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Queue`] or [`SyncError::Store`] for local
    /// failures. Remote failures are folded into the report and status.
    pub async fn run_cycle(&self) -> SyncResult<CycleReport> {
        let Ok(_guard) = self.gate.try_lock() else {
            return Ok(CycleReport {
                drain: DrainReport::skipped(),
                pull: None,
                status: self.status(),
            });
        };
        self.status.send_replace(SyncStatus::Syncing);

        let drain = match self.drain_locked().await {
            Ok(drain) => drain,
            Err(err) => {
                self.status.send_replace(SyncStatus::Error);
                return Err(err);
            }
        };
        let pull = match self.pull_locked().await {
            Ok(pull) => Some(pull),
            Err(SyncError::Remote(err)) if err.is_transient() => {
                warn!(error = %err, "pull failed; will retry next cycle");
                None
            }
            Err(err) => {
                self.status.send_replace(SyncStatus::Error);
                return Err(err);
            }
        };

        let status = if drain.retried > 0 || pull.is_none() {
            SyncStatus::Error
        } else {
            SyncStatus::Synced
        };
        self.status.send_replace(status);
        info!(
            acked = drain.acked,
            conflicted = drain.conflicted,
            retried = drain.retried,
            pulled = pull.map_or(0, |report| report.applied),
            %status,
            "sync cycle finished"
        );
        Ok(CycleReport {
            drain,
            pull,
            status,
        })
    }

    /// Pushes every queued operation once, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Queue`] or [`SyncError::Store`] for local
    /// failures.
    pub async fn drain(&self) -> SyncResult<DrainReport> {
        let Ok(_guard) = self.gate.try_lock() else {
            return Ok(DrainReport::skipped());
        };
        self.drain_locked().await
    }

    /// Fetches remote changes since the last pull and applies them locally.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Remote`] when the remote cannot be reached, or
    /// local failures.
    pub async fn pull(&self) -> SyncResult<PullReport> {
        let _guard = self.gate.lock().await;
        self.pull_locked().await
    }

    /// Runs cycles every `drain_interval` until `shutdown` turns `true` or
    /// its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.settings.drain_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.run_cycle().await {
                        error!(error = %err, "sync cycle failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("sync loop stopping");
                        break;
                    }
                }
            }
        }
    }

    async fn drain_locked(&self) -> SyncResult<DrainReport> {
        let operations = self.queue.pending()?;
        debug!(queued = operations.len(), "draining sync queue");

        let mut report = DrainReport::default();
        let mut blocked: HashSet<EntityKey> = HashSet::new();
        let mut rebased: HashMap<(EntityKey, u64), u64> = HashMap::new();

        for mut operation in operations {
            let key = (operation.kind(), operation.entity_id());
            if blocked.contains(&key) {
                report.retried += 1;
                continue;
            }
            while let Some(version) = rebased.get(&(key, operation.version())) {
                operation.rebase(*version);
            }

            match self.push(&operation).await {
                Ok(PushOutcome::Acked { version }) => {
                    self.queue.remove(operation.id())?;
                    if version > operation.version() {
                        self.queue
                            .rebase(key.0, key.1, operation.version(), version)?;
                        rebased.insert((key, operation.version()), version);
                    }
                    self.acknowledge(&operation, version)?;
                    report.acked += 1;
                }
                Ok(PushOutcome::Discarded(reason)) => {
                    self.queue.remove(operation.id())?;
                    self.discard(&operation, reason);
                    report.conflicted += 1;
                }
                Err(err) if err.is_transient() => {
                    warn!(
                        operation_id = %operation.id(),
                        kind = %operation.kind(),
                        entity_id = %operation.entity_id(),
                        error = %err,
                        "transient push failure; operation stays queued"
                    );
                    blocked.insert(key);
                    report.retried += 1;
                }
                Err(err) => {
                    warn!(operation_id = %operation.id(), error = %err, "remote rejected operation");
                    self.queue.remove(operation.id())?;
                    self.discard(&operation, DiscardReason::InvalidPayload);
                    report.conflicted += 1;
                }
            }
        }
        Ok(report)
    }

    async fn push(&self, operation: &SyncOperation) -> RemoteStoreResult<PushOutcome> {
        let Some(record) = operation.to_record() else {
            return Ok(PushOutcome::Discarded(DiscardReason::InvalidPayload));
        };
        let version = operation.version();

        let outcome = match operation.action() {
            SyncAction::Upsert | SyncAction::Delete if version <= INITIAL_VERSION => {
                let version = self.call(self.remote.upsert(&record)).await?;
                WriteOutcome::Applied { version }
            }
            SyncAction::Upsert => {
                self.call(self.remote.update_if_version(&record, version))
                    .await?
            }
            SyncAction::Delete => {
                let deleted_at = record
                    .deleted_at()
                    .unwrap_or_else(|| operation.enqueued_at());
                self.call(self.remote.soft_delete_if_version(
                    operation.kind(),
                    operation.entity_id(),
                    version,
                    deleted_at,
                ))
                .await?
            }
        };

        Ok(match outcome {
            WriteOutcome::Applied { version } => PushOutcome::Acked { version },
            WriteOutcome::Stale => PushOutcome::Discarded(DiscardReason::VersionConflict),
        })
    }

    async fn call<T>(
        &self,
        request: impl Future<Output = RemoteStoreResult<T>>,
    ) -> RemoteStoreResult<T> {
        let budget = self.settings.remote_timeout;
        tokio::time::timeout(budget, request)
            .await
            .unwrap_or(Err(RemoteStoreError::Timeout(budget)))
    }

    /// Advances the local copy to the acknowledged version unless something
    /// newer has already replaced it.
    fn acknowledge(&self, operation: &SyncOperation, version: u64) -> SyncResult<()> {
        let Some(mut entity) = self
            .store
            .entity(operation.kind(), operation.entity_id())?
        else {
            return Ok(());
        };
        if entity.meta().version() != operation.version() || version == operation.version() {
            return Ok(());
        }
        entity.meta_mut().set_version(version);
        self.store.commit(&ChangeSet::new().with(entity))?;
        Ok(())
    }

    fn discard(&self, operation: &SyncOperation, reason: DiscardReason) {
        warn!(
            operation_id = %operation.id(),
            kind = %operation.kind(),
            entity_id = %operation.entity_id(),
            version = operation.version(),
            ?reason,
            "discarded queued operation; next pull restores the remote copy"
        );
        let notice = SyncNotice {
            entity_id: operation.entity_id(),
            kind: operation.kind(),
            reason,
        };
        if self.notices.send(notice).is_err() {
            debug!("no notice subscribers");
        }
    }

    async fn pull_locked(&self) -> SyncResult<PullReport> {
        let mut report = PullReport::default();
        for kind in EntityKind::ALL {
            let after = self.cursor(kind);
            let pulled = self.call(self.remote.pull(kind, after)).await?;
            let mut latest = after;
            for record in pulled {
                latest = latest.max(record.revision);
                match self.replicator.apply(record.record)? {
                    ApplyOutcome::Applied => report.applied += 1,
                    ApplyOutcome::Ignored | ApplyOutcome::Undecodable => report.ignored += 1,
                }
            }
            self.set_cursor(kind, latest);
        }
        debug!(applied = report.applied, ignored = report.ignored, "pull finished");
        Ok(report)
    }

    fn cursor(&self, kind: EntityKind) -> i64 {
        self.cursors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }

    fn set_cursor(&self, kind: EntityKind, revision: i64) {
        self.cursors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, revision);
    }
}
