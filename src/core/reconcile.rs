//! Ordered confirmation of local marker edits against the store.
//!
//! Each timeline owns one worker. Changes are applied strictly in submission
//! order, so the persisted order can never be overtaken by a later edit.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::store::MarkerStore;
use crate::error::{EditorError, Result};
use crate::state::{Marker, MarkerPosition};

/// A local edit that still has to be confirmed by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerChange {
    Create(Marker),
    Delete(Vec<Uuid>),
    /// Sort keys after a reorder.
    Reposition(Vec<MarkerPosition>),
    Relabel { id: Uuid, label: Option<String> },
}

impl MarkerChange {
    pub fn op(&self) -> &'static str {
        match self {
            MarkerChange::Create(_) => "create",
            MarkerChange::Delete(_) => "delete",
            MarkerChange::Reposition(_) => "reorder",
            MarkerChange::Relabel { .. } => "relabel",
        }
    }
}

/// A change the store did not confirm. Hand it back to
/// [`Reconciler::retry`] to try again.
#[derive(Debug)]
pub struct ReconcileFailure {
    pub change: MarkerChange,
    pub error: EditorError,
}

enum Job {
    Apply(MarkerChange),
    Flush(oneshot::Sender<()>),
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    tx: mpsc::UnboundedSender<Job>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Job::Apply(change) => f.debug_tuple("Apply").field(change).finish(),
            Job::Flush(_) => f.write_str("Flush"),
        }
    }
}

impl Reconciler {
    /// Start the worker on the current tokio runtime.
    ///
    /// Failures are published on the returned receiver; local state is never
    /// rolled back by the worker.
    pub fn spawn(
        store: Arc<dyn MarkerStore>,
        video_id: Uuid,
    ) -> (Self, mpsc::UnboundedReceiver<ReconcileFailure>) {
        let (tx, mut jobs) = mpsc::unbounded_channel::<Job>();
        let (failure_tx, failures) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(job) = jobs.recv().await {
                match job {
                    Job::Apply(change) => {
                        if let Err(error) = apply_change(store.as_ref(), video_id, &change).await {
                            warn!(%video_id, op = change.op(), %error, "marker change not confirmed");
                            let _ = failure_tx.send(ReconcileFailure { change, error });
                        }
                    }
                    Job::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!(%video_id, "reconciler stopped");
        });

        (Self { tx }, failures)
    }

    pub fn submit(&self, change: MarkerChange) {
        if let Err(err) = self.tx.send(Job::Apply(change)) {
            warn!(job = ?err.0, "reconciler is not running; change dropped");
        }
    }

    pub fn retry(&self, failure: ReconcileFailure) {
        debug!(op = failure.change.op(), "retrying marker change");
        self.submit(failure.change);
    }

    /// Resolves once every change submitted before this call was attempted.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(Job::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

async fn apply_change(store: &dyn MarkerStore, video_id: Uuid, change: &MarkerChange) -> Result<()> {
    let result = match change {
        MarkerChange::Create(marker) => store.create(video_id, marker).await,
        MarkerChange::Delete(ids) => store.delete(video_id, ids).await,
        MarkerChange::Reposition(positions) => store.reposition(video_id, positions).await,
        MarkerChange::Relabel { id, label } => {
            store.update_label(video_id, *id, label.as_deref()).await
        }
    };
    result.map_err(|err| EditorError::Reconcile {
        op: change.op(),
        video_id,
        message: err.to_string(),
    })
}
