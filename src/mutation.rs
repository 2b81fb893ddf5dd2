//! Write operations with independent per-target status tracking.

use futures::future::BoxFuture;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{FetchError, MutationError};

/// The write operations the demo API supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
  Delete,
  Update,
}

/// Lifecycle of one mutation on one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationStatus {
  /// No mutation has been issued for this target.
  #[default]
  Idle,
  Pending,
  Succeeded,
  Failed,
}

/// The in-flight or last-completed mutation for a target.
#[derive(Debug, Clone)]
pub struct MutationRecord {
  pub kind: MutationKind,
  pub status: MutationStatus,
  pub error: Option<FetchError>,
}

type MutateFn = Box<dyn Fn(MutationKind, u64) -> BoxFuture<'static, Result<(), FetchError>> + Send + Sync>;

struct Completion {
  target: u64,
  result: Result<(), FetchError>,
}

/// Tracks mutations independently per target id.
///
/// A completed status sticks until the next mutation on the same target,
/// so the boundary can keep showing its outcome. List caches are
/// deliberately left untouched on success: the demo backend echoes writes
/// without persisting them, and refetching would only reproduce data the
/// server never stored. Against a persisting backend, invalidate the
/// owning page key on success instead.
pub struct Mutations {
  records: HashMap<u64, MutationRecord>,
  op: MutateFn,
  tx: mpsc::UnboundedSender<Completion>,
  rx: mpsc::UnboundedReceiver<Completion>,
}

impl Mutations {
  pub fn new<F>(op: F) -> Self
  where
    F: Fn(MutationKind, u64) -> BoxFuture<'static, Result<(), FetchError>> + Send + Sync + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      records: HashMap::new(),
      op: Box::new(op),
      tx,
      rx,
    }
  }

  /// Start a mutation. At most one per target may be in flight: while one
  /// is Pending, further calls are rejected with [`MutationError::Busy`]
  /// and no request is issued.
  pub fn mutate(&mut self, kind: MutationKind, target: u64) -> Result<(), MutationError> {
    if let Some(record) = self.records.get(&target) {
      if record.status == MutationStatus::Pending {
        warn!(target, "mutation rejected, one already pending");
        return Err(MutationError::Busy { target });
      }
    }

    self.records.insert(
      target,
      MutationRecord {
        kind,
        status: MutationStatus::Pending,
        error: None,
      },
    );
    debug!(target, ?kind, "mutation started");

    let future = (self.op)(kind, target);
    let tx = self.tx.clone();
    tokio::spawn(async move {
      let _ = tx.send(Completion {
        target,
        result: future.await,
      });
    });
    Ok(())
  }

  /// Apply completed mutations. Returns true when any record changed.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok(done) = self.rx.try_recv() {
      let Some(record) = self.records.get_mut(&done.target) else {
        continue;
      };
      match done.result {
        Ok(()) => {
          record.status = MutationStatus::Succeeded;
          record.error = None;
        }
        Err(err) => {
          record.status = MutationStatus::Failed;
          record.error = Some(err);
        }
      }
      changed = true;
    }
    changed
  }

  /// Status for `target`; Idle when it was never mutated.
  pub fn status(&self, target: u64) -> MutationStatus {
    self
      .records
      .get(&target)
      .map(|r| r.status)
      .unwrap_or_default()
  }

  pub fn record(&self, target: u64) -> Option<&MutationRecord> {
    self.records.get(&target)
  }
}
