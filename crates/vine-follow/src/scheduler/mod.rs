//! Bounded concurrent execution of work units.
//!
//! Up to `concurrency` units resolve at the same time. Results are surfaced
//! in the order the units were queued, each paired with a [`Completion`] that
//! releases its position in the checkpoint tracker.

use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, warn};
use vine_config::FailurePolicy;
use vine_core::error::VineError;
use vine_core::types::Position;
use vine_registry::{Resolution, ResolvedDocument};

use crate::checkpoint::CheckpointTracker;
use crate::work::WorkUnit;
use crate::FollowResult;

/// Consumer-facing sequence of resolved changes
pub type ChangeStream = Pin<Box<dyn Stream<Item = FollowResult<FollowItem>> + Send>>;

/// Releases one position once the consumer is done with it
#[must_use = "the checkpoint cannot advance past a change that is never completed"]
pub struct Completion {
    position: Position,
    tracker: Arc<CheckpointTracker>,
}

impl Completion {
    pub(crate) fn new(position: Position, tracker: Arc<CheckpointTracker>) -> Self {
        Self { position, tracker }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Mark the position finished.
    ///
    /// Returns the checkpoint if this completion advanced it.
    pub async fn done(self) -> FollowResult<Option<Position>> {
        self.tracker.finish(self.position).await
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

/// One surfaced change.
///
/// `change` is `None` when there is nothing to deliver for the position
/// (the document is gone, or it failed under [`FailurePolicy::Skip`]); the
/// completion must still be called.
#[derive(Debug)]
pub struct FollowItem {
    pub position: Position,
    pub change: Option<ResolvedDocument>,
    pub completion: Completion,
}

impl FollowItem {
    pub fn into_parts(self) -> (Option<ResolvedDocument>, Completion) {
        (self.change, self.completion)
    }
}

/// Runs work units with bounded concurrency
#[derive(Debug, Clone)]
pub struct Scheduler {
    tracker: Arc<CheckpointTracker>,
    concurrency: usize,
    policy: FailurePolicy,
}

type Outcomes = Pin<Box<dyn Stream<Item = (Position, FollowResult<Resolution>)> + Send>>;

struct ScheduleState {
    outcomes: Outcomes,
    tracker: Arc<CheckpointTracker>,
    policy: FailurePolicy,
    cancel: CancellationToken,
    _guard: DropGuard,
    done: bool,
}

impl Scheduler {
    pub fn new(tracker: Arc<CheckpointTracker>, concurrency: usize, policy: FailurePolicy) -> Self {
        Self {
            tracker,
            concurrency: concurrency.max(1),
            policy,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Execute `units` and surface their results.
    ///
    /// `cancel` is cancelled when the returned stream is dropped, when it
    /// ends on a terminal failure, and stops the stream when cancelled from
    /// outside.
    pub fn run<S>(&self, units: S, cancel: CancellationToken) -> ChangeStream
    where
        S: Stream<Item = WorkUnit> + Send + 'static,
    {
        let outcomes: Outcomes = Box::pin(units.map(WorkUnit::run).buffered(self.concurrency));
        let state = ScheduleState {
            outcomes,
            tracker: self.tracker.clone(),
            policy: self.policy,
            _guard: cancel.clone().drop_guard(),
            cancel,
            done: false,
        };

        Box::pin(stream::unfold(state, |mut state| async move {
            if state.done {
                return None;
            }

            let next = tokio::select! {
                biased;
                _ = state.cancel.cancelled() => None,
                next = state.outcomes.next() => next,
            };
            let Some((position, outcome)) = next else {
                debug!("scheduler stopped");
                return None;
            };

            let item = match outcome {
                Ok(resolution) => Ok(state.item(position, resolution)),
                Err(e) => state.failed(position, e),
            };
            Some((item, state))
        }))
    }
}

impl ScheduleState {
    fn item(&self, position: Position, resolution: Resolution) -> FollowItem {
        let change = match resolution {
            Resolution::Resolved(document) => Some(document),
            Resolution::NotFound => None,
        };

        FollowItem {
            position,
            change,
            completion: Completion::new(position, self.tracker.clone()),
        }
    }

    fn failed(&mut self, position: Position, err: VineError) -> FollowResult<FollowItem> {
        match self.policy {
            FailurePolicy::FailFast => {
                error!(position = %position, error = %err, "change failed, stopping");
                self.done = true;
                self.cancel.cancel();
                Err(err)
            },
            FailurePolicy::Skip => {
                warn!(position = %position, error = %err, "change failed, skipping");
                Ok(self.item(position, Resolution::NotFound))
            },
        }
    }
}
