//! Contiguous-prefix checkpoint tracking.
//!
//! Changes start in feed order but may finish in any order. The tracker keeps
//! every started position until it belongs to a run of finished positions
//! beginning at the smallest one in flight, and only then lets the persisted
//! checkpoint move past it. A restart therefore never skips a change that was
//! started but not completed.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};
use vine_core::types::Position;

use super::store::CheckpointStore;
use crate::FollowResult;

/// A started position and whether its work has completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InProgressEntry {
    pub position: Position,
    pub finished: bool,
}

#[derive(Debug, Default)]
struct TrackerState {
    /// Last confirmed position, loaded lazily
    safe: Option<Position>,
    /// Started but not yet checkpointed, ascending by position
    in_progress: Vec<InProgressEntry>,
}

/// Converts out-of-order completions into a monotonically advancing checkpoint
pub struct CheckpointTracker {
    store: Arc<dyn CheckpointStore>,
    state: Mutex<TrackerState>,
}

impl CheckpointTracker {
    /// Create a tracker; `since` overrides the stored checkpoint
    pub fn new(store: Arc<dyn CheckpointStore>, since: Option<Position>) -> Self {
        Self {
            store,
            state: Mutex::new(TrackerState {
                safe: since,
                in_progress: Vec::new(),
            }),
        }
    }

    /// Position to resume the feed from.
    ///
    /// A missing or unreadable stored value counts as `Position::ZERO`.
    pub async fn read(&self) -> Position {
        let mut state = self.state.lock().await;
        self.load(&mut state).await
    }

    async fn load(&self, state: &mut TrackerState) -> Position {
        if let Some(safe) = state.safe {
            return safe;
        }

        let loaded = match self.store.read().await {
            Ok(Some(raw)) => raw.parse::<Position>().unwrap_or_else(|e| {
                warn!(value = %raw.trim(), error = %e, "ignoring invalid stored checkpoint");
                Position::ZERO
            }),
            Ok(None) => Position::ZERO,
            Err(e) => {
                warn!(error = %e, "failed to read checkpoint, starting from zero");
                Position::ZERO
            },
        };

        state.safe = Some(loaded);
        loaded
    }

    /// Reserve a position as in flight
    pub async fn start(&self, position: Position) {
        let mut state = self.state.lock().await;
        let index = state
            .in_progress
            .partition_point(|entry| entry.position <= position);
        state.in_progress.insert(
            index,
            InProgressEntry {
                position,
                finished: false,
            },
        );
    }

    /// Mark a position finished and persist the checkpoint if it advanced.
    ///
    /// Returns the newly persisted position, if any.
    pub async fn finish(&self, position: Position) -> FollowResult<Option<Position>> {
        let mut state = self.state.lock().await;

        match state
            .in_progress
            .iter_mut()
            .find(|entry| entry.position == position && !entry.finished)
        {
            Some(entry) => entry.finished = true,
            None => {
                debug!(position = %position, "finish for a position that is not in flight");
                return Ok(None);
            },
        }

        let prefix = state
            .in_progress
            .iter()
            .take_while(|entry| entry.finished)
            .count();
        let Some(last) = state.in_progress[..prefix].iter().map(|entry| entry.position).max() else {
            return Ok(None);
        };

        let safe = self.load(&mut state).await;
        if last <= safe {
            state.in_progress.drain(..prefix);
            return Ok(None);
        }

        // A failed write keeps the prefix in flight so the next finish retries it
        self.store.write(last).await?;
        state.in_progress.drain(..prefix);
        state.safe = Some(last);
        debug!(position = %last, in_flight = state.in_progress.len(), "checkpoint advanced");

        Ok(Some(last))
    }

    /// Forget the checkpoint in both the store and the cache
    pub async fn reset(&self) -> FollowResult<()> {
        let mut state = self.state.lock().await;
        debug!("resetting checkpoint");
        self.store.reset().await?;
        state.safe = None;
        Ok(())
    }

    /// Number of started positions not yet checkpointed
    pub async fn in_flight(&self) -> usize {
        self.state.lock().await.in_progress.len()
    }

    pub async fn entries(&self) -> Vec<InProgressEntry> {
        self.state.lock().await.in_progress.clone()
    }
}

impl std::fmt::Debug for CheckpointTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointTracker").finish_non_exhaustive()
    }
}
