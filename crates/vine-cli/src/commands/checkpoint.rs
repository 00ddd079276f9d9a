//! `vine checkpoint` and `vine reset`

use std::sync::Arc;

use vine_config::FollowConfig;
use vine_core::error::VineResult;
use vine_follow::{CheckpointTracker, FileCheckpointStore, Position};

fn tracker(config: &FollowConfig) -> CheckpointTracker {
    let store = Arc::new(FileCheckpointStore::new(config.checkpoint_path.clone()));
    // The stored value, not a `since` override, is what these commands report
    CheckpointTracker::new(store, None)
}

/// Stored checkpoint; zero when absent or unreadable
pub async fn show(config: &FollowConfig) -> Position {
    tracker(config).read().await
}

pub async fn reset(config: &FollowConfig) -> VineResult<()> {
    tracker(config).reset().await
}
