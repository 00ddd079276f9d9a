//! The follower: the library surface over reader, scheduler and tracker.
//!
//! ```no_run
//! use futures::StreamExt;
//! use vine_follow::{CancellationToken, FollowConfig, Follower};
//!
//! # async fn example() -> vine_follow::FollowResult<()> {
//! let follower = Follower::new(FollowConfig::default())?;
//! let mut changes = follower.follow(CancellationToken::new());
//!
//! while let Some(item) = changes.next().await {
//!     let item = item?;
//!     if let Some(change) = &item.change {
//!         println!("{} {}", change.position, change.name);
//!     }
//!     item.completion.done().await?;
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::info;
use vine_config::FollowConfig;
use vine_core::types::Position;
use vine_registry::{DocumentResolver, FeedClient};

use crate::checkpoint::{CheckpointStore, CheckpointTracker, FileCheckpointStore};
use crate::reader::{ChangeReader, ChangeSource};
use crate::scheduler::{ChangeStream, Scheduler};
use crate::work::Resolve;
use crate::FollowResult;

/// Follows a change feed and surfaces resolved documents
pub struct Follower {
    config: Arc<FollowConfig>,
    tracker: Arc<CheckpointTracker>,
    source: Arc<dyn ChangeSource>,
    resolver: Arc<dyn Resolve>,
}

impl Follower {
    /// Follower over the registry endpoints and the file checkpoint
    pub fn new(config: FollowConfig) -> FollowResult<Self> {
        let store = Arc::new(FileCheckpointStore::new(config.checkpoint_path.clone()));
        let source = Arc::new(FeedClient::from_config(&config)?);
        let resolver = Arc::new(DocumentResolver::from_config(&config)?);
        Ok(Self::with_parts(config, store, source, resolver))
    }

    /// Follower over custom collaborators
    pub fn with_parts(
        config: FollowConfig,
        store: Arc<dyn CheckpointStore>,
        source: Arc<dyn ChangeSource>,
        resolver: Arc<dyn Resolve>,
    ) -> Self {
        let tracker = Arc::new(CheckpointTracker::new(store, config.since));
        Self {
            config: Arc::new(config),
            tracker,
            source,
            resolver,
        }
    }

    pub fn config(&self) -> &FollowConfig {
        &self.config
    }

    pub fn tracker(&self) -> &Arc<CheckpointTracker> {
        &self.tracker
    }

    /// Start following.
    ///
    /// The reader runs on its own task until `cancel` fires or the returned
    /// stream is dropped or ends. Every yielded item's completion must be
    /// called for the checkpoint to move past it.
    pub fn follow(&self, cancel: CancellationToken) -> ChangeStream {
        let cancel = cancel.child_token();
        let concurrency = self.config.concurrency.max(1);
        let (queue, units) = mpsc::channel(concurrency);

        let reader = ChangeReader::new(
            self.source.clone(),
            self.tracker.clone(),
            self.resolver.clone(),
            self.config.inactivity_timeout(),
            self.config.inactivity_backoff(),
        );
        info!(
            concurrency,
            inactivity_timeout_ms = self.config.inactivity_timeout_ms,
            failure_policy = ?self.config.failure_policy,
            "following change feed"
        );
        tokio::spawn(reader.run(queue, cancel.clone()));

        Scheduler::new(self.tracker.clone(), concurrency, self.config.failure_policy)
            .run(ReceiverStream::new(units), cancel)
    }

    /// Position the next `follow` resumes from
    pub async fn read_checkpoint(&self) -> Position {
        self.tracker.read().await
    }

    /// Forget the stored checkpoint; the next `follow` starts from the beginning
    pub async fn reset_checkpoint(&self) -> FollowResult<()> {
        self.tracker.reset().await
    }
}

impl std::fmt::Debug for Follower {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Follower")
            .field("config", &self.config)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
