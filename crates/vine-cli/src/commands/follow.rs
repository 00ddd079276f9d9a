//! `vine follow`

use std::fmt;

use futures::StreamExt;
use tracing::debug;
use vine_config::ConfigLayering;
use vine_core::error::VineResult;
use vine_follow::{CancellationToken, Follower, Position};

use crate::output::OutputHandler;

/// Flags of the follow command
#[derive(Debug, Clone, Default)]
pub struct FollowArgs {
    pub since: Option<u64>,
    pub concurrency: Option<usize>,
    pub limit: Option<u64>,
    pub on_error: Option<String>,
}

impl FollowArgs {
    /// Add the flags that were given as CLI overrides
    pub fn layering(&self, mut layering: ConfigLayering) -> ConfigLayering {
        if let Some(since) = self.since {
            layering = layering.with_cli_override("since", since);
        }
        if let Some(concurrency) = self.concurrency {
            layering = layering.with_cli_override("concurrency", concurrency);
        }
        if let Some(policy) = &self.on_error {
            layering = layering.with_cli_override("failure_policy", policy);
        }
        layering
    }
}

/// What a follow session did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FollowSummary {
    /// Changes printed
    pub changes: u64,
    /// Positions released without a document
    pub empty: u64,
    pub checkpoint: Position,
}

impl FollowSummary {
    pub fn total(&self) -> u64 {
        self.changes + self.empty
    }
}

impl fmt::Display for FollowSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Followed {} changes ({} without a document), checkpoint at {}",
            self.total(),
            self.empty,
            self.checkpoint
        )
    }
}

/// Print and complete changes until cancelled, `limit` is reached, or a
/// change fails
pub async fn run(
    follower: &Follower,
    limit: Option<u64>,
    cancel: CancellationToken,
    output: &OutputHandler,
) -> VineResult<FollowSummary> {
    let mut summary = FollowSummary::default();
    let mut changes = follower.follow(cancel.clone());

    while let Some(item) = changes.next().await {
        let item = item?;
        match &item.change {
            Some(change) => {
                output.change(change);
                summary.changes += 1;
            },
            None => {
                debug!(position = %item.position, "no document for change");
                summary.empty += 1;
            },
        }
        item.completion.done().await?;

        if limit.is_some_and(|limit| summary.total() >= limit) {
            cancel.cancel();
            break;
        }
    }

    summary.checkpoint = follower.read_checkpoint().await;
    Ok(summary)
}
