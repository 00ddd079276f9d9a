//! Change feed reader.
//!
//! The reader owns the feed connection. It resumes from the tracker's
//! checkpoint, decodes records, registers each valid one with the tracker
//! and hands it to the scheduler queue. A watchdog tears the connection down
//! when no record arrives within the inactivity timeout; any interruption is
//! followed by a fixed backoff and a fresh connection from the current
//! checkpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vine_core::error::VineError;
use vine_core::types::{ChangeRecord, Position};
use vine_registry::{FeedClient, FeedStream};

use crate::checkpoint::CheckpointTracker;
use crate::decode::decode_stream;
use crate::work::{Resolve, WorkUnit};
use crate::FollowResult;

/// Opens the feed after a position
#[async_trait]
pub trait ChangeSource: Send + Sync {
    async fn open(&self, since: Position) -> FollowResult<FeedStream>;
}

#[async_trait]
impl ChangeSource for FeedClient {
    async fn open(&self, since: Position) -> FollowResult<FeedStream> {
        FeedClient::open(self, since).await
    }
}

/// Lifecycle of the reader loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Connecting,
    Streaming,
    ReconnectWait,
    Stopped,
}

/// Reads the feed and produces work units in feed order
pub struct ChangeReader {
    source: Arc<dyn ChangeSource>,
    tracker: Arc<CheckpointTracker>,
    resolver: Arc<dyn Resolve>,
    inactivity_timeout: Duration,
    inactivity_backoff: Duration,
    state: watch::Sender<ReaderState>,
}

impl ChangeReader {
    pub fn new(
        source: Arc<dyn ChangeSource>,
        tracker: Arc<CheckpointTracker>,
        resolver: Arc<dyn Resolve>,
        inactivity_timeout: Duration,
        inactivity_backoff: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ReaderState::Connecting);
        Self {
            source,
            tracker,
            resolver,
            inactivity_timeout,
            inactivity_backoff,
            state,
        }
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<ReaderState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: ReaderState) {
        self.state.send_replace(state);
    }

    /// Follow the feed until cancelled or the queue is closed
    pub async fn run(self, queue: mpsc::Sender<WorkUnit>, cancel: CancellationToken) {
        loop {
            match self.stream_once(&queue, &cancel).await {
                Err(VineError::Cancelled) => break,
                Ok(()) => info!("change feed ended, reconnecting"),
                Err(e) => warn!(error = %e, "change feed interrupted, reconnecting"),
            }

            self.set_state(ReaderState::ReconnectWait);
            debug!(backoff_ms = millis(self.inactivity_backoff), "waiting before reconnect");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.inactivity_backoff) => {},
            }
        }

        self.set_state(ReaderState::Stopped);
        debug!("change reader stopped");
    }

    /// One connection, from open to interruption
    async fn stream_once(
        &self,
        queue: &mpsc::Sender<WorkUnit>,
        cancel: &CancellationToken,
    ) -> FollowResult<()> {
        self.set_state(ReaderState::Connecting);
        let since = self.tracker.read().await;

        let mut last_activity = Instant::now();
        let watchdog = sleep(self.inactivity_timeout);
        tokio::pin!(watchdog);

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(VineError::Cancelled),
            _ = &mut watchdog => return Err(inactivity(last_activity)),
            opened = self.source.open(since) => opened?,
        };

        self.set_state(ReaderState::Streaming);
        let records = decode_stream(body);
        tokio::pin!(records);

        loop {
            let value = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(VineError::Cancelled),
                _ = &mut watchdog => return Err(inactivity(last_activity)),
                next = records.next() => match next {
                    Some(value) => value?,
                    None => return Ok(()),
                },
            };

            let Some(record) = ChangeRecord::from_value(value) else {
                debug!("skipping feed line without a valid seq and id");
                continue;
            };

            let position = record.position;
            self.tracker.start(position).await;
            let unit = WorkUnit::new(record, self.resolver.clone());

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(VineError::Cancelled),
                sent = queue.send(unit) => sent.map_err(|_| VineError::Cancelled)?,
            }
            debug!(position = %position, "change queued");

            last_activity = Instant::now();
            watchdog.as_mut().reset(last_activity + self.inactivity_timeout);
        }
    }
}

fn inactivity(last_activity: Instant) -> VineError {
    VineError::Inactivity {
        elapsed_ms: millis(last_activity.elapsed()),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl std::fmt::Debug for ChangeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeReader")
            .field("inactivity_timeout", &self.inactivity_timeout)
            .field("inactivity_backoff", &self.inactivity_backoff)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
