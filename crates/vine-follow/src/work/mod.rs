//! Work units
//!
//! A work unit is a change record bound to the resolver that turns it into a
//! document. Units are created by the reader in feed order and executed by
//! the scheduler.

use std::sync::Arc;

use async_trait::async_trait;
use vine_core::types::{ChangeRecord, Position};
use vine_registry::{DocumentResolver, Resolution};

use crate::FollowResult;

/// Resolves a change into its document
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, record: &ChangeRecord) -> FollowResult<Resolution>;
}

#[async_trait]
impl Resolve for DocumentResolver {
    async fn resolve(&self, record: &ChangeRecord) -> FollowResult<Resolution> {
        DocumentResolver::resolve(self, record).await
    }
}

/// One change waiting to be resolved
#[derive(Clone)]
pub struct WorkUnit {
    record: ChangeRecord,
    resolver: Arc<dyn Resolve>,
}

impl WorkUnit {
    pub fn new(record: ChangeRecord, resolver: Arc<dyn Resolve>) -> Self {
        Self { record, resolver }
    }

    pub fn position(&self) -> Position {
        self.record.position
    }

    pub fn record(&self) -> &ChangeRecord {
        &self.record
    }

    /// Resolve the change, consuming the unit
    pub async fn run(self) -> (Position, FollowResult<Resolution>) {
        let result = self.resolver.resolve(&self.record).await;
        (self.record.position, result)
    }
}

impl std::fmt::Debug for WorkUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkUnit")
            .field("position", &self.record.position)
            .field("subject_id", &self.record.subject_id)
            .finish_non_exhaustive()
    }
}
