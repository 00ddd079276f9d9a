//! Checkpoint store implementations

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use tracing::debug;
use vine_core::error::VineError;
use vine_core::types::Position;

use crate::FollowResult;

/// Durable home of the last confirmed position
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Raw stored value, `None` when nothing was stored yet
    async fn read(&self) -> FollowResult<Option<String>>;

    async fn write(&self, position: Position) -> FollowResult<()>;

    async fn reset(&self) -> FollowResult<()>;
}

/// Stores the position as decimal text in a single file
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: Utf8PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn temp_path(&self) -> Utf8PathBuf {
        let file_name = self.path.file_name().unwrap_or("checkpoint");
        self.path.with_file_name(format!(".{}.tmp", file_name))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn read(&self) -> FollowResult<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VineError::io(format!("Failed to read checkpoint {}", self.path), e)),
        }
    }

    async fn write(&self, position: Position) -> FollowResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| VineError::io(format!("Failed to create {}", parent), e))?;
        }

        // Write then rename so a crash never leaves a partial value behind
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, position.to_string())
            .await
            .map_err(|e| VineError::io(format!("Failed to write {}", temp_path), e))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| VineError::io(format!("Failed to replace checkpoint {}", self.path), e))?;

        debug!(path = %self.path, position = %position, "checkpoint written");
        Ok(())
    }

    async fn reset(&self) -> FollowResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VineError::io(format!("Failed to remove checkpoint {}", self.path), e)),
        }
    }
}

/// In-memory store, used for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    value: Mutex<Option<String>>,
    writes: Mutex<Vec<Position>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a raw stored value
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn value(&self) -> Option<String> {
        self.value.lock().clone()
    }

    /// Every position written so far, oldest first
    pub fn writes(&self) -> Vec<Position> {
        self.writes.lock().clone()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn read(&self) -> FollowResult<Option<String>> {
        Ok(self.value())
    }

    async fn write(&self, position: Position) -> FollowResult<()> {
        *self.value.lock() = Some(position.to_string());
        self.writes.lock().push(position);
        Ok(())
    }

    async fn reset(&self) -> FollowResult<()> {
        *self.value.lock() = None;
        Ok(())
    }
}
