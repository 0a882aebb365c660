//! JSON-file backed [`DurableStore`].
//!
//! Each slot is one pretty-printed JSON file inside the data directory. The
//! directory is created on the first write. Writes land in a `.tmp` sibling
//! that is then renamed over the slot, so a crash mid-write leaves the
//! previous value intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use todosync_proto::codec;
use todosync_proto::mutation::PendingMutation;
use todosync_proto::task::Task;

use super::{DurableStore, QUEUE_FILE, SNAPSHOT_FILE, Slot, StoreError};

/// Store that keeps both slots as files under one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `dir`. Nothing is touched on disk yet.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the data directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, slot: Slot) -> PathBuf {
        match slot {
            Slot::Snapshot => self.dir.join(SNAPSHOT_FILE),
            Slot::Queue => self.dir.join(QUEUE_FILE),
        }
    }

    /// Reads a slot, returning `None` if its file does not exist.
    async fn read_slot<T: DeserializeOwned>(&self, slot: Slot) -> Result<Option<T>, StoreError> {
        let path = self.slot_path(slot);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        codec::decode(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                slot,
                reason: e.to_string(),
            })
    }

    async fn write_slot<T: Serialize + ?Sized>(
        &self,
        slot: Slot,
        value: &T,
    ) -> Result<(), StoreError> {
        let bytes = codec::encode(value).map_err(|e| StoreError::Corrupt {
            slot,
            reason: e.to_string(),
        })?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.slot_path(slot);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StoreError::Io { path, source })?;

        tracing::trace!(%slot, bytes = bytes.len(), "slot written");
        Ok(())
    }
}

impl DurableStore for FileStore {
    async fn load_snapshot(&self) -> Result<Vec<Task>, StoreError> {
        self.read_slot(Slot::Snapshot).await?.ok_or(StoreError::Empty)
    }

    async fn save_snapshot(&self, tasks: &[Task]) -> Result<(), StoreError> {
        self.write_slot(Slot::Snapshot, tasks).await
    }

    async fn load_queue(&self) -> Result<Vec<PendingMutation>, StoreError> {
        Ok(self.read_slot(Slot::Queue).await?.unwrap_or_default())
    }

    async fn save_queue(&self, queue: &[PendingMutation]) -> Result<(), StoreError> {
        self.write_slot(Slot::Queue, queue).await
    }
}
