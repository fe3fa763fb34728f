//! Checkpoint stores — durable roster state.
//!
//! Writes never block the timer loop: `put` only enqueues. The file store
//! drains its queue from a single background writer task.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use dutybot_core::Checkpoint;
use dutybot_core::error::{DutyBotError, Result};

use crate::checkpoint;

/// Capacity of the file store's write queue.
pub const WRITE_QUEUE_CAPACITY: usize = 16;

/// Durable mapping from roster name to checkpoint.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Request a write of `checkpoint` under its roster id. Does not wait for the write.
    fn put(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Last stored checkpoint for a roster, `NotFound` if there is none.
    fn get(&self, roster_id: &str) -> Result<Checkpoint>;

    /// Stop accepting writes and wait for pending ones.
    async fn shutdown(&self);
}

/// Store that keeps nothing. Used when persistence is disabled.
#[derive(Debug, Default)]
pub struct NullStateStore;

#[async_trait]
impl StateStore for NullStateStore {
    fn put(&self, _checkpoint: &Checkpoint) -> Result<()> {
        Ok(())
    }

    fn get(&self, roster_id: &str) -> Result<Checkpoint> {
        Err(DutyBotError::NotFound(roster_id.to_string()))
    }

    async fn shutdown(&self) {}
}

/// In-memory store, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: Mutex<HashMap<String, Checkpoint>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    fn put(&self, checkpoint: &Checkpoint) -> Result<()> {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(checkpoint.roster_id.clone(), checkpoint.clone());
        Ok(())
    }

    fn get(&self, roster_id: &str) -> Result<Checkpoint> {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(roster_id)
            .cloned()
            .ok_or_else(|| DutyBotError::NotFound(roster_id.to_string()))
    }

    async fn shutdown(&self) {}
}

/// File-based store: one `<roster>.state` file per roster in a directory.
pub struct FileStateStore {
    dir: PathBuf,
    states: Arc<RwLock<HashMap<String, Checkpoint>>>,
    queue: Mutex<Option<mpsc::Sender<Checkpoint>>>,
    writer: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl FileStateStore {
    /// Open the store, indexing every state file in `dir`, and start the writer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let states = Arc::new(RwLock::new(load_states(dir)?));

        let (tx, rx) = mpsc::channel(WRITE_QUEUE_CAPACITY);
        let writer = tokio::spawn(writer_loop(dir.to_path_buf(), rx, states.clone()));

        Ok(Self {
            dir: dir.to_path_buf(),
            states,
            queue: Mutex::new(Some(tx)),
            writer: tokio::sync::Mutex::new(Some(writer)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    fn put(&self, checkpoint: &Checkpoint) -> Result<()> {
        let queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = queue.as_ref() else {
            return Err(DutyBotError::Other("state store is shut down".into()));
        };

        tx.try_send(checkpoint.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                DutyBotError::QueueFull(format!("state of '{}' not saved", checkpoint.roster_id))
            }
            mpsc::error::TrySendError::Closed(_) => {
                DutyBotError::Other("state writer has stopped".into())
            }
        })
    }

    fn get(&self, roster_id: &str) -> Result<Checkpoint> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(roster_id)
            .cloned()
            .ok_or_else(|| DutyBotError::NotFound(roster_id.to_string()))
    }

    async fn shutdown(&self) {
        // Dropping the sender lets the writer drain the queue and exit.
        let closed = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if closed {
            tracing::info!("💾 state store: shutting down");
        }

        let writer = self.writer.lock().await.take();
        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                tracing::error!("state store writer failed: {e}");
            }
            tracing::info!("💾 state store: shutdown finished");
        }
    }
}

fn load_states(dir: &Path) -> Result<HashMap<String, Checkpoint>> {
    let mut states = HashMap::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if !checkpoint::is_state_file(file_name) {
            continue;
        }

        let parsed = std::fs::read_to_string(entry.path())
            .map_err(DutyBotError::from)
            .and_then(|text| checkpoint::decode(&text));
        match parsed {
            Ok(state) => {
                tracing::debug!("💾 found state of '{}' in {}", state.roster_id, file_name);
                states.insert(state.roster_id.clone(), state);
            }
            Err(e) => {
                tracing::warn!("⚠️ skipping state file '{}': {e}", file_name);
            }
        }
    }

    Ok(states)
}

async fn writer_loop(
    dir: PathBuf,
    mut rx: mpsc::Receiver<Checkpoint>,
    states: Arc<RwLock<HashMap<String, Checkpoint>>>,
) {
    while let Some(state) = rx.recv().await {
        match write_state(&dir, &state).await {
            Ok(()) => {
                tracing::info!("💾 [{}] state has been saved to disk", state.roster_id);
                states
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(state.roster_id.clone(), state);
            }
            Err(e) => {
                tracing::error!(
                    "[{}] could not save state to disk, scheduling will start from the beginning after a restart: {e}",
                    state.roster_id
                );
            }
        }
    }
}

async fn write_state(dir: &Path, state: &Checkpoint) -> Result<()> {
    let path = dir.join(checkpoint::state_file_name(&state.roster_id));
    let tmp = path.with_extension("state.tmp");
    tokio::fs::write(&tmp, checkpoint::encode(state)).await?;
    tokio::fs::rename(&tmp, &path).await?;
    Ok(())
}
