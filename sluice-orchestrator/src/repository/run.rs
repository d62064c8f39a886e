//! Run Repository
//!
//! In-memory storage for runs, keyed by run ID. Every run sits behind its own
//! lock: the engine mutates a run through its [`RunHandle`] while readers
//! take consistent snapshots. The map lock is only held for insert and lookup,
//! never across a run mutation.
//!
//! Runs live for the lifetime of the process; nothing is persisted or evicted.

use sluice_core::domain::run::Run;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Shared handle to a single stored run
pub type RunHandle = Arc<RwLock<Run>>;

/// Registry of all runs known to this process
#[derive(Debug, Default)]
pub struct RunRepository {
    runs: RwLock<HashMap<Uuid, RunHandle>>,
}

impl RunRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new run with all stages pending and store it
    pub async fn create(&self, fail_test: bool) -> RunHandle {
        let run = Run::new(fail_test);
        let id = run.id;
        let handle = Arc::new(RwLock::new(run));

        self.runs.write().await.insert(id, Arc::clone(&handle));

        handle
    }

    /// Find a run by ID, returning a snapshot of its current state
    pub async fn find_by_id(&self, id: Uuid) -> Option<Run> {
        let handle = self.handle(id).await?;
        let run = handle.read().await;
        Some(run.clone())
    }

    /// Get the shared handle for a run
    pub async fn handle(&self, id: Uuid) -> Option<RunHandle> {
        self.runs.read().await.get(&id).cloned()
    }

    /// List snapshots of all runs, newest first
    pub async fn list_all(&self) -> Vec<Run> {
        let handles: Vec<RunHandle> = self.runs.read().await.values().cloned().collect();

        let mut runs = Vec::with_capacity(handles.len());
        for handle in handles {
            runs.push(handle.read().await.clone());
        }

        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        runs
    }
}
