use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cadence_domain::persistence::{PersistedRecurrence, PersistenceSink};
use cadence_domain::service::TaskId;

/// Immutable description of a store that recurrence blobs are written to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncRoot {
    pub id: String,
    pub backend: StorageBackend,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StorageBackend {
    Local { dir: PathBuf },
    Remote { endpoint: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncJob {
    pub root_id: String,
    pub job_kind: SyncJobKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncJobKind {
    WriteBack {
        task: TaskId,
        blob: PersistedRecurrence,
    },
    FullScan,
    RemoteDelta,
}

/// Shared handle the engine writes into. `TaskService` hands blobs here
/// from inside its mutation step and immediately moves on; the queue is
/// drained into concrete jobs later. Last write per task wins, and there
/// is no retry bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct WriteBackQueue {
    pending: Arc<Mutex<VecDeque<(TaskId, PersistedRecurrence)>>>,
}

impl WriteBackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    fn drain(&self) -> Vec<(TaskId, PersistedRecurrence)> {
        self.pending.lock().drain(..).collect()
    }
}

impl PersistenceSink for WriteBackQueue {
    fn persist(&self, task: &TaskId, blob: PersistedRecurrence) {
        tracing::debug!(task = %task, "recurrence write-back queued");
        self.pending.lock().push_back((task.clone(), blob));
    }
}

#[derive(Debug, Default)]
pub struct SyncService {
    roots: Vec<SyncRoot>,
    queue: WriteBackQueue,
    pending_jobs: VecDeque<SyncJob>,
}

impl SyncService {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sink to hand to `TaskServiceBuilder::with_persistence_sink`.
    pub fn queue_handle(&self) -> WriteBackQueue {
        self.queue.clone()
    }

    #[instrument(skip(self))]
    pub fn register_root(&mut self, root: SyncRoot) -> Result<()> {
        if self.roots.iter().any(|existing| existing.id == root.id) {
            return Ok(());
        }
        if let StorageBackend::Local { dir } = &root.backend {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating sync root `{}`", dir.display()))?;
        }
        self.pending_jobs.push_back(SyncJob {
            root_id: root.id.clone(),
            job_kind: SyncJobKind::FullScan,
        });
        self.roots.push(root);
        Ok(())
    }

    pub fn list_roots(&self) -> &[SyncRoot] {
        &self.roots
    }

    /// Turns every queued write-back into a job against `root_id`.
    pub fn drain_queue(&mut self, root_id: &str) {
        for (task, blob) in self.queue.drain() {
            self.pending_jobs.push_back(SyncJob {
                root_id: root_id.to_string(),
                job_kind: SyncJobKind::WriteBack { task, blob },
            });
        }
    }

    pub fn dequeue_job(&mut self) -> Option<SyncJob> {
        self.pending_jobs.pop_front()
    }

    #[instrument(skip(self, job), fields(root = %job.root_id))]
    pub fn perform_job(&mut self, job: SyncJob) -> Result<SyncReport> {
        let root = self
            .roots
            .iter()
            .find(|candidate| candidate.id == job.root_id)
            .with_context(|| format!("unknown sync root `{}`", job.root_id))?;

        match job.job_kind {
            SyncJobKind::WriteBack { task, blob } => match &root.backend {
                StorageBackend::Local { dir } => {
                    write_blob(dir, &task, &blob)?;
                    Ok(SyncReport::written(root.id.clone(), task))
                }
                StorageBackend::Remote { endpoint } => {
                    // Remote delivery is owned by the transport layer;
                    // this queue only hands the blob over.
                    tracing::debug!(%endpoint, task = %task, "remote write-back dispatched");
                    Ok(SyncReport::written(root.id.clone(), task))
                }
            },
            SyncJobKind::FullScan => {
                let known = match &root.backend {
                    StorageBackend::Local { dir } => scan_blobs(dir)?,
                    StorageBackend::Remote { .. } => Vec::new(),
                };
                Ok(SyncReport::scanned(root.id.clone(), known))
            }
            SyncJobKind::RemoteDelta => Ok(SyncReport::noop(root.id.clone())),
        }
    }

    /// Reads one task's blob back from a local root.
    pub fn load_blob(root: &SyncRoot, task: &TaskId) -> Result<PersistedRecurrence> {
        let StorageBackend::Local { dir } = &root.backend else {
            anyhow::bail!("root `{}` has no readable local store", root.id);
        };
        let path = blob_path(dir, task);
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading `{}`", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("decoding `{}`", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub root_id: String,
    pub written: Option<TaskId>,
    pub known_tasks: Vec<TaskId>,
}

impl SyncReport {
    fn written(root_id: String, task: TaskId) -> Self {
        Self {
            root_id,
            written: Some(task),
            known_tasks: Vec::new(),
        }
    }

    fn scanned(root_id: String, known_tasks: Vec<TaskId>) -> Self {
        Self {
            root_id,
            written: None,
            known_tasks,
        }
    }

    fn noop(root_id: String) -> Self {
        Self {
            root_id,
            written: None,
            known_tasks: Vec::new(),
        }
    }
}

fn blob_path(dir: &Path, task: &TaskId) -> PathBuf {
    dir.join(format!("{}.json", task.as_str()))
}

fn write_blob(dir: &Path, task: &TaskId, blob: &PersistedRecurrence) -> Result<()> {
    let path = blob_path(dir, task);
    let payload = serde_json::to_string_pretty(blob)?;
    fs::write(&path, payload).with_context(|| format!("writing `{}`", path.display()))
}

fn scan_blobs(dir: &Path) -> Result<Vec<TaskId>> {
    let mut tasks = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("scanning `{}`", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                tasks.push(TaskId::new(stem));
            }
        }
    }
    tasks.sort();
    Ok(tasks)
}
