use crate::error::AppResult;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::error;
use uuid::Uuid;

/// Lifecycle of a background task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

/// One tracked background task
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: Uuid,
    pub kind: String,
    /// Requesting user, when the task was started from an API call
    pub owner: Option<Uuid>,
    pub status: TaskStatus,
    /// Failure message, or a small JSON result on success
    pub error: Option<String>,
    pub result: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// In-memory registry of background tasks
///
/// Records live only for the lifetime of the process and are capped at
/// `capacity`; when full, the oldest finished records are evicted first.
/// There is no retry, persistence or cancellation: a task runs at most
/// once and its outcome is whatever the record says.
pub struct TaskRegistry {
    tasks: RwLock<HashMap<Uuid, TaskRecord>>,
    capacity: usize,
}

impl TaskRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Run a named job on `tokio::spawn`, tracking its lifecycle
    ///
    /// The job's `Ok` payload becomes the record's result; its error message
    /// is stored and logged. The caller gets the task id back immediately.
    pub async fn spawn_job<F>(self: &Arc<Self>, kind: &str, owner: Option<Uuid>, job: F) -> Uuid
    where
        F: Future<Output = AppResult<Option<serde_json::Value>>> + Send + 'static,
    {
        let id = self.enqueue(kind, owner).await;
        let kind = kind.to_string();
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            registry.mark_running(id).await;
            match job.await {
                Ok(result) => registry.mark_succeeded(id, result).await,
                Err(e) => {
                    error!(kind = %kind, task_id = %id, error = %e, "background job failed");
                    registry.mark_failed(id, &e.to_string()).await;
                }
            }
        });
        id
    }

    /// Register a new task in the queued state and return its id
    pub async fn enqueue(&self, kind: &str, owner: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now().naive_utc();
        let record = TaskRecord {
            id,
            kind: kind.to_string(),
            owner,
            status: TaskStatus::Queued,
            error: None,
            result: None,
            created_at: now,
            updated_at: now,
        };

        let mut tasks = self.tasks.write().await;
        if tasks.len() >= self.capacity {
            Self::evict_oldest_finished(&mut tasks);
        }
        tasks.insert(id, record);
        id
    }

    /// Move a task to the running state
    pub async fn mark_running(&self, id: Uuid) {
        self.update(id, |record| {
            record.status = TaskStatus::Running;
        })
        .await;
    }

    /// Finish a task successfully, with an optional small result payload
    pub async fn mark_succeeded(&self, id: Uuid, result: Option<serde_json::Value>) {
        self.update(id, |record| {
            record.status = TaskStatus::Succeeded;
            record.result = result;
        })
        .await;
    }

    /// Finish a task with an error message
    pub async fn mark_failed(&self, id: Uuid, error: &str) {
        let error = error.to_string();
        self.update(id, move |record| {
            record.status = TaskStatus::Failed;
            record.error = Some(error);
        })
        .await;
    }

    /// Snapshot of one task record
    pub async fn get(&self, id: Uuid) -> Option<TaskRecord> {
        self.tasks.read().await.get(&id).cloned()
    }

    /// Number of records currently held
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    async fn update<F>(&self, id: Uuid, apply: F)
    where
        F: FnOnce(&mut TaskRecord),
    {
        let mut tasks = self.tasks.write().await;
        if let Some(record) = tasks.get_mut(&id) {
            apply(record);
            record.updated_at = chrono::Utc::now().naive_utc();
        }
    }

    fn evict_oldest_finished(tasks: &mut HashMap<Uuid, TaskRecord>) {
        let oldest_finished = tasks
            .values()
            .filter(|r| r.status.is_terminal())
            .min_by_key(|r| r.updated_at)
            .map(|r| r.id);

        match oldest_finished {
            Some(id) => {
                tasks.remove(&id);
            }
            None => {
                // Everything is still in flight; drop the oldest record so
                // the registry stays bounded.
                if let Some(id) = tasks.values().min_by_key(|r| r.created_at).map(|r| r.id) {
                    tasks.remove(&id);
                }
            }
        }
    }
}
