//! In-process `TaskRegistry`: the Control API's stand-in for whatever real
//! task queue a deployment uses. The engine never references this type.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

use crate::core::types::{AggregateReport, TaskStatus, TaskView};

struct TaskEntry {
    status: TaskStatus,
    info: Option<Value>,
    result: Option<AggregateReport>,
    error: Option<String>,
    abort: Option<AbortHandle>,
    cancel: CancellationToken,
}

impl TaskEntry {
    fn pending(cancel: CancellationToken) -> Self {
        Self {
            status: TaskStatus::Pending,
            info: None,
            result: None,
            error: None,
            abort: None,
            cancel,
        }
    }

    fn view(&self, task_id: &str) -> TaskView {
        TaskView {
            task_id: task_id.to_string(),
            status: self.status,
            info: self.info.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }
}

#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<Mutex<HashMap<String, TaskEntry>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, task_id: &str, abort: AbortHandle, cancel: CancellationToken) {
        let mut entry = TaskEntry::pending(cancel);
        entry.abort = Some(abort);
        self.tasks.lock().await.insert(task_id.to_string(), entry);
    }

    pub async fn mark_started(&self, task_id: &str) {
        if let Some(entry) = self.tasks.lock().await.get_mut(task_id) {
            entry.status = TaskStatus::Started;
        }
    }

    pub async fn mark_progress(&self, task_id: &str, info: Value) {
        if let Some(entry) = self.tasks.lock().await.get_mut(task_id) {
            entry.status = TaskStatus::Progress;
            entry.info = Some(info);
        }
    }

    pub async fn mark_success(&self, task_id: &str, result: AggregateReport) {
        if let Some(entry) = self.tasks.lock().await.get_mut(task_id) {
            entry.status = TaskStatus::Success;
            entry.result = Some(result);
            entry.info = None;
        }
    }

    pub async fn mark_failure(&self, task_id: &str, error: String) {
        if let Some(entry) = self.tasks.lock().await.get_mut(task_id) {
            entry.status = TaskStatus::Failure;
            entry.error = Some(error);
        }
    }

    pub async fn view(&self, task_id: &str) -> Option<TaskView> {
        self.tasks.lock().await.get(task_id).map(|e| e.view(task_id))
    }

    /// Revoke a task. Any task in `PENDING`, `STARTED`, or `PROGRESS` is
    /// revocable regardless of `terminate` — the reference task queue's own
    /// `revoke(terminate=...)` revokes purely on state membership, with
    /// `terminate` only controlling kill-signal forcefulness, not
    /// eligibility.
    ///
    /// `terminate` picks the mechanism: `true` hard-aborts the running task
    /// immediately (it cannot self-report past that point, so the terminal
    /// status is set here); `false` raises the cooperative cancellation
    /// signal and leaves the pipeline to reach its own terminal status
    /// through the normal `mark_success`/`mark_failure` path once it has
    /// performed its final persist.
    pub async fn revoke(&self, task_id: &str, terminate: bool) -> Option<(TaskView, bool)> {
        let mut tasks = self.tasks.lock().await;
        let entry = tasks.get_mut(task_id)?;
        let revocable = matches!(
            entry.status,
            TaskStatus::Pending | TaskStatus::Started | TaskStatus::Progress
        );
        if revocable {
            if terminate {
                if let Some(abort) = entry.abort.take() {
                    abort.abort();
                }
                entry.status = TaskStatus::Failure;
                entry.error = Some("revoked by client".to_string());
                entry.info = None;
            } else {
                entry.cancel.cancel();
            }
        } else {
            entry.info = Some(serde_json::json!({ "message": "cannot be revoked" }));
        }
        Some((entry.view(task_id), revocable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_abort() -> AbortHandle {
        tokio::spawn(async { std::future::pending::<()>().await }).abort_handle()
    }

    #[tokio::test]
    async fn lifecycle_pending_started_success() {
        let registry = TaskRegistry::new();
        registry.register("T1", dummy_abort(), CancellationToken::new()).await;
        assert_eq!(registry.view("T1").await.unwrap().status, TaskStatus::Pending);

        registry.mark_started("T1").await;
        assert_eq!(registry.view("T1").await.unwrap().status, TaskStatus::Started);

        let report = AggregateReport {
            status: "completed".to_string(),
            task_id: "T1".to_string(),
            duration_secs: 1.0,
            domains: vec!["https://example.com".to_string()],
            urls_count: HashMap::new(),
            total_urls: 0,
            parser_stats: HashMap::new(),
            urls_by_parser: HashMap::new(),
        };
        registry.mark_success("T1", report).await;
        let view = registry.view("T1").await.unwrap();
        assert_eq!(view.status, TaskStatus::Success);
        assert!(view.result.is_some());
    }

    #[tokio::test]
    async fn pending_task_is_always_revocable() {
        let registry = TaskRegistry::new();
        registry.register("T1", dummy_abort(), CancellationToken::new()).await;
        let (view, revoked) = registry.revoke("T1", true).await.unwrap();
        assert!(revoked);
        assert_eq!(view.status, TaskStatus::Failure);
    }

    #[tokio::test]
    async fn started_task_is_revocable_without_terminate() {
        let registry = TaskRegistry::new();
        let cancel = CancellationToken::new();
        registry.register("T1", dummy_abort(), cancel.clone()).await;
        registry.mark_started("T1").await;

        // terminate=false: revocable immediately, but cooperative — the
        // task's own status is left for the pipeline to settle later, only
        // the cancellation signal fires.
        let (view, revoked) = registry.revoke("T1", false).await.unwrap();
        assert!(revoked);
        assert_eq!(view.status, TaskStatus::Started);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn started_task_with_terminate_aborts_immediately() {
        let registry = TaskRegistry::new();
        registry.register("T1", dummy_abort(), CancellationToken::new()).await;
        registry.mark_started("T1").await;

        let (view, revoked) = registry.revoke("T1", true).await.unwrap();
        assert!(revoked);
        assert_eq!(view.status, TaskStatus::Failure);
    }

    #[tokio::test]
    async fn terminal_task_is_never_revocable() {
        let registry = TaskRegistry::new();
        registry.register("T1", dummy_abort(), CancellationToken::new()).await;
        registry.mark_failure("T1", "boom".to_string()).await;

        let (_view, revoked) = registry.revoke("T1", true).await.unwrap();
        assert!(!revoked);
    }
}
