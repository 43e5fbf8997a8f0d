// src/task/coordinator.rs

use super::{handler::Handler, progress, scheduler::TaskScheduler};
use crate::{
    TaskContext,
    chat::ChatSurface,
    config::AppConfig,
    downloader::DownloadManager,
    error::{AppError, AppResult},
    models::{Task, TaskMode, TaskOptions, TaskStatus, TaskType},
    processing::PostProcessor,
    transfer::{TransferState, progress_channel},
    utils,
};
use log::{error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

/// Collaborators shared by every task.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<AppConfig>,
    pub chat: Arc<dyn ChatSurface>,
    pub downloader: Arc<dyn DownloadManager>,
    pub processor: Arc<dyn PostProcessor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Done,
    Cancelled(String),
}

struct SlotState {
    status: TaskStatus,
    sources: Vec<String>,
    token: Option<CancellationToken>,
    cancel_reason: Option<String>,
}

/// The single task slot. Every status change goes through one of these guarded
/// transitions.
pub struct TaskSlot {
    state: Mutex<SlotState>,
}

impl Default for TaskSlot {
    fn default() -> Self {
        Self {
            state: Mutex::new(SlotState {
                status: TaskStatus::Idle,
                sources: Vec::new(),
                token: None,
                cancel_reason: None,
            }),
        }
    }
}

impl TaskSlot {
    /// Every transition rewrites whole fields, so a poisoned lock still holds a usable state.
    fn state(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> TaskStatus {
        self.state().status
    }

    pub fn is_running(&self) -> bool {
        self.status() == TaskStatus::Running
    }

    /// `idle | started | done | cancelled -> started`. A running task is left untouched.
    pub(super) fn accept(&self, sources: Vec<String>) -> AppResult<()> {
        let mut state = self.state();
        if state.status == TaskStatus::Running {
            return Err(AppError::TaskBusy);
        }
        state.status = TaskStatus::Started;
        state.sources = sources;
        state.cancel_reason = None;
        Ok(())
    }

    /// `started -> running`, handing out the accepted sources.
    pub(super) fn begin(&self, token: CancellationToken) -> AppResult<Vec<String>> {
        let mut state = self.state();
        let status = state.status;
        match status {
            TaskStatus::Started => {
                state.status = TaskStatus::Running;
                state.token = Some(token);
                Ok(std::mem::take(&mut state.sources))
            }
            TaskStatus::Running => Err(AppError::TaskBusy),
            _ => Err(AppError::PreconditionUnmet("No task is waiting to start.".to_string())),
        }
    }

    /// `running -> cancelled`. Returns whether a running task was stopped.
    pub fn mark_cancelled(&self) -> bool {
        let mut state = self.state();
        let was_running = state.status == TaskStatus::Running;
        if was_running {
            state.status = TaskStatus::Cancelled;
        }
        state.token = None;
        was_running
    }

    /// Clears `started`/`running`: a running task becomes done, anything else idle.
    pub fn finish(&self) {
        let mut state = self.state();
        let status = state.status;
        state.status = match status {
            TaskStatus::Running => TaskStatus::Done,
            TaskStatus::Cancelled => TaskStatus::Cancelled,
            _ => TaskStatus::Idle,
        };
        state.token = None;
    }

    fn discard(&self) {
        let mut state = self.state();
        if state.status == TaskStatus::Started {
            state.status = TaskStatus::Idle;
            state.sources.clear();
        }
    }

    fn request_cancel(&self, reason: &str) -> bool {
        let mut state = self.state();
        match (state.status, state.token.clone()) {
            (TaskStatus::Running, Some(token)) => {
                state.cancel_reason.get_or_insert_with(|| reason.to_string());
                token.cancel();
                true
            }
            _ => false,
        }
    }

    fn take_cancel_reason(&self) -> Option<String> {
        self.state().cancel_reason.take()
    }

    fn reset(&self) {
        let mut state = self.state();
        state.status = TaskStatus::Idle;
        state.sources.clear();
        state.token = None;
        state.cancel_reason = None;
    }
}

/// Owns the one-task-at-a-time rule and runs accepted tasks.
pub struct TaskCoordinator {
    services: Services,
    slot: Arc<TaskSlot>,
    transfer: TransferState,
}

impl TaskCoordinator {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            slot: Arc::new(TaskSlot::default()),
            transfer: TransferState::new(),
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.slot.status()
    }

    pub fn transfer(&self) -> TransferState {
        self.transfer.clone()
    }

    /// Accepts a source list from `user_id`. Rejected while a task is running,
    /// without touching that task.
    pub fn submit(&self, user_id: i64, raw_sources: &[String]) -> AppResult<()> {
        if let Some(owner) = self.services.config.owner_id
            && owner != user_id
        {
            warn!("Rejected submission from user {}", user_id);
            return Err(AppError::Unauthorized(user_id));
        }
        if utils::parse_source_directives(raw_sources).sources.is_empty() {
            return Err(AppError::PreconditionUnmet("No source given.".to_string()));
        }
        self.slot.accept(raw_sources.to_vec())?;
        info!("Accepted {} source line(s) from user {}", raw_sources.len(), user_id);
        Ok(())
    }

    /// Drops an accepted task that was never started.
    pub fn discard(&self) {
        self.slot.discard();
    }

    /// Stops the running task with `reason`. Returns false when nothing runs.
    pub fn cancel(&self, reason: &str) -> bool {
        self.slot.request_cancel(reason)
    }

    /// Runs the accepted task to completion. Every failure ends in the handler's
    /// cancel path and comes back as `TaskOutcome::Cancelled`.
    pub async fn start(
        &self,
        mode: TaskMode,
        task_type: TaskType,
        options: TaskOptions,
    ) -> AppResult<TaskOutcome> {
        let token = CancellationToken::new();
        let raw = self.slot.begin(token.clone())?;
        let task = Task::from_raw_sources(&raw, mode, task_type, options);
        info!(
            "Starting {} / {} task with {} source(s)",
            task.mode,
            task.task_type,
            task.sources.len()
        );

        let (progress, rx) = progress_channel();
        let config = self.services.config.clone();
        let ctx = TaskContext::new(
            Arc::new(task),
            &self.services,
            self.transfer.clone(),
            progress,
            self.slot.clone(),
            token.clone(),
        );

        let stop_reporter = CancellationToken::new();
        let reporter = progress::spawn_reporter(
            rx,
            ctx.chat.clone(),
            self.slot.clone(),
            config.progress_interval,
            stop_reporter.clone(),
        );

        let scheduler = TaskScheduler::new(ctx.clone());
        let result = tokio::select! {
            result = scheduler.run_task() => result,
            _ = token.cancelled() => Err(AppError::UserCancelled),
        };

        let outcome = match result {
            Ok(()) => TaskOutcome::Done,
            Err(e) => {
                let reason = self.slot.take_cancel_reason().unwrap_or_else(|| e.reason());
                error!("Task stopped: {}", e);
                Handler::new(ctx).cancel(&reason).await;
                TaskOutcome::Cancelled(reason)
            }
        };

        stop_reporter.cancel();
        if let Err(e) = reporter.await {
            warn!("Progress reporter ended abnormally: {}", e);
        }
        self.slot.reset();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_survives_a_poisoned_lock() {
        let slot = Arc::new(TaskSlot::default());
        slot.accept(vec!["https://a".into()]).unwrap();
        let poisoner = slot.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.lock().unwrap();
            panic!("holder died");
        })
        .join();
        assert!(slot.state.is_poisoned());

        assert_eq!(slot.status(), TaskStatus::Started);
        slot.begin(CancellationToken::new()).unwrap();
        assert!(slot.is_running());
        assert!(slot.mark_cancelled());
        slot.reset();
        assert_eq!(slot.status(), TaskStatus::Idle);
    }

    #[test]
    fn test_slot_transitions() {
        let slot = TaskSlot::default();
        assert!(matches!(slot.begin(CancellationToken::new()), Err(AppError::PreconditionUnmet(_))));

        slot.accept(vec!["https://a".into()]).unwrap();
        assert_eq!(slot.status(), TaskStatus::Started);
        let sources = slot.begin(CancellationToken::new()).unwrap();
        assert_eq!(sources, vec!["https://a".to_string()]);
        assert!(slot.is_running());

        assert!(matches!(slot.accept(vec!["https://b".into()]), Err(AppError::TaskBusy)));
        assert!(slot.is_running());

        assert!(slot.mark_cancelled());
        assert_eq!(slot.status(), TaskStatus::Cancelled);
        assert!(!slot.mark_cancelled());
        slot.reset();
        assert_eq!(slot.status(), TaskStatus::Idle);
    }

    #[test]
    fn test_finish_clears_flags() {
        let slot = TaskSlot::default();
        slot.accept(vec!["x".into()]).unwrap();
        slot.finish();
        assert_eq!(slot.status(), TaskStatus::Idle);

        slot.accept(vec!["x".into()]).unwrap();
        slot.begin(CancellationToken::new()).unwrap();
        slot.finish();
        assert_eq!(slot.status(), TaskStatus::Done);
    }

    #[test]
    fn test_request_cancel_needs_running_task() {
        let slot = TaskSlot::default();
        assert!(!slot.request_cancel("nope"));
        slot.accept(vec!["x".into()]).unwrap();
        let token = CancellationToken::new();
        slot.begin(token.clone()).unwrap();
        assert!(slot.request_cancel("Cancelled by user."));
        assert!(token.is_cancelled());
        assert_eq!(slot.take_cancel_reason().as_deref(), Some("Cancelled by user."));
    }
}
