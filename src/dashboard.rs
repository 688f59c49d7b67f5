//! Main-screen data flow.
//!
//! The dashboard caches the user's tasks, categories, stats and progression,
//! reloads them after every mutation and exposes the result through
//! [`Dashboard::snapshot`]. Failures land in `error_message` as user-facing
//! text; the typed error is still returned to the caller.

use std::future::Future;

use chrono::NaiveDate;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::api::model::{Category, CategoryRequest, Stat, StatRequest, Task, TaskRequest};
use crate::calendar;
use crate::config::ClientConfig;
use crate::error::{ApiError, Error, Result, TaskError};
use crate::progression::{
    self, EXPERIENCE_STAT, LEVEL_STAT, ProgressionCalculator, ProgressionState,
};
use crate::tasks::completion_request;

/// Everything the main screen renders.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardState {
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub tasks: Vec<Task>,
    pub categories: Vec<Category>,
    pub stats: Vec<Stat>,
    pub progression: ProgressionState,
    /// Completed share of the tasks due today, in percent.
    pub daily_progress: f32,
    pub tasks_due_today: usize,
    pub loading: bool,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
}

impl DashboardState {
    /// Default stats without the reserved level/experience counters.
    pub fn editable_stats(&self) -> Vec<&Stat> {
        progression::editable_stats(&self.stats)
    }
}

/// What a completion toggle did.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOutcome {
    /// False when the task already had the requested flag.
    pub changed: bool,
    pub reward: i64,
    pub leveled_up: bool,
    pub progression: ProgressionState,
    /// Names of stats whose write failed. These are not rolled back.
    pub failed_stat_updates: Vec<String>,
}

pub struct Dashboard {
    api: ApiClient,
    task_limit: usize,
    category_limit: usize,
    state: RwLock<DashboardState>,
}

impl Dashboard {
    pub fn new(api: ApiClient, config: &ClientConfig) -> Self {
        Self::with_limits(api, config.task_limit, config.category_limit)
    }

    pub fn with_limits(api: ApiClient, task_limit: usize, category_limit: usize) -> Self {
        Self {
            api,
            task_limit,
            category_limit,
            state: RwLock::new(DashboardState::default()),
        }
    }

    pub async fn snapshot(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    pub async fn editable_stats(&self) -> Vec<Stat> {
        self.state
            .read()
            .await
            .editable_stats()
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn clear_messages(&self) {
        let mut state = self.state.write().await;
        state.error_message = None;
        state.success_message = None;
    }

    // ── Reload ──────────────────────────────────────────────────────

    /// Reload everything, counting today's tasks against the current UTC date.
    pub async fn load(&self) -> Result<()> {
        self.load_on(calendar::today()).await
    }

    /// Reload everything with `today` as the reference day.
    pub async fn load_on(&self, today: NaiveDate) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.loading = true;
            state.error_message = None;
        }

        let result = self.fetch_all(today).await;

        let mut state = self.state.write().await;
        state.loading = false;
        if let Err(ref e) = result {
            warn!(error = %e, "Dashboard reload failed");
            state.error_message = Some(e.user_message("Failed to load data"));
        }
        result
    }

    /// Only a failed user fetch aborts; the other fetches run regardless and
    /// the first of their errors is returned.
    async fn fetch_all(&self, today: NaiveDate) -> Result<()> {
        let user = self.api.get_user().await?;
        self.state.write().await.username = Some(user.username);

        let mut first_error: Option<Error> = None;
        let mut record = |e: ApiError, what: &str| {
            warn!(error = %e, "Failed to load {what}");
            if first_error.is_none() {
                first_error = Some(e.into());
            }
        };

        match self.api.list_tasks().await {
            Ok(mut tasks) => {
                tasks.truncate(self.task_limit);
                let due_today = calendar::tasks_due_on_prefix(&tasks, today);
                let daily_progress =
                    ProgressionCalculator::daily_progress_percentage(due_today.iter().copied());
                let tasks_due_today = due_today.len();
                let mut state = self.state.write().await;
                state.tasks = tasks;
                state.daily_progress = daily_progress;
                state.tasks_due_today = tasks_due_today;
            }
            Err(e) => record(e, "tasks"),
        }

        match self.api.list_categories().await {
            Ok(mut categories) => {
                categories.truncate(self.category_limit);
                self.state.write().await.categories = categories;
            }
            Err(e) => record(e, "categories"),
        }

        match self.api.list_stats().await {
            Ok(stats) => {
                let progression = ProgressionState::from_stats(&stats);
                let mut state = self.state.write().await;
                state.stats = stats;
                state.progression = progression;
            }
            Err(e) => record(e, "stats"),
        }

        match self.api.get_avatar().await {
            Ok(avatars) => {
                let url = avatars
                    .into_iter()
                    .next()
                    .and_then(|a| a.avatar_details)
                    .and_then(|d| d.image_url);
                self.state.write().await.avatar_url = url;
            }
            Err(e) => debug!(error = %e, "Avatar unavailable"),
        }

        {
            let state = self.state.read().await;
            debug!(
                level = state.progression.level,
                experience = state.progression.experience,
                tasks_due_today = state.tasks_due_today,
                daily_progress = state.daily_progress,
                "Dashboard reloaded"
            );
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ── Completion ──────────────────────────────────────────────────

    /// Set task `id`'s completion flag.
    ///
    /// Completing a task awards its priority as experience, bumps the linked
    /// stat and writes the new level and experience. Stat writes run
    /// concurrently after the task update succeeds; their failures are
    /// reported but never undo the completion.
    pub async fn complete_task(&self, id: i64, completed: bool) -> Result<CompletionOutcome> {
        let (task, stats, current) = {
            let state = self.state.read().await;
            let task = state.tasks.iter().find(|t| t.id == id).cloned();
            (task, state.stats.clone(), state.progression)
        };

        let Some(task) = task else {
            let err = TaskError::NotFound { id };
            return Err(self.fail(err.into(), "Failed to update task").await);
        };
        let request = match completion_request(&task, completed) {
            Ok(request) => request,
            Err(e) => return Err(self.fail(e.into(), "Failed to update task").await),
        };

        let Some(request) = request else {
            return Ok(CompletionOutcome {
                changed: false,
                reward: 0,
                leveled_up: false,
                progression: current,
                failed_stat_updates: Vec::new(),
            });
        };

        if let Err(e) = self.api.update_task(id, &request).await {
            return Err(self.fail(e.into(), "Failed to update task").await);
        }

        let reward = progression::reward_points(&task);
        let result = ProgressionCalculator::apply_completion(current.level, current.experience, reward);
        let progression = result.state();
        {
            let mut state = self.state.write().await;
            state.progression = progression;
            if let Some(t) = state.tasks.iter_mut().find(|t| t.id == id) {
                t.is_completed = true;
            }
        }
        info!(
            task_id = id,
            reward,
            level = result.new_level,
            experience = result.new_experience,
            leveled_up = result.leveled_up,
            "Task completed"
        );

        let failed_stat_updates = self.write_progress(&task, &stats, result.new_level, result.new_experience).await;

        let reloaded = self.load().await.is_ok();

        if !failed_stat_updates.is_empty() {
            self.state.write().await.error_message = Some(format!(
                "Failed to update stats: {}",
                failed_stat_updates.join(", ")
            ));
        } else if result.leveled_up && reloaded {
            self.state.write().await.success_message =
                Some(format!("Level up! You reached level {}", result.new_level));
        }

        Ok(CompletionOutcome {
            changed: true,
            reward,
            leveled_up: result.leveled_up,
            progression,
            failed_stat_updates,
        })
    }

    /// Write the linked stat, experience and level concurrently.
    ///
    /// Returns the names of the stats whose write failed.
    async fn write_progress(
        &self,
        task: &Task,
        stats: &[Stat],
        level: i64,
        experience: i64,
    ) -> Vec<String> {
        let mut writes = Vec::new();

        if let Some(stat_id) = task.stat_id {
            match stats.iter().find(|s| s.id == stat_id) {
                Some(linked) if !progression::is_reserved_stat(&linked.name) => {
                    let value = linked.value.saturating_add(1);
                    writes.push(self.write_stat(&linked.name, Some(linked), value));
                }
                Some(_) => {}
                None => warn!(task_id = task.id, stat_id, "Linked stat not loaded; skipping"),
            }
        }
        let by_name = |name: &str| stats.iter().find(|s| s.name == name);
        writes.push(self.write_stat(EXPERIENCE_STAT, by_name(EXPERIENCE_STAT), experience));
        writes.push(self.write_stat(LEVEL_STAT, by_name(LEVEL_STAT), level));

        join_all(writes)
            .await
            .into_iter()
            .filter_map(|(name, result)| match result {
                Ok(()) => None,
                Err(e) => {
                    warn!(stat = %name, error = %e, "Stat update failed");
                    Some(name)
                }
            })
            .collect()
    }

    /// Update `existing` to `value`, or create the stat when it is missing.
    async fn write_stat(
        &self,
        name: &str,
        existing: Option<&Stat>,
        value: i64,
    ) -> (String, std::result::Result<(), ApiError>) {
        let result = match existing {
            Some(stat) => self
                .api
                .update_stat(stat.id, &StatRequest::with_value(stat, value))
                .await
                .map(|_| ()),
            None => {
                let mut request = StatRequest::new(name);
                request.value = value;
                self.api.create_stat(&request).await.map(|_| ())
            }
        };
        (name.to_string(), result)
    }

    // ── CRUD ────────────────────────────────────────────────────────

    pub async fn add_task(&self, request: &TaskRequest) -> Result<Task> {
        self.validate(request.validate()).await?;
        self.mutate("Failed to add task", "Task added", self.api.create_task(request))
            .await
    }

    pub async fn update_task(&self, id: i64, request: &TaskRequest) -> Result<Task> {
        self.validate(request.validate()).await?;
        self.mutate(
            "Failed to update task",
            "Task updated",
            self.api.update_task(id, request),
        )
        .await
    }

    pub async fn delete_task(&self, id: i64) -> Result<()> {
        self.mutate("Failed to delete task", "Task deleted", self.api.delete_task(id))
            .await
    }

    pub async fn add_category(&self, request: &CategoryRequest) -> Result<Category> {
        self.validate(request.validate()).await?;
        self.mutate(
            "Failed to add category",
            "Category added",
            self.api.create_category(request),
        )
        .await
    }

    pub async fn update_category(&self, id: i64, request: &CategoryRequest) -> Result<Category> {
        self.validate(request.validate()).await?;
        self.mutate(
            "Failed to update category",
            "Category updated",
            self.api.update_category(id, request),
        )
        .await
    }

    pub async fn delete_category(&self, id: i64) -> Result<()> {
        self.mutate(
            "Failed to delete category",
            "Category deleted",
            self.api.delete_category(id),
        )
        .await
    }

    pub async fn add_stat(&self, request: &StatRequest) -> Result<Stat> {
        self.validate(request.validate()).await?;
        self.mutate("Failed to add stat", "Stat added", self.api.create_stat(request))
            .await
    }

    pub async fn update_stat(&self, id: i64, request: &StatRequest) -> Result<Stat> {
        self.validate(request.validate()).await?;
        self.mutate(
            "Failed to update stat",
            "Stat updated",
            self.api.update_stat(id, request),
        )
        .await
    }

    pub async fn delete_stat(&self, id: i64) -> Result<()> {
        self.mutate("Failed to delete stat", "Stat deleted", self.api.delete_stat(id))
            .await
    }

    // ── Plumbing ────────────────────────────────────────────────────

    async fn validate(
        &self,
        check: std::result::Result<(), crate::error::ValidationError>,
    ) -> Result<()> {
        match check {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e.into(), "Invalid input").await),
        }
    }

    /// Await a write, then reload on success or record the failure.
    async fn mutate<T, F>(&self, fallback: &str, success: &str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, ApiError>>,
    {
        match call.await {
            Ok(value) => {
                // A failed reload has already filled the error slot.
                if self.load().await.is_ok() {
                    self.state.write().await.success_message = Some(success.to_string());
                }
                Ok(value)
            }
            Err(e) => Err(self.fail(e.into(), fallback).await),
        }
    }

    async fn fail(&self, err: Error, fallback: &str) -> Error {
        let mut state = self.state.write().await;
        state.success_message = None;
        state.error_message = Some(err.user_message(fallback));
        err
    }
}
