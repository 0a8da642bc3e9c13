//! Task board: the session guard, the in-memory task list and the mutations
//! that act on it. Every mutation is one request followed by a full refetch;
//! the cached list is never patched locally.

use crate::api::{NewReminder, NewTask, TaskPatch, TrackerApi};
use crate::datetime::parse_user_datetime;
use crate::error::AppError;
use crate::model::{Category, Reminder, Task, TaskId, TaskStatus};
use crate::notify::{Notifier, activation_argument};
use crate::storage::session_store::Session;
use time::OffsetDateTime;

pub const FAILURE_WARNING: &str = "Marking as failure will auto-delete after 2 days. Continue?";
pub const DELETE_WARNING: &str = "Delete this failed task permanently?";

/// Blocking yes/no question put to the user before destructive changes.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Answers yes to everything.
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

#[derive(Debug)]
pub enum Navigation {
    Board,
    Login { reason: AppError },
}

impl Navigation {
    /// Turns a login redirect into a `login_required` error.
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Navigation::Board => Ok(()),
            Navigation::Login {
                reason: AppError::LoginRequired(message),
            } => Err(AppError::login_required(message)),
            Navigation::Login { reason } => Err(AppError::login_required(format!(
                "session rejected ({reason}); run `tracker login`"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Done(T),
    Cancelled,
}

/// Create form state. Reset to defaults after a successful submit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub target_date: String,
}

impl TaskForm {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn to_new_task(&self) -> Result<NewTask, AppError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AppError::invalid_input("title required"));
        }

        let description = Some(self.description.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let target_date = if self.target_date.trim().is_empty() {
            None
        } else {
            Some(parse_user_datetime(&self.target_date, "target_date")?)
        };

        Ok(NewTask {
            title: title.to_string(),
            description,
            category: self.category.clone(),
            target_date,
            status: TaskStatus::Progress,
        })
    }
}

/// Field changes for an in-place edit. `target_date: Some("")` clears it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub target_date: Option<String>,
}

#[derive(Debug)]
pub struct Column<'a> {
    pub category: Category,
    pub tasks: Vec<&'a Task>,
}

#[derive(Debug)]
pub struct NotificationOutcome {
    pub notified: Vec<(TaskId, Reminder)>,
    pub failures: Vec<NotificationFailure>,
}

#[derive(Debug)]
pub struct NotificationFailure {
    pub task_id: TaskId,
    pub error: AppError,
}

pub struct TaskBoard<'a> {
    api: &'a dyn TrackerApi,
    tasks: Vec<Task>,
}

impl<'a> TaskBoard<'a> {
    pub fn new(api: &'a dyn TrackerApi) -> Self {
        Self {
            api,
            tasks: Vec::new(),
        }
    }

    /// Guards the board behind a stored token, then loads it. Any failure
    /// sends the user back to login.
    pub fn mount(&mut self, session: &Session) -> Navigation {
        if !session.is_logged_in() {
            tracing::warn!("no access token stored, redirecting to login");
            return Navigation::Login {
                reason: AppError::login_required("not logged in; run `tracker login`"),
            };
        }

        match self.refresh() {
            Ok(()) => Navigation::Board,
            Err(err) => {
                tracing::warn!(error = %err, "task fetch failed, redirecting to login");
                Navigation::Login { reason: err }
            }
        }
    }

    pub fn refresh(&mut self) -> Result<(), AppError> {
        self.tasks = self.api.list_tasks()?;
        tracing::debug!(count = self.tasks.len(), "task list refreshed");
        Ok(())
    }

    /// Refetch after a mutation the server already accepted. A failure here
    /// says so, since retrying the command would repeat the change.
    fn refresh_after(&mut self, applied: &str) -> Result<(), AppError> {
        self.refresh().map_err(|err| {
            tracing::warn!(error = %err, applied, "change saved but task reload failed");
            err.context(&format!("{applied}, but reloading tasks failed"))
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Result<&Task, AppError> {
        self.tasks
            .iter()
            .find(|task| task.id == id)
            .ok_or_else(|| AppError::invalid_input("task not found"))
    }

    pub fn create(&mut self, form: &mut TaskForm) -> Result<Task, AppError> {
        let new_task = form.to_new_task()?;
        let created = self.api.create_task(&new_task)?;
        tracing::info!(id = created.id, title = %created.title, "task created");

        form.reset();
        self.refresh_after(&format!("task #{} created", created.id))?;
        Ok(created)
    }

    pub fn change_status(
        &mut self,
        id: TaskId,
        status: TaskStatus,
        confirm: &dyn Confirm,
    ) -> Result<Outcome<Task>, AppError> {
        if status == TaskStatus::Failure && !confirm.confirm(FAILURE_WARNING) {
            return Ok(Outcome::Cancelled);
        }

        let updated = self.api.update_task(id, &TaskPatch::status(status))?;
        tracing::info!(id, status = %status, "task status changed");

        self.refresh_after(&format!("task #{id} status changed"))?;
        Ok(Outcome::Done(updated))
    }

    /// Sends the full set of editable fields, starting from the cached task.
    pub fn edit(&mut self, id: TaskId, edit: &TaskEdit) -> Result<Task, AppError> {
        let current = self.get(id)?;

        let title = match edit.title.as_deref() {
            Some(value) => value.trim().to_string(),
            None => current.title.clone(),
        };
        if title.is_empty() {
            return Err(AppError::invalid_input("title required"));
        }

        let description = match edit.description.as_deref() {
            Some(value) => value.trim().to_string(),
            None => current.description().unwrap_or_default().to_string(),
        };
        let category = edit
            .category
            .clone()
            .unwrap_or_else(|| current.category.clone());
        let target_date = match edit.target_date.as_deref() {
            Some(value) if value.trim().is_empty() => None,
            Some(value) => Some(parse_user_datetime(value, "target_date")?),
            None => current.target_date.clone(),
        };

        let patch = TaskPatch {
            title: Some(title),
            description: Some(description),
            category: Some(category),
            target_date: Some(target_date),
            status: None,
        };

        let updated = self.api.update_task(id, &patch)?;
        tracing::info!(id, "task edited");

        self.refresh_after(&format!("task #{id} updated"))?;
        Ok(updated)
    }

    /// Deletes a task from the failed list. Other tasks cannot be deleted.
    pub fn delete_failed(
        &mut self,
        id: TaskId,
        confirm: &dyn Confirm,
    ) -> Result<Outcome<Task>, AppError> {
        let task = self.get(id)?.clone();
        if !task.is_failed() {
            return Err(AppError::invalid_input("only failed tasks can be deleted"));
        }

        if !confirm.confirm(DELETE_WARNING) {
            return Ok(Outcome::Cancelled);
        }

        self.api.delete_task(id)?;
        tracing::info!(id, "failed task deleted");

        self.refresh_after(&format!("task #{id} deleted"))?;
        Ok(Outcome::Done(task))
    }

    /// Creates a reminder. The board is not refetched.
    pub fn add_reminder(&self, id: TaskId, remind_at: &str) -> Result<Reminder, AppError> {
        if remind_at.trim().is_empty() {
            return Err(AppError::invalid_input("please select date & time"));
        }
        let remind_at = parse_user_datetime(remind_at, "remind_at")?;

        let reminder = self.api.create_reminder(&NewReminder { task: id, remind_at })?;
        tracing::info!(id, remind_at = %reminder.remind_at, "reminder set");
        Ok(reminder)
    }

    pub fn check_reminders(&self) -> Result<u64, AppError> {
        let sent = self.api.check_reminders()?;
        tracing::info!(sent, "server reminder check finished");
        Ok(sent)
    }

    pub fn cleanup_failed(&mut self) -> Result<u64, AppError> {
        let deleted = self.api.cleanup_failed()?;
        tracing::info!(deleted, "expired failed tasks removed");

        self.refresh_after(&format!("{deleted} failed task(s) removed"))?;
        Ok(deleted)
    }

    pub fn columns(&self) -> Vec<Column<'_>> {
        partition_columns(&self.tasks)
    }

    pub fn failed(&self) -> Vec<&Task> {
        failed_tasks(&self.tasks)
    }

    pub fn uncategorized(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| !task.is_failed() && matches!(task.category, Category::Other(_)))
            .collect()
    }

    /// Raises one notification per due reminder. Failures, including
    /// reminders whose time cannot be read, are collected.
    pub fn notify_due_reminders(
        &self,
        notifier: &dyn Notifier,
        now: OffsetDateTime,
    ) -> NotificationOutcome {
        let mut notified = Vec::new();
        let mut failures = Vec::new();

        for task in &self.tasks {
            for due in task.due_reminders(now) {
                let result = due.and_then(|reminder| {
                    let action = activation_argument(task.id);
                    notifier
                        .notify_with_action(task, reminder, &action)
                        .map(|()| reminder)
                });
                match result {
                    Ok(reminder) => notified.push((task.id, reminder.clone())),
                    Err(err) => {
                        tracing::debug!(task = task.id, error = %err, "reminder notification failed");
                        failures.push(NotificationFailure {
                            task_id: task.id,
                            error: err,
                        });
                    }
                }
            }
        }

        NotificationOutcome { notified, failures }
    }
}

/// Active tasks grouped under the fixed category columns.
pub fn partition_columns(tasks: &[Task]) -> Vec<Column<'_>> {
    Category::columns()
        .into_iter()
        .map(|category| {
            let tasks = tasks
                .iter()
                .filter(|task| !task.is_failed() && task.category == category)
                .collect();
            Column { category, tasks }
        })
        .collect()
}

pub fn failed_tasks(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|task| task.is_failed()).collect()
}
