use crate::error::AppError;
use crate::model::{Reminder, Task, TaskId};

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

const DISABLE_ENV_VAR: &str = "PROGRESS_TRACKER_DISABLE_NOTIFICATIONS";

pub trait Notifier {
    fn notify(&self, task: &Task, reminder: &Reminder) -> Result<(), AppError>;

    fn notify_with_action(
        &self,
        task: &Task,
        reminder: &Reminder,
        action: &str,
    ) -> Result<(), AppError> {
        let _ = action;
        self.notify(task, reminder)
    }
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _task: &Task, _reminder: &Reminder) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn notifier_from_env() -> Result<Box<dyn Notifier>, AppError> {
    if std::env::var(DISABLE_ENV_VAR).is_ok() {
        return Ok(Box::new(NoopNotifier));
    }

    match platform_notifier() {
        Ok(notifier) => Ok(notifier),
        Err(err) => match err {
            AppError::InvalidData(_) => {
                tracing::debug!(error = %err, "desktop notifications unavailable");
                Ok(Box::new(NoopNotifier))
            }
            other => Err(other),
        },
    }
}

pub(crate) fn notification_body(task: &Task, reminder: &Reminder) -> String {
    format!(
        "{} [{}] due {} (#{})",
        task.title,
        task.category.label(),
        reminder.remind_at,
        task.id
    )
}

const ACTION_PREFIX: &str = "show:";

pub fn activation_argument(task_id: TaskId) -> String {
    format!("{ACTION_PREFIX}{task_id}")
}

pub fn parse_activation_argument(argument: &str) -> Option<TaskId> {
    argument
        .strip_prefix(ACTION_PREFIX)
        .and_then(|id| id.trim().parse().ok())
}

/// Re-launches the current executable to show the task's details.
pub fn launch_show(task_id: TaskId) -> Result<(), AppError> {
    let exe = std::env::current_exe().map_err(|err| AppError::io(err.to_string()))?;
    std::process::Command::new(exe)
        .arg("show")
        .arg(task_id.to_string())
        .spawn()
        .map_err(|err| AppError::io(err.to_string()))?;
    Ok(())
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}
