use crate::error::AppError;
use crate::model::{Reminder, Task};
use crate::notify::{Notifier, launch_show, notification_body};
use notify_rust::Notification;

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, task: &Task, reminder: &Reminder) -> Result<(), AppError> {
        self.notify_with_action(task, reminder, "")
    }

    fn notify_with_action(
        &self,
        task: &Task,
        reminder: &Reminder,
        action: &str,
    ) -> Result<(), AppError> {
        let mut notification = Notification::new();
        notification.summary("Progress Tracker reminder");
        notification.body(&notification_body(task, reminder));
        if !action.trim().is_empty() {
            notification.action(action, "Open");
        }

        let handle = notification
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;

        if !action.trim().is_empty() {
            let action_key = action.to_string();
            let task_id = task.id;
            std::thread::spawn(move || {
                handle.wait_for_action(|selected| {
                    if selected == action_key || selected == "default" {
                        let _ = launch_show(task_id);
                    }
                });
            });
        }

        Ok(())
    }
}
