use crate::error::AppError;
use crate::model::{Reminder, Task};
use crate::notify::{Notifier, launch_show, notification_body, parse_activation_argument};
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, task: &Task, reminder: &Reminder) -> Result<(), AppError> {
        self.notify_with_action(task, reminder, "")
    }

    fn notify_with_action(
        &self,
        task: &Task,
        reminder: &Reminder,
        action: &str,
    ) -> Result<(), AppError> {
        let task_id = task.id;
        let action_value = action.to_string();
        let mut toast = Toast::new(Toast::POWERSHELL_APP_ID)
            .title("Progress Tracker reminder")
            .text1(&task.title)
            .text2(&notification_body(task, reminder));

        if !action_value.trim().is_empty() {
            toast = toast.add_button("Open", &action_value);
        }

        toast
            .on_activated(move |args| {
                let target = args
                    .as_deref()
                    .and_then(parse_activation_argument)
                    .unwrap_or(task_id);
                let _ = launch_show(target);
                Ok(())
            })
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
