use crate::api::{Credentials, NewReminder, NewTask, TaskPatch, TokenPair, TrackerApi};
use crate::config::ReminderEndpoint;
use crate::error::AppError;
use crate::model::{Reminder, Task, TaskId};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Deserialize)]
struct SentCount {
    sent: u64,
}

#[derive(Debug, Deserialize)]
struct DeletedCount {
    deleted: u64,
}

/// Blocking REST client. Attaches the bearer token to every request except
/// the token exchange.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    access_token: Option<String>,
    reminder_endpoint: ReminderEndpoint,
}

impl HttpApi {
    pub fn new(base_url: &str, reminder_endpoint: ReminderEndpoint) -> Result<Self, AppError> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("api base url is required"));
        }

        let client = Client::builder()
            .build()
            .map_err(|err| AppError::network(err.to_string()))?;

        Ok(Self {
            client,
            base_url: trimmed.trim_end_matches('/').to_string(),
            access_token: None,
            reminder_endpoint,
        })
    }

    pub fn with_access_token(mut self, token: Option<&str>) -> Self {
        self.access_token = token
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.access_token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn send(&self, method: &str, url: &str, builder: RequestBuilder) -> Result<Response, AppError> {
        tracing::debug!(method, url, "sending request");
        let response = builder
            .send()
            .map_err(|err| AppError::network(format!("{method} {url}: {err}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let message = error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        tracing::debug!(method, url, status = status.as_u16(), %message, "request rejected");

        if status.as_u16() == 401 || status.as_u16() == 403 {
            Err(AppError::unauthorized(message))
        } else {
            Err(AppError::http(status.as_u16(), message))
        }
    }
}

fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
    response
        .json::<T>()
        .map_err(|err| AppError::invalid_data(format!("unexpected response body: {err}")))
}

/// Pulls a readable message out of an error body (`{"detail": ...}` or
/// field errors such as `{"title": ["This field is required."]}`).
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let value: serde_json::Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(_) => return Some(trimmed.chars().take(200).collect()),
    };

    if let Some(detail) = value.get("detail").and_then(|detail| detail.as_str()) {
        return Some(detail.to_string());
    }

    let fields = value.as_object()?;
    let parts: Vec<String> = fields
        .iter()
        .map(|(field, errors)| {
            let text = match errors {
                serde_json::Value::Array(items) => items
                    .iter()
                    .filter_map(|item| item.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            format!("{field}: {text}")
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

impl TrackerApi for HttpApi {
    fn obtain_token(&self, credentials: &Credentials) -> Result<TokenPair, AppError> {
        let url = self.url("token/");
        let builder = self.client.post(&url).json(credentials);
        read_json(self.send("POST", &url, builder)?)
    }

    fn list_tasks(&self) -> Result<Vec<Task>, AppError> {
        let url = self.url("tasks/");
        let builder = self.authorized(self.client.get(&url));
        read_json(self.send("GET", &url, builder)?)
    }

    fn create_task(&self, task: &NewTask) -> Result<Task, AppError> {
        let url = self.url("tasks/");
        let builder = self.authorized(self.client.post(&url).json(task));
        read_json(self.send("POST", &url, builder)?)
    }

    fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, AppError> {
        let url = self.url(&format!("tasks/{id}/"));
        let builder = self.authorized(self.client.patch(&url).json(patch));
        read_json(self.send("PATCH", &url, builder)?)
    }

    fn delete_task(&self, id: TaskId) -> Result<(), AppError> {
        let url = self.url(&format!("tasks/{id}/"));
        let builder = self.authorized(self.client.delete(&url));
        self.send("DELETE", &url, builder)?;
        Ok(())
    }

    fn create_reminder(&self, reminder: &NewReminder) -> Result<Reminder, AppError> {
        let url = self.url(self.reminder_endpoint.path());
        let builder = self.authorized(self.client.post(&url).json(reminder));
        read_json(self.send("POST", &url, builder)?)
    }

    fn check_reminders(&self) -> Result<u64, AppError> {
        let url = self.url("check-reminders/");
        let builder = self.authorized(self.client.get(&url));
        let count: SentCount = read_json(self.send("GET", &url, builder)?)?;
        Ok(count.sent)
    }

    fn cleanup_failed(&self) -> Result<u64, AppError> {
        let url = self.url("cleanup-failed/");
        let builder = self.authorized(self.client.delete(&url));
        let count: DeletedCount = read_json(self.send("DELETE", &url, builder)?)?;
        Ok(count.deleted)
    }
}
