//! Persisted login state. Holds the access and refresh tokens the way a
//! browser would keep them in local storage.

use crate::config;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SESSION_FILE_NAME: &str = "session.json";
const SESSION_ENV_VAR: &str = "PROGRESS_TRACKER_SESSION_PATH";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl Session {
    /// Stored access token, ignoring blank values.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    pub fn is_logged_in(&self) -> bool {
        self.access_token().is_some()
    }
}

pub fn session_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(SESSION_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(config::app_dir()?.join(SESSION_FILE_NAME))
}

pub fn load_session(path: &Path) -> Result<Session, AppError> {
    if !path.exists() {
        return Ok(Session::default());
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io(err.to_string()))?;
    serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))
}

pub fn save_session(path: &Path, session: &Session) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let content = serde_json::to_string_pretty(session)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    Ok(())
}

pub fn clear_session(path: &Path) -> Result<(), AppError> {
    if !path.exists() {
        return Ok(());
    }
    std::fs::remove_file(path).map_err(|err| AppError::io(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{Session, clear_session, load_session, save_session};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("progress-tracker-{nanos}-{file_name}"))
    }

    #[test]
    fn missing_file_is_logged_out() {
        let path = temp_path("no-session.json");
        let session = load_session(&path).unwrap();

        assert_eq!(session, Session::default());
        assert!(!session.is_logged_in());
    }

    #[test]
    fn save_and_load_keeps_both_tokens() {
        let path = temp_path("session.json");
        let session = Session {
            access_token: Some("access-1".to_string()),
            refresh_token: Some("refresh-1".to_string()),
        };

        save_session(&path, &session).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let loaded = load_session(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(raw["access_token"], "access-1");
        assert_eq!(raw["refresh_token"], "refresh-1");
        assert_eq!(loaded, session);
        assert_eq!(loaded.access_token(), Some("access-1"));
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_path("private-session.json");
        save_session(&path, &Session::default()).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        fs::remove_file(&path).ok();

        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn blank_access_token_is_not_logged_in() {
        let session = Session {
            access_token: Some("  ".to_string()),
            refresh_token: None,
        };
        assert!(!session.is_logged_in());
    }

    #[test]
    fn clear_session_removes_file() {
        let path = temp_path("clear-session.json");
        save_session(
            &path,
            &Session {
                access_token: Some("a".to_string()),
                refresh_token: Some("r".to_string()),
            },
        )
        .unwrap();

        clear_session(&path).unwrap();
        clear_session(&path).unwrap();

        assert!(!path.exists());
        assert!(!load_session(&path).unwrap().is_logged_in());
    }

    #[test]
    fn rejects_malformed_session() {
        let path = temp_path("bad-session.json");
        fs::write(&path, "{\"access_token\": 5}").unwrap();

        let err = load_session(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_data");
    }
}
