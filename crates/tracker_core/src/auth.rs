use crate::api::{Credentials, TrackerApi};
use crate::error::AppError;
use crate::storage::session_store::{self, Session};
use std::path::Path;

pub fn login(
    api: &dyn TrackerApi,
    session_path: &Path,
    username: &str,
    password: &str,
) -> Result<Session, AppError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::invalid_input("username is required"));
    }
    if password.is_empty() {
        return Err(AppError::invalid_input("password is required"));
    }

    let credentials = Credentials {
        username: username.to_string(),
        password: password.to_string(),
    };

    let tokens = api.obtain_token(&credentials).map_err(|err| match err {
        AppError::Unauthorized(_) | AppError::Http { .. } | AppError::InvalidData(_) => {
            tracing::debug!(error = %err, "token exchange rejected");
            AppError::unauthorized("invalid credentials")
        }
        other => other,
    })?;

    let session = Session {
        access_token: Some(tokens.access),
        refresh_token: Some(tokens.refresh),
    };
    session_store::save_session(session_path, &session)?;
    tracing::info!(username, "logged in");

    Ok(session)
}

pub fn logout(session_path: &Path) -> Result<(), AppError> {
    session_store::clear_session(session_path)?;
    tracing::info!("logged out");
    Ok(())
}
