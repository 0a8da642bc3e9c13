use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    InvalidInput(String),
    InvalidData(String),
    Io(String),
    Unauthorized(String),
    Http { status: u16, message: String },
    Network(String),
    LoginRequired(String),
}

impl AppError {
    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn unauthorized<M: Into<String>>(message: M) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn http<M: Into<String>>(status: u16, message: M) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::Network(message.into())
    }

    pub fn login_required<M: Into<String>>(message: M) -> Self {
        Self::LoginRequired(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidData(_) => "invalid_data",
            Self::Io(_) => "io_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::Http { .. } => "http_error",
            Self::Network(_) => "network_error",
            Self::LoginRequired(_) => "login_required",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(message) => message,
            Self::InvalidData(message) => message,
            Self::Io(message) => message,
            Self::Unauthorized(message) => message,
            Self::Http { message, .. } => message,
            Self::Network(message) => message,
            Self::LoginRequired(message) => message,
        }
    }

    /// Prefixes the message, keeping the code.
    pub fn context(self, prefix: &str) -> Self {
        let wrap = |message: String| format!("{prefix}: {message}");
        match self {
            Self::InvalidInput(message) => Self::InvalidInput(wrap(message)),
            Self::InvalidData(message) => Self::InvalidData(wrap(message)),
            Self::Io(message) => Self::Io(wrap(message)),
            Self::Unauthorized(message) => Self::Unauthorized(wrap(message)),
            Self::Http { status, message } => Self::Http {
                status,
                message: wrap(message),
            },
            Self::Network(message) => Self::Network(wrap(message)),
            Self::LoginRequired(message) => Self::LoginRequired(wrap(message)),
        }
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.code(), self.message())
    }
}

impl std::error::Error for AppError {}
