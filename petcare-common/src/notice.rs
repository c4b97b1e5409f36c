//! User-visible notifications (toasts).

use serde::{Deserialize, Serialize};

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
}

impl std::fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoticeKind::Success => write!(f, "success"),
            NoticeKind::Error => write!(f, "error"),
        }
    }
}

/// Transient notification shown to the user after a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub const SERVER_BUSY: &'static str = "Server is busy. Please try again in a few moments.";
    pub const AUTH_FAILED: &'static str = "Authentication failed. Please sign in again.";

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    pub fn welcome_new(name: &str) -> Self {
        Self::success(format!("Welcome to PetCare, {}!", name))
    }

    pub fn welcome_back(name: &str) -> Self {
        Self::success(format!("Welcome back, {}!", name))
    }

    pub fn server_busy() -> Self {
        Self::error(Self::SERVER_BUSY)
    }

    pub fn auth_failed() -> Self {
        Self::error(Self::AUTH_FAILED)
    }
}
