//! User-facing notifications and their error taxonomy.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeCategory {
    /// Missing, non-video or oversized input; nothing was sent.
    Validation,
    /// The analysis service answered with an error message.
    Service,
    /// The request failed or the answer could not be read.
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    category: NoticeCategory,
    message: String,
}

impl Notification {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            category: NoticeCategory::Validation,
            message: message.into(),
        }
    }

    pub fn service(server_message: &str) -> Self {
        Self {
            category: NoticeCategory::Service,
            message: format!("Error analyzing video: {server_message}"),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            category: NoticeCategory::Transport,
            message: message.into(),
        }
    }

    pub fn category(&self) -> NoticeCategory {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
