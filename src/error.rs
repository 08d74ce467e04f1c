use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum LeavecoreError {
    StoreError(String),
    RuntimeError(String),
    SyncError(String),
    NotificationError(String),
    ValidationError(String),
    ConfigurationError(String),
}

impl fmt::Display for LeavecoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeavecoreError::StoreError(msg) => write!(f, "Store error: {msg}"),
            LeavecoreError::RuntimeError(msg) => write!(f, "Runtime error: {msg}"),
            LeavecoreError::SyncError(msg) => write!(f, "Sync error: {msg}"),
            LeavecoreError::NotificationError(msg) => write!(f, "Notification error: {msg}"),
            LeavecoreError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            LeavecoreError::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for LeavecoreError {}

pub type Result<T> = std::result::Result<T, LeavecoreError>;
